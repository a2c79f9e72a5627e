//! Table Catalog
//!
//! A JSON registry mapping table names to the version directory that currently
//! backs them. The registry file is replaced by write-then-rename, so readers
//! see either the old or the new registration, never a mix.

use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const CATALOG_FILE: &str = "_catalog.json";
pub const SCHEMA_FILE: &str = "_schema.parquet";
pub const PART_FILE: &str = "part-00000.parquet";
pub const NULL_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionInfo {
    /// Partition key, `None` for rows whose key is null
    pub value: Option<i64>,
    /// Directory name relative to the table location
    pub directory: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub name: String,
    pub location: PathBuf,
    pub version: String,
    pub partition_column: String,
    pub columns: Vec<ColumnEntry>,
    pub partitions: Vec<PartitionInfo>,
    pub row_count: usize,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogState {
    tables: BTreeMap<String, TableEntry>,
}

pub struct TableCatalog {
    path: PathBuf,
}

impl TableCatalog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Catalog stored at the root of an output directory.
    pub fn in_dir(output_dir: &Path) -> Self {
        Self::new(output_dir.join(CATALOG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_state(&self) -> Result<CatalogState> {
        if !self.path.exists() {
            return Ok(CatalogState::default());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| {
            PipelineError::Catalog(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    fn store_state(&self, state: &CatalogState) -> Result<()> {
        let dir = self.path.parent().ok_or_else(|| {
            PipelineError::Catalog(format!(
                "Cannot determine parent directory for: {}",
                self.path.display()
            ))
        })?;
        fs::create_dir_all(dir)?;

        let staging = dir.join(format!("{}.tmp-{}", CATALOG_FILE, Uuid::new_v4().simple()));
        fs::write(&staging, serde_json::to_string_pretty(state)?)?;
        fs::rename(&staging, &self.path).map_err(|e| {
            let _ = fs::remove_file(&staging);
            PipelineError::Catalog(format!("Failed to publish catalog: {}", e))
        })
    }

    /// Point `entry.name` at a new location. Returns the replaced entry.
    pub fn register(&self, entry: TableEntry) -> Result<Option<TableEntry>> {
        let mut state = self.load_state()?;
        let previous = state.tables.insert(entry.name.clone(), entry);
        self.store_state(&state)?;
        Ok(previous)
    }

    pub fn lookup(&self, name: &str) -> Result<Option<TableEntry>> {
        Ok(self.load_state()?.tables.remove(name))
    }

    pub fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.load_state()?.tables.into_keys().collect())
    }

    fn entry(&self, name: &str) -> Result<TableEntry> {
        self.lookup(name)?
            .ok_or_else(|| PipelineError::Catalog(format!("Table not registered: {}", name)))
    }

    /// All rows of a registered table.
    pub fn scan(&self, name: &str) -> Result<DataFrame> {
        let entry = self.entry(name)?;
        read_partitions(&entry, entry.partitions.iter())
    }

    /// Rows of a single partition; other partition directories are not read.
    pub fn scan_partition(&self, name: &str, value: i64) -> Result<DataFrame> {
        let entry = self.entry(name)?;
        read_partitions(
            &entry,
            entry.partitions.iter().filter(|p| p.value == Some(value)),
        )
    }
}

fn read_parquet(path: &Path) -> Result<DataFrame> {
    let file = File::open(path).map_err(|e| {
        PipelineError::Catalog(format!("Failed to open {}: {}", path.display(), e))
    })?;
    ParquetReader::new(file).finish().map_err(|e| {
        PipelineError::Catalog(format!("Failed to read {}: {}", path.display(), e))
    })
}

fn read_partitions<'a>(
    entry: &TableEntry,
    partitions: impl Iterator<Item = &'a PartitionInfo>,
) -> Result<DataFrame> {
    // the zero-row schema file keeps empty results typed
    let mut out = read_parquet(&entry.location.join(SCHEMA_FILE))?;
    for partition in partitions {
        let part = read_parquet(&entry.location.join(&partition.directory).join(PART_FILE))?;
        out.vstack_mut(&part)?;
    }
    out.align_chunks();
    Ok(out)
}
