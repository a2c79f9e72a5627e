//! Partitioned Parquet Persister
//!
//! Each run writes a fresh version directory:
//!
//! ```text
//! <output_dir>/<table>/v-<version>/_schema.parquet
//! <output_dir>/<table>/v-<version>/purchase_month_key=201801/part-00000.parquet
//! ```
//!
//! and only then flips the catalog entry to it. The previous version is removed
//! after the flip.

use super::catalog::{
    ColumnEntry, PartitionInfo, TableCatalog, TableEntry, NULL_PARTITION, PART_FILE, SCHEMA_FILE,
};
use super::{FactPersister, PersistOutcome};
use crate::context::PipelineContext;
use crate::error::{PipelineError, Result};
use chrono::Utc;
use itertools::Itertools;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct PartitionedParquetPersister {
    output_dir: PathBuf,
    table_name: String,
    version: String,
    catalog: TableCatalog,
}

impl PartitionedParquetPersister {
    pub fn new(ctx: &PipelineContext) -> Self {
        let output_dir = ctx.config.output_dir.clone();
        Self {
            catalog: TableCatalog::in_dir(&output_dir),
            table_name: ctx.config.table_name.clone(),
            version: ctx.version_tag(),
            output_dir,
        }
    }

    pub fn catalog(&self) -> &TableCatalog {
        &self.catalog
    }

    fn version_dir(&self) -> PathBuf {
        self.output_dir
            .join(&self.table_name)
            .join(format!("v-{}", self.version))
    }

    fn write_version(
        &self,
        facts: &DataFrame,
        partition_column: &str,
        version_dir: &Path,
    ) -> Result<Vec<PartitionInfo>> {
        fs::create_dir_all(version_dir)?;
        write_parquet(&version_dir.join(SCHEMA_FILE), &mut facts.head(Some(0)))?;

        if facts.height() == 0 {
            return Ok(Vec::new());
        }

        let sort_columns: Vec<String> = facts
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut partitions = Vec::new();
        for part in facts.partition_by_stable([partition_column], true)? {
            let value = part.column(partition_column)?.get(0)?.extract::<i64>();
            let directory = partition_directory(partition_column, value);

            // canonical row order so reruns produce identical files
            let mut sorted = part.sort(sort_columns.clone(), SortMultipleOptions::default())?;
            sorted.as_single_chunk_par();

            let dir = version_dir.join(&directory);
            fs::create_dir_all(&dir)?;
            write_parquet(&dir.join(PART_FILE), &mut sorted)?;
            debug!("Wrote {} rows to {}", sorted.height(), dir.display());

            partitions.push(PartitionInfo {
                value,
                directory,
                rows: sorted.height(),
            });
        }

        Ok(partitions
            .into_iter()
            .sorted_by(|a, b| a.directory.cmp(&b.directory))
            .collect())
    }

    /// Write the version directory, removing it again if any file fails.
    fn write_version_or_discard(
        &self,
        facts: &DataFrame,
        partition_column: &str,
        version_dir: &Path,
    ) -> Result<Vec<PartitionInfo>> {
        self.write_version(facts, partition_column, version_dir)
            .map_err(|e| {
                warn!("Discarding partial version {}: {}", version_dir.display(), e);
                discard(version_dir);
                e
            })
    }
}

fn partition_directory(column: &str, value: Option<i64>) -> String {
    match value {
        Some(v) => format!("{}={}", column, v),
        None => format!("{}={}", column, NULL_PARTITION),
    }
}

fn write_parquet(path: &Path, df: &mut DataFrame) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        PipelineError::Write(format!("Failed to create {}: {}", path.display(), e))
    })?;
    ParquetWriter::new(&mut file).finish(df).map_err(|e| {
        PipelineError::Write(format!("Failed to write {}: {}", path.display(), e))
    })?;
    Ok(())
}

fn discard(dir: &Path) {
    if dir.exists() {
        if let Err(e) = fs::remove_dir_all(dir) {
            warn!("Failed to remove {}: {}", dir.display(), e);
        }
    }
}

impl FactPersister for PartitionedParquetPersister {
    fn persist(&self, facts: &DataFrame, partition_column: &str) -> Result<PersistOutcome> {
        let dtype = facts
            .column(partition_column)
            .map_err(|_| {
                PipelineError::Write(format!("partition column '{}' not in dataset", partition_column))
            })?
            .dtype()
            .clone();
        if !dtype.is_integer() {
            return Err(PipelineError::Write(format!(
                "partition column '{}' must be an integer column, found {}",
                partition_column, dtype
            )));
        }

        let version_dir = self.version_dir();
        if version_dir.exists() {
            return Err(PipelineError::Write(format!(
                "version directory already exists: {}",
                version_dir.display()
            )));
        }

        let partitions = self.write_version_or_discard(facts, partition_column, &version_dir)?;

        let entry = TableEntry {
            name: self.table_name.clone(),
            location: version_dir.clone(),
            version: self.version.clone(),
            partition_column: partition_column.to_string(),
            columns: facts
                .schema()
                .iter_fields()
                .map(|f| ColumnEntry {
                    name: f.name().to_string(),
                    data_type: f.data_type().to_string(),
                })
                .collect(),
            partitions: partitions.clone(),
            row_count: facts.height(),
            registered_at: Utc::now(),
        };

        let previous = match self.catalog.register(entry) {
            Ok(previous) => previous,
            Err(e) => {
                discard(&version_dir);
                return Err(e);
            }
        };
        info!(
            "Registered table {} at {} ({} rows, {} partitions)",
            self.table_name,
            version_dir.display(),
            facts.height(),
            partitions.len()
        );

        if let Some(previous) = previous {
            if previous.location != version_dir {
                discard(&previous.location);
            }
        }

        Ok(PersistOutcome {
            table_name: self.table_name.clone(),
            version: self.version.clone(),
            location: version_dir,
            partitions,
            row_count: facts.height(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use uuid::Uuid;

    fn facts() -> DataFrame {
        df! [
            "order_id" => ["o1", "o2", "o3"],
            "purchase_month_key" => [Some(201801i32), Some(201802), None]
        ]
        .unwrap()
    }

    fn context(output_dir: &Path) -> PipelineContext {
        PipelineContext::new(PipelineConfig {
            output_dir: output_dir.to_path_buf(),
            ..PipelineConfig::default()
        })
    }

    #[test]
    fn test_null_partition_value_gets_default_directory() {
        let dir = std::env::temp_dir().join(format!("fact_sales_persist_{}", Uuid::new_v4()));
        let persister = PartitionedParquetPersister::new(&context(&dir));

        let outcome = persister.persist(&facts(), "purchase_month_key").unwrap();

        let directories: Vec<&str> = outcome.partitions.iter().map(|p| p.directory.as_str()).collect();
        assert_eq!(
            directories,
            vec![
                "purchase_month_key=201801",
                "purchase_month_key=201802",
                "purchase_month_key=__HIVE_DEFAULT_PARTITION__"
            ]
        );
        assert_eq!(outcome.partitions[2].value, None);
        assert!(outcome.location.join(&outcome.partitions[2].directory).join(PART_FILE).is_file());

        let table = persister.catalog().scan("fact_sales").unwrap();
        assert_eq!(table.height(), 3);
        assert_eq!(table.column("purchase_month_key").unwrap().null_count(), 1);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partition_failure_discards_partial_version() {
        let dir = std::env::temp_dir().join(format!("fact_sales_persist_{}", Uuid::new_v4()));
        let first = PartitionedParquetPersister::new(&context(&dir))
            .persist(&facts(), "purchase_month_key")
            .unwrap();

        let persister = PartitionedParquetPersister::new(&context(&dir));
        let version_dir = persister.version_dir();
        fs::create_dir_all(&version_dir).unwrap();
        // a plain file where the first partition directory has to go
        fs::write(version_dir.join("purchase_month_key=201801"), b"").unwrap();

        let err = persister
            .write_version_or_discard(&facts(), "purchase_month_key", &version_dir)
            .unwrap_err();

        assert!(matches!(err, PipelineError::Io(_)));
        assert!(!version_dir.exists());
        let entry = persister.catalog().lookup("fact_sales").unwrap().unwrap();
        assert_eq!(entry.location, first.location);
        assert_eq!(persister.catalog().scan("fact_sales").unwrap().height(), 3);

        fs::remove_dir_all(&dir).ok();
    }
}
