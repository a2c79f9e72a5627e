//! Persistence boundary: write the fact table and register it under a name.

pub mod catalog;
pub mod partitioned;

pub use catalog::{PartitionInfo, TableCatalog, TableEntry};
pub use partitioned::PartitionedParquetPersister;

use crate::error::Result;
use polars::prelude::DataFrame;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct PersistOutcome {
    pub table_name: String,
    pub version: String,
    pub location: PathBuf,
    pub partitions: Vec<PartitionInfo>,
    pub row_count: usize,
}

/// Persister trait
///
/// After `persist` returns `Ok`, the registered table shows exactly `facts`
/// (rows and schema). On `Err` the previous registration is still in effect.
pub trait FactPersister {
    fn persist(&self, facts: &DataFrame, partition_column: &str) -> Result<PersistOutcome>;
}
