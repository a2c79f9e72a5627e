//! Entity Readers
//!
//! Boundary that supplies the six raw datasets. All readers route through
//! `schema::conform`, so the declared types are applied the same way whether
//! the data comes from CSV files or from frames built in memory.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::schema::{conform, Entity};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Reader trait
///
/// Produces one raw dataset conformed to its declared schema.
pub trait EntityReader {
    fn read(&self, entity: Entity) -> Result<DataFrame>;
}

/// Reads the extracts as CSV files from a local directory.
pub struct CsvEntityReader {
    paths: HashMap<Entity, PathBuf>,
}

impl CsvEntityReader {
    pub fn new(config: &PipelineConfig) -> Self {
        let paths = Entity::ALL
            .iter()
            .map(|entity| (*entity, config.source_path(*entity)))
            .collect();
        Self { paths }
    }

    fn path_for(&self, entity: Entity) -> Result<&PathBuf> {
        self.paths
            .get(&entity)
            .ok_or_else(|| PipelineError::read(entity.dataset_name(), "no source path configured"))
    }
}

impl EntityReader for CsvEntityReader {
    fn read(&self, entity: Entity) -> Result<DataFrame> {
        let path = self.path_for(entity)?;
        if !path.exists() {
            return Err(PipelineError::read(
                entity.dataset_name(),
                format!("file not found: {}", path.display()),
            ));
        }

        // Every column comes in as text; conform applies the declared types.
        let raw = LazyCsvReader::new(path)
            .with_infer_schema_length(Some(0))
            .finish()
            .map_err(|e| PipelineError::read(entity.dataset_name(), format!("Failed to scan CSV: {}", e)))?
            .collect()
            .map_err(|e| PipelineError::read(entity.dataset_name(), format!("Failed to collect CSV: {}", e)))?;

        debug!("Read {} raw rows from {}", raw.height(), path.display());
        conform(entity, raw)
    }
}

/// Serves raw frames held in memory.
#[derive(Default)]
pub struct InMemorySource {
    frames: HashMap<Entity, DataFrame>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame(mut self, entity: Entity, frame: DataFrame) -> Self {
        self.frames.insert(entity, frame);
        self
    }
}

impl EntityReader for InMemorySource {
    fn read(&self, entity: Entity) -> Result<DataFrame> {
        let frame = self
            .frames
            .get(&entity)
            .ok_or_else(|| PipelineError::read(entity.dataset_name(), "no frame registered"))?;
        conform(entity, frame.clone())
    }
}

/// The six conformed inputs of one run.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub customers: DataFrame,
    pub orders: DataFrame,
    pub order_items: DataFrame,
    pub products: DataFrame,
    pub sellers: DataFrame,
    pub reviews: DataFrame,
}

impl SourceTables {
    /// Read every dataset. The first failure aborts the whole load.
    pub fn load(reader: &dyn EntityReader) -> Result<Self> {
        let read = |entity: Entity| -> Result<DataFrame> {
            let df = reader.read(entity)?;
            info!("Loaded {} rows from {}", df.height(), entity);
            Ok(df)
        };

        Ok(Self {
            customers: read(Entity::Customers)?,
            orders: read(Entity::Orders)?,
            order_items: read(Entity::OrderItems)?,
            products: read(Entity::Products)?,
            sellers: read(Entity::Sellers)?,
            reviews: read(Entity::Reviews)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fact_sales_source_{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_csv_reader_applies_declared_schema() {
        let dir = scratch_dir();
        let config = PipelineConfig {
            input_dir: dir.clone(),
            ..PipelineConfig::default()
        };
        fs::write(
            config.source_path(Entity::Products),
            "product_id,product_category_name,product_name_lenght,product_photos_qty,product_weight_g,product_length_cm,product_height_cm,product_width_cm\n\
             p1,cama_mesa_banho,40,1,225,16,10,14\n\
             p2,,,,,,,\n",
        )
        .unwrap();

        let reader = CsvEntityReader::new(&config);
        let products = reader.read(Entity::Products).unwrap();

        assert_eq!(products.height(), 2);
        assert_eq!(products.schema(), Entity::Products.declared_schema());
        let category = products.column("product_category_name").unwrap().str().unwrap();
        assert_eq!(category.get(0), Some("cama_mesa_banho"));
        assert_eq!(category.get(1), None);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = scratch_dir();
        let config = PipelineConfig {
            input_dir: dir.clone(),
            ..PipelineConfig::default()
        };

        let reader = CsvEntityReader::new(&config);
        let err = reader.read(Entity::Sellers).unwrap_err();
        assert!(matches!(err, PipelineError::Read { ref dataset, .. } if dataset == "sellers"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_stops_at_first_missing_dataset() {
        let source = InMemorySource::new().with_frame(
            Entity::Customers,
            df! [
                "customer_id" => ["c1"],
                "customer_unique_id" => ["u1"],
                "customer_city" => ["franca"],
                "customer_state" => ["SP"]
            ]
            .unwrap(),
        );

        let err = SourceTables::load(&source).unwrap_err();
        assert!(matches!(err, PipelineError::Read { ref dataset, .. } if dataset == "orders"));
    }
}
