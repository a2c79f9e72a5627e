//! Pipeline Configuration
//!
//! Locations and names the pipeline receives from outside. Loaded from a JSON
//! file; every field has a default matching the standard Olist extract layout.

use crate::error::{PipelineError, Result};
use crate::schema::{fact_sales_schema, Entity};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How multiple reviews for one order are handled before the review join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewPolicy {
    /// Join every review; an order with N reviews yields N rows per item.
    #[default]
    KeepAll,
    /// Keep only the most recently created review per order.
    LatestPerOrder,
}

/// Source file name per dataset, relative to `input_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFiles {
    pub customers: String,
    pub orders: String,
    pub order_items: String,
    pub products: String,
    pub sellers: String,
    pub order_reviews: String,
}

impl Default for SourceFiles {
    fn default() -> Self {
        Self {
            customers: "olist_customers_dataset.csv".to_string(),
            orders: "olist_orders_dataset.csv".to_string(),
            order_items: "olist_order_items_dataset.csv".to_string(),
            products: "olist_products_dataset.csv".to_string(),
            sellers: "olist_sellers_dataset.csv".to_string(),
            order_reviews: "olist_order_reviews_dataset.csv".to_string(),
        }
    }
}

impl SourceFiles {
    pub fn file_for(&self, entity: Entity) -> &str {
        match entity {
            Entity::Customers => &self.customers,
            Entity::Orders => &self.orders,
            Entity::OrderItems => &self.order_items,
            Entity::Products => &self.products,
            Entity::Sellers => &self.sellers,
            Entity::Reviews => &self.order_reviews,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the raw extracts
    pub input_dir: PathBuf,
    /// Root directory for table versions and the catalog
    pub output_dir: PathBuf,
    pub table_name: String,
    pub partition_column: String,
    pub review_policy: ReviewPolicy,
    pub sources: SourceFiles,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("warehouse"),
            table_name: "fact_sales".to_string(),
            partition_column: "purchase_month_key".to_string(),
            review_policy: ReviewPolicy::default(),
            sources: SourceFiles::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: PipelineConfig = serde_json::from_str(&content).map_err(|e| {
            PipelineError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.table_name.trim().is_empty() {
            return Err(PipelineError::Config("table_name must not be empty".to_string()));
        }

        let schema = fact_sales_schema();
        match schema.get(&self.partition_column) {
            Some(dtype) if dtype.is_integer() => {}
            Some(dtype) => {
                return Err(PipelineError::Config(format!(
                    "partition column '{}' must be an integer column, found {}",
                    self.partition_column, dtype
                )))
            }
            None => {
                return Err(PipelineError::Config(format!(
                    "partition column '{}' is not a fact_sales column",
                    self.partition_column
                )))
            }
        }

        for entity in Entity::ALL {
            if self.sources.file_for(entity).trim().is_empty() {
                return Err(PipelineError::Config(format!(
                    "no source file configured for {}",
                    entity
                )));
            }
        }
        Ok(())
    }

    pub fn source_path(&self, entity: Entity) -> PathBuf {
        self.input_dir.join(self.sources.file_for(entity))
    }
}
