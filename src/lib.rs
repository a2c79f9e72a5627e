pub mod config;
pub mod context;
pub mod error;
pub mod persist;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod transform;

pub use config::{PipelineConfig, ReviewPolicy};
pub use context::PipelineContext;
pub use error::{PipelineError, Result};
pub use pipeline::{build_fact_sales, FactSalesPipeline, PipelineReport, StageCounts};
