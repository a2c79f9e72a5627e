use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Read error for dataset '{dataset}': {reason}")]
    Read { dataset: String, reason: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Transform error in {stage}: {reason}")]
    Transform { stage: &'static str, reason: String },

    #[error("Write error: {0}")]
    Write(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

impl PipelineError {
    pub fn read(dataset: &str, reason: impl ToString) -> Self {
        PipelineError::Read {
            dataset: dataset.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn transform(stage: &'static str, reason: impl ToString) -> Self {
        PipelineError::Transform {
            stage,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
