//! Run context passed explicitly to every boundary component.

use crate::config::PipelineConfig;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl PipelineContext {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    /// Short identifier used for table version directories.
    pub fn version_tag(&self) -> String {
        format!(
            "{}-{}",
            self.started_at.format("%Y%m%dT%H%M%S"),
            &self.run_id.simple().to_string()[..8]
        )
    }
}
