//! Structured per-asset logging and the worker's tracing subscriber setup.
//!
//! Mirrors the teacher's `JobLogger` convention, generalized to wrap
//! `asset_id` instead of `job_id`.

use std::sync::Arc;

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mediasearch_models::AssetId;

use crate::flight_log::{FlightLog, FlightLogLayer};

/// Per-asset structured logger with consistent formatting across stages.
#[derive(Debug, Clone)]
pub struct AssetLogger {
    asset_id: String,
    stage: String,
}

impl AssetLogger {
    pub fn new(asset_id: AssetId, stage: &str) -> Self {
        Self {
            asset_id: asset_id.to_string(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(asset_id = %self.asset_id, stage = %self.stage, "started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(asset_id = %self.asset_id, stage = %self.stage, "progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(asset_id = %self.asset_id, stage = %self.stage, "warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(asset_id = %self.asset_id, stage = %self.stage, "error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(asset_id = %self.asset_id, stage = %self.stage, "completed: {}", message);
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!("asset", asset_id = %self.asset_id, stage = %self.stage)
    }
}

/// Install the worker's tracing subscriber: JSON output gated by `RUST_LOG`
/// plus the in-memory flight log layer. Returns the shared flight log handle
/// so the lifecycle loop can flush it on error or `forensic_dump`.
pub fn init_tracing() -> Arc<FlightLog> {
    let flight_log = Arc::new(FlightLog::default());

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(FlightLogLayer::new(flight_log.clone()))
        .with(EnvFilter::from_default_env().add_directive("mediasearch=info".parse().unwrap()))
        .init();

    flight_log
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_logger_formats_id() {
        let logger = AssetLogger::new(AssetId::new(42), "proxy");
        assert_eq!(logger.asset_id, "42");
        assert_eq!(logger.stage, "proxy");
    }
}
