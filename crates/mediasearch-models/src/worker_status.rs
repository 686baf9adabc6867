//! WorkerStatus entity: the observational heartbeat row per worker process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::WorkerId;
use crate::status::{WorkerCommand, WorkerRole, WorkerState};

/// Heartbeat row for one worker process.
///
/// This is observational only: lease expiry on the asset row, not staleness
/// here, is the source of truth for "is this work abandoned".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub worker_id: WorkerId,
    pub role: WorkerRole,
    pub hostname: String,
    pub last_heartbeat: DateTime<Utc>,
    pub state: WorkerState,
    pub pending_command: WorkerCommand,
    pub stats: Option<serde_json::Value>,
    pub started_at: DateTime<Utc>,
}

impl WorkerStatus {
    pub fn is_stale(&self, now: DateTime<Utc>, staleness: chrono::Duration) -> bool {
        now - self.last_heartbeat > staleness
    }
}

/// Heartbeat stats payload shape the temp-GC cross-host guard looks for
/// (see `maintenance run`'s temp sweep).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeartbeatStats {
    pub transcoding: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_asset_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_processed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directories_visited: Option<u64>,
}
