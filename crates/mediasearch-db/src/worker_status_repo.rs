//! Repository for the `worker_status` heartbeat table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use mediasearch_models::{WorkerCommand, WorkerId, WorkerRole, WorkerState, WorkerStatus};

use crate::error::{DbError, DbResult};

#[derive(sqlx::FromRow)]
struct WorkerStatusRow {
    worker_id: String,
    role: String,
    hostname: String,
    last_heartbeat: DateTime<Utc>,
    state: String,
    pending_command: String,
    stats: Option<serde_json::Value>,
    started_at: DateTime<Utc>,
}

impl From<WorkerStatusRow> for WorkerStatus {
    fn from(row: WorkerStatusRow) -> Self {
        WorkerStatus {
            worker_id: WorkerId(row.worker_id),
            role: role_from_db_str(&row.role),
            hostname: row.hostname,
            last_heartbeat: row.last_heartbeat,
            state: state_from_db_str(&row.state),
            pending_command: command_from_db_str(&row.pending_command),
            stats: row.stats,
            started_at: row.started_at,
        }
    }
}

fn role_from_db_str(s: &str) -> WorkerRole {
    match s {
        "image-proxy" => WorkerRole::ImageProxy,
        "video-proxy" => WorkerRole::VideoProxy,
        "ai-image" => WorkerRole::AiImage,
        "ai-video" => WorkerRole::AiVideo,
        _ => WorkerRole::Scanner,
    }
}

fn state_from_db_str(s: &str) -> WorkerState {
    match s {
        "processing" => WorkerState::Processing,
        "paused" => WorkerState::Paused,
        "offline" => WorkerState::Offline,
        _ => WorkerState::Idle,
    }
}

fn command_from_db_str(s: &str) -> WorkerCommand {
    match s {
        "pause" => WorkerCommand::Pause,
        "resume" => WorkerCommand::Resume,
        "shutdown" => WorkerCommand::Shutdown,
        "forensic_dump" => WorkerCommand::ForensicDump,
        _ => WorkerCommand::None,
    }
}

const WORKER_COLUMNS: &str =
    "worker_id, role, hostname, last_heartbeat, state, pending_command, stats, started_at";

pub struct WorkerStatusRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> WorkerStatusRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Upsert the worker's own heartbeat row. Called on startup and every
    /// `HEARTBEAT_INTERVAL_SECS`.
    pub async fn heartbeat(
        &self,
        worker_id: &WorkerId,
        role: WorkerRole,
        hostname: &str,
        state: WorkerState,
        stats: Option<&serde_json::Value>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO worker_status (worker_id, role, hostname, last_heartbeat, state, stats)
            VALUES ($1, $2, $3, now(), $4, $5)
            ON CONFLICT (worker_id) DO UPDATE SET
                last_heartbeat = now(),
                state = EXCLUDED.state,
                stats = EXCLUDED.stats
            "#,
        )
        .bind(worker_id.as_str())
        .bind(role.as_db_str())
        .bind(hostname)
        .bind(state.as_db_str())
        .bind(stats)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn find(&self, worker_id: &WorkerId) -> DbResult<Option<WorkerStatus>> {
        let row = sqlx::query_as::<_, WorkerStatusRow>(&format!(
            "SELECT {WORKER_COLUMNS} FROM worker_status WHERE worker_id = $1"
        ))
        .bind(worker_id.as_str())
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(WorkerStatus::from))
    }

    pub async fn list(&self) -> DbResult<Vec<WorkerStatus>> {
        let rows = sqlx::query_as::<_, WorkerStatusRow>(&format!(
            "SELECT {WORKER_COLUMNS} FROM worker_status ORDER BY worker_id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(WorkerStatus::from).collect())
    }

    /// Poll for a pending out-of-band command. Does not clear it — callers
    /// clear once the command has actually been acted on.
    pub async fn pending_command(&self, worker_id: &WorkerId) -> DbResult<WorkerCommand> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT pending_command FROM worker_status WHERE worker_id = $1")
                .bind(worker_id.as_str())
                .fetch_optional(self.pool)
                .await?;
        Ok(raw.as_deref().map(command_from_db_str).unwrap_or_default())
    }

    pub async fn set_pending_command(
        &self,
        worker_id: &WorkerId,
        command: WorkerCommand,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE worker_status SET pending_command = $1 WHERE worker_id = $2",
        )
        .bind(command.as_db_str())
        .bind(worker_id.as_str())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Query(sqlx::Error::RowNotFound));
        }
        Ok(())
    }

    pub async fn clear_pending_command(&self, worker_id: &WorkerId) -> DbResult<()> {
        sqlx::query("UPDATE worker_status SET pending_command = 'none' WHERE worker_id = $1")
            .bind(worker_id.as_str())
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Workers with no heartbeat in `staleness` are candidates for pruning
    /// from the admin-visible fleet view (`maintenance run`).
    pub async fn list_stale(&self, staleness: chrono::Duration) -> DbResult<Vec<WorkerStatus>> {
        let rows = sqlx::query_as::<_, WorkerStatusRow>(&format!(
            "SELECT {WORKER_COLUMNS} FROM worker_status WHERE last_heartbeat < now() - $1::interval"
        ))
        .bind(format!("{} seconds", staleness.num_seconds()))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(WorkerStatus::from).collect())
    }

    pub async fn delete(&self, worker_id: &WorkerId) -> DbResult<()> {
        sqlx::query("DELETE FROM worker_status WHERE worker_id = $1")
            .bind(worker_id.as_str())
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
