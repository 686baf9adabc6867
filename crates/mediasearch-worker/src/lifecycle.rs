//! Worker lifecycle framework (C2, spec §4.2): heartbeat, command polling,
//! signal handling, and the cooperative shutdown/pause contract every stage
//! run-loop is built on top of.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use mediasearch_db::WorkerStatusRepo;
use mediasearch_models::{WorkerCommand, WorkerId, WorkerRole, WorkerState};

use crate::config::WorkerConfig;
use crate::flight_log::{flush_to_disk, FlightLog};

/// Shared handle every stage's run-loop drives. One per worker process.
pub struct Lifecycle {
    pool: PgPool,
    config: WorkerConfig,
    flight_log: Arc<FlightLog>,
    forensics_dir: std::path::PathBuf,
    state_tx: watch::Sender<WorkerState>,
    stats: AsyncMutex<Option<serde_json::Value>>,
    /// Set by an OS signal or an explicit `shutdown` command observed by the
    /// heartbeat task. The main run-loop polls this, never the signal
    /// handler directly, so there is exactly one shutdown code path.
    shutdown_requested: AtomicBool,
    heartbeat_task: AsyncMutex<Option<JoinHandle<()>>>,
    signal_task: AsyncMutex<Option<JoinHandle<()>>>,
    command_poll_task: AsyncMutex<Option<JoinHandle<()>>>,
}

impl Lifecycle {
    /// Register this worker's `WorkerStatus` row and start the heartbeat and
    /// signal-handling background activities. Must be called once at
    /// process start, after the schema-version check (spec §4.2).
    pub async fn start(
        pool: PgPool,
        config: WorkerConfig,
        flight_log: Arc<FlightLog>,
        forensics_dir: std::path::PathBuf,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(WorkerState::Idle);

        let lifecycle = Arc::new(Self {
            pool,
            config,
            flight_log,
            forensics_dir,
            state_tx,
            stats: AsyncMutex::new(None),
            shutdown_requested: AtomicBool::new(false),
            heartbeat_task: AsyncMutex::new(None),
            signal_task: AsyncMutex::new(None),
            command_poll_task: AsyncMutex::new(None),
        });

        lifecycle.write_heartbeat().await;

        let heartbeat_handle = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.heartbeat_loop().await })
        };
        *lifecycle.heartbeat_task.lock().await = Some(heartbeat_handle);

        let signal_handle = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.signal_loop().await })
        };
        *lifecycle.signal_task.lock().await = Some(signal_handle);

        let command_poll_handle = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.command_poll_loop().await })
        };
        *lifecycle.command_poll_task.lock().await = Some(command_poll_handle);

        lifecycle
    }

    pub fn worker_id(&self) -> &WorkerId {
        &self.config.worker_id
    }

    pub fn role(&self) -> WorkerRole {
        self.config.role
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        self.config.poll_interval
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// True once an OS signal or DB `shutdown` command has been observed.
    /// Checked between work units everywhere the spec requires cooperative
    /// cancellation (directory boundaries, per-scene boundaries, per-frame
    /// in the video engine).
    pub fn should_stop(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    pub fn set_state(&self, state: WorkerState) {
        let _ = self.state_tx.send(state);
    }

    pub fn current_state(&self) -> WorkerState {
        *self.state_tx.borrow()
    }

    pub async fn set_stats(&self, stats: serde_json::Value) {
        *self.stats.lock().await = Some(stats);
    }

    /// Pulls the worker's pending command from the database once. Callers
    /// (the run-loop top, and cooperative checkpoints inside long stages)
    /// are responsible for acting on it; this never clears it.
    pub async fn poll_command(&self) -> WorkerCommand {
        WorkerStatusRepo::new(&self.pool)
            .pending_command(&self.config.worker_id)
            .await
            .unwrap_or_default()
    }

    pub async fn clear_command(&self) {
        let _ = WorkerStatusRepo::new(&self.pool)
            .clear_pending_command(&self.config.worker_id)
            .await;
    }

    /// Flush the flight log to `<forensics_dir>/<worker_id>_<ts>.log`,
    /// whether from an unhandled error or an explicit `forensic_dump`
    /// command (spec §4.2).
    pub async fn dump_flight_log(&self) {
        match flush_to_disk(
            &self.flight_log,
            &self.forensics_dir,
            self.config.worker_id.as_str(),
            chrono::Utc::now(),
        )
        .await
        {
            Ok(path) => info!(path = %path.display(), "flushed flight log"),
            Err(e) => warn!(error = %e, "failed to flush flight log"),
        }
    }

    /// Graceful exit: mark the worker offline in `WorkerStatus` and stop the
    /// background activities. The asset-level lease release is the caller's
    /// job (it knows which stage/asset, if any, is mid-flight).
    pub async fn shutdown(&self) {
        self.set_state(WorkerState::Offline);
        self.write_heartbeat().await;

        if let Some(handle) = self.heartbeat_task.lock().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.signal_task.lock().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.command_poll_task.lock().await.take() {
            handle.abort();
        }
    }

    async fn write_heartbeat(&self) {
        let stats = self.stats.lock().await.clone();
        if let Err(e) = WorkerStatusRepo::new(&self.pool)
            .heartbeat(
                &self.config.worker_id,
                self.config.role,
                &self.config.hostname,
                self.current_state(),
                stats.as_ref(),
            )
            .await
        {
            warn!(error = %e, "heartbeat write failed");
        }
    }

    /// Background activity: writes a heartbeat row every
    /// `HEARTBEAT_INTERVAL_SECS`. Never shares mutable state with the main
    /// run-loop except through `state_tx`/`stats`, both thread-safe. Must
    /// never block the main thread — it runs on its own spawned task.
    async fn heartbeat_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.heartbeat_interval);
        loop {
            ticker.tick().await;
            self.write_heartbeat().await;
        }
    }

    /// Background activity: polls the worker's own `WorkerStatus` row for a
    /// `shutdown` command independently of the run-loop top, so a `shutdown`
    /// issued while a long-running stage (video segmentation, a directory
    /// walk) is mid-flight still flips [`Self::should_stop`] promptly instead
    /// of waiting for the current asset to finish on its own (spec §4.2:
    /// "interrupt long-running work at the next cooperative checkpoint").
    /// `pause`/`resume`/`forensic_dump` stay top-of-loop only — pause must
    /// let the current asset finish, not interrupt it.
    async fn command_poll_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.heartbeat_interval);
        loop {
            ticker.tick().await;
            if matches!(self.poll_command().await, WorkerCommand::Shutdown) {
                info!("shutdown command observed, requesting cooperative stop");
                self.shutdown_requested.store(true, Ordering::SeqCst);
                return;
            }
        }
    }

    /// Background activity: OS INT/TERM signals request the same graceful
    /// shutdown as an explicit `shutdown` command (spec §4.2) — one code
    /// path, not two.
    async fn signal_loop(self: Arc<Self>) {
        #[cfg(unix)]
        {
            let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler");
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("received SIGINT, requesting graceful shutdown");
                }
                _ = term.recv() => {
                    info!("received SIGTERM, requesting graceful shutdown");
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("received interrupt, requesting graceful shutdown");
        }

        self.shutdown_requested.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_stop_reflects_flag() {
        let flag = AtomicBool::new(false);
        assert!(!flag.load(Ordering::SeqCst));
        flag.store(true, Ordering::SeqCst);
        assert!(flag.load(Ordering::SeqCst));
    }
}
