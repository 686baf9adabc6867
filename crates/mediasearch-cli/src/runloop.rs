//! The cooperative run-loop shared by every long-lived worker subcommand
//! (spec §4.2): obey a pending command, then either sleep (paused or idle)
//! or claim-and-process one asset. Each stage's `run_once` already folds
//! claim + process + mark-success/failure into one call, so this loop only
//! has to drive the command/pause/shutdown machinery around it.

use std::sync::Arc;

use mediasearch_models::{WorkerCommand, WorkerState};
use mediasearch_worker::{Lifecycle, WorkerResult};

/// What the top of the loop decided to do this iteration.
pub enum Tick {
    /// A command changed worker state; re-evaluate before claiming.
    HandledCommand,
    /// Nothing pending; go claim work.
    ClaimWork,
    /// Shutdown was requested; the caller should break out.
    Stop,
}

/// Pulls the worker's pending command and applies pause/resume/shutdown/
/// forensic-dump semantics. Never clears `shutdown` itself — that's left
/// set so `lifecycle.should_stop()` keeps returning true for any
/// in-flight stage that also checks it directly.
pub async fn obey_command_if_any(lifecycle: &Lifecycle, paused: &mut bool) -> Tick {
    if lifecycle.should_stop() {
        return Tick::Stop;
    }

    match lifecycle.poll_command().await {
        WorkerCommand::None => {}
        WorkerCommand::Pause => {
            *paused = true;
            lifecycle.set_state(WorkerState::Paused);
            lifecycle.clear_command().await;
            return Tick::HandledCommand;
        }
        WorkerCommand::Resume => {
            *paused = false;
            lifecycle.set_state(WorkerState::Idle);
            lifecycle.clear_command().await;
            return Tick::HandledCommand;
        }
        WorkerCommand::Shutdown => {
            lifecycle.clear_command().await;
            return Tick::Stop;
        }
        WorkerCommand::ForensicDump => {
            lifecycle.dump_flight_log().await;
            lifecycle.clear_command().await;
            return Tick::HandledCommand;
        }
    }

    if *paused {
        Tick::HandledCommand
    } else {
        Tick::ClaimWork
    }
}

/// Drives `poll_fn` (one stage's `run_once`) through the run-loop described
/// in spec §4.2. `once` stops after the first claimed unit of work (or
/// immediately if none is available); otherwise it polls forever until a
/// command or signal requests shutdown.
pub async fn drive<F, Fut>(lifecycle: &Arc<Lifecycle>, once: bool, mut poll_fn: F) -> WorkerResult<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = WorkerResult<bool>>,
{
    let mut paused = false;
    loop {
        match obey_command_if_any(lifecycle, &mut paused).await {
            Tick::Stop => break,
            Tick::HandledCommand => {
                tokio::time::sleep(lifecycle.poll_interval()).await;
                continue;
            }
            Tick::ClaimWork => {}
        }

        let did_work = poll_fn().await?;

        if once {
            break;
        }
        if !did_work {
            tokio::time::sleep(lifecycle.poll_interval()).await;
        }
    }

    lifecycle.shutdown().await;
    Ok(())
}
