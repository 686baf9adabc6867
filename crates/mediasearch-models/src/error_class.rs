//! The error taxonomy every stage-local error type classifies into.
//!
//! A single dispatch point in the worker run-loop matches on `ErrorClass`
//! rather than ad hoc string inspection of error messages.

/// How the run-loop should react to a failed claim/process cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Network blip, lock contention, decoder stall. Lease expires,
    /// another worker reclaims; `retry_count` increments.
    Transient,
    /// Decoder ended before source duration. Retryable; disables hardware
    /// decode on the next attempt.
    Truncation,
    /// `retry_count` exceeded the cap. Asset is marked poisoned and is no
    /// longer reclaimed automatically.
    Poison,
    /// The frame/PTS pairing contract was violated. Fatal for the current
    /// attempt, retryable on the next.
    Desync,
    /// Schema mismatch, unreachable database. Fatal for the whole worker
    /// process; it exits non-zero immediately.
    Configuration,
    /// Source file cannot be decoded at all.
    Corrupt,
}

impl ErrorClass {
    /// Whether the asset should be retried (re-queued) rather than poisoned
    /// or escalated to a worker exit.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorClass::Transient | ErrorClass::Truncation | ErrorClass::Desync | ErrorClass::Corrupt
        )
    }

    /// Whether this should terminate the worker process rather than being
    /// handled per-asset.
    pub fn is_fatal_to_worker(self) -> bool {
        matches!(self, ErrorClass::Configuration)
    }
}
