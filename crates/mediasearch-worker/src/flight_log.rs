//! Bounded circular flight log (spec §4.2).
//!
//! Every worker keeps the last [`mediasearch_models::defaults::FORENSICS_FLIGHT_LOG_CAPACITY`]
//! log lines in memory. DEBUG/INFO never touch disk in steady state — only
//! on an unhandled error or an explicit `forensic_dump` command does the
//! buffer get flushed, atomically, to `<forensics_dir>/<worker_id>_<ts>.log`.
//! This is a `tracing_subscriber::Layer` so ordinary `tracing::info!`/
//! `debug!` calls populate it for free, with no call-site changes.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::Mutex;

use tracing::field::{Field, Visit};
use tracing::Subscriber;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use mediasearch_models::defaults::FORENSICS_FLIGHT_LOG_CAPACITY;

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// Single writer (the tracing layer on the main thread's call stack),
/// single reader (the dump routine). Insertion never blocks on the reader.
pub struct FlightLog {
    capacity: usize,
    buffer: Mutex<VecDeque<LogEntry>>,
}

impl FlightLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn push(&self, entry: LogEntry) {
        let mut buf = self.buffer.lock().expect("flight log mutex poisoned");
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(entry);
    }

    /// Drain the buffer atomically into a single string, oldest first.
    /// Leaves the buffer empty — a dump is a one-shot snapshot, not a peek.
    pub fn drain_to_string(&self) -> String {
        let mut buf = self.buffer.lock().expect("flight log mutex poisoned");
        let mut out = String::new();
        for entry in buf.drain(..) {
            let _ = writeln!(
                out,
                "{} {:>5} {} {}",
                entry.timestamp.to_rfc3339(),
                entry.level,
                entry.target,
                entry.message
            );
        }
        out
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().expect("flight log mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FlightLog {
    fn default() -> Self {
        Self::new(FORENSICS_FLIGHT_LOG_CAPACITY)
    }
}

/// Flush the drained buffer to `<forensics_dir>/<worker_id>_<unix_ts>.log`.
/// Called on an unhandled error and on `forensic_dump` (spec §4.2). Success
/// is never persisted this way — only the context around a failure.
pub async fn flush_to_disk(
    log: &FlightLog,
    forensics_dir: &std::path::Path,
    worker_id: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> std::io::Result<std::path::PathBuf> {
    tokio::fs::create_dir_all(forensics_dir).await?;
    let path = forensics_dir.join(format!("{worker_id}_{}.log", now.timestamp()));
    let contents = log.drain_to_string();
    tokio::fs::write(&path, contents).await?;
    Ok(path)
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else if !self.message.is_empty() {
            let _ = write!(self.message, " {}={:?}", field.name(), value);
        } else {
            let _ = write!(self.message, "{}={:?}", field.name(), value);
        }
    }
}

/// `tracing_subscriber::Layer` that feeds every event into a [`FlightLog`]
/// without affecting where the event also goes (stdout, JSON, etc).
pub struct FlightLogLayer {
    log: std::sync::Arc<FlightLog>,
}

impl FlightLogLayer {
    pub fn new(log: std::sync::Arc<FlightLog>) -> Self {
        Self { log }
    }
}

impl<S: Subscriber> Layer<S> for FlightLogLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.log.push(LogEntry {
            timestamp: chrono::Utc::now(),
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_evicts_oldest_past_capacity() {
        let log = FlightLog::new(3);
        for i in 0..5 {
            log.push(LogEntry {
                timestamp: chrono::Utc::now(),
                level: "INFO".into(),
                target: "test".into(),
                message: format!("entry {i}"),
            });
        }
        assert_eq!(log.len(), 3);
        let dumped = log.drain_to_string();
        assert!(dumped.contains("entry 4"));
        assert!(!dumped.contains("entry 0"));
    }

    #[test]
    fn drain_empties_the_buffer() {
        let log = FlightLog::new(10);
        log.push(LogEntry {
            timestamp: chrono::Utc::now(),
            level: "INFO".into(),
            target: "test".into(),
            message: "hi".into(),
        });
        assert_eq!(log.len(), 1);
        log.drain_to_string();
        assert!(log.is_empty());
    }
}
