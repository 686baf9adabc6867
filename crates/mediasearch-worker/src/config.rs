//! Worker process configuration: identity, role, and the tunables every
//! stage shares. Follows the teacher's `WorkerConfig::from_env` convention —
//! every field has a spec default and an environment override.

use mediasearch_models::{defaults, WorkerId, WorkerRole};
use rand::Rng;

/// Identity and scope a worker process is launched with. One process hosts
/// exactly one role (spec §5).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: WorkerId,
    pub role: WorkerRole,
    pub hostname: String,
    pub heartbeat_interval: std::time::Duration,
    pub poll_interval: std::time::Duration,
    pub worker_stale_after: chrono::Duration,
}

impl WorkerConfig {
    /// Build a worker identity for `role`, optionally pinned to an explicit
    /// `--worker-name`; otherwise generated as `<role>-<hostname>-<suffix>`.
    pub fn new(role: WorkerRole, explicit_name: Option<String>) -> Self {
        Self::with_heartbeat_override(role, explicit_name, None)
    }

    /// Same as `new`, but `--heartbeat N` on the worker subcommands (spec
    /// §6.1) takes precedence over `HEARTBEAT_INTERVAL_SEC`/the default.
    pub fn with_heartbeat_override(
        role: WorkerRole,
        explicit_name: Option<String>,
        heartbeat_override_secs: Option<u64>,
    ) -> Self {
        let hostname = local_hostname();
        let worker_id = match explicit_name {
            Some(name) => WorkerId(name),
            None => WorkerId::new(role.as_db_str(), &hostname, &random_suffix()),
        };

        let heartbeat_secs = heartbeat_override_secs.unwrap_or_else(|| {
            std::env::var("HEARTBEAT_INTERVAL_SEC")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::HEARTBEAT_INTERVAL_SECS)
        });

        Self {
            worker_id,
            role,
            hostname,
            heartbeat_interval: std::time::Duration::from_secs(heartbeat_secs),
            poll_interval: std::time::Duration::from_secs(
                std::env::var("POLL_INTERVAL_SEC")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults::POLL_INTERVAL_SECS),
            ),
            worker_stale_after: chrono::Duration::hours(defaults::WORKER_STALE_AFTER_HOURS),
        }
    }
}

/// Best-effort hostname for worker-id generation and the temp-GC cross-host
/// guard (spec §9). `HOSTNAME` is set in essentially every container
/// runtime; `/etc/hostname` covers bare-metal NAS-adjacent hosts too.
fn local_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown-host".to_string())
}

/// Six-character lowercase-alphanumeric suffix for worker ids, grounded in
/// the teacher's short job-id suffix generation.
pub fn random_suffix() -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..6)
        .map(|_| CHARS[rng.random_range(0..CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_worker_name_is_used_verbatim() {
        let cfg = WorkerConfig::new(WorkerRole::Scanner, Some("scanner-pinned".to_string()));
        assert_eq!(cfg.worker_id.as_str(), "scanner-pinned");
    }

    #[test]
    fn generated_worker_id_embeds_role() {
        let cfg = WorkerConfig::new(WorkerRole::ImageProxy, None);
        assert!(cfg.worker_id.as_str().starts_with("image-proxy-"));
    }

    #[test]
    fn heartbeat_override_beats_default() {
        let cfg = WorkerConfig::with_heartbeat_override(WorkerRole::Scanner, None, Some(3));
        assert_eq!(cfg.heartbeat_interval, std::time::Duration::from_secs(3));
    }

    #[test]
    fn no_override_falls_back_to_default() {
        std::env::remove_var("HEARTBEAT_INTERVAL_SEC");
        let cfg = WorkerConfig::with_heartbeat_override(WorkerRole::Scanner, None, None);
        assert_eq!(
            cfg.heartbeat_interval,
            std::time::Duration::from_secs(defaults::HEARTBEAT_INTERVAL_SECS)
        );
    }
}
