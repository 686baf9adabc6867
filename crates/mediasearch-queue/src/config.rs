//! Tunables for the claim/lease engine.

use chrono::Duration;
use mediasearch_models::defaults;

/// Mirrors the teacher's `WorkerConfig::from_env` convention: every tunable
/// has a spec-default and an environment override.
#[derive(Debug, Clone)]
pub struct LeaseConfig {
    pub lease_ttl: Duration,
    pub heartbeat_interval: std::time::Duration,
    pub poll_interval: std::time::Duration,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            lease_ttl: Duration::seconds(defaults::LEASE_TTL_SECS),
            heartbeat_interval: std::time::Duration::from_secs(
                defaults::HEARTBEAT_INTERVAL_SECS,
            ),
            poll_interval: std::time::Duration::from_secs(defaults::POLL_INTERVAL_SECS),
        }
    }
}

impl LeaseConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            lease_ttl: std::env::var("LEASE_TTL_SEC")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::seconds)
                .unwrap_or(default.lease_ttl),
            heartbeat_interval: std::env::var("HEARTBEAT_INTERVAL_SEC")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(std::time::Duration::from_secs)
                .unwrap_or(default.heartbeat_interval),
            poll_interval: std::env::var("POLL_INTERVAL_SEC")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(std::time::Duration::from_secs)
                .unwrap_or(default.poll_interval),
        }
    }
}
