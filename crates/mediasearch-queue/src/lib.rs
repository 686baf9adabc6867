//! Queue/lease engine (C1): the atomic claim, heartbeat, and lease-expiry
//! reclaim that let N independent workers drain a shared Postgres-backed
//! queue with no peer-to-peer coordination and no dispatcher.

pub mod claim;
pub mod config;
pub mod error;

pub use claim::ClaimEngine;
pub use config::LeaseConfig;
pub use error::{QueueError, QueueResult};
