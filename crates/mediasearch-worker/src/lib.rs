#![deny(unreachable_patterns)]
//! Worker lifecycle framework and pipeline stage executors.
//!
//! This crate provides:
//! - Worker process identity/config and the run-loop + heartbeat lifecycle
//! - The filesystem scanner reconciler (C3)
//! - The image and video proxy stages (C4)
//! - The resumable video scene segmentation engine (C5)
//! - The image and video AI vision passes (C4.5.6)
//! - The maintenance sweep (reclaim, stale-worker pruning, temp GC, repair)
//! - Structured per-asset logging and the bounded flight log

pub mod ai_image;
pub mod ai_video;
pub mod config;
pub mod error;
pub mod flight_log;
pub mod lifecycle;
pub mod logging;
pub mod maintenance;
pub mod proxy_image;
pub mod proxy_video;
pub mod scanner;
pub mod video_engine;
pub mod vision_pass;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use flight_log::FlightLog;
pub use lifecycle::Lifecycle;
pub use logging::AssetLogger;
