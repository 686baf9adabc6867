//! Shared data models for the media-search distributed indexing pipeline.
//!
//! This crate provides the entities described by the asset state machine:
//! libraries, assets, video scenes and their resumable checkpoint state,
//! worker heartbeats, and the AI model registry. It has no I/O of its own —
//! persistence lives in `mediasearch-db`, claim/lease logic in
//! `mediasearch-queue`.

pub mod ai_model;
pub mod asset;
pub mod error_class;
pub mod ids;
pub mod library;
pub mod status;
pub mod video_scene;
pub mod worker_status;

pub use ai_model::{system_metadata_keys, AiModel};
pub use asset::{Asset, DiscoveredFile, PipelineStage, MAX_RETRIES};
pub use error_class::ErrorClass;
pub use ids::{AiModelId, AssetId, InvalidSlug, LibrarySlug, VideoSceneId, WorkerId};
pub use library::{Library, NewLibrary};
pub use status::{
    AnalysisMode, AssetStatus, CloseReason, MediaKind, ScanState, UnknownStatus, WorkerCommand,
    WorkerRole, WorkerState,
};
pub use video_scene::{scenes_are_disjoint_and_ordered, VideoActiveState, VideoScene};
pub use worker_status::{HeartbeatStats, WorkerStatus};

/// Default tunables, overridable via environment variables (`§6.3`).
pub mod defaults {
    pub const LEASE_TTL_SECS: i64 = 300;
    pub const HEARTBEAT_INTERVAL_SECS: u64 = 15;
    pub const POLL_INTERVAL_SECS: u64 = 5;
    pub const WORKER_STALE_AFTER_HOURS: i64 = 24;

    pub const PHASH_THRESHOLD: u32 = 51;
    pub const TEMPORAL_CEILING_SECS: f64 = 30.0;
    pub const DEBOUNCE_SECS: f64 = 3.0;
    pub const FRAME_PAIRING_TIMEOUT_SECS: u64 = 10;
    pub const RESUME_OVERLAP_SECS: f64 = 2.0;
    pub const FRAME_EXTRACT_FPS: u32 = 1;
    pub const FRAME_WIDTH_PX: u32 = 480;

    pub const FORENSICS_FLIGHT_LOG_CAPACITY: usize = 50_000;
    pub const TRASH_EMPTY_BATCH_SIZE: i64 = 5_000;
    pub const SCAN_UPSERT_BATCH_SIZE: usize = 500;
    pub const TEMP_FILE_MAX_AGE_HOURS: i64 = 4;
}
