//! Postgres persistence layer for the media-search pipeline.
//!
//! Entities are defined in `mediasearch-models`; this crate owns the
//! migrations, the connection pool, and one repository per table.
//! Soft-deleted rows are never hidden implicitly — every repository method
//! that can see them takes an explicit [`scope::QueryScope`].

pub mod ai_model_repo;
pub mod asset_repo;
pub mod error;
pub mod library_repo;
pub mod pool;
pub mod scope;
pub mod system_metadata_repo;
pub mod video_scene_repo;
pub mod worker_status_repo;

pub use ai_model_repo::AiModelRepo;
pub use asset_repo::{AssetRepo, ClaimFilter};
pub use error::{DbError, DbResult};
pub use library_repo::LibraryRepo;
pub use pool::{check_schema_version, connect, DbConfig, SCHEMA_VERSION};
pub use scope::QueryScope;
pub use system_metadata_repo::SystemMetadataRepo;
pub use video_scene_repo::VideoSceneRepo;
pub use worker_status_repo::WorkerStatusRepo;
