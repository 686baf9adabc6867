//! Local derivative cache: layout, image transcode cascade, and path rules.
//!
//! This crate provides:
//! - Cache root configuration (`MEDIA_SEARCH_DATA_DIR` and friends)
//! - Deterministic derivative path computation per asset/library
//! - The image proxy cascade (thumbnail + proxy) built on `image`/`webp`

pub mod config;
pub mod error;
pub mod image_cascade;
pub mod paths;

pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use image_cascade::{build_image_cascade, ImageDerivatives, PROXY_LONG_EDGE_PX, THUMBNAIL_LONG_EDGE_PX};
pub use paths::{
    lazy_clip_path, proxy_path, thumbnail_path, tmp_transcode_path, video_head_clip_path,
    video_scene_frame_path,
};
