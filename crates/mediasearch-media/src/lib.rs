#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for the video proxy and scene-segmentation pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with progress parsing
//!   from `-progress pipe:2`
//! - Source probing (duration, resolution, stream presence)
//! - Proxy-stage transcode steps: 720p transcode, head clip, static thumbnail
//! - A persistent decode pipe pairing raw RGB24 frames with their PTS
//! - Perceptual hashing and sharpness scoring for scene-cut detection
//! - The scene segmenter state machine
//! - Targeted high-resolution re-extraction of a scene's representative frame

pub mod command;
pub mod error;
pub mod frame_extractor;
pub mod phash;
pub mod probe;
pub mod progress;
pub mod rep_frame;
pub mod segmenter;
pub mod sharpness;
pub mod thumbnail;
pub mod transcode;

pub use command::{FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use frame_extractor::{ExtractedFrame, FrameExtractor};
pub use phash::{phash_luma, phash_rgb24, to_luma, PHash};
pub use probe::{probe_video, VideoInfo};
pub use progress::{FfmpegProgress, ProgressCallback};
pub use rep_frame::extract_rep_frame;
pub use segmenter::{BestFrameSeed, ClosedScene, OpenScene, Segmenter, SegmenterConfig};
pub use sharpness::laplacian_variance;
pub use thumbnail::generate_thumbnail;
pub use transcode::{extract_head_clip, transcode_720p};
