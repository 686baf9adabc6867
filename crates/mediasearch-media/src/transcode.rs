//! Video proxy stage transcode steps (spec §4.4): one ephemeral 720p
//! transcode, one stream-copied head clip, kept separate from the frame
//! extractor and segmenter so a worker can produce derivatives without
//! decoding the source twice for unrelated reasons.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Long edge, in pixels, of the ephemeral 720p transcode the scene engine
/// and head-clip extraction both read from.
pub const TRANSCODE_HEIGHT_PX: u32 = 720;

/// Length, in seconds, of the stream-copied head clip.
pub const HEAD_CLIP_DURATION_SECS: f64 = 10.0;

/// Transcode `source` into an ephemeral 720p H.264/AAC file at `output`.
/// The caller owns deleting `output` once done with it, success or
/// failure — this function never touches the source.
pub async fn transcode_720p(source: &Path, output: &Path) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(source, output)
        .video_filter(format!("scale=-2:{TRANSCODE_HEIGHT_PX}"))
        .video_codec("libx264")
        .preset("veryfast")
        .crf(23)
        .audio_codec("aac")
        .audio_bitrate("128k")
        .log_level("error");

    FfmpegRunner::new().run(&cmd).await
}

/// Cut the first [`HEAD_CLIP_DURATION_SECS`] of `source` into `output`
/// without re-encoding (spec §6.4: filename is always `head_clip.mp4`).
pub async fn extract_head_clip(source: &Path, output: &Path) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(source, output)
        .duration(HEAD_CLIP_DURATION_SECS)
        .output_arg("-c")
        .output_arg("copy")
        .log_level("error");

    FfmpegRunner::new().run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcode_uses_even_scale_filter() {
        let cmd = FfmpegCommand::new("in.mov", "out.mp4")
            .video_filter(format!("scale=-2:{TRANSCODE_HEIGHT_PX}"));
        let args = cmd.build_args();
        assert!(args.iter().any(|a| a == "scale=-2:720"));
    }
}
