//! Static video thumbnail generation (spec §4.4: one per video proxy pass).

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Long edge, in pixels, of the generated thumbnail JPEG.
pub const THUMBNAIL_SCALE_WIDTH: u32 = 320;

/// Timestamp to grab the static thumbnail frame from. A few seconds in
/// tends to skip black-frame video intros without probing for one.
pub const THUMBNAIL_TIMESTAMP: &str = "00:00:03";

/// Generate a single-frame JPEG thumbnail from a video file.
pub async fn generate_thumbnail(
    video_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> MediaResult<()> {
    let video_path = video_path.as_ref();
    let output_path = output_path.as_ref();

    let filter = format!("scale={}:-2", THUMBNAIL_SCALE_WIDTH);

    let cmd = FfmpegCommand::new(video_path, output_path)
        .input_arg("-ss")
        .input_arg(THUMBNAIL_TIMESTAMP)
        .single_frame()
        .video_filter(&filter)
        .log_level("error");

    FfmpegRunner::new().run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_filter() {
        let filter = format!("scale={}:-2", THUMBNAIL_SCALE_WIDTH);
        assert!(filter.contains("320"));
    }
}
