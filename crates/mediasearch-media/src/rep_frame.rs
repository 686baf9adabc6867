//! Representative-frame high-resolution re-extraction (spec §4.5.3).
//!
//! The 1 fps/480px pass the segmenter runs on never holds a full-resolution
//! frame in memory. Once a scene closes, this module performs a *second*,
//! targeted seek on the original source to recover a high-res JPEG for the
//! chosen representative timestamp — decoupling scene detection from
//! output quality.

use std::path::Path;
use std::process::Stdio;

use image::{ImageBuffer, Rgb};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};

/// Width of the decode window fed to ffmpeg around the target timestamp.
const WINDOW_SECS: f64 = 1.0;
/// How far before the representative PTS the window starts.
const WINDOW_LEAD_SECS: f64 = 0.5;

/// Decode a short window of `source` at native resolution around
/// `rep_pts` and save the frame whose own PTS is nearest to it as a JPEG
/// at `output_path`. `source_width`/`source_height` come from an earlier
/// probe.
pub async fn extract_rep_frame(
    source: &Path,
    rep_pts: f64,
    source_width: u32,
    source_height: u32,
    output_path: &Path,
) -> MediaResult<()> {
    let seek_to = (rep_pts - WINDOW_LEAD_SECS).max(0.0);

    let cmd = FfmpegCommand::new(source, "pipe:1")
        .seek(seek_to)
        .duration(WINDOW_SECS)
        .video_filter("showinfo")
        .output_arg("-pix_fmt")
        .output_arg("rgb24")
        .output_arg("-f")
        .output_arg("rawvideo")
        .log_level("info");

    let args = cmd.build_args();
    let mut child = Command::new("ffmpeg")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(MediaError::Io)?;

    let mut stdout = child.stdout.take().expect("stdout not captured");
    let stderr = child.stderr.take().expect("stderr not captured");

    let pts_task: tokio::task::JoinHandle<Vec<f64>> = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut pts_list = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(pts) = parse_showinfo_pts(&line) {
                pts_list.push(pts);
            }
        }
        pts_list
    });

    let frame_bytes = (source_width * source_height * 3) as usize;
    let mut frames: Vec<Vec<u8>> = Vec::new();
    loop {
        let mut buf = vec![0u8; frame_bytes];
        match stdout.read_exact(&mut buf).await {
            Ok(_) => frames.push(buf),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(MediaError::Io(e)),
        }
    }

    let status = child.wait().await.map_err(MediaError::Io)?;
    let pts_list = pts_task.await.map_err(|e| MediaError::Internal(e.to_string()))?;

    if !status.success() {
        return Err(MediaError::ffmpeg_failed(
            "representative frame re-extraction failed",
            None,
            status.code(),
        ));
    }

    if frames.is_empty() || pts_list.is_empty() {
        return Err(MediaError::Truncated(format!(
            "no frames decoded around representative pts {rep_pts}"
        )));
    }

    // Pick the frame whose own PTS (seek_to + index'th timestamp) is
    // nearest to the requested representative timestamp.
    let best_idx = pts_list
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (**a - rep_pts)
                .abs()
                .partial_cmp(&(**b - rep_pts).abs())
                .unwrap()
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
        .min(frames.len() - 1);

    let rgb = &frames[best_idx];
    let image: ImageBuffer<Rgb<u8>, _> =
        ImageBuffer::from_raw(source_width, source_height, rgb.clone())
            .ok_or_else(|| MediaError::internal("frame buffer size mismatch"))?;

    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    image
        .save(output_path)
        .map_err(|e| MediaError::internal(format!("failed to save representative frame: {e}")))?;

    Ok(())
}

fn parse_showinfo_pts(line: &str) -> Option<f64> {
    let idx = line.find("pts_time:")?;
    let rest = &line[idx + "pts_time:".len()..];
    let token = rest.split_whitespace().next()?;
    token.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_never_seeks_negative() {
        let seek_to = (0.2_f64 - WINDOW_LEAD_SECS).max(0.0);
        assert_eq!(seek_to, 0.0);
    }

    #[test]
    fn parses_pts_time_from_showinfo_line() {
        let line = "[Parsed_showinfo_0 @ 0x1] n:0 pts:1200 pts_time:25.0";
        assert_eq!(parse_showinfo_pts(line), Some(25.0));
    }
}
