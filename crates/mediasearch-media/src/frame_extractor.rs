//! Persistent decoder pipe with a pixel/PTS pairing contract (spec §4.5.1).
//!
//! ffmpeg emits two asynchronous streams for a 1 fps/480px decode: raw RGB24
//! frames on stdout, and a `showinfo` log line per frame (carrying the
//! presentation timestamp) on stderr. This module pairs them: a background
//! task drains stderr into a bounded PTS queue; the consumer reads exactly
//! one frame's worth of pixel bytes, then pops one PTS. A PTS that doesn't
//! show up within [`FRAME_PAIRING_TIMEOUT_SECS`] of the pixel bytes is a
//! fatal desync, not a retry-forever condition.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use mediasearch_models::defaults::{FRAME_EXTRACT_FPS, FRAME_PAIRING_TIMEOUT_SECS, FRAME_WIDTH_PX};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};

const PTS_QUEUE_CAPACITY: usize = 64;

pub struct ExtractedFrame {
    pub rgb: Vec<u8>,
    pub pts: f64,
}

pub struct FrameExtractor {
    child: Child,
    stdout: ChildStdout,
    pts_rx: mpsc::Receiver<f64>,
    stderr_task: JoinHandle<()>,
    frame_width: u32,
    frame_height: u32,
    frame_bytes: usize,
    pub last_pts: Option<f64>,
}

impl FrameExtractor {
    /// Open a decode pipe starting at `seek_to` seconds. `source_width`/
    /// `source_height` come from an earlier probe and are used only to
    /// compute the scaled (even) output height.
    pub async fn open(
        source: &Path,
        seek_to: f64,
        source_width: u32,
        source_height: u32,
    ) -> MediaResult<Self> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let frame_width = FRAME_WIDTH_PX;
        let frame_height = scaled_even_height(source_width, source_height, frame_width);

        let cmd = FfmpegCommand::new(source, "pipe:1")
            .seek(seek_to)
            .video_filter(format!(
                "fps={FRAME_EXTRACT_FPS},scale={frame_width}:-2,showinfo"
            ))
            .output_arg("-pix_fmt")
            .output_arg("rgb24")
            .output_arg("-f")
            .output_arg("rawvideo")
            .log_level("info");

        let args = cmd.build_args();
        debug!("frame extractor: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(MediaError::Io)?;

        let stdout = child.stdout.take().expect("stdout not captured");
        let stderr = child.stderr.take().expect("stderr not captured");

        let (pts_tx, pts_rx) = mpsc::channel(PTS_QUEUE_CAPACITY);
        let stderr_task = tokio::spawn(read_pts_stream(stderr, pts_tx));

        Ok(Self {
            child,
            stdout,
            pts_rx,
            stderr_task,
            frame_width,
            frame_height,
            frame_bytes: (frame_width * frame_height * 3) as usize,
            last_pts: None,
        })
    }

    pub fn frame_dimensions(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    /// Read the next `(pixels, pts)` pair. `Ok(None)` is a clean end of the
    /// pixel stream; completion against the probed source duration is the
    /// caller's job (§4.5.1 "completion check").
    pub async fn next_frame(&mut self) -> MediaResult<Option<ExtractedFrame>> {
        let mut buf = vec![0u8; self.frame_bytes];
        match self.stdout.read_exact(&mut buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(MediaError::Io(e)),
        }

        let pts = tokio::time::timeout(
            std::time::Duration::from_secs(FRAME_PAIRING_TIMEOUT_SECS),
            self.pts_rx.recv(),
        )
        .await
        .map_err(|_| {
            MediaError::Desync(format!(
                "no PTS observed within {FRAME_PAIRING_TIMEOUT_SECS}s of pixel bytes"
            ))
        })?
        .ok_or_else(|| MediaError::Desync("PTS stream ended before pixel stream".to_string()))?;

        self.last_pts = Some(pts);
        Ok(Some(ExtractedFrame { rgb: buf, pts }))
    }

    /// Wait for ffmpeg to exit after the pixel stream has been drained.
    pub async fn finish(mut self) -> MediaResult<()> {
        let status = self.child.wait().await.map_err(MediaError::Io)?;
        self.stderr_task.abort();
        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                "frame extractor ffmpeg exited with non-zero status",
                None,
                status.code(),
            ));
        }
        Ok(())
    }
}

fn scaled_even_height(source_width: u32, source_height: u32, target_width: u32) -> u32 {
    if source_width == 0 {
        return target_width;
    }
    let ratio = source_height as f64 / source_width as f64;
    let mut h = (target_width as f64 * ratio).round() as u32;
    if h % 2 != 0 {
        h += 1;
    }
    h.max(2)
}

async fn read_pts_stream(stderr: tokio::process::ChildStderr, tx: mpsc::Sender<f64>) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(pts) = parse_showinfo_pts(&line) {
            if tx.send(pts).await.is_err() {
                break;
            }
        }
    }
}

/// Parse `pts_time:12.5` out of an ffmpeg `showinfo` filter log line.
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
    fn parses_showinfo_pts_line() {
        let line = "[Parsed_showinfo_1 @ 0x5621] n:   3 pts:  90000 pts_time:3.75       ";
        assert_eq!(parse_showinfo_pts(line), Some(3.75));
    }

    #[test]
    fn ignores_unrelated_stderr_lines() {
        assert_eq!(parse_showinfo_pts("frame=   12 fps=1.0 q=-1.0"), None);
    }

    #[test]
    fn scales_height_to_even() {
        assert_eq!(scaled_even_height(1920, 1080, 480), 270);
        assert_eq!(scaled_even_height(1000, 999, 480), 480);
    }
}
