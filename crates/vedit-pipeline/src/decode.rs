//! Video decoding collaborator.
//!
//! The pipeline consumes an ordered sequence of JPEG-encoded frames with
//! capture timestamps through the [`VideoDecoder`] trait; the production
//! implementation shells out to ffprobe/ffmpeg.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};

/// One decoded frame, JPEG-encoded, with its capture position.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// 1-based decode-order position
    pub frame_index: u32,
    /// Capture position within the source video
    pub timestamp_millis: u64,
    /// Compressed image bytes
    pub jpeg: Vec<u8>,
}

/// Ordered frame source for one video.
#[async_trait]
pub trait VideoDecoder: Send {
    /// The next frame in decode order, or `None` when the video is done.
    async fn next_frame(&mut self) -> PipelineResult<Option<DecodedFrame>>;
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

/// ffmpeg-backed decoder: one ffmpeg run dumps every frame as JPEG into a
/// scratch directory, timestamps are derived from the probed frame rate.
pub struct FfmpegDecoder {
    // Held for its Drop; the frame files live inside it.
    _frames_dir: TempDir,
    pending: VecDeque<PathBuf>,
    next_index: u32,
    fps_num: u64,
    fps_den: u64,
}

impl FfmpegDecoder {
    /// Probe and decode the video at `path`.
    pub async fn open(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::decode(format!(
                "source video not found: {}",
                path.display()
            )));
        }
        which::which("ffprobe")
            .map_err(|_| PipelineError::decode("ffprobe not found on PATH"))?;
        which::which("ffmpeg").map_err(|_| PipelineError::decode("ffmpeg not found on PATH"))?;

        let (fps_num, fps_den) = probe_frame_rate(path).await?;
        debug!(fps_num, fps_den, "Probed source frame rate");

        let frames_dir = TempDir::new()?;
        let pattern = frames_dir.path().join("frame_%06d.jpg");

        let output = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-qscale:v", "2"])
            .arg(&pattern)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(PipelineError::decode(format!(
                "ffmpeg failed to decode {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let mut frame_paths: Vec<PathBuf> = std::fs::read_dir(frames_dir.path())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        frame_paths.sort();

        if frame_paths.is_empty() {
            return Err(PipelineError::decode(format!(
                "no frames decoded from {}",
                path.display()
            )));
        }

        Ok(Self {
            _frames_dir: frames_dir,
            pending: frame_paths.into(),
            next_index: 1,
            fps_num,
            fps_den,
        })
    }
}

#[async_trait]
impl VideoDecoder for FfmpegDecoder {
    async fn next_frame(&mut self) -> PipelineResult<Option<DecodedFrame>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };

        let jpeg = tokio::fs::read(&path).await?;
        let frame_index = self.next_index;
        self.next_index += 1;

        Ok(Some(DecodedFrame {
            frame_index,
            timestamp_millis: frame_timestamp_millis(frame_index, self.fps_num, self.fps_den),
            jpeg,
        }))
    }
}

/// Capture position of a 1-based frame index at `num/den` frames per second.
fn frame_timestamp_millis(frame_index: u32, fps_num: u64, fps_den: u64) -> u64 {
    (frame_index as u64 - 1) * 1000 * fps_den / fps_num
}

async fn probe_frame_rate(path: &Path) -> PipelineResult<(u64, u64)> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=avg_frame_rate,r_frame_rate",
            "-print_format",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(PipelineError::decode(format!(
            "ffprobe failed on {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| PipelineError::decode(format!("undecodable ffprobe output: {}", e)))?;

    let stream = probe
        .streams
        .first()
        .ok_or_else(|| PipelineError::decode("no video stream found"))?;

    stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate))
        .ok_or_else(|| PipelineError::decode("could not determine frame rate"))
}

/// Parse an ffprobe "num/den" rate; rejects zero numerators/denominators.
fn parse_rate(rate: &str) -> Option<(u64, u64)> {
    let (num, den) = rate.split_once('/')?;
    let num: u64 = num.trim().parse().ok()?;
    let den: u64 = den.trim().parse().ok()?;
    if num == 0 || den == 0 {
        return None;
    }
    Some((num, den))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("30/1"), Some((30, 1)));
        assert_eq!(parse_rate("30000/1001"), Some((30000, 1001)));
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("garbage"), None);
    }

    #[test]
    fn test_frame_timestamps_start_at_zero_and_are_non_decreasing() {
        assert_eq!(frame_timestamp_millis(1, 30, 1), 0);
        assert_eq!(frame_timestamp_millis(2, 30, 1), 33);
        assert_eq!(frame_timestamp_millis(4, 30, 1), 100);

        let mut last = 0;
        for index in 1..=100 {
            let ts = frame_timestamp_millis(index, 30000, 1001);
            assert!(ts >= last);
            last = ts;
        }
    }
}
