//! Keyframe-only fMP4 HLS generation via ffmpeg.

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use fw_core::Result;

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Re-encoding every keyframe of a long feature takes a while.
const GENERATE_TIMEOUT: Duration = Duration::from_secs(3 * 3600);

/// Parameters for one I-frame HLS generation run.
#[derive(Debug, Clone)]
pub struct IframeHlsRequest<'a> {
    /// Source media file.
    pub input: &'a Path,
    /// Output height in pixels; width follows the aspect ratio.
    pub target_height: u32,
    /// ffmpeg thread count; 0 lets ffmpeg decide.
    pub threads: u32,
    /// Enable hardware-accelerated decoding.
    pub hw_accel: bool,
    /// Niceness for the encoding process.
    pub priority: i32,
}

/// Generate a keyframe-only fMP4 HLS rendition into a fresh scratch
/// directory: `iframe.m3u8`, `init.mp4`, and `00000.m4s`-style segments.
///
/// Only key frames are decoded and each output frame is written as an
/// intra frame, so every segment is independently scrubbable. The caller
/// owns the returned directory.
pub async fn generate_iframe_hls(
    tools: &ToolRegistry,
    req: &IframeHlsRequest<'_>,
    cancel: &CancellationToken,
) -> Result<TempDir> {
    let ffmpeg = tools.require("ffmpeg")?;
    let scratch = TempDir::new()?;

    let seg_pattern = scratch.path().join("%05d.m4s");
    let playlist_path = scratch.path().join("iframe.m3u8");

    tracing::info!(
        input = %req.input.display(),
        target_height = req.target_height,
        "generating I-frame HLS rendition"
    );

    let mut cmd = ToolCommand::new(ffmpeg.path.clone());
    cmd.timeout(GENERATE_TIMEOUT);
    cmd.niceness(req.priority);
    cmd.cancel_token(cancel.clone());

    cmd.arg("-y");
    if req.hw_accel {
        cmd.args(["-hwaccel", "auto"]);
    }
    cmd.args(["-skip_frame", "nokey"]);
    if req.threads > 0 {
        cmd.args(["-threads", &req.threads.to_string()]);
    }
    cmd.arg("-i");
    cmd.arg(req.input.to_string_lossy().as_ref());
    cmd.args(["-an", "-sn"]);
    cmd.args(["-vf", &format!("scale=-2:{}", req.target_height)]);
    cmd.args(["-vsync", "vfr"]);
    cmd.args(["-c:v", "libx264", "-preset", "veryfast", "-crf", "23"]);
    // All-intra output: every frame a sync sample.
    cmd.args(["-g", "1"]);
    cmd.args(["-f", "hls"]);
    cmd.args(["-hls_time", "10"]);
    cmd.args(["-hls_segment_type", "fmp4"]);
    cmd.args(["-hls_playlist_type", "vod"]);
    cmd.args(["-hls_segment_filename", &seg_pattern.to_string_lossy()]);
    cmd.args(["-hls_fmp4_init_filename", "init.mp4"]);
    cmd.arg(playlist_path.to_string_lossy().as_ref());

    cmd.execute().await?;

    Ok(scratch)
}
