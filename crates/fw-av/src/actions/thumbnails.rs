//! Interval-spaced JPEG thumbnail extraction via ffmpeg.

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use fw_core::Result;

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Extraction can walk an entire feature film; allow it plenty of time.
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(3 * 3600);

/// Parameters for one thumbnail extraction run.
#[derive(Debug, Clone)]
pub struct ThumbnailRequest<'a> {
    /// Source media file.
    pub input: &'a Path,
    /// Thumbnail width; height follows the aspect ratio (rounded even).
    pub width: u32,
    /// Milliseconds between thumbnails.
    pub interval_ms: u64,
    /// ffmpeg thread count; 0 lets ffmpeg decide.
    pub threads: u32,
    /// JPEG qscale, lower is better quality.
    pub qscale: u32,
    /// Enable hardware-accelerated decoding.
    pub hw_accel: bool,
    /// Decode key frames only.
    pub keyframes_only: bool,
    /// Niceness for the extraction process.
    pub priority: i32,
}

/// Extract thumbnails into a fresh scratch directory.
///
/// Produces `00000001.jpg`, `00000002.jpg`, … — lexicographic order equals
/// chronological order. The caller owns the returned directory and deletes
/// it (explicitly or by drop).
pub async fn extract_thumbnails(
    tools: &ToolRegistry,
    req: &ThumbnailRequest<'_>,
    cancel: &CancellationToken,
) -> Result<TempDir> {
    let ffmpeg = tools.require("ffmpeg")?;
    let scratch = TempDir::new()?;

    let interval_s = req.interval_ms as f64 / 1000.0;
    let pattern = scratch.path().join("%08d.jpg");

    tracing::info!(
        input = %req.input.display(),
        width = req.width,
        interval_ms = req.interval_ms,
        "extracting trickplay thumbnails"
    );

    let mut cmd = ToolCommand::new(ffmpeg.path.clone());
    cmd.timeout(EXTRACT_TIMEOUT);
    cmd.niceness(req.priority);
    cmd.cancel_token(cancel.clone());

    cmd.arg("-y");
    if req.hw_accel {
        cmd.args(["-hwaccel", "auto"]);
    }
    if req.keyframes_only {
        cmd.args(["-skip_frame", "nokey"]);
    }
    if req.threads > 0 {
        cmd.args(["-threads", &req.threads.to_string()]);
    }
    cmd.arg("-i");
    cmd.arg(req.input.to_string_lossy().as_ref());
    cmd.args(["-an", "-sn"]);
    cmd.args([
        "-vf",
        &format!("fps=1/{interval_s},scale={}:-2", req.width),
    ]);
    cmd.args(["-vsync", "vfr"]);
    cmd.args(["-qscale:v", &req.qscale.to_string()]);
    cmd.args(["-f", "image2"]);
    cmd.arg(pattern.to_string_lossy().as_ref());

    // The scratch TempDir cleans itself up if the command errors out.
    cmd.execute().await?;

    Ok(scratch)
}
