//! ffprobe-backed stream inspection.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format
//! -show_streams` and maps the JSON into the few fields the artifact
//! pipeline needs: dimensions, duration, and the video stream count.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use fw_core::{Error, Result};

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// The subset of probe data the artifact pipeline consumes.
#[derive(Debug, Clone)]
pub struct VideoProbe {
    /// Width of the first video stream, in pixels.
    pub width: u32,
    /// Height of the first video stream, in pixels.
    pub height: u32,
    /// Container duration.
    pub duration: Duration,
    /// Number of video streams (attached pictures excluded).
    pub video_stream_count: usize,
}

/// Probe a media file.
pub async fn probe_video(tools: &ToolRegistry, path: &Path) -> Result<VideoProbe> {
    let ffprobe = tools.require("ffprobe")?;

    let mut cmd = ToolCommand::new(ffprobe.path.clone());
    cmd.args([
        "-v", "quiet",
        "-print_format", "json",
        "-show_format",
        "-show_streams",
    ]);
    cmd.arg(path.to_string_lossy().as_ref());

    let output = cmd.execute().await?;
    let ff: FfprobeOutput = serde_json::from_str(&output.stdout)
        .map_err(|e| Error::tool("ffprobe", format!("JSON parse error: {e}")))?;

    let video_streams: Vec<&FfprobeStream> = ff
        .streams
        .iter()
        .filter(|s| {
            s.codec_type.as_deref() == Some("video") && s.disposition.attached_pic == 0
        })
        .collect();

    let duration_secs = ff
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    // A source without a video stream is reported, not an error; the
    // builders treat it as an unmet precondition.
    Ok(VideoProbe {
        width: video_streams.first().and_then(|s| s.width).unwrap_or(0),
        height: video_streams.first().and_then(|s| s.height).unwrap_or(0),
        duration: Duration::from_secs_f64(duration_secs.max(0.0)),
        video_stream_count: video_streams.len(),
    })
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    disposition: FfprobeDisposition,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_mapping() {
        let json = r#"{
            "format": {"duration": "7230.500000"},
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080,
                 "disposition": {"attached_pic": 0}},
                {"codec_type": "audio"},
                {"codec_type": "video", "width": 600, "height": 900,
                 "disposition": {"attached_pic": 1}}
            ]
        }"#;
        let ff: FfprobeOutput = serde_json::from_str(json).unwrap();
        let videos: Vec<_> = ff
            .streams
            .iter()
            .filter(|s| {
                s.codec_type.as_deref() == Some("video") && s.disposition.attached_pic == 0
            })
            .collect();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].width, Some(1920));
        assert_eq!(ff.format.duration.as_deref(), Some("7230.500000"));
    }
}
