//! I-frame playlist generation and serving.
//!
//! One keyframe-only fMP4 HLS rendition per video at a fixed 160 px
//! height, for Apple-style scrubbing. The stored playlist references bare
//! file names; serving rewrites the URIs with the media source id and
//! access token.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use fw_av::actions::{generate_iframe_hls, IframeHlsRequest};
use fw_core::{Error, Result, VideoRef};
use fw_db::models::IFramePlaylistInfo;
use fw_db::queries::iframe_playlists;
use fw_media::hls::rewrite_iframe_playlist;

use crate::state::AppState;
use crate::trickplay::eligible;

/// Fixed output height of the I-frame rendition.
pub const IFRAME_HEIGHT: u32 = 160;

/// Name of the stored playlist file.
const PLAYLIST_NAME: &str = "iframe.m3u8";

/// Build the I-frame playlist for a video.
pub async fn build(
    state: &AppState,
    video: &VideoRef,
    replace: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let opts = &state.config.trickplay;
    if !eligible(video, opts.clamped_interval_ms()) {
        return Ok(());
    }

    let save_with_media = state.config.library.save_with_media;
    let dir = state.paths.iframe_dir(video, save_with_media);

    if !replace && dir.join(PLAYLIST_NAME).exists() {
        let conn = fw_db::get_conn(&state.db)?;
        if iframe_playlists::get(&conn, video.id)?.is_some() {
            tracing::debug!(video = %video.id, "I-frame playlist up to date");
            return Ok(());
        }
    }

    let request = IframeHlsRequest {
        input: &video.path,
        target_height: IFRAME_HEIGHT,
        threads: opts.threads,
        hw_accel: opts.enable_hw_accel,
        priority: opts.process_priority,
    };
    let scratch = generate_iframe_hls(&state.tools, &request, cancel).await?;

    if !scratch.path().join(PLAYLIST_NAME).exists()
        || !scratch.path().join("init.mp4").exists()
    {
        return Err(Error::tool("ffmpeg", "I-frame generation produced no playlist"));
    }

    let (segment_count, max_segment_bytes) = scan_segments(scratch.path())?;
    if segment_count == 0 {
        return Err(Error::tool("ffmpeg", "I-frame generation produced no segments"));
    }

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    // Atomic swap into the artifact root.
    if let Some(parent) = dir.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if dir.exists() {
        std::fs::remove_dir_all(&dir)?;
    }
    move_dir(&scratch.keep(), &dir)?;

    let (effective_w, effective_h) = video.effective_dimensions();
    let width = if effective_h > 0 {
        (IFRAME_HEIGHT * effective_w / effective_h) / 2 * 2
    } else {
        0
    };

    let info = IFramePlaylistInfo {
        item_id: video.id,
        width,
        height: IFRAME_HEIGHT,
        segment_count,
        // Peak, as HLS requires: the largest segment sets the bandwidth.
        bandwidth: 8 * max_segment_bytes,
        created_at: String::new(),
    };
    let conn = fw_db::get_conn(&state.db)?;
    iframe_playlists::upsert(&conn, &info)?;

    tracing::info!(
        video = %video.id,
        segments = segment_count,
        width,
        "I-frame playlist generated"
    );
    Ok(())
}

/// Move a directory into place. The scratch lives on the system temp
/// filesystem, so a plain rename can fail with EXDEV; fall back to a
/// recursive copy.
fn move_dir(src: &Path, dst: &Path) -> Result<()> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)?.filter_map(|e| e.ok()) {
        let from = entry.path();
        if from.is_file() {
            std::fs::copy(&from, dst.join(entry.file_name()))?;
        }
    }
    std::fs::remove_dir_all(src)?;
    Ok(())
}

/// Count `.m4s` segments and find the largest.
fn scan_segments(dir: &Path) -> Result<(u32, u64)> {
    let mut count = 0u32;
    let mut max_bytes = 0u64;
    for entry in std::fs::read_dir(dir)?.filter_map(|e| e.ok()) {
        let path = entry.path();
        let is_segment = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("m4s"))
            .unwrap_or(false);
        if is_segment {
            count += 1;
            max_bytes = max_bytes.max(std::fs::metadata(&path)?.len());
        }
    }
    Ok((count, max_bytes))
}

/// Remove the playlist directory and row for a video.
pub fn delete(state: &AppState, video: &VideoRef) -> Result<()> {
    let save_with_media = state.config.library.save_with_media;
    let dir = state.paths.iframe_dir(video, save_with_media);
    if dir.exists() {
        std::fs::remove_dir_all(&dir)?;
    }
    let conn = fw_db::get_conn(&state.db)?;
    iframe_playlists::delete_for_item(&conn, video.id)?;
    Ok(())
}

/// Load the stored playlist and rewrite it for serving, or `None` when the
/// artifact does not exist.
pub fn serve_playlist(
    state: &AppState,
    video: &VideoRef,
    api_key: &str,
) -> Result<Option<String>> {
    {
        let conn = fw_db::get_conn(&state.db)?;
        if iframe_playlists::get(&conn, video.id)?.is_none() {
            return Ok(None);
        }
    }

    let save_with_media = state.config.library.save_with_media;
    let path = state
        .paths
        .iframe_dir(video, save_with_media)
        .join(PLAYLIST_NAME);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    Ok(Some(rewrite_iframe_playlist(
        &text,
        &video.id.simple_hex(),
        api_key,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_segments_counts_and_maxes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("00000.m4s"), vec![0u8; 100]).unwrap();
        std::fs::write(dir.path().join("00001.m4s"), vec![0u8; 300]).unwrap();
        std::fs::write(dir.path().join("init.mp4"), vec![0u8; 50]).unwrap();
        std::fs::write(dir.path().join("iframe.m3u8"), b"#EXTM3U\n").unwrap();

        let (count, max_bytes) = scan_segments(dir.path()).unwrap();
        assert_eq!(count, 2);
        assert_eq!(max_bytes, 300);
    }

    #[test]
    fn empty_dir_has_no_segments() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(scan_segments(dir.path()).unwrap(), (0, 0));
    }
}
