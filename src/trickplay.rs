//! Trickplay tile generation.
//!
//! For each configured output width, extracts interval-spaced thumbnails
//! through the media encoder, composes them into tiled JPEGs, computes the
//! playlist metadata, and atomically swaps the tile directory into place.
//! Existing tile directories without a database row are adopted instead of
//! rebuilt.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use fw_av::actions::{extract_thumbnails, ThumbnailRequest};
use fw_av::tile::{self, TileOptions};
use fw_core::{Error, Result, VideoId, VideoRef};
use fw_db::models::TrickplayInfo;
use fw_db::queries::trickplay_infos;
use fw_media::hls::{trickplay_manifest, TrickplayManifestParams};

use crate::state::AppState;

/// Check the shapes that disqualify a video from artifact generation.
///
/// Not an error: callers log at debug and return an empty result.
pub(crate) fn eligible(video: &VideoRef, interval_ms: u64) -> bool {
    if video.flags.any() {
        tracing::debug!(video = %video.id, "skipping: source shape disallows artifacts");
        return false;
    }
    if video.width == 0 || video.height == 0 {
        tracing::debug!(video = %video.id, "skipping: no video stream");
        return false;
    }
    if video.duration.as_millis() < interval_ms as u128 {
        tracing::debug!(video = %video.id, "skipping: shorter than one interval");
        return false;
    }
    if video.in_backdrops_dir() {
        tracing::debug!(video = %video.id, "skipping: backdrop clip");
        return false;
    }
    true
}

/// Build (or adopt) the tile set for one configured width.
///
/// Runs under the process-wide trickplay lock for the whole body,
/// including the media-encoder call, so at most one heavy extraction is in
/// flight per process.
pub async fn build_width(
    state: &AppState,
    video: &VideoRef,
    width: u32,
    replace: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let opts = &state.config.trickplay;
    if opts.tile_width == 0 || opts.tile_height == 0 {
        return Err(Error::Validation("trickplay tile grid must be at least 1x1".into()));
    }
    let interval_ms = opts.clamped_interval_ms();

    if !eligible(video, interval_ms) {
        return Ok(());
    }

    // Output width must be even for the encoder; a source narrower than
    // the request caps it.
    let mut actual_width = width / 2 * 2;
    let (effective_w, _) = video.effective_dimensions();
    if effective_w < width {
        actual_width = effective_w / 2 * 2;
        tracing::warn!(
            video = %video.id,
            requested = width,
            actual = actual_width,
            "requested trickplay width exceeds source; capping"
        );
    }
    if actual_width == 0 {
        return Ok(());
    }

    let save_with_media = state.config.library.save_with_media;
    let dir = state.paths.trickplay_dir(
        video,
        save_with_media,
        actual_width,
        opts.tile_width,
        opts.tile_height,
    );

    // Adopt tiles left by a previous installation when nothing is recorded
    // for them yet.
    if !replace && dir.is_dir() {
        let existing = {
            let conn = fw_db::get_conn(&state.db)?;
            trickplay_infos::get(&conn, video.id, actual_width)?
        };
        if existing.is_none() {
            if let Some(info) = import_existing(state, video, actual_width, &dir, interval_ms)? {
                tracing::info!(
                    video = %video.id,
                    width = actual_width,
                    tiles = info.thumbnail_count,
                    "adopted existing trickplay tiles"
                );
                return Ok(());
            }
        } else {
            tracing::debug!(video = %video.id, width = actual_width, "tiles up to date");
            return Ok(());
        }
    }

    let _guard = state.lock_trickplay().await;
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let request = ThumbnailRequest {
        input: &video.path,
        width: actual_width,
        interval_ms,
        threads: opts.threads,
        qscale: opts.qscale,
        hw_accel: opts.enable_hw_accel,
        keyframes_only: opts.keyframes_only,
        priority: opts.process_priority,
    };
    let thumb_scratch = extract_thumbnails(&state.tools, &request, cancel).await?;

    let thumbnails = sorted_jpegs(thumb_scratch.path())?;
    if thumbnails.is_empty() {
        return Err(Error::tool("ffmpeg", "thumbnail extraction produced no images"));
    }
    let thumbnail_count = thumbnails.len() as u32;

    // Compose tiles into a scratch directory next to the final location so
    // the final swap is a same-filesystem rename.
    let root = state.paths.artifact_root(video, save_with_media);
    std::fs::create_dir_all(&root)?;
    let tile_scratch = tempfile::Builder::new()
        .prefix(".tiles-")
        .tempdir_in(&root)?;

    let per_tile = opts.thumbnails_per_tile() as usize;
    let interval_s = interval_ms as f64 / 1000.0;
    let mut thumb_height: Option<u32> = None;
    let mut bandwidth: u64 = 0;

    for (index, chunk) in thumbnails.chunks(per_tile).enumerate() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let tile_path = tile_scratch.path().join(format!("{index}.jpg"));
        let options = TileOptions {
            output_path: tile_path.clone(),
            input_paths: chunk.to_vec(),
            tile_width: opts.tile_width,
            tile_height: opts.tile_height,
        };
        let quality = opts.jpeg_quality;
        let fixed = thumb_height;
        let composite_h = tokio::task::spawn_blocking(move || {
            tile::compose_tile(&options, quality, actual_width, fixed)
        })
        .await
        .map_err(|e| Error::Internal(format!("tile compose join error: {e}")))??;

        if thumb_height.is_none() {
            // The first tile fixes the cell height for the whole set.
            let rows = (chunk.len() as u32).div_ceil(opts.tile_width);
            thumb_height = Some(composite_h / rows.max(1));
        }

        let bytes = std::fs::metadata(&tile_path)?.len();
        bandwidth = bandwidth.max(peak_bandwidth(bytes, per_tile as u64, interval_s));
    }

    // Atomic swap: drop any previous directory, then rename the scratch in.
    if dir.exists() {
        std::fs::remove_dir_all(&dir)?;
    }
    let scratch_path = tile_scratch.keep();
    std::fs::rename(&scratch_path, &dir)?;

    let info = TrickplayInfo {
        item_id: video.id,
        width: actual_width,
        tile_width: opts.tile_width,
        tile_height: opts.tile_height,
        interval_ms,
        thumbnail_count,
        height: thumb_height.unwrap_or(0),
        bandwidth,
        created_at: String::new(),
    };
    let conn = fw_db::get_conn(&state.db)?;
    trickplay_infos::upsert(&conn, &info)?;

    tracing::info!(
        video = %video.id,
        width = actual_width,
        thumbnails = thumbnail_count,
        tiles = info.tile_count(),
        "trickplay tiles generated"
    );
    Ok(())
}

/// Adopt an existing tile directory: measure each tile through the image
/// encoder and persist a row describing what is already on disk.
fn import_existing(
    state: &AppState,
    video: &VideoRef,
    width: u32,
    dir: &Path,
    interval_ms: u64,
) -> Result<Option<TrickplayInfo>> {
    let opts = &state.config.trickplay;
    let tiles = sorted_jpegs(dir)?;
    if tiles.is_empty() {
        return Ok(None);
    }

    let per_tile = opts.thumbnails_per_tile() as u64;
    let interval_s = interval_ms as f64 / 1000.0;
    let mut height = 0u32;
    let mut bandwidth = 0u64;

    for tile in &tiles {
        let (_, tile_h) = tile::image_size(tile)?;
        height = height.max(tile_h.div_ceil(opts.tile_height));
        let bytes = std::fs::metadata(tile)?.len();
        bandwidth = bandwidth.max(peak_bandwidth(bytes, per_tile, interval_s));
    }

    let info = TrickplayInfo {
        item_id: video.id,
        width,
        tile_width: opts.tile_width,
        tile_height: opts.tile_height,
        interval_ms,
        thumbnail_count: tiles.len() as u32,
        height,
        bandwidth,
        created_at: String::new(),
    };
    let conn = fw_db::get_conn(&state.db)?;
    trickplay_infos::upsert(&conn, &info)?;
    Ok(Some(info))
}

/// Peak bits per second for one tile: its bytes spread over the time the
/// tile covers.
fn peak_bandwidth(bytes: u64, thumbs_per_tile: u64, interval_s: f64) -> u64 {
    (bytes as f64 * 8.0 / (thumbs_per_tile as f64 * interval_s)).ceil() as u64
}

/// JPEG files in a directory, lexicographically ordered (which equals
/// chronological order for the encoder's zero-padded names).
fn sorted_jpegs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("jpg"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Delete sub-directories under the artifact root that no persisted row
/// accounts for (stale widths or grid layouts after a reconfiguration).
/// The `iframe` directory belongs to the I-frame builder and is exempt.
pub fn prune_directories(state: &AppState, video: &VideoRef) -> Result<()> {
    let save_with_media = state.config.library.save_with_media;
    let root = state.paths.artifact_root(video, save_with_media);
    if !root.is_dir() {
        return Ok(());
    }

    let keep: Vec<String> = {
        let conn = fw_db::get_conn(&state.db)?;
        trickplay_infos::list_for_item(&conn, video.id)?
            .iter()
            .map(|row| row.directory_name())
            .collect()
    };

    for entry in std::fs::read_dir(&root)?.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name == "iframe" || keep.contains(&name) {
            continue;
        }
        tracing::info!(video = %video.id, dir = %path.display(), "pruning stale tile directory");
        std::fs::remove_dir_all(&path)?;
    }
    Ok(())
}

/// Remove every tile directory and row for a video, including stray tile
/// directories no row accounts for. The `iframe` directory is left to the
/// I-frame builder.
pub fn delete_all(state: &AppState, video: &VideoRef) -> Result<()> {
    let save_with_media = state.config.library.save_with_media;
    let root = state.paths.artifact_root(video, save_with_media);

    if root.is_dir() {
        for entry in std::fs::read_dir(&root)?.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() && entry.file_name() != "iframe" {
                std::fs::remove_dir_all(&path)?;
            }
        }
    }

    let conn = fw_db::get_conn(&state.db)?;
    trickplay_infos::delete_for_item(&conn, video.id)?;
    Ok(())
}

/// Generate the HLS image playlist for a stored tile set, or `None` when
/// no row exists.
pub fn hls_manifest(
    state: &AppState,
    video_id: VideoId,
    width: u32,
    api_key: &str,
) -> Result<Option<String>> {
    let conn = fw_db::get_conn(&state.db)?;
    let Some(info) = trickplay_infos::get(&conn, video_id, width)? else {
        return Ok(None);
    };

    Ok(Some(trickplay_manifest(&TrickplayManifestParams {
        width: info.width,
        height: info.height,
        tile_width: info.tile_width,
        tile_height: info.tile_height,
        thumbnail_count: info.thumbnail_count,
        interval_ms: info.interval_ms,
        media_source_id: video_id.simple_hex(),
        api_key: api_key.to_string(),
    })))
}
