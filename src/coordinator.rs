//! Per-video artifact refresh orchestration.
//!
//! A refresh resolves the artifact root (migrating it when the storage
//! policy flipped), rebuilds or adopts tiles per configured width, prunes
//! stale directories, and finally refreshes the I-frame playlist. One
//! width failing is logged and does not stop the others; cancellation
//! stops everything.

use tokio_util::sync::CancellationToken;

use fw_core::{Error, Result, VideoRef};
use fw_db::queries::{iframe_playlists, trickplay_infos};

use crate::state::AppState;
use crate::{iframe, trickplay};

/// Refresh all artifacts for one video.
pub async fn refresh_video(
    state: &AppState,
    video: &VideoRef,
    replace: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let library = &state.config.library;

    // Move artifacts between roots if the save-with-media toggle changed;
    // rows stay valid because they never store absolute paths.
    state.paths.reconcile_root(video, library.save_with_media)?;

    if !library.enable_trickplay || replace {
        tracing::debug!(
            video = %video.id,
            enabled = library.enable_trickplay,
            replace,
            "clearing existing trickplay artifacts"
        );
        trickplay::delete_all(state, video)?;
        if !library.enable_trickplay {
            return Ok(());
        }
    }

    for &width in &state.config.trickplay.widths {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match trickplay::build_width(state, video, width, replace, cancel).await {
            Ok(()) => {}
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                // One width failing must not starve the others; scratch
                // state was already cleaned up on the way out.
                tracing::error!(video = %video.id, width, error = %e, "trickplay width failed");
            }
        }
    }

    trickplay::prune_directories(state, video)?;

    if !library.disable_iframe_playlists {
        match iframe::build(state, video, replace, cancel).await {
            Ok(()) => {}
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                tracing::error!(video = %video.id, error = %e, "I-frame playlist failed");
            }
        }
    }

    Ok(())
}

/// Remove every artifact and row for a deleted video.
pub fn delete_video_artifacts(state: &AppState, video: &VideoRef) -> Result<()> {
    trickplay::delete_all(state, video)?;
    iframe::delete(state, video)?;

    // Drop whichever root is left, regardless of the current policy.
    for save_with_media in [false, true] {
        let root = state.paths.artifact_root(video, save_with_media);
        if root.exists() {
            std::fs::remove_dir_all(&root)?;
        }
    }

    let conn = fw_db::get_conn(&state.db)?;
    trickplay_infos::delete_for_item(&conn, video.id)?;
    iframe_playlists::delete_for_item(&conn, video.id)?;
    Ok(())
}
