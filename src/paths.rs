//! Artifact directory resolution.
//!
//! Every video has two possible artifact roots: one next to the media file
//! (`save_with_media`) and one under the server data directory. The
//! library toggle selects which is preferred; when the toggle flips, the
//! existing directory is renamed across so artifacts survive without a
//! rebuild.

use std::path::{Path, PathBuf};

use fw_core::{Result, VideoRef};

/// Directory name of the media-adjacent artifact root.
const MEDIA_ADJACENT_DIR: &str = ".artifacts";

/// Resolves artifact directories for videos.
#[derive(Debug, Clone)]
pub struct PathManager {
    data_dir: PathBuf,
}

impl PathManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The artifact root for a video under the selected policy.
    pub fn artifact_root(&self, video: &VideoRef, save_with_media: bool) -> PathBuf {
        if save_with_media {
            video
                .path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(MEDIA_ADJACENT_DIR)
                .join(video.id.simple_hex())
        } else {
            self.data_dir.join("artifacts").join(video.id.simple_hex())
        }
    }

    /// Trickplay tile directory for one width: `<root>/<W> - <tw>x<th>`.
    pub fn trickplay_dir(
        &self,
        video: &VideoRef,
        save_with_media: bool,
        width: u32,
        tile_width: u32,
        tile_height: u32,
    ) -> PathBuf {
        self.artifact_root(video, save_with_media)
            .join(format!("{width} - {tile_width}x{tile_height}"))
    }

    /// I-frame playlist directory: `<root>/iframe`.
    pub fn iframe_dir(&self, video: &VideoRef, save_with_media: bool) -> PathBuf {
        self.artifact_root(video, save_with_media).join("iframe")
    }

    /// Resolve the artifact root, migrating an existing directory from the
    /// non-preferred location when the `save_with_media` toggle changed
    /// since the last build. The database is untouched; only the directory
    /// moves.
    pub fn reconcile_root(&self, video: &VideoRef, save_with_media: bool) -> Result<PathBuf> {
        let preferred = self.artifact_root(video, save_with_media);
        let other = self.artifact_root(video, !save_with_media);

        if !preferred.exists() && other.exists() {
            tracing::info!(
                from = %other.display(),
                to = %preferred.display(),
                "artifact root policy changed; moving artifacts"
            );
            if let Some(parent) = preferred.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::rename(&other, &preferred)?;
        }

        Ok(preferred)
    }
}
