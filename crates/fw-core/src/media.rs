//! Media-domain types: spatial formats, source shape flags, and video
//! references flowing through the artifact pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::ids::VideoId;

// ---------------------------------------------------------------------------
// SpatialFormat
// ---------------------------------------------------------------------------

/// The 3D / 360-degree layout of a video source.
///
/// Drives the shape of the `vexu` metadata injected into HEVC initialization
/// segments. `None` means a flat 2D source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpatialFormat {
    HalfSbs,
    FullSbs,
    HalfOu,
    FullOu,
    Mvc,
    Stereo180Sbs,
    Stereo180Ou,
    Stereo360Sbs,
    Stereo360Ou,
    Mono360,
    #[default]
    None,
}

impl SpatialFormat {
    /// Parse a spatial-format tag as found in library metadata or filename
    /// markers. Case-insensitive. Unknown tags map to `None`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "hsbs" | "halfsbs" | "half-sbs" | "sbs" => Self::HalfSbs,
            "fsbs" | "fullsbs" | "full-sbs" => Self::FullSbs,
            "hou" | "halfou" | "half-ou" | "htab" | "halftab" => Self::HalfOu,
            "fou" | "fullou" | "full-ou" | "ftab" | "fulltab" => Self::FullOu,
            "mvc" => Self::Mvc,
            "180sbs" | "180-sbs" => Self::Stereo180Sbs,
            "180ou" | "180-ou" | "180tab" => Self::Stereo180Ou,
            "360sbs" | "360-sbs" => Self::Stereo360Sbs,
            "360ou" | "360-ou" | "360tab" => Self::Stereo360Ou,
            "360" | "mono360" | "equirectangular" => Self::Mono360,
            _ => Self::None,
        }
    }

    /// Detect a spatial format from delimited tokens in a file name, e.g.
    /// `Movie (2024) [HSBS].mkv` or `clip.360sbs.mp4`.
    pub fn from_filename(name: &str) -> Self {
        for token in name.split(|c: char| !c.is_ascii_alphanumeric()) {
            if token.is_empty() {
                continue;
            }
            let parsed = Self::from_tag(token);
            if parsed != Self::None {
                return parsed;
            }
        }
        Self::None
    }

    /// Effective post-transform display dimensions for a source of
    /// `width x height`: side-by-side packings halve the width, over-under
    /// packings halve the height, everything else passes through.
    pub fn effective_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Self::HalfSbs | Self::FullSbs | Self::Stereo180Sbs | Self::Stereo360Sbs => {
                (width / 2, height)
            }
            Self::HalfOu | Self::FullOu | Self::Stereo180Ou | Self::Stereo360Ou => {
                (width, height / 2)
            }
            Self::Mvc | Self::Mono360 | Self::None => (width, height),
        }
    }

    /// True if patching an init segment for this format would inject a box.
    pub fn wants_vexu(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for SpatialFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::HalfSbs => "halfsbs",
            Self::FullSbs => "fullsbs",
            Self::HalfOu => "halfou",
            Self::FullOu => "fullou",
            Self::Mvc => "mvc",
            Self::Stereo180Sbs => "180sbs",
            Self::Stereo180Ou => "180ou",
            Self::Stereo360Sbs => "360sbs",
            Self::Stereo360Ou => "360ou",
            Self::Mono360 => "mono360",
            Self::None => "none",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// SourceFlags
// ---------------------------------------------------------------------------

/// Shape flags that disqualify a source from artifact generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFlags {
    /// ISO / DVD / BluRay disc image or folder structure.
    pub disc_image: bool,
    /// Placeholder entry with no real media behind it.
    pub placeholder: bool,
    /// Shortcut / strm-style redirect.
    pub shortcut: bool,
    /// Still being written or downloaded.
    pub incomplete: bool,
}

impl SourceFlags {
    /// True if any disqualifying flag is set.
    pub fn any(&self) -> bool {
        self.disc_image || self.placeholder || self.shortcut || self.incomplete
    }
}

// ---------------------------------------------------------------------------
// VideoRef
// ---------------------------------------------------------------------------

/// A reference to one video source entering a refresh.
///
/// Immutable for the duration of the refresh: the coordinator resolves it
/// once and hands it to every builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRef {
    pub id: VideoId,
    /// Absolute path to the media file.
    pub path: PathBuf,
    pub spatial_format: SpatialFormat,
    /// Source frame width in pixels.
    pub width: u32,
    /// Source frame height in pixels.
    pub height: u32,
    /// Total duration of the video.
    pub duration: Duration,
    pub flags: SourceFlags,
}

impl VideoRef {
    /// Effective display dimensions after the spatial transform.
    pub fn effective_dimensions(&self) -> (u32, u32) {
        self.spatial_format
            .effective_dimensions(self.width, self.height)
    }

    /// True if the parent directory is a backdrops folder (those clips are
    /// not scrubbed, so they get no artifacts).
    pub fn in_backdrops_dir(&self) -> bool {
        self.path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().eq_ignore_ascii_case("backdrops"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_parsing() {
        assert_eq!(SpatialFormat::from_tag("HSBS"), SpatialFormat::HalfSbs);
        assert_eq!(SpatialFormat::from_tag("fullou"), SpatialFormat::FullOu);
        assert_eq!(SpatialFormat::from_tag("360"), SpatialFormat::Mono360);
        assert_eq!(SpatialFormat::from_tag("whatever"), SpatialFormat::None);
    }

    #[test]
    fn filename_detection() {
        assert_eq!(
            SpatialFormat::from_filename("Movie (2024) [HSBS].mkv"),
            SpatialFormat::HalfSbs
        );
        assert_eq!(
            SpatialFormat::from_filename("clip.360sbs.mp4"),
            SpatialFormat::Stereo360Sbs
        );
        assert_eq!(
            SpatialFormat::from_filename("plain-movie.mkv"),
            SpatialFormat::None
        );
    }

    #[test]
    fn effective_dimensions() {
        assert_eq!(
            SpatialFormat::HalfSbs.effective_dimensions(1920, 1080),
            (960, 1080)
        );
        assert_eq!(
            SpatialFormat::FullOu.effective_dimensions(1920, 2160),
            (1920, 1080)
        );
        assert_eq!(
            SpatialFormat::Mono360.effective_dimensions(3840, 1920),
            (3840, 1920)
        );
    }

    #[test]
    fn flags_any() {
        assert!(!SourceFlags::default().any());
        let flags = SourceFlags {
            placeholder: true,
            ..Default::default()
        };
        assert!(flags.any());
    }

    #[test]
    fn backdrops_detection() {
        let video = VideoRef {
            id: VideoId::new(),
            path: PathBuf::from("/media/movies/Backdrops/clip.mp4"),
            spatial_format: SpatialFormat::None,
            width: 1920,
            height: 1080,
            duration: Duration::from_secs(30),
            flags: SourceFlags::default(),
        };
        assert!(video.in_backdrops_dir());
    }
}
