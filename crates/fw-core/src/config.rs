//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for trickplay generation, OCR models, library behavior, and
//! external tools. Every section defaults sensibly so a completely empty
//! `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server data directory; artifact store, OCR models, and data-rooted
    /// artifacts live under it.
    pub data_dir: PathBuf,
    pub trickplay: TrickplayOptions,
    pub models: ModelOptions,
    pub library: LibraryOptions,
    pub tools: ToolsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            trickplay: TrickplayOptions::default(),
            models: ModelOptions::default(),
            library: LibraryOptions::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.trickplay.widths.is_empty() {
            warnings.push("trickplay.widths is empty; no tiles will be generated".into());
        }
        for &w in &self.trickplay.widths {
            if w == 0 {
                warnings.push("trickplay.widths contains 0".into());
            }
        }
        if self.trickplay.tile_width == 0 || self.trickplay.tile_height == 0 {
            warnings.push("trickplay tile grid must be at least 1x1".into());
        }
        if self.trickplay.interval_ms < 1000 {
            warnings.push(format!(
                "trickplay.interval_ms {} is below 1000 and will be clamped",
                self.trickplay.interval_ms
            ));
        }
        if self.trickplay.jpeg_quality == 0 || self.trickplay.jpeg_quality > 100 {
            warnings.push(format!(
                "trickplay.jpeg_quality {} is outside 1-100",
                self.trickplay.jpeg_quality
            ));
        }
        if self.models.base_url.is_empty() {
            warnings.push("models.base_url is empty; OCR model downloads will fail".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// TrickplayOptions
// ---------------------------------------------------------------------------

/// Options controlling trickplay tile generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrickplayOptions {
    /// Milliseconds between thumbnails. Values below 1000 are clamped.
    pub interval_ms: u64,
    /// Output widths to generate, one tile set per width.
    pub widths: Vec<u32>,
    /// Thumbnails per tile row.
    pub tile_width: u32,
    /// Thumbnail rows per tile.
    pub tile_height: u32,
    /// JPEG quality for composed tiles, 1-100.
    pub jpeg_quality: u8,
    /// Allow hardware-accelerated decoding during extraction.
    pub enable_hw_accel: bool,
    /// Thread count passed to the media encoder. 0 lets it decide.
    pub threads: u32,
    /// Niceness applied to the extraction process (unix).
    pub process_priority: i32,
    /// Extract key frames only (much faster, less uniform spacing).
    pub keyframes_only: bool,
    /// ffmpeg qscale for extracted thumbnails, lower is better quality.
    pub qscale: u32,
}

impl Default for TrickplayOptions {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            widths: vec![320],
            tile_width: 10,
            tile_height: 10,
            jpeg_quality: 80,
            enable_hw_accel: false,
            threads: 1,
            process_priority: 10,
            keyframes_only: false,
            qscale: 4,
        }
    }
}

impl TrickplayOptions {
    /// Interval clamped to the 1 s floor, as a warning-logged invariant.
    pub fn clamped_interval_ms(&self) -> u64 {
        if self.interval_ms < 1000 {
            tracing::warn!(
                interval_ms = self.interval_ms,
                "trickplay interval below 1000ms; clamping to 1000ms"
            );
            1000
        } else {
            self.interval_ms
        }
    }

    /// Thumbnails per composed tile.
    pub fn thumbnails_per_tile(&self) -> u32 {
        self.tile_width * self.tile_height
    }
}

// ---------------------------------------------------------------------------
// ModelOptions
// ---------------------------------------------------------------------------

/// OCR model download configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    /// Base URL the registry downloads model files from. Layout below the
    /// base mirrors the on-disk layout: `det.onnx`, `<family>/rec.onnx`,
    /// `<family>/dict.txt`.
    pub base_url: String,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            base_url: "https://models.framewright.dev/ocr/v1".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// LibraryOptions
// ---------------------------------------------------------------------------

/// Per-library feature toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryOptions {
    /// Master switch for trickplay tile extraction.
    pub enable_trickplay: bool,
    /// Disable I-frame playlist generation.
    pub disable_iframe_playlists: bool,
    /// Store artifacts next to the media file instead of the data dir.
    pub save_with_media: bool,
}

impl Default for LibraryOptions {
    fn default() -> Self {
        Self {
            enable_trickplay: true,
            disable_iframe_playlists: false,
            save_with_media: false,
        }
    }
}

// ---------------------------------------------------------------------------
// ToolsConfig
// ---------------------------------------------------------------------------

/// Optional explicit paths for external tools; unset tools are discovered
/// on `PATH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}
