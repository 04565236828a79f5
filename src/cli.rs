use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "framewright")]
#[command(author, version, about = "Media artifact generation: trickplay, I-frame HLS, spatial metadata, subtitle OCR")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate all artifacts (trickplay tiles, I-frame playlist) for a video
    Refresh {
        /// Media file to process
        #[arg(required = true)]
        input: PathBuf,

        /// Stable video id; a random one is generated if omitted
        #[arg(long)]
        id: Option<String>,

        /// Spatial format tag (hsbs, fsbs, hou, fou, mvc, 180sbs, 360, ...);
        /// detected from the filename if omitted
        #[arg(long)]
        spatial: Option<String>,

        /// Rebuild artifacts even if they already exist
        #[arg(long)]
        replace: bool,
    },

    /// Convert a PGS (.sup) subtitle stream to SubRip text via OCR
    Subtitles {
        /// .sup file to convert
        #[arg(required = true)]
        input: PathBuf,

        /// Subtitle language (ISO 639 code or English name)
        #[arg(short, long, default_value = "en")]
        language: String,

        /// Only convert cues starting at or after this many seconds
        #[arg(long)]
        from: Option<f64>,

        /// Only convert cues starting before this many seconds
        #[arg(long)]
        to: Option<f64>,

        /// Write SRT here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download OCR models
    Models {
        /// Download every script family instead of just Latin and CJK
        #[arg(long)]
        all: bool,

        /// Download one specific family (latin, cjk, korean, ...)
        #[arg(long, conflicts_with = "all")]
        family: Option<String>,
    },

    /// Inject spatial-video metadata into an fMP4 initialization segment
    PatchInit {
        /// init.mp4 to patch
        #[arg(required = true)]
        input: PathBuf,

        /// Spatial format tag (hsbs, fsbs, hou, fou, mvc, 180sbs, 360, ...)
        #[arg(short, long)]
        format: String,

        /// Output path; defaults to patching a copy next to the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that required external tools are available
    CheckTools,
}
