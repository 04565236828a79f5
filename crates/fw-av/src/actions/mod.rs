//! ffmpeg actions producing artifact inputs.

pub mod iframe_hls;
pub mod thumbnails;

pub use iframe_hls::{generate_iframe_hls, IframeHlsRequest};
pub use thumbnails::{extract_thumbnails, ThumbnailRequest};
