//! fw-media: ISO BMFF box utilities, spatial-video (`vexu`) metadata, and
//! HLS playlist text generation.
//!
//! Everything in this crate is pure: byte buffers in, byte buffers or
//! strings out. No I/O, no suspension.

pub mod bmff;
pub mod hls;
pub mod spatial;
pub mod vexu;

pub use spatial::{patch_init_segment, patch_init_segment_or_original};
pub use vexu::build_vexu;
