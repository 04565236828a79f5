//! fw-pgs: Presentation Graphics Stream (Blu-ray bitmap subtitle) decoding.
//!
//! A .sup file is a sequence of segments (palette, object, composition,
//! window, end-of-display-set) that together describe timed bitmap cues.
//! [`DisplaySetReader`] turns a sequential byte source into a lazy stream
//! of [`DisplaySet`] values: one RGBA bitmap per on-screen cue, with start
//! and end times resolved across adjacent sets.

pub mod palette;
pub mod reader;
pub mod rle;
mod segment;

pub use reader::{DisplaySet, DisplaySetReader};
