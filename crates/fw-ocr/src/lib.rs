//! fw-ocr: OCR model management and text recognition for bitmap subtitles.
//!
//! Three layers:
//! - [`lang`]: language code to script-family mapping,
//! - [`registry`]: per-family model download with atomic installs,
//! - [`engine`]: the recognition engine (preprocessing, ONNX inference,
//!   CTC decoding), one lazily-loaded session per script family.

pub mod ctc;
pub mod engine;
pub mod lang;
pub mod preprocess;
pub mod registry;

pub use engine::{OcrEngine, OcrResult};
pub use lang::ScriptFamily;
pub use registry::{ModelRegistry, OcrModelPaths};
