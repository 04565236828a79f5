//! The recognition engine: lazily-loaded ONNX sessions, one per script
//! family, and the per-bitmap recognition path.
//!
//! Sessions load once behind a load mutex; after installation in the map,
//! readers clone the `Arc` from a read lock and run inference without any
//! coordination — ONNX Runtime sessions are safe for concurrent runs.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use futures::stream::{StreamExt, TryStreamExt};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use fw_core::{Error, Result};

use crate::ctc;
use crate::lang::ScriptFamily;
use crate::preprocess::{self, REC_HEIGHT};
use crate::registry::{ModelRegistry, OcrModelPaths};

/// Upper bound on concurrently running inference tasks in a batch.
const MAX_PARALLEL_OCR: usize = 4;

/// Outcome of recognizing one bitmap.
#[derive(Debug, Clone, Default)]
pub struct OcrResult {
    /// Recognized text; region texts joined with newlines.
    pub text: String,
    /// Mean confidence across regions, 0.0 when nothing was recognized.
    pub confidence: f32,
    /// Number of regions that produced text.
    pub regions: usize,
}

impl OcrResult {
    /// True when no usable text came out.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A loaded recognition session plus its glyph dictionary.
struct LoadedModel {
    session: Session,
    glyphs: Vec<String>,
}

/// Thread-safe OCR engine holding at most one session per family.
pub struct OcrEngine {
    registry: Arc<ModelRegistry>,
    sessions: RwLock<HashMap<ScriptFamily, Arc<LoadedModel>>>,
    load_lock: tokio::sync::Mutex<()>,
}

impl OcrEngine {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            sessions: RwLock::new(HashMap::new()),
            load_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Get or load the session for a family (single-flight).
    async fn session(&self, family: ScriptFamily) -> Result<Arc<LoadedModel>> {
        if let Some(model) = self.sessions.read().get(&family) {
            return Ok(model.clone());
        }

        let _guard = self.load_lock.lock().await;
        if let Some(model) = self.sessions.read().get(&family) {
            return Ok(model.clone());
        }

        if !self.registry.has_models(family) {
            return Err(Error::ModelUnavailable(family.to_string()));
        }

        let paths = self.registry.paths(family);
        tracing::info!(%family, "loading OCR recognition session");
        let model = tokio::task::spawn_blocking(move || load_model(&paths))
            .await
            .map_err(|e| Error::Internal(format!("session load join error: {e}")))??;

        let model = Arc::new(model);
        self.sessions.write().insert(family, model.clone());
        Ok(model)
    }

    /// Recognize text in one RGBA bitmap.
    ///
    /// Inference failures degrade to an empty result; only a missing model
    /// set is an error.
    pub async fn recognize(
        &self,
        rgba: Vec<u8>,
        width: u32,
        height: u32,
        family: ScriptFamily,
    ) -> Result<OcrResult> {
        let model = self.session(family).await?;
        tokio::task::spawn_blocking(move || recognize_bitmap(&model, &rgba, width, height))
            .await
            .map_err(|e| Error::Internal(format!("ocr join error: {e}")))
    }

    /// Recognize a batch of RGBA bitmaps on a bounded worker pool.
    ///
    /// Results come back in input order. Cancellation aborts between
    /// elements.
    pub async fn recognize_batch(
        &self,
        images: Vec<(Vec<u8>, u32, u32)>,
        family: ScriptFamily,
        cancel: &CancellationToken,
    ) -> Result<Vec<OcrResult>> {
        let model = self.session(family).await?;

        futures::stream::iter(images.into_iter().map(|(rgba, width, height)| {
            let model = model.clone();
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                tokio::task::spawn_blocking(move || {
                    recognize_bitmap(&model, &rgba, width, height)
                })
                .await
                .map_err(|e| Error::Internal(format!("ocr join error: {e}")))
            }
        }))
        .buffered(MAX_PARALLEL_OCR)
        .try_collect()
        .await
    }
}

/// Parse the dictionary and open the recognition model.
///
/// Session options follow the recognition model's deployment defaults:
/// full graph optimization, sequential execution, one inter-op thread and
/// four intra-op threads.
fn load_model(paths: &OcrModelPaths) -> Result<LoadedModel> {
    let glyphs = parse_dictionary(&paths.dictionary)?;

    let session = Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|b| b.with_parallel_execution(false))
        .and_then(|b| b.with_inter_threads(1))
        .and_then(|b| b.with_intra_threads(4))
        .and_then(|b| b.commit_from_file(&paths.recognition_model))
        .map_err(|e| Error::Internal(format!("failed to load recognition model: {e}")))?;

    Ok(LoadedModel { session, glyphs })
}

/// Read `dict.txt` into an ordered glyph list, trimming a BOM and
/// dropping empty lines.
fn parse_dictionary(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)?;
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(&raw);
    Ok(raw
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Recognition entry point; degrades internal failures to an empty result.
fn recognize_bitmap(model: &LoadedModel, rgba: &[u8], width: u32, height: u32) -> OcrResult {
    match run_recognition(model, rgba, width, height) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "OCR inference failed; returning empty result");
            OcrResult::default()
        }
    }
}

fn run_recognition(
    model: &LoadedModel,
    rgba: &[u8],
    width: u32,
    height: u32,
) -> Result<OcrResult> {
    let rgb = preprocess::composite_over_white(rgba, width, height);
    let regions = preprocess::find_text_regions(&rgb, width, height);

    let mut texts = Vec::new();
    let mut confidences = Vec::new();

    for region in &regions {
        let (tensor, target_w) = preprocess::region_to_tensor(&rgb, width, region);
        let (text, confidence) = infer_line(model, tensor, target_w)?;
        if !text.trim().is_empty() {
            texts.push(text);
            confidences.push(confidence);
        }
    }

    let regions = texts.len();
    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32
    };

    Ok(OcrResult {
        text: texts.join("\n"),
        confidence,
        regions,
    })
}

/// Run one `[1, 3, 48, W]` line tensor through the session and decode the
/// `[1, T, C]` logits.
fn infer_line(model: &LoadedModel, tensor: Vec<f32>, target_w: usize) -> Result<(String, f32)> {
    let input = Value::from_array((
        [1usize, 3, REC_HEIGHT as usize, target_w],
        tensor,
    ))
    .map_err(|e| Error::Internal(format!("onnx input build failed: {e}")))?;

    let outputs = model
        .session
        .run(ort::inputs![input].map_err(|e| Error::Internal(format!("onnx inputs: {e}")))?)
        .map_err(|e| Error::Internal(format!("onnx inference failed: {e}")))?;

    let (shape, logits) = outputs[0]
        .try_extract_raw_tensor::<f32>()
        .map_err(|e| Error::Internal(format!("onnx output extract failed: {e}")))?;

    if shape.len() != 3 {
        return Err(Error::Internal(format!(
            "unexpected logits shape: {shape:?}"
        )));
    }
    let timesteps = shape[1] as usize;
    let classes = shape[2] as usize;

    Ok(ctc::greedy_decode(logits, timesteps, classes, &model.glyphs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_parsing_trims_bom_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.txt");
        std::fs::write(&path, "\u{feff}a\nb\n\nch\r\n").unwrap();

        let glyphs = parse_dictionary(&path).unwrap();
        assert_eq!(glyphs, vec!["a", "b", "ch"]);
    }

    #[tokio::test]
    async fn missing_models_is_model_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ModelRegistry::new(dir.path(), "http://invalid"));
        let engine = OcrEngine::new(registry);

        let err = engine
            .recognize(vec![0u8; 4], 1, 1, ScriptFamily::Latin)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn batch_cancellation_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ModelRegistry::new(dir.path(), "http://invalid"));
        let engine = OcrEngine::new(registry);
        let cancel = CancellationToken::new();
        cancel.cancel();

        // Model lookup fails before the batch even starts; with installed
        // models the per-element cancellation check would fire instead.
        let result = engine
            .recognize_batch(vec![(vec![0u8; 4], 1, 1)], ScriptFamily::Latin, &cancel)
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn empty_result_is_empty() {
        assert!(OcrResult::default().is_empty());
        let result = OcrResult {
            text: "  \n ".into(),
            confidence: 0.1,
            regions: 1,
        };
        assert!(result.is_empty());
    }
}
