//! PGS to text subtitle conversion.
//!
//! Glues the .sup decoder to the OCR engine: display sets stream out of
//! the decoder, move through recognition in bounded batches, and come back
//! as timed text events. Unsupported languages and missing models yield an
//! empty track rather than an error — a subtitle nobody can read is not
//! worth failing playback over.

use std::io::Read;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use fw_core::{Error, Result};
use fw_ocr::ScriptFamily;
use fw_pgs::{DisplaySet, DisplaySetReader};

use crate::state::AppState;

/// Display sets recognized per batch; bounds peak memory for full-file
/// conversion.
const OCR_BATCH: usize = 50;

/// One timed text event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEvent {
    /// Sequential, 1-based.
    pub id: u32,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

/// An ordered list of subtitle events.
#[derive(Debug, Clone, Default)]
pub struct SubtitleTrack {
    pub events: Vec<SubtitleEvent>,
}

impl SubtitleTrack {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Render as SubRip text.
    pub fn to_srt(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        for event in &self.events {
            writeln!(out, "{}", event.id).unwrap();
            writeln!(
                out,
                "{} --> {}",
                srt_timestamp(event.start),
                srt_timestamp(event.end)
            )
            .unwrap();
            writeln!(out, "{}", event.text).unwrap();
            writeln!(out).unwrap();
        }
        out
    }
}

fn srt_timestamp(d: Duration) -> String {
    let total_ms = d.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = total_ms / 60_000 % 60;
    let seconds = total_ms / 1000 % 60;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Convert the display sets of one time window.
///
/// Used per HLS subtitle segment: the window filters by start time so a
/// cue spanning a segment boundary appears exactly once.
pub async fn convert_range<R>(
    state: &AppState,
    source: R,
    language: &str,
    window: (Duration, Duration),
    cancel: &CancellationToken,
) -> Result<SubtitleTrack>
where
    R: Read + Send + 'static,
{
    let Some(family) = resolve_family(state, language) else {
        return Ok(SubtitleTrack::default());
    };
    let reader = DisplaySetReader::with_window(source, window.0, window.1);
    convert_inner(state, reader, family, cancel).await
}

/// Convert an entire .sup stream.
pub async fn convert_full<R>(
    state: &AppState,
    source: R,
    language: &str,
    cancel: &CancellationToken,
) -> Result<SubtitleTrack>
where
    R: Read + Send + 'static,
{
    let Some(family) = resolve_family(state, language) else {
        return Ok(SubtitleTrack::default());
    };
    let reader = DisplaySetReader::new(source);
    convert_inner(state, reader, family, cancel).await
}

/// Language to family, gated on the models actually being installed.
fn resolve_family(state: &AppState, language: &str) -> Option<ScriptFamily> {
    let Some(family) = ScriptFamily::from_language(language) else {
        tracing::debug!(language, "unsupported subtitle language; returning empty track");
        return None;
    };
    if !state.models.has_models(family) {
        tracing::warn!(
            language,
            %family,
            "OCR models not installed; returning empty track"
        );
        return None;
    }
    Some(family)
}

async fn convert_inner<R>(
    state: &AppState,
    reader: DisplaySetReader<R>,
    family: ScriptFamily,
    cancel: &CancellationToken,
) -> Result<SubtitleTrack>
where
    R: Read + Send + 'static,
{
    let mut track = SubtitleTrack::default();
    let mut next_id = 1u32;
    // The reader moves into spawn_blocking for each batch and back out;
    // decoding is CPU-bound RLE work that must not block the runtime.
    let mut slot = Some(reader);

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut reader = slot.take().expect("reader always returned to slot");
        let (batch, reader) = tokio::task::spawn_blocking(move || {
            let batch: Vec<DisplaySet> = reader.by_ref().take(OCR_BATCH).collect();
            (batch, reader)
        })
        .await
        .map_err(|e| Error::Internal(format!("pgs decode join error: {e}")))?;
        slot = Some(reader);

        if batch.is_empty() {
            break;
        }

        let timings: Vec<(Duration, Duration)> =
            batch.iter().map(|set| (set.start, set.end)).collect();
        let images: Vec<(Vec<u8>, u32, u32)> = batch
            .into_iter()
            .map(|set| (set.rgba, set.width, set.height))
            .collect();

        let results = state.ocr.recognize_batch(images, family, cancel).await?;

        for ((start, end), result) in timings.into_iter().zip(results) {
            if result.is_empty() {
                continue;
            }
            track.events.push(SubtitleEvent {
                id: next_id,
                start,
                end,
                text: result.text.trim().to_string(),
            });
            next_id += 1;
        }
    }

    Ok(track)
}
