//! Lazy display-set extraction from a sequential .sup source.

use std::io::Read;
use std::time::Duration;

use crate::palette::Palette;
use crate::rle;
use crate::segment::{
    self, SEG_END, SEG_OBJECT, SEG_PALETTE, SEG_PRESENTATION, SEG_WINDOW,
};

/// The last display set of a stream has no successor to borrow an end time
/// from; it stays on screen this long.
const FINAL_SET_DURATION: Duration = Duration::from_secs(5);

/// One decoded subtitle cue: an RGBA bitmap with resolved timing.
///
/// `rgba` is `4 * width * height` bytes, row-major.
#[derive(Debug, Clone)]
pub struct DisplaySet {
    pub start: Duration,
    pub end: Duration,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// In-flight object accumulator: RLE data possibly split across segments.
#[derive(Debug, Default)]
struct ObjectAccum {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl ObjectAccum {
    /// Apply an object definition segment payload.
    ///
    /// The first segment of an object (flag bit 0x80 in byte 3) carries the
    /// bitmap dimensions at offset 7; continuation segments only extend the
    /// RLE data.
    fn push(&mut self, payload: &[u8]) {
        if payload.len() < 4 {
            return;
        }
        let first_in_sequence = payload[3] & 0x80 != 0;
        if first_in_sequence {
            if payload.len() < 11 {
                return;
            }
            self.width = u16::from_be_bytes([payload[7], payload[8]]) as u32;
            self.height = u16::from_be_bytes([payload[9], payload[10]]) as u32;
            self.data.clear();
            self.data.extend_from_slice(&payload[11..]);
        } else {
            self.data.extend_from_slice(&payload[4..]);
        }
    }

    fn clear(&mut self) {
        self.width = 0;
        self.height = 0;
        self.data.clear();
    }
}

/// A decoded display set before its end time is known.
struct RawSet {
    start: Duration,
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

/// Lazy, finite, non-restartable iterator of display sets.
///
/// Reads segments on demand; the end time of each set is the start of its
/// successor, so emission lags one set behind the parse. An optional time
/// window drops sets whose *start* falls outside `[start, end)` — filtering
/// by start only prevents the same cue from appearing in two adjacent HLS
/// subtitle segments.
pub struct DisplaySetReader<R: Read> {
    src: R,
    window: Option<(Duration, Duration)>,
    palette: Palette,
    comp_width: u32,
    comp_height: u32,
    set_start: Duration,
    object: ObjectAccum,
    pending: Option<RawSet>,
    done: bool,
}

impl<R: Read> DisplaySetReader<R> {
    /// Read every display set in the stream.
    pub fn new(src: R) -> Self {
        Self {
            src,
            window: None,
            palette: Palette::default(),
            comp_width: 0,
            comp_height: 0,
            set_start: Duration::ZERO,
            object: ObjectAccum::default(),
            pending: None,
            done: false,
        }
    }

    /// Only emit display sets whose start time falls in `[start, end)`.
    pub fn with_window(src: R, start: Duration, end: Duration) -> Self {
        let mut reader = Self::new(src);
        reader.window = Some((start, end));
        reader
    }

    fn in_window(&self, start: Duration) -> bool {
        match self.window {
            None => true,
            Some((s, e)) => start >= s && start < e,
        }
    }

    /// True once no later set can fall inside the window.
    fn past_window(&self, start: Duration) -> bool {
        matches!(self.window, Some((_, e)) if start >= e)
    }

    /// Parse segments until one complete display set is decoded.
    ///
    /// Returns `None` at EOF or on a corrupt/truncated stream.
    fn read_raw_set(&mut self) -> Option<RawSet> {
        loop {
            let header = segment::read_header(&mut self.src).ok()??;
            let payload = segment::read_payload(&mut self.src, header.size).ok()??;

            match header.kind {
                SEG_PRESENTATION => {
                    if payload.len() >= 4 {
                        self.comp_width =
                            u16::from_be_bytes([payload[0], payload[1]]) as u32;
                        self.comp_height =
                            u16::from_be_bytes([payload[2], payload[3]]) as u32;
                    }
                    self.set_start = header.pts_time();
                    self.object.clear();
                }
                SEG_PALETTE => self.palette.update(&payload),
                SEG_OBJECT => self.object.push(&payload),
                SEG_WINDOW => {}
                SEG_END => {
                    if let Some(raw) = self.finish_set() {
                        return Some(raw);
                    }
                    // A display set without a bitmap (e.g. the clearing set
                    // at the end of an epoch) produces nothing; keep going.
                }
                other => {
                    tracing::trace!(kind = other, "skipping unknown PGS segment type");
                }
            }
        }
    }

    /// Decode the accumulated object into an RGBA bitmap.
    fn finish_set(&mut self) -> Option<RawSet> {
        let (w, h) = (self.object.width, self.object.height);
        if w == 0 || h == 0 || self.object.data.is_empty() {
            self.object.clear();
            return None;
        }

        let indices = rle::decode(&self.object.data, w, h);
        let mut rgba = Vec::with_capacity(indices.len() * 4);
        for &index in &indices {
            rgba.extend_from_slice(&self.palette.color(index));
        }
        self.object.clear();

        Some(RawSet {
            start: self.set_start,
            width: w,
            height: h,
            rgba,
        })
    }
}

impl<R: Read> Iterator for DisplaySetReader<R> {
    type Item = DisplaySet;

    fn next(&mut self) -> Option<DisplaySet> {
        while !self.done {
            match self.read_raw_set() {
                Some(next_set) => {
                    let next_start = next_set.start;
                    // No further set can match once starts pass the window.
                    if self.past_window(next_start) {
                        self.done = true;
                    }
                    let previous = self.pending.replace(next_set);
                    if let Some(prev) = previous {
                        if self.in_window(prev.start) {
                            return Some(DisplaySet {
                                start: prev.start,
                                end: next_start,
                                width: prev.width,
                                height: prev.height,
                                rgba: prev.rgba,
                            });
                        }
                    }
                }
                None => {
                    self.done = true;
                }
            }
        }

        // Flush the final set; its end time is synthesized.
        let last = self.pending.take()?;
        if self.in_window(last.start) {
            Some(DisplaySet {
                start: last.start,
                end: last.start + FINAL_SET_DURATION,
                width: last.width,
                height: last.height,
                rgba: last.rgba,
            })
        } else {
            None
        }
    }
}
