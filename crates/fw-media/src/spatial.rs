//! Spatial metadata injection into fMP4 initialization segments.
//!
//! Walks `moov -> trak -> mdia -> minf -> stbl -> stsd`, finds the first
//! HEVC sample entry, strips any conflicting spatial boxes (`sv3d`, `st3d`,
//! pre-existing `vexu`), inserts a freshly built `vexu`, and fixes up every
//! ancestor size. VEXU targets HEVC only; buffers without an `hvc1` or
//! `dvh1` entry pass through untouched.

use fw_core::{Error, Result, SpatialFormat};

use crate::bmff;
use crate::vexu::build_vexu;

/// Fixed portion of a video sample entry (VisualSampleEntry) following the
/// 8-byte box header; child boxes start after it.
const SAMPLE_ENTRY_HEADER: usize = 8 + 78;

/// Version/flags plus entry count preceding the first `stsd` child.
const STSD_PREFIX: usize = 16;

/// Child box types that conflict with or duplicate a `vexu` injection.
const CONFLICTING: [&[u8; 4]; 3] = [b"sv3d", b"st3d", b"vexu"];

/// Inject spatial metadata for `format` into an init segment.
///
/// Returns a new buffer. The input is returned unchanged (no error) when
/// the segment carries no HEVC track or the format requires no injection.
///
/// # Errors
///
/// [`Error::MalformedBox`] when the expected box chain or sample entry is
/// missing. Callers treat this as non-fatal and keep serving the original
/// segment.
pub fn patch_init_segment(buf: &[u8], format: SpatialFormat) -> Result<Vec<u8>> {
    if !bmff::contains_literal(buf, b"hvc1") && !bmff::contains_literal(buf, b"dvh1") {
        return Ok(buf.to_vec());
    }

    let vexu = build_vexu(format);
    if vexu.is_empty() {
        return Ok(buf.to_vec());
    }

    // moov is normally the first or second top-level box, but some muxers
    // emit leading boxes we do not model; fall back to a full scan.
    let moov = bmff::find_box(buf, 0, buf.len(), b"moov")
        .or_else(|| bmff::scan_box(buf, b"moov"))
        .ok_or_else(|| Error::malformed("init segment has no moov box"))?;

    // Descend to stsd, recording each ancestor for the size fix-up.
    let mut ancestors = vec![moov];
    let mut parent = moov;
    for kind in [b"trak", b"mdia", b"minf", b"stbl", b"stsd"] {
        let parent_size = bmff::box_size(buf, parent) as usize;
        let child = bmff::find_box(buf, parent + 8, parent + parent_size, kind)
            .ok_or_else(|| {
                Error::malformed(format!(
                    "missing {} box in init segment",
                    String::from_utf8_lossy(kind)
                ))
            })?;
        ancestors.push(child);
        parent = child;
    }

    let stsd = parent;
    let stsd_end = stsd + bmff::box_size(buf, stsd) as usize;
    let entry = bmff::find_box(buf, stsd + STSD_PREFIX, stsd_end, b"hvc1")
        .or_else(|| bmff::find_box(buf, stsd + STSD_PREFIX, stsd_end, b"dvh1"))
        .ok_or_else(|| Error::malformed("stsd has no HEVC sample entry"))?;

    let mut out = buf.to_vec();
    let mut entry_size = bmff::box_size(&out, entry) as usize;
    if entry_size < SAMPLE_ENTRY_HEADER {
        return Err(Error::malformed("HEVC sample entry shorter than its fixed header"));
    }

    // Strip conflicting children. Positions do not advance after a strip:
    // the next sibling slides into place.
    let mut removed = 0usize;
    let mut child = entry + SAMPLE_ENTRY_HEADER;
    while child + 8 <= entry + entry_size {
        let child_size = bmff::box_size(&out, child) as usize;
        if child_size < 8 || child + child_size > entry + entry_size {
            break;
        }
        let kind = &out[child + 4..child + 8];
        if CONFLICTING.iter().any(|c| kind == *c) {
            out = bmff::strip_box(&out, child, child_size);
            entry_size -= child_size;
            removed += child_size;
        } else {
            child += child_size;
        }
    }

    out = bmff::insert_box(&out, entry + entry_size, &vexu);

    bmff::rename_dvwc_to_dvcc(&mut out);

    // Grow (or shrink) the sample entry and every ancestor by the net
    // change, innermost first.
    let delta = vexu.len() as i64 - removed as i64;
    for pos in std::iter::once(entry).chain(ancestors.into_iter().rev()) {
        let old = bmff::box_size(&out, pos) as i64;
        bmff::set_box_size(&mut out, pos, (old + delta) as u32);
    }

    Ok(out)
}

/// Like [`patch_init_segment`], but degrades to the original bytes on a
/// malformed segment, logging the failure. Serving an unpatched segment
/// beats serving nothing.
pub fn patch_init_segment_or_original(buf: &[u8], format: SpatialFormat) -> Vec<u8> {
    match patch_init_segment(buf, format) {
        Ok(patched) => patched,
        Err(e) => {
            tracing::error!(error = %e, %format, "init segment patch failed; serving original");
            buf.to_vec()
        }
    }
}
