//! Video Extended Usage (`vexu`) box construction.
//!
//! Apple's spatial-video metadata: a `vexu` container holding `eyes`
//! (stereo view info), `proj` (projection) and `pack` (frame packing)
//! children, depending on the source layout. Consumed by visionOS-class
//! players from the HEVC sample entry of an fMP4 init segment.

use fw_core::SpatialFormat;

/// Stereo baseline in micrometres, approximately the human interpupillary
/// distance.
const BASELINE_UM: u32 = 65_000;

/// Half-equirectangular (180-degree) projection code.
const PROJ_HALF_EQUIRECT: &[u8; 4] = b"hequ";
/// Full equirectangular (360-degree) projection code.
const PROJ_EQUIRECT: &[u8; 4] = b"equi";
/// Side-by-side frame packing code.
const PACK_SIDE_BY_SIDE: &[u8; 4] = b"side";
/// Over-under frame packing code.
const PACK_OVER_UNDER: &[u8; 4] = b"over";

/// Write a plain box: size (u32 BE) + type + content.
fn write_box(box_type: &[u8; 4], content: &[u8]) -> Vec<u8> {
    let size = (8 + content.len()) as u32;
    let mut out = Vec::with_capacity(size as usize);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(box_type);
    out.extend_from_slice(content);
    out
}

/// Write a full box: size + type + 4 zero bytes of version/flags + content.
fn write_full_box(box_type: &[u8; 4], content: &[u8]) -> Vec<u8> {
    let size = (12 + content.len()) as u32;
    let mut out = Vec::with_capacity(size as usize);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(box_type);
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(content);
    out
}

/// Write a container box from already-serialized children.
fn write_container(box_type: &[u8; 4], children: &[&[u8]]) -> Vec<u8> {
    let children_len: usize = children.iter().map(|c| c.len()).sum();
    let size = (8 + children_len) as u32;
    let mut out = Vec::with_capacity(size as usize);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(box_type);
    for child in children {
        out.extend_from_slice(child);
    }
    out
}

/// `eyes` box: both eye views present, right eye is the hero view, camera
/// baseline set to the human interpupillary distance.
fn write_eyes() -> Vec<u8> {
    let stri = write_full_box(b"stri", &[0x03]);
    let hero = write_full_box(b"hero", &[0x01]);
    let blin = write_full_box(b"blin", &BASELINE_UM.to_be_bytes());
    let cams = write_container(b"cams", &[&blin]);
    write_container(b"eyes", &[&stri, &hero, &cams])
}

/// `proj` box with the given projection kind inside `prji`.
fn write_proj(kind: &[u8; 4]) -> Vec<u8> {
    let prji = write_full_box(b"prji", kind);
    write_container(b"proj", &[&prji])
}

/// `pack` box with the given frame packing inside `pkin`.
fn write_pack(kind: &[u8; 4]) -> Vec<u8> {
    let pkin = write_full_box(b"pkin", kind);
    write_container(b"pack", &[&pkin])
}

/// Build the `vexu` box for a spatial format.
///
/// Returns an empty buffer for formats that need no injection (flat 2D
/// sources).
pub fn build_vexu(format: SpatialFormat) -> Vec<u8> {
    let (projection, packing, stereo) = match format {
        SpatialFormat::Stereo180Sbs => (Some(PROJ_HALF_EQUIRECT), Some(PACK_SIDE_BY_SIDE), true),
        SpatialFormat::Stereo180Ou => (Some(PROJ_HALF_EQUIRECT), Some(PACK_OVER_UNDER), true),
        SpatialFormat::Stereo360Sbs => (Some(PROJ_EQUIRECT), Some(PACK_SIDE_BY_SIDE), true),
        SpatialFormat::Stereo360Ou => (Some(PROJ_EQUIRECT), Some(PACK_OVER_UNDER), true),
        SpatialFormat::Mono360 => (Some(PROJ_EQUIRECT), None, false),
        SpatialFormat::HalfSbs | SpatialFormat::FullSbs | SpatialFormat::Mvc => {
            (None, Some(PACK_SIDE_BY_SIDE), true)
        }
        SpatialFormat::HalfOu | SpatialFormat::FullOu => (None, Some(PACK_OVER_UNDER), true),
        SpatialFormat::None => return Vec::new(),
    };

    let mut children: Vec<Vec<u8>> = Vec::with_capacity(3);
    if stereo {
        children.push(write_eyes());
    }
    if let Some(kind) = projection {
        children.push(write_proj(kind));
    }
    if let Some(kind) = packing {
        children.push(write_pack(kind));
    }

    let refs: Vec<&[u8]> = children.iter().map(|c| c.as_slice()).collect();
    write_container(b"vexu", &refs)
}
