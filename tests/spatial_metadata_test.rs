//! End-to-end spatial metadata checks against synthetic init segments.

use fw_core::SpatialFormat;
use fw_media::{bmff, build_vexu, patch_init_segment};

fn raw_box(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&((8 + payload.len()) as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out
}

fn sample_entry(kind: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    let mut payload = vec![0u8; 78];
    for child in children {
        payload.extend_from_slice(child);
    }
    raw_box(kind, &payload)
}

/// ftyp + moov/trak/mdia/minf/stbl/stsd with one sample entry.
fn init_segment(entry: Vec<u8>) -> Vec<u8> {
    let mut stsd_payload = vec![0u8; 8];
    stsd_payload[7] = 1; // entry_count
    stsd_payload.extend_from_slice(&entry);
    let stsd = raw_box(b"stsd", &stsd_payload);
    let stbl = raw_box(b"stbl", &stsd);
    let minf = raw_box(b"minf", &stbl);
    let mdia = raw_box(b"mdia", &minf);
    let trak = raw_box(b"trak", &mdia);
    let moov = raw_box(b"moov", &trak);

    let mut out = raw_box(b"ftyp", b"isom\x00\x00\x02\x00isom");
    out.extend_from_slice(&moov);
    out
}

/// Find a literal 4-byte tag, returning its offset.
fn find_tag(buf: &[u8], tag: &[u8; 4]) -> Option<usize> {
    (0..buf.len().saturating_sub(3)).find(|&i| &buf[i..i + 4] == tag)
}

/// `moov.size = 8 + sum(children.size)`, recursively, for the container
/// chain the patcher touches.
fn assert_sizes_sum(buf: &[u8], pos: usize) {
    let size = bmff::box_size(buf, pos) as usize;
    let kind: [u8; 4] = buf[pos + 4..pos + 8].try_into().unwrap();
    let first_child = match &kind {
        b"moov" | b"trak" | b"mdia" | b"minf" | b"stbl" => pos + 8,
        b"stsd" => pos + 16,
        b"hvc1" | b"dvh1" => pos + 8 + 78,
        _ => return,
    };
    let mut child = first_child;
    while child + 8 <= pos + size {
        let child_size = bmff::box_size(buf, child) as usize;
        assert!(child_size >= 8);
        assert!(child + child_size <= pos + size);
        assert_sizes_sum(buf, child);
        child += child_size;
    }
    assert_eq!(child, pos + size);
}

#[test]
fn vexu_stereo180_sbs_shape() {
    let vexu = build_vexu(SpatialFormat::Stereo180Sbs);

    // First 8 bytes: big-endian size covering the whole buffer, then the
    // vexu tag.
    assert_eq!(bmff::box_size(&vexu, 0) as usize, vexu.len());
    assert_eq!(&vexu[4..8], b"vexu");

    // eyes present; proj contains prji containing hequ; pack contains
    // pkin containing side.
    assert!(find_tag(&vexu, b"eyes").is_some());
    let proj = find_tag(&vexu, b"proj").unwrap();
    let prji = find_tag(&vexu, b"prji").unwrap();
    let hequ = find_tag(&vexu, b"hequ").unwrap();
    assert!(proj < prji && prji < hequ);
    let pack = find_tag(&vexu, b"pack").unwrap();
    let pkin = find_tag(&vexu, b"pkin").unwrap();
    let side = find_tag(&vexu, b"side").unwrap();
    assert!(pack < pkin && pkin < side);
}

#[test]
fn vexu_mono360_shape() {
    let vexu = build_vexu(SpatialFormat::Mono360);

    let proj = find_tag(&vexu, b"proj").unwrap();
    let prji = find_tag(&vexu, b"prji").unwrap();
    let equi = find_tag(&vexu, b"equi").unwrap();
    assert!(proj < prji && prji < equi);

    assert!(find_tag(&vexu, b"eyes").is_none());
    assert!(find_tag(&vexu, b"pack").is_none());
}

#[test]
fn patch_round_trip() {
    let hvcc = raw_box(b"hvcC", &[0u8; 16]);
    let dvwc = raw_box(b"dvwC", &[0u8; 24]);
    let buf = init_segment(sample_entry(b"hvc1", &[hvcc, dvwc]));

    let vexu_len = build_vexu(SpatialFormat::FullSbs).len();
    let patched = patch_init_segment(&buf, SpatialFormat::FullSbs).unwrap();

    // vexu landed inside the hvc1 sample entry.
    let hvc1 = find_tag(&patched, b"hvc1").unwrap() - 4;
    let hvc1_size = bmff::box_size(&patched, hvc1) as usize;
    let vexu = find_tag(&patched, b"vexu").unwrap();
    assert!(vexu > hvc1 && vexu < hvc1 + hvc1_size);

    // moov grew by exactly the vexu size.
    let moov_before = find_tag(&buf, b"moov").unwrap() - 4;
    let moov_after = find_tag(&patched, b"moov").unwrap() - 4;
    assert_eq!(
        bmff::box_size(&patched, moov_after) as usize,
        bmff::box_size(&buf, moov_before) as usize + vexu_len
    );

    // dvwC was renamed for visionOS.
    assert!(find_tag(&patched, b"dvcC").is_some());
    assert!(find_tag(&patched, b"dvwC").is_none());

    assert_sizes_sum(&patched, moov_after);
}

#[test]
fn patch_is_idempotent_per_format() {
    let hvcc = raw_box(b"hvcC", &[0u8; 16]);
    let buf = init_segment(sample_entry(b"hvc1", &[hvcc]));

    for format in [
        SpatialFormat::HalfSbs,
        SpatialFormat::Stereo180Ou,
        SpatialFormat::Stereo360Sbs,
        SpatialFormat::Mono360,
    ] {
        let once = patch_init_segment(&buf, format).unwrap();
        let twice = patch_init_segment(&once, format).unwrap();
        assert_eq!(once, twice, "patching twice changed bytes for {format}");
    }
}

#[test]
fn patch_replaces_prior_spatial_boxes() {
    let sv3d = raw_box(b"sv3d", &[0u8; 32]);
    let hvcc = raw_box(b"hvcC", &[0u8; 16]);
    let buf = init_segment(sample_entry(b"hvc1", &[sv3d, hvcc]));

    // Patch as one format, then re-patch as another: exactly one vexu,
    // no stale sv3d, sizes consistent.
    let first = patch_init_segment(&buf, SpatialFormat::HalfOu).unwrap();
    let second = patch_init_segment(&first, SpatialFormat::Stereo360Ou).unwrap();

    assert!(find_tag(&second, b"sv3d").is_none());
    let vexu_count = (0..second.len() - 4)
        .filter(|&i| &second[i..i + 4] == b"vexu")
        .count();
    assert_eq!(vexu_count, 1);

    let moov = find_tag(&second, b"moov").unwrap() - 4;
    assert_sizes_sum(&second, moov);
}
