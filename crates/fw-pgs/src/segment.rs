//! PGS segment record framing.
//!
//! Every record is `PG | pts u32 | dts u32 | type u8 | size u16` followed
//! by `size` payload bytes. PTS ticks at 90 kHz.

use std::io::{self, Read};
use std::time::Duration;

/// Palette definition segment.
pub const SEG_PALETTE: u8 = 0x14;
/// Object (RLE bitmap) definition segment.
pub const SEG_OBJECT: u8 = 0x15;
/// Presentation composition segment.
pub const SEG_PRESENTATION: u8 = 0x16;
/// Window definition segment.
pub const SEG_WINDOW: u8 = 0x17;
/// End of display set.
pub const SEG_END: u8 = 0x80;

/// PGS presentation timestamps tick at 90 kHz.
const PTS_HZ: u64 = 90_000;

/// One parsed segment header.
#[derive(Debug, Clone, Copy)]
pub struct SegmentHeader {
    pub pts: u32,
    pub kind: u8,
    pub size: u16,
}

impl SegmentHeader {
    /// Presentation time as a [`Duration`].
    pub fn pts_time(&self) -> Duration {
        ticks_to_duration(self.pts)
    }
}

/// Convert 90 kHz ticks to a [`Duration`].
pub fn ticks_to_duration(ticks: u32) -> Duration {
    Duration::from_nanos(ticks as u64 * 1_000_000_000 / PTS_HZ)
}

/// Read the next segment header.
///
/// Returns `Ok(None)` on a clean EOF at a record boundary, or when the
/// magic bytes do not match (the stream is corrupt; parsing stops
/// silently). Truncation inside the header also maps to `Ok(None)`.
pub fn read_header<R: Read>(src: &mut R) -> io::Result<Option<SegmentHeader>> {
    let mut buf = [0u8; 13];
    if !read_exact_or_eof(src, &mut buf)? {
        return Ok(None);
    }

    if &buf[0..2] != b"PG" {
        return Ok(None);
    }

    let pts = u32::from_be_bytes([buf[2], buf[3], buf[4], buf[5]]);
    // buf[6..10] is the DTS, which PGS players ignore.
    let kind = buf[10];
    let size = u16::from_be_bytes([buf[11], buf[12]]);

    Ok(Some(SegmentHeader { pts, kind, size }))
}

/// Read an exact payload; `Ok(None)` when the stream truncates mid-segment.
pub fn read_payload<R: Read>(src: &mut R, size: u16) -> io::Result<Option<Vec<u8>>> {
    let mut payload = vec![0u8; size as usize];
    if !read_exact_or_eof(src, &mut payload)? {
        return Ok(None);
    }
    Ok(Some(payload))
}

/// `read_exact` that reports EOF (including partial reads) as `Ok(false)`.
fn read_exact_or_eof<R: Read>(src: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    match src.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_round_trip() {
        let mut data = Vec::new();
        data.extend_from_slice(b"PG");
        data.extend_from_slice(&90_000u32.to_be_bytes()); // pts = 1s
        data.extend_from_slice(&0u32.to_be_bytes()); // dts
        data.push(SEG_PRESENTATION);
        data.extend_from_slice(&4u16.to_be_bytes());
        data.extend_from_slice(&[1, 2, 3, 4]);

        let mut cursor = Cursor::new(&data);
        let header = read_header(&mut cursor).unwrap().unwrap();
        assert_eq!(header.kind, SEG_PRESENTATION);
        assert_eq!(header.size, 4);
        assert_eq!(header.pts_time(), Duration::from_secs(1));

        let payload = read_payload(&mut cursor, header.size).unwrap().unwrap();
        assert_eq!(payload, vec![1, 2, 3, 4]);
    }

    #[test]
    fn eof_at_boundary() {
        let mut cursor = Cursor::new(&[][..]);
        assert!(read_header(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn bad_magic_stops() {
        let data = [b'X', b'Y', 0, 0, 0, 0, 0, 0, 0, 0, 0x16, 0, 0];
        let mut cursor = Cursor::new(&data[..]);
        assert!(read_header(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn truncated_payload_is_none() {
        let mut data = Vec::new();
        data.extend_from_slice(b"PG");
        data.extend_from_slice(&[0u8; 8]);
        data.push(SEG_OBJECT);
        data.extend_from_slice(&100u16.to_be_bytes());
        data.extend_from_slice(&[0u8; 10]); // only 10 of 100 bytes

        let mut cursor = Cursor::new(&data);
        let header = read_header(&mut cursor).unwrap().unwrap();
        assert!(read_payload(&mut cursor, header.size).unwrap().is_none());
    }

    #[test]
    fn tick_conversion() {
        assert_eq!(ticks_to_duration(90_000), Duration::from_secs(1));
        assert_eq!(ticks_to_duration(45_000), Duration::from_millis(500));
    }
}
