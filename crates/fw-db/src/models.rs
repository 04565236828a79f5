//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`.

use fw_core::VideoId;
use uuid::Uuid;

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(T::from(uuid))
}

// ---------------------------------------------------------------------------
// TrickplayInfo
// ---------------------------------------------------------------------------

/// One persisted trickplay tile set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrickplayInfo {
    pub item_id: VideoId,
    /// Thumbnail width in pixels; half of the composite key.
    pub width: u32,
    /// Thumbnails per tile row.
    pub tile_width: u32,
    /// Thumbnail rows per tile.
    pub tile_height: u32,
    /// Milliseconds between thumbnails. Never below 1000.
    pub interval_ms: u64,
    /// Total thumbnails across all tiles. Always at least 1.
    pub thumbnail_count: u32,
    /// Height of one thumbnail in pixels, fixed by the first composed tile.
    pub height: u32,
    /// Peak bandwidth in bits per second across tiles.
    pub bandwidth: u64,
    pub created_at: String,
}

impl TrickplayInfo {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            item_id: parse_id(row, 0)?,
            width: row.get(1)?,
            tile_width: row.get(2)?,
            tile_height: row.get(3)?,
            interval_ms: row.get(4)?,
            thumbnail_count: row.get(5)?,
            height: row.get(6)?,
            bandwidth: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    /// Tile count implied by the thumbnail count and grid.
    pub fn tile_count(&self) -> u32 {
        self.thumbnail_count
            .div_ceil(self.tile_width * self.tile_height)
    }

    /// Directory name holding this tile set: `<width> - <tw>x<th>`.
    pub fn directory_name(&self) -> String {
        format!("{} - {}x{}", self.width, self.tile_width, self.tile_height)
    }
}

// ---------------------------------------------------------------------------
// IFramePlaylistInfo
// ---------------------------------------------------------------------------

/// One persisted I-frame playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IFramePlaylistInfo {
    pub item_id: VideoId,
    /// Segment video width in pixels, derived from the 160 px height.
    pub width: u32,
    /// Segment video height; fixed at 160 px.
    pub height: u32,
    pub segment_count: u32,
    /// Peak bandwidth in bits per second across segments.
    pub bandwidth: u64,
    pub created_at: String,
}

impl IFramePlaylistInfo {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            item_id: parse_id(row, 0)?,
            width: row.get(1)?,
            height: row.get(2)?,
            segment_count: row.get(3)?,
            bandwidth: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}
