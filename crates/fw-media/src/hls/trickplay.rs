//! Trickplay image playlist (M3U8) generation.
//!
//! Players that understand `#EXT-X-IMAGES-ONLY` scrub through a VOD
//! playlist of tiled JPEGs, each tile holding a `layout` grid of
//! interval-spaced thumbnails.

use std::fmt::Write;

/// Inputs for one trickplay playlist.
#[derive(Debug, Clone)]
pub struct TrickplayManifestParams {
    /// Thumbnail width in pixels.
    pub width: u32,
    /// Thumbnail height in pixels.
    pub height: u32,
    /// Thumbnails per tile row.
    pub tile_width: u32,
    /// Thumbnail rows per tile.
    pub tile_height: u32,
    /// Total thumbnail count across all tiles.
    pub thumbnail_count: u32,
    /// Milliseconds between thumbnails.
    pub interval_ms: u64,
    /// Dash-free media source id appended to tile URLs.
    pub media_source_id: String,
    /// Access token appended to tile URLs.
    pub api_key: String,
}

/// Generate the trickplay image playlist.
///
/// One `#EXTINF` + `#EXT-X-TILES` + URL triple per tile; the final tile
/// covers only the remaining thumbnails.
pub fn trickplay_manifest(p: &TrickplayManifestParams) -> String {
    let per_tile = p.tile_width * p.tile_height;
    let tile_count = p.thumbnail_count.div_ceil(per_tile);
    let interval_s = p.interval_ms as f64 / 1000.0;

    let mut out = String::new();
    writeln!(out, "#EXTM3U").unwrap();
    writeln!(out, "#EXT-X-TARGETDURATION:{tile_count}").unwrap();
    writeln!(out, "#EXT-X-VERSION:7").unwrap();
    writeln!(out, "#EXT-X-MEDIA-SEQUENCE:1").unwrap();
    writeln!(out, "#EXT-X-PLAYLIST-TYPE:VOD").unwrap();
    writeln!(out, "#EXT-X-IMAGES-ONLY").unwrap();
    writeln!(out).unwrap();

    for tile in 0..tile_count {
        let thumbs_in_tile = if tile < tile_count - 1 {
            per_tile
        } else {
            p.thumbnail_count - tile * per_tile
        };
        writeln!(out, "#EXTINF:{},", thumbs_in_tile as f64 * interval_s).unwrap();
        writeln!(
            out,
            "#EXT-X-TILES:RESOLUTION={}x{},LAYOUT={}x{},DURATION={}",
            p.width, p.height, p.tile_width, p.tile_height, interval_s
        )
        .unwrap();
        writeln!(
            out,
            "{tile}.jpg?MediaSourceId={}&ApiKey={}",
            p.media_source_id, p.api_key
        )
        .unwrap();
    }

    writeln!(out, "#EXT-X-ENDLIST").unwrap();
    out
}
