//! I-frame playlist metadata operations.

use chrono::Utc;
use rusqlite::Connection;

use fw_core::{Error, Result, VideoId};

use crate::models::IFramePlaylistInfo;

const COLS: &str = "item_id, width, height, segment_count, bandwidth, created_at";

/// Insert or replace the playlist row for an item.
pub fn upsert(conn: &Connection, info: &IFramePlaylistInfo) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        &format!(
            "INSERT INTO iframe_playlist_infos ({COLS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(item_id) DO UPDATE SET
                 width = excluded.width,
                 height = excluded.height,
                 segment_count = excluded.segment_count,
                 bandwidth = excluded.bandwidth,
                 created_at = excluded.created_at"
        ),
        rusqlite::params![
            info.item_id.to_string(),
            info.width,
            info.height,
            info.segment_count,
            info.bandwidth,
            now,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Get the playlist row for an item.
pub fn get(conn: &Connection, item_id: VideoId) -> Result<Option<IFramePlaylistInfo>> {
    let q = format!("SELECT {COLS} FROM iframe_playlist_infos WHERE item_id = ?1");
    let result = conn.query_row(&q, [item_id.to_string()], IFramePlaylistInfo::from_row);
    match result {
        Ok(info) => Ok(Some(info)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Delete the playlist row for an item.
pub fn delete_for_item(conn: &Connection, item_id: VideoId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM iframe_playlist_infos WHERE item_id = ?1",
            [item_id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Page through all rows, ordered by item id.
pub fn list(conn: &Connection, limit: u32, offset: u32) -> Result<Vec<IFramePlaylistInfo>> {
    let q = format!(
        "SELECT {COLS} FROM iframe_playlist_infos ORDER BY item_id LIMIT ?1 OFFSET ?2"
    );
    let mut stmt = conn
        .prepare(&q)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params![limit, offset], IFramePlaylistInfo::from_row)
        .map_err(|e| Error::database(e.to_string()))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}
