//! Trickplay tile-set metadata operations.

use chrono::Utc;
use rusqlite::Connection;

use fw_core::{Error, Result, VideoId};

use crate::models::TrickplayInfo;

const COLS: &str = "item_id, width, tile_width, tile_height, interval_ms, \
                    thumbnail_count, height, bandwidth, created_at";

/// Insert or replace the tile-set row for `(item, width)`.
pub fn upsert(conn: &Connection, info: &TrickplayInfo) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        &format!(
            "INSERT INTO trickplay_infos ({COLS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(item_id, width) DO UPDATE SET
                 tile_width = excluded.tile_width,
                 tile_height = excluded.tile_height,
                 interval_ms = excluded.interval_ms,
                 thumbnail_count = excluded.thumbnail_count,
                 height = excluded.height,
                 bandwidth = excluded.bandwidth,
                 created_at = excluded.created_at"
        ),
        rusqlite::params![
            info.item_id.to_string(),
            info.width,
            info.tile_width,
            info.tile_height,
            info.interval_ms,
            info.thumbnail_count,
            info.height,
            info.bandwidth,
            now,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Get the tile-set row for `(item, width)`.
pub fn get(conn: &Connection, item_id: VideoId, width: u32) -> Result<Option<TrickplayInfo>> {
    let q = format!("SELECT {COLS} FROM trickplay_infos WHERE item_id = ?1 AND width = ?2");
    let result = conn.query_row(
        &q,
        rusqlite::params![item_id.to_string(), width],
        TrickplayInfo::from_row,
    );
    match result {
        Ok(info) => Ok(Some(info)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// All tile-set rows for one item, ordered by width.
pub fn list_for_item(conn: &Connection, item_id: VideoId) -> Result<Vec<TrickplayInfo>> {
    let q = format!("SELECT {COLS} FROM trickplay_infos WHERE item_id = ?1 ORDER BY width");
    let mut stmt = conn
        .prepare(&q)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([item_id.to_string()], TrickplayInfo::from_row)
        .map_err(|e| Error::database(e.to_string()))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}

/// Delete every tile-set row for an item. Returns the number removed.
pub fn delete_for_item(conn: &Connection, item_id: VideoId) -> Result<usize> {
    conn.execute(
        "DELETE FROM trickplay_infos WHERE item_id = ?1",
        [item_id.to_string()],
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Delete the tile-set row for one `(item, width)` pair.
pub fn delete_width(conn: &Connection, item_id: VideoId, width: u32) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM trickplay_infos WHERE item_id = ?1 AND width = ?2",
            rusqlite::params![item_id.to_string(), width],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Page through all rows, ordered by item id then width.
pub fn list(conn: &Connection, limit: u32, offset: u32) -> Result<Vec<TrickplayInfo>> {
    let q = format!(
        "SELECT {COLS} FROM trickplay_infos ORDER BY item_id, width LIMIT ?1 OFFSET ?2"
    );
    let mut stmt = conn
        .prepare(&q)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params![limit, offset], TrickplayInfo::from_row)
        .map_err(|e| Error::database(e.to_string()))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;

    fn sample(item_id: VideoId, width: u32) -> TrickplayInfo {
        TrickplayInfo {
            item_id,
            width,
            tile_width: 10,
            tile_height: 10,
            interval_ms: 10_000,
            thumbnail_count: 250,
            height: 180,
            bandwidth: 256_000,
            created_at: String::new(),
        }
    }

    #[test]
    fn upsert_and_get() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let id = VideoId::new();

        upsert(&conn, &sample(id, 320)).unwrap();
        let info = get(&conn, id, 320).unwrap().unwrap();
        assert_eq!(info.thumbnail_count, 250);
        assert_eq!(info.width, 320);

        assert!(get(&conn, id, 640).unwrap().is_none());
    }

    #[test]
    fn upsert_replaces() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let id = VideoId::new();

        upsert(&conn, &sample(id, 320)).unwrap();
        let mut updated = sample(id, 320);
        updated.thumbnail_count = 99;
        upsert(&conn, &updated).unwrap();

        let info = get(&conn, id, 320).unwrap().unwrap();
        assert_eq!(info.thumbnail_count, 99);
        assert_eq!(list_for_item(&conn, id).unwrap().len(), 1);
    }

    #[test]
    fn list_for_item_is_width_ordered() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let id = VideoId::new();

        upsert(&conn, &sample(id, 640)).unwrap();
        upsert(&conn, &sample(id, 320)).unwrap();
        upsert(&conn, &sample(VideoId::new(), 320)).unwrap();

        let rows = list_for_item(&conn, id).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].width, 320);
        assert_eq!(rows[1].width, 640);
    }

    #[test]
    fn delete_operations() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let id = VideoId::new();

        upsert(&conn, &sample(id, 320)).unwrap();
        upsert(&conn, &sample(id, 640)).unwrap();

        assert!(delete_width(&conn, id, 320).unwrap());
        assert!(!delete_width(&conn, id, 320).unwrap());
        assert_eq!(delete_for_item(&conn, id).unwrap(), 1);
        assert!(list_for_item(&conn, id).unwrap().is_empty());
    }

    #[test]
    fn paging() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        for _ in 0..5 {
            upsert(&conn, &sample(VideoId::new(), 320)).unwrap();
        }

        let first = list(&conn, 3, 0).unwrap();
        let second = list(&conn, 3, 3).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 2);
    }
}
