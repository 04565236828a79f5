//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order. A
//! `schema_migrations` table tracks which versions have been applied.

use rusqlite::Connection;

use fw_core::{Error, Result};

/// V1: initial schema -- artifact metadata tables.
const V1_INITIAL: &str = r#"
-- Trickplay tile sets, one row per (item, output width).
CREATE TABLE trickplay_infos (
    item_id         TEXT    NOT NULL,
    width           INTEGER NOT NULL,
    tile_width      INTEGER NOT NULL,
    tile_height     INTEGER NOT NULL,
    interval_ms     INTEGER NOT NULL,
    thumbnail_count INTEGER NOT NULL,
    height          INTEGER NOT NULL,
    bandwidth       INTEGER NOT NULL,
    created_at      TEXT    NOT NULL,
    PRIMARY KEY (item_id, width)
);

CREATE INDEX idx_trickplay_item ON trickplay_infos(item_id);

-- I-frame playlists, one row per item.
CREATE TABLE iframe_playlist_infos (
    item_id       TEXT    PRIMARY KEY,
    width         INTEGER NOT NULL,
    height        INTEGER NOT NULL,
    segment_count INTEGER NOT NULL,
    bandwidth     INTEGER NOT NULL,
    created_at    TEXT    NOT NULL
);
"#;

/// All migrations in order. Index + 1 is the schema version.
const MIGRATIONS: &[&str] = &[V1_INITIAL];

/// Apply any migrations the database has not seen yet.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )
    .map_err(|e| Error::database(e.to_string()))?;

    let current: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| Error::database(e.to_string()))?;

    for (idx, sql) in MIGRATIONS.iter().enumerate() {
        let version = idx as i64 + 1;
        if version <= current {
            continue;
        }
        conn.execute_batch(sql)
            .map_err(|e| Error::database(format!("migration v{version} failed: {e}")))?;
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![version, chrono::Utc::now().to_rfc3339()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row(
                "SELECT MAX(version) FROM schema_migrations",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, MIGRATIONS.len() as i64);
    }
}
