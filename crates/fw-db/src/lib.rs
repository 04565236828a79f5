//! fw-db: durable artifact metadata store.
//!
//! Two tables back the artifact pipeline: `trickplay_infos` keyed by
//! `(item_id, width)` and `iframe_playlist_infos` keyed by `item_id`.
//! Everything is synchronous rusqlite behind an r2d2 pool; callers on the
//! async side go through `spawn_blocking`.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

pub use models::{IFramePlaylistInfo, TrickplayInfo};
pub use pool::{get_conn, init_memory_pool, init_pool, DbPool, PooledConnection};
