//! Per-table query modules.

pub mod iframe_playlists;
pub mod trickplay_infos;
