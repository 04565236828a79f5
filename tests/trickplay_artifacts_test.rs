//! Trickplay artifact behavior: manifest shape, adoption of existing
//! tiles, and directory pruning.

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use framewright::state::AppState;
use framewright::trickplay;
use fw_core::config::Config;
use fw_core::{SourceFlags, SpatialFormat, VideoId, VideoRef};
use fw_db::models::TrickplayInfo;
use fw_db::queries::trickplay_infos;

fn test_state(data_dir: &Path) -> AppState {
    let mut config = Config::default();
    config.data_dir = data_dir.to_path_buf();
    AppState::with_pool(config, fw_db::init_memory_pool().unwrap())
}

fn test_video(dir: &Path) -> VideoRef {
    VideoRef {
        id: VideoId::new(),
        path: dir.join("film.mkv"),
        spatial_format: SpatialFormat::None,
        width: 1920,
        height: 1080,
        duration: Duration::from_secs(3600),
        flags: SourceFlags::default(),
    }
}

fn seed_row(state: &AppState, video: &VideoRef, thumbnail_count: u32) {
    let info = TrickplayInfo {
        item_id: video.id,
        width: 320,
        tile_width: 10,
        tile_height: 10,
        interval_ms: 10_000,
        thumbnail_count,
        height: 180,
        bandwidth: 256_000,
        created_at: String::new(),
    };
    let conn = fw_db::get_conn(&state.db).unwrap();
    trickplay_infos::upsert(&conn, &info).unwrap();
}

#[test]
fn manifest_matches_hls_image_playlist_shape() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());
    let video = test_video(tmp.path());
    seed_row(&state, &video, 250);

    let manifest = trickplay::hls_manifest(&state, video.id, 320, "token")
        .unwrap()
        .expect("row exists");

    assert!(manifest.starts_with("#EXTM3U\n"));
    assert!(manifest.contains("#EXT-X-TARGETDURATION:3\n"));
    assert!(manifest.contains("#EXT-X-VERSION:7\n"));
    assert!(manifest.contains("#EXT-X-MEDIA-SEQUENCE:1\n"));
    assert!(manifest.contains("#EXT-X-PLAYLIST-TYPE:VOD\n"));
    assert!(manifest.contains("#EXT-X-IMAGES-ONLY\n"));

    // 250 thumbnails on a 10x10 grid: three tiles, the last covering the
    // remaining 50 thumbnails at 10s each.
    assert_eq!(manifest.matches("#EXTINF:").count(), 3);
    assert!(manifest.contains("#EXTINF:500,"));
    assert!(manifest
        .contains("#EXT-X-TILES:RESOLUTION=320x180,LAYOUT=10x10,DURATION=10"));

    let expected_url = format!(
        "2.jpg?MediaSourceId={}&ApiKey=token",
        video.id.simple_hex()
    );
    assert!(manifest.contains(&expected_url));
    assert!(manifest.trim_end().ends_with("#EXT-X-ENDLIST"));

    // The media source id is the dash-free 32-hex form.
    assert!(!video.id.simple_hex().contains('-'));
    assert_eq!(video.id.simple_hex().len(), 32);
}

#[test]
fn manifest_is_none_without_row() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());
    assert!(trickplay::hls_manifest(&state, VideoId::new(), 320, "k")
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn existing_tiles_are_adopted() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());
    let video = test_video(tmp.path());

    // Two tiles on disk from a previous installation, no row yet.
    let dir = state
        .paths
        .artifact_root(&video, false)
        .join("320 - 10x10");
    std::fs::create_dir_all(&dir).unwrap();
    for (name, height) in [("0.jpg", 1800u32), ("1.jpg", 900u32)] {
        let img = image::RgbImage::from_pixel(3200, height, image::Rgb([40, 40, 40]));
        img.save(dir.join(name)).unwrap();
    }

    trickplay::build_width(&state, &video, 320, false, &CancellationToken::new())
        .await
        .unwrap();

    let conn = fw_db::get_conn(&state.db).unwrap();
    let info = trickplay_infos::get(&conn, video.id, 320).unwrap().unwrap();
    // File count stands in for the thumbnail count on the import path.
    assert_eq!(info.thumbnail_count, 2);
    // Height is the tallest tile divided by the row count.
    assert_eq!(info.height, 180);
    assert!(info.bandwidth > 0);

    // The adopted files were not touched.
    assert!(dir.join("0.jpg").exists());
    assert!(dir.join("1.jpg").exists());
}

#[tokio::test]
async fn ineligible_video_is_skipped_without_rows() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());
    let mut video = test_video(tmp.path());
    video.flags.placeholder = true;

    trickplay::build_width(&state, &video, 320, false, &CancellationToken::new())
        .await
        .unwrap();

    let conn = fw_db::get_conn(&state.db).unwrap();
    assert!(trickplay_infos::list_for_item(&conn, video.id)
        .unwrap()
        .is_empty());
}

#[test]
fn prune_leaves_only_accounted_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let state = test_state(tmp.path());
    let video = test_video(tmp.path());
    seed_row(&state, &video, 100);

    let root = state.paths.artifact_root(&video, false);
    let keep = root.join("320 - 10x10");
    let stale_width = root.join("640 - 10x10");
    let stale_layout = root.join("320 - 4x4");
    let iframe = root.join("iframe");
    for dir in [&keep, &stale_width, &stale_layout, &iframe] {
        std::fs::create_dir_all(dir).unwrap();
    }

    trickplay::prune_directories(&state, &video).unwrap();

    assert!(keep.exists());
    assert!(iframe.exists());
    assert!(!stale_width.exists());
    assert!(!stale_layout.exists());
}
