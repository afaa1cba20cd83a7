use std::path::{Path, PathBuf};

use super::model::RenditionSpec;

pub const MASTER_PLAYLIST: &str = "master.m3u8";

pub fn render_master_playlist(renditions: &[RenditionSpec]) -> String {
    let mut playlist = String::from("#EXTM3U\n");
    for spec in renditions {
        playlist.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{}\n{}\n",
            spec.bandwidth,
            spec.width,
            spec.height,
            spec.playlist_name()
        ));
    }
    playlist
}

/// Writes `master.m3u8` into the job's output directory.
pub async fn write_master_playlist(
    output_dir: &Path,
    renditions: &[RenditionSpec],
) -> std::io::Result<PathBuf> {
    let path = output_dir.join(MASTER_PLAYLIST);
    tokio::fs::write(&path, render_master_playlist(renditions)).await?;
    Ok(path)
}
