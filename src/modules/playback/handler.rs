use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use super::manifest::HLS_CONTENT_TYPE;
use crate::common::response::AppError;
use crate::state::AppState;

/// Get a playlist
/// Segment lines are rewritten to short-lived presigned storage URLs.
#[utoipa::path(
    get,
    path = "/videos/{video_id}/playlists/{playlist}",
    params(
        ("video_id" = String, Path, description = "Video ID"),
        ("playlist" = String, Path, description = "Playlist file, e.g. master.m3u8 or 360p.m3u8")
    ),
    responses(
        (status = 200, description = "HLS playlist", content_type = "application/vnd.apple.mpegurl", body = String),
        (status = 404, description = "Video or playlist not found"),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Playback"
)]
pub async fn get_playlist(
    State(state): State<AppState>,
    Path((video_id, playlist)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let body = state.playback.manifest(&video_id, &playlist).await?;
    Ok(([(header::CONTENT_TYPE, HLS_CONTENT_TYPE)], body))
}

/// Get a decryption key
/// The only route through which raw key bytes leave storage.
#[utoipa::path(
    get,
    path = "/videos/{video_id}/keys/{key}",
    params(
        ("video_id" = String, Path, description = "Video ID"),
        ("key" = String, Path, description = "Key file, e.g. enc_360p.key")
    ),
    responses(
        (status = 200, description = "Raw AES-128 key", content_type = "application/octet-stream", body = Vec<u8>),
        (status = 404, description = "Key not found"),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Playback"
)]
pub async fn get_key(
    State(state): State<AppState>,
    Path((video_id, key)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    // TODO: authenticate the caller before releasing key material.
    let data = state.playback.key(&video_id, &key).await?;
    Ok((
        [
            (header::CONTENT_TYPE, mime::APPLICATION_OCTET_STREAM.to_string()),
            (header::CONTENT_LENGTH, data.len().to_string()),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        data,
    ))
}
