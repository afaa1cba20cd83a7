use axum::Router;
use axum::routing::get;

use crate::state::AppState;

pub mod handler;
pub mod manifest;
pub mod repository;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/videos/{video_id}/playlists/{playlist}", get(handler::get_playlist))
        .route("/videos/{video_id}/keys/{key}", get(handler::get_key))
}
