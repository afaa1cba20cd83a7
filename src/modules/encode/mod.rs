use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use tower_http::limit::RequestBodyLimitLayer;

use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod master;
pub mod model;
pub mod publish;
pub mod rendition;

/// Room for multipart boundaries and part headers on top of the file itself.
/// The file size proper is enforced while streaming the `video` field.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/video/upload", post(handler::upload_video))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
        ))
}
