use std::path::Path;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info, warn};

use super::dto::UploadAccepted;
use super::master::MASTER_PLAYLIST;
use super::model::EncodeJob;
use crate::common::response::{ApiResponse, ApiSuccess, AppError};
use crate::common::upload::{UploadError, save_field_to_disk, video_id_from_filename};
use crate::state::AppState;

/// Upload a source video
/// Saves the file locally and queues it for packaging; returns before encoding starts.
#[utoipa::path(
    post,
    path = "/video/upload",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Accepted for encoding", body = ApiResponse<UploadAccepted>),
        (status = 413, description = "Video larger than the configured limit"),
        (status = 422, description = "Missing or invalid video field"),
        (status = 503, description = "Could not store the upload or queue is closed")
    ),
    tag = "Encode"
)]
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| match UploadError::from(e) {
            UploadError::TooLarge => too_large(state.config.max_upload_bytes),
            other => AppError::ClientInput(format!("Malformed multipart body: {}", other)),
        })?
    {
        if field.name() != Some("video") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::ClientInput("The video field must be a file".to_string()))?;
        let video_id = video_id_from_filename(&file_name).ok_or_else(|| {
            AppError::ClientInput(
                "Invalid video file name, use letters, digits, '-', '_' or '.'".to_string(),
            )
        })?;
        let extension = Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");

        let job = EncodeJob::new(&video_id, extension, &state.config);
        info!(video_id = %video_id, job_id = %job.job_id, file_name = %file_name, "Receiving upload");

        save_field_to_disk(field, &job.input_path, state.config.max_upload_bytes)
            .await
            .map_err(|e| match e {
                UploadError::TooLarge => too_large(state.config.max_upload_bytes),
                UploadError::Stream(e) => {
                    warn!(video_id = %video_id, "Upload stream failed: {}", e);
                    AppError::ClientInput(format!("Upload interrupted: {}", e))
                }
                UploadError::Disk(e) => {
                    error!(video_id = %video_id, "Saving upload failed: {:#}", e);
                    AppError::Unavailable(e.to_string())
                }
            })?;

        let accepted = UploadAccepted {
            job_id: job.job_id,
            video_id: video_id.clone(),
            master_playlist: format!(
                "{}/videos/{}/playlists/{}",
                state.config.api_base_url, video_id, MASTER_PLAYLIST
            ),
        };

        let input_path = job.input_path.clone();
        let submitted = match state.config.submit_timeout {
            Some(timeout) => state.dispatcher.submit_within(job, timeout).await,
            None => state.dispatcher.submit(job).await,
        };
        if let Err(e) = submitted {
            warn!(video_id = %video_id, "Encode job rejected: {}", e);
            let _ = tokio::fs::remove_file(&input_path).await;
            return Err(AppError::Unavailable(e.to_string()));
        }

        return Ok(ApiSuccess(
            ApiResponse::success(accepted, "Video accepted for encoding"),
            StatusCode::ACCEPTED,
        ));
    }

    Err(AppError::ClientInput(
        "No video field found in multipart request".to_string(),
    ))
}

fn too_large(max_upload_bytes: usize) -> AppError {
    AppError::PayloadTooLarge(format!(
        "Video exceeds the upload limit of {} bytes",
        max_upload_bytes
    ))
}
