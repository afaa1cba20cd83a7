use std::path::Path;

use anyhow::Context;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use futures_util::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload exceeds the size limit")]
    TooLarge,

    #[error("upload stream interrupted: {0}")]
    Stream(MultipartError),

    #[error(transparent)]
    Disk(#[from] anyhow::Error),
}

impl From<MultipartError> for UploadError {
    fn from(e: MultipartError) -> Self {
        // The request body limit layer surfaces through multer as a 413.
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::TooLarge
        } else {
            UploadError::Stream(e)
        }
    }
}

/// Streams a multipart field to `dest` chunk by chunk, refusing to write
/// more than `max_bytes`. A partially written file is removed on failure.
pub async fn save_field_to_disk(
    mut field: Field<'_>,
    dest: &Path,
    max_bytes: usize,
) -> Result<u64, UploadError> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create {}", parent.display()))?;
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("create {}", dest.display()))?;
    let mut written: u64 = 0;

    while let Some(chunk) = field.next().await {
        let outcome = match chunk {
            Ok(chunk) if written + chunk.len() as u64 > max_bytes as u64 => {
                Err(UploadError::TooLarge)
            }
            Ok(chunk) => {
                written += chunk.len() as u64;
                file.write_all(&chunk)
                    .await
                    .context("write chunk")
                    .map_err(UploadError::from)
            }
            Err(e) => Err(UploadError::from(e)),
        };

        if let Err(e) = outcome {
            error!(path = %dest.display(), max_bytes, "Upload aborted: {}", e);
            drop(file);
            let _ = tokio::fs::remove_file(dest).await;
            return Err(e);
        }
    }

    file.flush().await.context("flush upload")?;
    info!(path = %dest.display(), bytes = written, "Upload saved");
    Ok(written)
}

/// `sample.mp4` → `sample`. Ids end up in storage keys and URLs, so only a
/// conservative character set is accepted.
pub fn video_id_from_filename(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next()?;
    let stem = Path::new(base).file_stem()?.to_str()?;
    is_safe_name(stem).then(|| stem.to_string())
}

/// Single path segment made of ASCII alphanumerics, `-`, `_` and `.`,
/// never `.` or `..`.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name.len() <= 200
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
