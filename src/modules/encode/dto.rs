use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadAccepted {
    pub job_id: Uuid,
    pub video_id: String,
    /// Becomes readable once the job has finished.
    pub master_playlist: String,
}
