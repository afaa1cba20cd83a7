use utoipa::OpenApi;

use crate::modules::encode::dto::UploadAccepted;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::encode::handler::upload_video,
        crate::modules::playback::handler::get_playlist,
        crate::modules::playback::handler::get_key,
    ),
    components(schemas(UploadAccepted)),
    tags(
        (name = "Encode", description = "Upload and asynchronous HLS packaging"),
        (name = "Playback", description = "Playlist delivery and key proxy")
    )
)]
pub struct ApiDoc;
