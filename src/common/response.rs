use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T, message: &str) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            status: "error".to_string(),
            message: message.to_string(),
            data: None,
        }
    }
}

pub struct ApiSuccess<T>(pub T, pub StatusCode);

impl<T> IntoResponse for ApiSuccess<ApiResponse<T>>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        let (response, status) = (self.0, self.1);
        (status, Json(response)).into_response()
    }
}

pub struct ApiError(pub String, pub StatusCode);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (message, status) = (self.0, self.1);
        let response = ApiResponse::<()>::error(&message);
        (status, Json(response)).into_response()
    }
}

const GENERIC_FAILURE: &str = "Something went wrong, please try again later";

/// Request-path failures. Only 4xx messages reach
/// the caller; everything else is logged where it happens.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    ClientInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::ClientInput(message) => {
                ApiError(message, StatusCode::UNPROCESSABLE_ENTITY).into_response()
            }
            AppError::NotFound(message) => ApiError(message, StatusCode::NOT_FOUND).into_response(),
            AppError::PayloadTooLarge(message) => {
                ApiError(message, StatusCode::PAYLOAD_TOO_LARGE).into_response()
            }
            AppError::Unavailable(_) => {
                ApiError(GENERIC_FAILURE.to_string(), StatusCode::SERVICE_UNAVAILABLE)
                    .into_response()
            }
            AppError::Internal(_) => {
                ApiError(GENERIC_FAILURE.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
                    .into_response()
            }
        }
    }
}
