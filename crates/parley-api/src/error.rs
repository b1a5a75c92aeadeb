use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Thread {0} is busy with another message")]
    Busy(String),

    #[error("Persistence error: {0}")]
    Persist(#[from] parley_persist::PersistError),

    #[error("Chat error: {0}")]
    Chat(#[from] parley_chat::ChatError),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::ThreadNotFound(_) | ApiError::FileNotFound(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Busy(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Persist(ref e) => {
                tracing::error!("Persistence error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            ApiError::Chat(ref e) => {
                tracing::error!("Chat error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Processing error".to_string())
            }
            ApiError::Internal => {
                tracing::error!("Internal error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
