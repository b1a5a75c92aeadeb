use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use std::sync::Arc;

use parley_media::infer_media_type;
use crate::{error::{ApiError, ApiResult}, state::AppState};

/// Serve an uploaded file so the configured persistence base URL resolves
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path((collection, record_id, file)): Path<(String, String, String)>,
) -> ApiResult<impl IntoResponse> {
    let bytes = state
        .backend
        .file(&collection, &record_id, &file)
        .await
        .ok_or_else(|| ApiError::FileNotFound(file.clone()))?;

    Ok(([(header::CONTENT_TYPE, infer_media_type(&file))], bytes))
}
