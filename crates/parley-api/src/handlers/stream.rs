use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;

use parley_types::{ChatState, FileContent};
use crate::{error::{ApiError, ApiResult}, state::AppState};

/// Media types the provider accepts as attachments
pub const ACCEPTED_MEDIA_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "application/pdf"];

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
    #[serde(default)]
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub media_type: String,
    /// Base64 file content
    pub data: String,
}

fn decode_files(files: Vec<UploadedFile>) -> ApiResult<Vec<FileContent>> {
    files
        .into_iter()
        .map(|file| {
            let media_type = file.media_type.trim().to_ascii_lowercase();
            if !ACCEPTED_MEDIA_TYPES.contains(&media_type.as_str()) {
                return Err(ApiError::BadRequest(format!(
                    "Unsupported media type {} for {}",
                    file.media_type, file.name
                )));
            }
            let bytes = STANDARD
                .decode(file.data.as_bytes())
                .map_err(|e| ApiError::BadRequest(format!("Invalid base64 in {}: {}", file.name, e)))?;
            Ok(FileContent::new(file.name, media_type, bytes))
        })
        .collect()
}

fn state_event(state: &ChatState, error: Option<String>) -> Event {
    let payload = json!({
        "mode": state.mode,
        "streamed_text": state.streamed_text,
        "error": error,
    });
    Event::default()
        .event("state")
        .json_data(payload)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

/// Submit a message to a thread and stream the session state using
/// Server-Sent Events
///
/// The thread is created on first use. The stream ends with a `ready` or
/// `error` state; the submission itself keeps running if the client goes
/// away.
pub async fn send_message_stream(
    State(state): State<Arc<AppState>>,
    Path(friendly_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if req.text.trim().is_empty() && req.files.is_empty() {
        return Err(ApiError::BadRequest("Message text or files required".to_string()));
    }
    let files = decode_files(req.files)?;

    let (session, guard) = state.claim_session(&friendly_id).await?;

    // Only states produced by this submission are streamed
    let mut updates = session.subscribe();
    updates.borrow_and_update();

    tracing::info!(friendly_id = %friendly_id, files = files.len(), "Submitting message");

    let text = req.text;
    let slug = friendly_id.clone();
    let app = Arc::clone(&state);
    let mut task = Some(tokio::spawn(async move {
        let result = session.submit(&slug, &text, files).await;
        drop(guard);
        app.release_session(&slug).await;
        result
    }));

    let stream = async_stream::stream! {
        while updates.changed().await.is_ok() {
            let current = updates.borrow_and_update().clone();
            if !current.mode.is_terminal() {
                yield Ok(state_event(&current, None));
                continue;
            }

            // Wait for the thread to be released before closing the stream
            let error = match task.take() {
                Some(handle) => match handle.await {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(e.to_string()),
                    Err(e) => Some(format!("submission task failed: {e}")),
                },
                None => None,
            };
            yield Ok(state_event(&current, error));
            break;
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
