use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use parley_types::{ConversationTurn, MediaAttachment, MessageRole, Thread};
use crate::{error::{ApiError, ApiResult}, state::AppState};

#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub id: String,
    pub friendly_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Thread> for ThreadResponse {
    fn from(thread: Thread) -> Self {
        Self {
            id: thread.id,
            friendly_id: thread.friendly_id,
            title: thread.title,
            created_at: thread.created,
            updated_at: thread.updated,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListThreadsResponse {
    pub threads: Vec<ThreadResponse>,
}

#[derive(Debug, Serialize)]
pub struct AttachmentResponse {
    pub id: String,
    pub file: String,
    /// Present once the media cache holds the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
}

impl From<MediaAttachment> for AttachmentResponse {
    fn from(attachment: MediaAttachment) -> Self {
        let (media_type, size) = match attachment.file {
            Some(file) => (Some(file.media_type.clone()), Some(file.len())),
            None => (None, None),
        };
        Self {
            id: attachment.record.id,
            file: attachment.record.file,
            media_type,
            size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub id: String,
    pub role: MessageRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub attachments: Vec<AttachmentResponse>,
}

impl From<ConversationTurn> for TurnResponse {
    fn from(turn: ConversationTurn) -> Self {
        Self {
            id: turn.text_message.id,
            role: turn.text_message.role,
            text: turn.text_message.content_text,
            created_at: turn.text_message.created,
            attachments: turn.media_messages.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TurnsResponse {
    pub friendly_id: String,
    pub title: String,
    pub turns: Vec<TurnResponse>,
}

/// Threads currently mirrored from the store, newest first
pub async fn list_threads(State(state): State<Arc<AppState>>) -> Json<ListThreadsResponse> {
    let mut threads: Vec<Thread> = state.chat.thread_store().snapshot().as_ref().clone();
    threads.sort_by(|a, b| b.created.cmp(&a.created));

    Json(ListThreadsResponse {
        threads: threads.into_iter().map(Into::into).collect(),
    })
}

/// Conversation of one thread in chronological order
pub async fn get_turns(
    State(state): State<Arc<AppState>>,
    Path(friendly_id): Path<String>,
) -> ApiResult<Json<TurnsResponse>> {
    let thread = state
        .chat
        .thread_store()
        .find_by_friendly_id(&friendly_id)
        .ok_or_else(|| ApiError::ThreadNotFound(friendly_id.clone()))?;

    let turns = state
        .chat
        .turns_for(&friendly_id)
        .await
        .unwrap_or_default();

    Ok(Json(TurnsResponse {
        friendly_id,
        title: thread.title,
        turns: turns.into_iter().map(Into::into).collect(),
    }))
}
