use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: HashMap<String, String>,
}

/// Health of the API and the state of each mirrored collection
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let chat = &state.chat;
    let collections = [
        ("threads", chat.thread_store().state().is_ready()),
        ("text_messages", chat.text_store().state().is_ready()),
        ("media_messages", chat.media_store().state().is_ready()),
    ];
    let healthy = collections.iter().all(|(_, ready)| *ready);

    let mut services: HashMap<String, String> = collections
        .iter()
        .map(|(name, ready)| (name.to_string(), describe(*ready)))
        .collect();
    services.insert("cached_files".to_string(), chat.cache().len().await.to_string());

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services,
    })
}

fn describe(ready: bool) -> String {
    let status = if ready { "synced" } else { "disconnected" };
    status.to_string()
}
