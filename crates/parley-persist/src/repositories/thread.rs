use std::sync::Arc;

use parley_types::{Record, Thread};
use serde_json::json;

use super::decode;
use crate::backend::{RecordBackend, Sort};
use crate::error::Result;

#[derive(Clone)]
pub struct ThreadRepository {
    backend: Arc<dyn RecordBackend>,
}

impl ThreadRepository {
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self { backend }
    }

    /// Create a thread for a slug; the title stays empty until generated
    pub async fn create_thread(&self, friendly_id: &str) -> Result<Thread> {
        let fields = json!({ "friendlyId": friendly_id, "title": "" });
        let value = self.backend.create(Thread::COLLECTION, fields, Vec::new()).await?;
        decode(value)
    }

    pub async fn update_title(&self, thread_id: &str, title: &str) -> Result<Thread> {
        let value = self
            .backend
            .update(Thread::COLLECTION, thread_id, json!({ "title": title }))
            .await?;
        decode(value)
    }

    /// All threads, newest first; rows that do not validate are skipped
    pub async fn list_threads(&self) -> Result<Vec<Thread>> {
        let rows = self.backend.list(Thread::COLLECTION, &Sort::newest_first()).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match decode::<Thread>(row) {
                Ok(thread) => Some(thread),
                Err(e) => {
                    tracing::warn!("Skipping thread row: {}", e);
                    None
                }
            })
            .collect())
    }

    pub async fn find_by_friendly_id(&self, friendly_id: &str) -> Result<Option<Thread>> {
        let threads = self.list_threads().await?;
        Ok(threads.into_iter().find(|t| t.friendly_id == friendly_id))
    }
}
