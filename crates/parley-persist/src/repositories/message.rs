use std::sync::Arc;

use parley_types::{MessageRole, Record, TextMessage};
use serde_json::json;

use super::decode;
use crate::backend::RecordBackend;
use crate::error::Result;

#[derive(Clone)]
pub struct TextMessageRepository {
    backend: Arc<dyn RecordBackend>,
}

impl TextMessageRepository {
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self { backend }
    }

    pub async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content_text: &str,
    ) -> Result<TextMessage> {
        let fields = json!({
            "threadId": thread_id,
            "role": role.as_str(),
            "contentText": content_text,
        });
        let value = self
            .backend
            .create(TextMessage::COLLECTION, fields, Vec::new())
            .await?;
        decode(value)
    }
}
