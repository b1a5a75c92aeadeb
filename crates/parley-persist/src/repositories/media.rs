use std::sync::Arc;

use bytes::Bytes;
use parley_types::{MediaMessage, Record};
use serde_json::json;

use super::decode;
use crate::backend::{FileUpload, RecordBackend};
use crate::error::Result;

const FILE_FIELD: &str = "file";

#[derive(Clone)]
pub struct MediaMessageRepository {
    backend: Arc<dyn RecordBackend>,
}

impl MediaMessageRepository {
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self { backend }
    }

    /// Upload a file as an attachment of `text_message_id`
    pub async fn create_media(
        &self,
        thread_id: &str,
        text_message_id: &str,
        file_name: &str,
        bytes: Bytes,
    ) -> Result<MediaMessage> {
        let fields = json!({
            "threadId": thread_id,
            "aiTextMessageId": text_message_id,
        });
        let upload = FileUpload::new(FILE_FIELD, file_name, bytes);
        let value = self
            .backend
            .create(MediaMessage::COLLECTION, fields, vec![upload])
            .await?;
        decode(value)
    }
}
