use bytes::Bytes;

use crate::records::{MediaMessage, TextMessage};

/// File bytes plus the metadata needed to hand them to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct FileContent {
    pub name: String,
    pub media_type: String,
    pub bytes: Bytes,
}

impl FileContent {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A media record with its content, if the cache has resolved it yet
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAttachment {
    pub record: MediaMessage,
    pub file: Option<FileContent>,
}

impl MediaAttachment {
    pub fn is_resolved(&self) -> bool {
        self.file.is_some()
    }
}

/// Text message plus its attachments; derived, never stored
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub text_message: TextMessage,
    pub media_messages: Vec<MediaAttachment>,
}
