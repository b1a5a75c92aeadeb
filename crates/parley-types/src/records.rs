use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const THREADS_COLLECTION: &str = "aiThreads";
pub const TEXT_MESSAGES_COLLECTION: &str = "aiTextMessages";
pub const MEDIA_MESSAGES_COLLECTION: &str = "aiMediaMessages";

/// A record owned by the remote store and mirrored locally
///
/// `parse` is the shape check applied to every row of a snapshot and every
/// change event; a payload that fails it is never inserted.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name of the backing collection
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn created(&self) -> DateTime<Utc>;

    fn parse(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Records that belong to a thread
pub trait ThreadScoped: Record {
    fn thread_id(&self) -> &str;
}

/// Conversation thread, looked up by its caller-supplied slug
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    pub id: String,
    pub friendly_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(with = "crate::timestamp")]
    pub created: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub updated: DateTime<Utc>,
}

impl Thread {
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

impl Record for Thread {
    const COLLECTION: &'static str = THREADS_COLLECTION;

    fn id(&self) -> &str {
        &self.id
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Text half of a turn; immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    pub id: String,
    pub thread_id: String,
    pub role: MessageRole,
    pub content_text: String,
    #[serde(with = "crate::timestamp")]
    pub created: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub updated: DateTime<Utc>,
}

impl Record for TextMessage {
    const COLLECTION: &'static str = TEXT_MESSAGES_COLLECTION;

    fn id(&self) -> &str {
        &self.id
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

impl ThreadScoped for TextMessage {
    fn thread_id(&self) -> &str {
        &self.thread_id
    }
}

/// File attachment of a turn; `file` is the store's file reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    pub id: String,
    pub thread_id: String,
    pub ai_text_message_id: String,
    pub file: String,
    #[serde(with = "crate::timestamp")]
    pub created: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub updated: DateTime<Utc>,
}

impl MediaMessage {
    /// Collection this record's file is served from
    pub fn collection(&self) -> &str {
        self.collection_name.as_deref().unwrap_or(Self::COLLECTION)
    }
}

impl Record for MediaMessage {
    const COLLECTION: &'static str = MEDIA_MESSAGES_COLLECTION;

    fn id(&self) -> &str {
        &self.id
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

impl ThreadScoped for MediaMessage {
    fn thread_id(&self) -> &str {
        &self.thread_id
    }
}
