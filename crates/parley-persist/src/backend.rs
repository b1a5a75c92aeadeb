use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use parley_types::RecordEvent;
use serde_json::Value;

use crate::error::Result;

/// Live change notifications for one collection
pub type ChangeFeed = Pin<Box<dyn Stream<Item = Result<RecordEvent>> + Send>>;

/// Sort expression in the store's notation: `created` ascending,
/// `-created` descending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    /// Newest first; what collections load their snapshot with
    pub fn newest_first() -> Self {
        Self::desc("created")
    }

    pub fn parse(expr: &str) -> Self {
        match expr.trim().strip_prefix('-') {
            Some(field) => Self::desc(field),
            None => Self::asc(expr.trim().trim_start_matches('+')),
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field)
        } else {
            f.write_str(&self.field)
        }
    }
}

/// A file sent along with a create, stored under `field`
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub field: String,
    pub name: String,
    pub bytes: Bytes,
}

impl FileUpload {
    pub fn new(field: impl Into<String>, name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            field: field.into(),
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Contract of the record store the application talks to
///
/// Records cross this boundary as raw JSON; typing and validation happen on
/// the caller's side.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Create a record; the returned value carries the assigned id,
    /// timestamps and file references
    async fn create(&self, collection: &str, fields: Value, files: Vec<FileUpload>) -> Result<Value>;

    /// Every record of the collection
    async fn list(&self, collection: &str, sort: &Sort) -> Result<Vec<Value>>;

    /// Open the collection's change feed
    async fn subscribe(&self, collection: &str) -> Result<ChangeFeed>;

    /// Merge `fields` into an existing record
    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<Value>;
}
