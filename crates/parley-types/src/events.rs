use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Change feed action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
    Create,
    Update,
    Delete,
}

/// One notification from a collection's change feed
///
/// `record` is left untyped; it is validated by whoever applies the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEvent {
    pub action: RecordAction,
    pub record: Value,
}

impl RecordEvent {
    pub fn new(action: RecordAction, record: Value) -> Self {
        Self { action, record }
    }

    pub fn create(record: Value) -> Self {
        Self::new(RecordAction::Create, record)
    }

    pub fn update(record: Value) -> Self {
        Self::new(RecordAction::Update, record)
    }

    pub fn delete(record: Value) -> Self {
        Self::new(RecordAction::Delete, record)
    }
}
