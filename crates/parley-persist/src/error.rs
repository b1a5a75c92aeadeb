use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Invalid record in {collection}: {reason}")]
    Validation { collection: String, reason: String },

    #[error("Record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PersistError {
    pub fn validation(collection: impl Into<String>, reason: impl ToString) -> Self {
        Self::Validation {
            collection: collection.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;
