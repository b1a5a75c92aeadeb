mod media;
mod message;
mod thread;

pub use media::MediaMessageRepository;
pub use message::TextMessageRepository;
pub use thread::ThreadRepository;

use parley_types::Record;
use serde_json::Value;

use crate::error::{PersistError, Result};

/// Type a record returned by the backend
pub(crate) fn decode<T: Record>(value: Value) -> Result<T> {
    T::parse(value).map_err(|e| PersistError::validation(T::COLLECTION, e))
}
