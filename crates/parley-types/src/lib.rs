pub mod events;
pub mod records;
pub mod state;
pub mod timestamp;
pub mod turns;

pub use events::{RecordAction, RecordEvent};
pub use records::{
    MediaMessage, MessageRole, Record, TextMessage, Thread, ThreadScoped,
    MEDIA_MESSAGES_COLLECTION, TEXT_MESSAGES_COLLECTION, THREADS_COLLECTION,
};
pub use state::{ChatMode, ChatState};
pub use turns::{ConversationTurn, FileContent, MediaAttachment};
