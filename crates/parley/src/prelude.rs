//! Prelude module for convenient imports
//!
//! ```rust
//! use parley::prelude::*;
//! ```

pub use crate::{
    ChatClient, ChatConfig, ChatMode, ChatSession, ChatSessionBuilder, ChatState, ClientFactory,
    ConversationTurn, FileContent, HttpFileFetcher, MemoryBackend, ProviderConfig, RecordBackend,
    RecordStore, Thread,
};
