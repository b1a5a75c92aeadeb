//! # Parley
//!
//! Chat with an AI provider over conversations that live in a realtime
//! record store.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parley::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ClientFactory::create_client(ProviderConfig::anthropic(
//!         std::env::var("ANTHROPIC_API_KEY")?,
//!     ))?;
//!     let backend = Arc::new(MemoryBackend::new());
//!
//!     let session = ChatSessionBuilder::new()
//!         .client(client)
//!         .backend(backend.clone())
//!         .fetcher(backend)
//!         .config(ChatConfig::new("claude-3-5-sonnet-latest"))
//!         .build()
//!         .await?;
//!
//!     let mut state = session.subscribe();
//!     tokio::spawn(async move {
//!         while state.changed().await.is_ok() {
//!             println!("{}", state.borrow_and_update().streamed_text);
//!         }
//!     });
//!
//!     session.submit("weekend-trip", "Plan a hike", Vec::new()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`parley-types`**: records, change events, conversation turns, chat state
//! - **`parley-llm`**: provider messages, `ChatClient`, Anthropic client, titles
//! - **`parley-persist`**: record backends, repositories, synced collections
//! - **`parley-media`**: file fetching and the media cache
//! - **`parley-chat`**: conversation view, provider adapter, chat sessions

pub mod prelude;

pub use parley_types::{
    ChatMode, ChatState, ConversationTurn, FileContent, MediaAttachment, MediaMessage,
    MessageRole, Record, RecordAction, RecordEvent, TextMessage, Thread,
};

pub use parley_llm::{
    generate_title, AnthropicClient, ChatClient, ChatOptions, ChatRequest, ChatResponse,
    ClientFactory, ContentBlock, ContentKind, ProviderConfig, ProviderMessage, Role, StreamEvent,
};

pub use parley_persist::{
    MediaMessageRepository, MemoryBackend, PersistError, RecordBackend, RecordCollection,
    RecordStore, StoreState, TextMessageRepository, ThreadRepository,
};

pub use parley_media::{FileFetcher, HttpFileFetcher, MediaCache, MediaError};

pub use parley_chat::{
    build_turns, to_provider_message, ChatConfig, ChatContext, ChatError, ChatSession,
    ChatSessionBuilder,
};
