pub mod adapter;
pub mod builder;
pub mod config;
pub mod error;
pub mod session;
pub mod view;

pub use adapter::{attachment_block, classify, to_provider_message, to_provider_messages, EncodingError};
pub use builder::{ChatContext, ChatSessionBuilder};
pub use config::ChatConfig;
pub use error::{ChatError, Result};
pub use session::{should_generate_title, ChatSession};
pub use view::build_turns;
