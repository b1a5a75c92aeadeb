pub mod anthropic;
pub mod buffer_utils;
pub mod config;
pub mod streaming;
pub mod titles;
pub mod traits;
pub mod types;

pub use traits::{ChatClient, ChatOptions, ChatRequest, ChatResponse, EventStream, TokenUsage};

pub use anthropic::AnthropicClient;
pub use config::{ClientFactory, ProviderConfig};
pub use streaming::StreamEvent;
pub use titles::generate_title;
pub use types::{ContentBlock, ContentKind, MediaSource, ProviderMessage, Role};
