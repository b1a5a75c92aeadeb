mod client;
mod types;

pub use client::{AnthropicClient, AnthropicClientBuilder, DEFAULT_MAX_TOKENS};
pub use types::{MessagesResponse, ResponseBlock, Usage};
