use serde::{Deserialize, Serialize};

/// Orchestrator mode as seen by the chat view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    #[default]
    Ready,
    Thinking,
    Streaming,
    Error,
}

impl ChatMode {
    /// Submissions must be held back while a turn is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Thinking | Self::Streaming)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

/// Observable chat state: current mode plus the text streamed so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatState {
    pub mode: ChatMode,
    pub streamed_text: String,
}

impl ChatState {
    pub fn new(mode: ChatMode) -> Self {
        Self {
            mode,
            streamed_text: String::new(),
        }
    }
}
