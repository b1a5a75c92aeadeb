use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Completion settings shared by every session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatConfig {
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used for thread titles; falls back to `model`
    #[serde(default)]
    pub title_model: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            title_model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            system_prompt: None,
        }
    }
}

impl ChatConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_title_model(mut self, model: impl Into<String>) -> Self {
        self.title_model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn title_model(&self) -> &str {
        self.title_model.as_deref().unwrap_or(&self.model)
    }
}
