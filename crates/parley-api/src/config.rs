use config::{Config as ConfigLoader, ConfigError, File};
use parley_chat::ChatConfig;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub persist: PersistConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub anthropic_api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body limit; attachments arrive base64-encoded in the JSON body
    #[serde(default = "default_max_body_mb")]
    pub max_body_mb: usize,
}

fn default_max_body_mb() -> usize {
    25
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistConfig {
    /// Base URL media files are downloaded from
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    #[serde(default)]
    pub title_model: Option<String>,
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Provider endpoint override, e.g. a proxy
    #[serde(default)]
    pub base_url: Option<String>,
}

impl From<LlmConfig> for ChatConfig {
    fn from(config: LlmConfig) -> Self {
        let mut chat = ChatConfig::new(config.model).with_max_tokens(config.max_tokens);
        if let Some(title_model) = config.title_model {
            chat = chat.with_title_model(title_model);
        }
        if let Some(temperature) = config.temperature {
            chat = chat.with_temperature(temperature);
        }
        if let Some(system_prompt) = config.system_prompt {
            chat = chat.with_system_prompt(system_prompt);
        }
        chat
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Environment variables that override a config key
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("SERVER_HOST", "server.host"),
    ("SERVER_PORT", "server.port"),
    ("SERVER_MAX_BODY_MB", "server.max_body_mb"),
    ("PERSIST_BASE_URL", "persist.base_url"),
    ("LLM_MODEL", "llm.model"),
    ("LLM_TITLE_MODEL", "llm.title_model"),
    ("LLM_MAX_TOKENS", "llm.max_tokens"),
    ("LLM_TEMPERATURE", "llm.temperature"),
    ("LLM_SYSTEM_PROMPT", "llm.system_prompt"),
    ("LLM_BASE_URL", "llm.base_url"),
    ("LOG_LEVEL", "logging.level"),
    ("LOG_FORMAT", "logging.format"),
];

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables (SERVER_, PERSIST_, LLM_, LOG_ prefixes)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let mut builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false));

        for (var, key) in ENV_OVERRIDES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        cfg.anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            ConfigError::Message("ANTHROPIC_API_KEY environment variable is required".to_string())
        })?;

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        builder.build()?.try_deserialize()
    }

    pub fn chat_config(&self) -> ChatConfig {
        self.llm.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        host = "127.0.0.1"
        port = 8090

        [cors]
        enabled = true
        origins = ["http://localhost:3000"]

        [persist]
        base_url = "http://127.0.0.1:8090"

        [llm]
        model = "claude-3-5-sonnet-latest"
        title_model = "claude-3-5-haiku-latest"
        max_tokens = 2048

        [logging]
        level = "debug"
        format = "json"
    "#;

    #[test]
    fn test_config_structure() {
        let config: Config = toml::from_str(SAMPLE).unwrap();

        assert_eq!(config.server.port, 8090);
        assert_eq!(config.server.max_body_mb, 25);
        assert_eq!(config.cors.origins, vec!["http://localhost:3000"]);
        assert_eq!(config.persist.base_url, "http://127.0.0.1:8090");
        assert_eq!(config.logging.format, "json");
        assert!(config.anthropic_api_key.is_empty());
        assert!(config.llm.base_url.is_none());
    }

    #[test]
    fn test_llm_config_into_chat_config() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let chat = config.chat_config();

        assert_eq!(chat.model, "claude-3-5-sonnet-latest");
        assert_eq!(chat.title_model(), "claude-3-5-haiku-latest");
        assert_eq!(chat.max_tokens, 2048);
        assert!(chat.temperature.is_none());
        assert!(chat.system_prompt.is_none());
    }
}
