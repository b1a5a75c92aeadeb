use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parley_api::{build_router, config::Config, state::AppState};
use parley_chat::ChatSessionBuilder;
use parley_llm::{config::AnthropicConfig, ClientFactory, ProviderConfig};
use parley_media::HttpFileFetcher;
use parley_persist::MemoryBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    init_logging(&config);

    tracing::info!("Starting Parley API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let mut anthropic = AnthropicConfig::new(config.anthropic_api_key.clone());
    if let Some(base_url) = &config.llm.base_url {
        anthropic = anthropic.with_base_url(base_url.clone());
    }
    let client = ClientFactory::create_client(ProviderConfig::from(anthropic))
        .context("Failed to create provider client")?;

    let backend = Arc::new(MemoryBackend::new());
    let fetcher = Arc::new(HttpFileFetcher::new(config.persist.base_url.clone()));

    tracing::info!("Syncing collections");
    let chat = ChatSessionBuilder::new()
        .client(client)
        .backend(backend.clone())
        .fetcher(fetcher)
        .config(config.chat_config())
        .build_context()
        .await
        .context("Failed to start chat context")?;

    let state = Arc::new(AppState::new(config.clone(), backend, chat));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        }
        _ => {
            registry.with(tracing_subscriber::fmt::layer().pretty()).init();
        }
    }
}
