use std::sync::Arc;

use parley_llm::ChatClient;
use parley_media::{FileFetcher, MediaCache};
use parley_persist::{
    MediaMessageRepository, RecordBackend, RecordStore, TextMessageRepository, ThreadRepository,
};
use parley_types::{ConversationTurn, MediaMessage, TextMessage, Thread};
use tokio::task::JoinHandle;

use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::session::ChatSession;
use crate::view::build_turns;

/// Services shared by every chat session: provider client, repositories,
/// the three mirrored collections and the media cache
pub struct ChatContext {
    pub(crate) client: Arc<dyn ChatClient>,
    pub(crate) threads: ThreadRepository,
    pub(crate) messages: TextMessageRepository,
    pub(crate) media: MediaMessageRepository,
    pub(crate) thread_store: Arc<RecordStore<Thread>>,
    pub(crate) text_store: Arc<RecordStore<TextMessage>>,
    pub(crate) media_store: Arc<RecordStore<MediaMessage>>,
    pub(crate) cache: Arc<MediaCache>,
    pub(crate) config: ChatConfig,
    media_watcher: JoinHandle<()>,
}

impl ChatContext {
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn thread_store(&self) -> &Arc<RecordStore<Thread>> {
        &self.thread_store
    }

    pub fn text_store(&self) -> &Arc<RecordStore<TextMessage>> {
        &self.text_store
    }

    pub fn media_store(&self) -> &Arc<RecordStore<MediaMessage>> {
        &self.media_store
    }

    pub fn cache(&self) -> &Arc<MediaCache> {
        &self.cache
    }

    /// Current conversation of a thread, `None` if the slug is unknown
    pub async fn turns_for(&self, friendly_id: &str) -> Option<Vec<ConversationTurn>> {
        let thread = self.thread_store.find_by_friendly_id(friendly_id)?;
        Some(self.turns(&thread.id).await)
    }

    pub(crate) async fn turns(&self, thread_id: &str) -> Vec<ConversationTurn> {
        let texts = self.text_store.snapshot();
        let media = self.media_store.records_by_thread(thread_id);
        self.turns_from(thread_id, &texts, &media).await
    }

    pub(crate) async fn turns_from(
        &self,
        thread_id: &str,
        texts: &[TextMessage],
        media: &[MediaMessage],
    ) -> Vec<ConversationTurn> {
        let attachments = self.cache.attachments(media).await;
        build_turns(thread_id, texts, &attachments)
    }
}

impl Drop for ChatContext {
    fn drop(&mut self) {
        self.media_watcher.abort();
    }
}

/// Builder wiring a provider client and a record backend into sessions
pub struct ChatSessionBuilder {
    client: Option<Arc<dyn ChatClient>>,
    backend: Option<Arc<dyn RecordBackend>>,
    fetcher: Option<Arc<dyn FileFetcher>>,
    config: ChatConfig,
}

impl ChatSessionBuilder {
    pub fn new() -> Self {
        Self {
            client: None,
            backend: None,
            fetcher: None,
            config: ChatConfig::default(),
        }
    }

    pub fn client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn RecordBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Where attachment bytes are downloaded from
    pub fn fetcher(mut self, fetcher: Arc<dyn FileFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn config(mut self, config: ChatConfig) -> Self {
        self.config = config;
        self
    }

    /// Connect the collections and wait for their first snapshots
    pub async fn build_context(self) -> Result<Arc<ChatContext>> {
        let client = self
            .client
            .ok_or_else(|| ChatError::Config("chat client is required".to_string()))?;
        let backend = self
            .backend
            .ok_or_else(|| ChatError::Config("record backend is required".to_string()))?;
        let fetcher = self
            .fetcher
            .ok_or_else(|| ChatError::Config("file fetcher is required".to_string()))?;

        let thread_store = RecordStore::<Thread>::connect(Arc::clone(&backend)).await;
        let text_store = RecordStore::<TextMessage>::connect(Arc::clone(&backend)).await;
        let media_store = RecordStore::<MediaMessage>::connect(Arc::clone(&backend)).await;

        thread_store.wait_ready().await?;
        text_store.wait_ready().await?;
        media_store.wait_ready().await?;

        let cache = Arc::new(MediaCache::new(fetcher));
        let media_watcher = cache.watch(&media_store);

        tracing::info!(model = %self.config.model, "Chat context ready");

        Ok(Arc::new(ChatContext {
            client,
            threads: ThreadRepository::new(Arc::clone(&backend)),
            messages: TextMessageRepository::new(Arc::clone(&backend)),
            media: MediaMessageRepository::new(backend),
            thread_store,
            text_store,
            media_store,
            cache,
            config: self.config,
            media_watcher,
        }))
    }

    /// Build the shared context and a first session on it
    pub async fn build(self) -> Result<ChatSession> {
        Ok(ChatSession::new(self.build_context().await?))
    }
}

impl Default for ChatSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
