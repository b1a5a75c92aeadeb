use std::sync::Arc;
use std::time::Duration;

use futures::future::{join, join_all};
use futures::StreamExt;
use parley_llm::{generate_title, ChatOptions, ChatRequest, ProviderMessage, StreamEvent};
use parley_types::{ChatMode, ChatState, FileContent, MessageRole, Record, TextMessage, Thread};
use tokio::sync::watch;
use tokio::time::timeout;

use crate::adapter::{to_provider_messages, user_message};
use crate::builder::ChatContext;
use crate::error::{ChatError, Result};

/// Title generation starts once a conversation has grown past this many
/// turns and still has no title.
const TITLE_MIN_HISTORY: usize = 2;

/// Upper bound on waiting for the mirrored collections to show a turn's
/// own writes
const MIRROR_SYNC_TIMEOUT: Duration = Duration::from_secs(5);

pub fn should_generate_title(history_len: usize, thread: &Thread) -> bool {
    history_len > TITLE_MIN_HISTORY && !thread.has_title()
}

/// Drives one user submission at a time through persistence, completion and
/// titling
///
/// The state is published on a watch channel. Callers must not start a new
/// submission while the current one is busy.
pub struct ChatSession {
    ctx: Arc<ChatContext>,
    state: watch::Sender<ChatState>,
}

impl ChatSession {
    pub fn new(ctx: Arc<ChatContext>) -> Self {
        let (state, _) = watch::channel(ChatState::default());
        Self { ctx, state }
    }

    pub fn context(&self) -> &Arc<ChatContext> {
        &self.ctx
    }

    pub fn state(&self) -> ChatState {
        (*self.state.borrow()).clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().mode.is_busy()
    }

    /// Send `text` and `files` to thread `friendly_id`, creating the thread
    /// if needed
    ///
    /// Ends in `Ready` on success. Any failure leaves the session in `Error`
    /// and is returned.
    pub async fn submit(&self, friendly_id: &str, text: &str, files: Vec<FileContent>) -> Result<()> {
        self.state.send_replace(ChatState::new(ChatMode::Thinking));

        match self.run(friendly_id, text, files).await {
            Ok(()) => {
                self.set_mode(ChatMode::Ready);
                Ok(())
            }
            Err(e) => {
                tracing::error!(friendly_id, "Submission failed: {}", e);
                self.set_mode(ChatMode::Error);
                Err(e)
            }
        }
    }

    async fn run(&self, friendly_id: &str, text: &str, files: Vec<FileContent>) -> Result<()> {
        let ctx = &self.ctx;

        // Prior turns are read before anything is written so the new user
        // message cannot show up twice in the history.
        let texts = ctx.text_store.snapshot();
        let media = ctx.media_store.snapshot();

        let thread = self.resolve_thread(friendly_id).await?;

        let user_text = ctx
            .messages
            .create_message(&thread.id, MessageRole::User, text)
            .await?;
        let media_ids = self.persist_attachments(&thread, &user_text, &files).await;

        let thread_media: Vec<_> = media.iter().filter(|m| m.thread_id == thread.id).cloned().collect();
        let prior = ctx.turns_from(&thread.id, &texts, &thread_media).await;

        let mut history = to_provider_messages(&prior);
        history.push(user_message(text, &files));
        tracing::debug!(thread_id = %thread.id, history = history.len(), "History assembled");

        if should_generate_title(history.len(), &thread) {
            self.spawn_title(thread.id.clone(), history.clone());
        }

        let reply = self.reply(&thread, history).await;

        // The next submission reads its history from the mirrors
        let mut written = vec![user_text.id.clone()];
        if let Ok(assistant) = &reply {
            written.push(assistant.id.clone());
        }
        self.await_mirror(&written, &media_ids).await;

        let assistant = reply?;
        tracing::info!(thread_id = %thread.id, chars = assistant.content_text.len(), "Assistant reply stored");
        Ok(())
    }

    async fn reply(&self, thread: &Thread, history: Vec<ProviderMessage>) -> Result<TextMessage> {
        let response = self.stream_completion(history).await?;
        let assistant = self
            .ctx
            .messages
            .create_message(&thread.id, MessageRole::Assistant, &response)
            .await?;
        Ok(assistant)
    }

    /// Wait until the text and media mirrors hold the given records
    ///
    /// A mirror that fails or stays behind past the timeout is logged; the
    /// records are stored either way.
    async fn await_mirror(&self, text_ids: &[String], media_ids: &[String]) {
        let texts = self.ctx.text_store.wait_until(|records| contains_all(records, text_ids));
        let media = self.ctx.media_store.wait_until(|records| contains_all(records, media_ids));

        match timeout(MIRROR_SYNC_TIMEOUT, join(texts, media)).await {
            Ok((texts, media)) => {
                for e in [texts.err(), media.err()].into_iter().flatten() {
                    tracing::warn!("Mirror unavailable after write: {}", e);
                }
            }
            Err(_) => tracing::warn!(
                timeout_ms = MIRROR_SYNC_TIMEOUT.as_millis() as u64,
                "Mirror did not catch up with this turn"
            ),
        }
    }

    async fn resolve_thread(&self, friendly_id: &str) -> Result<Thread> {
        if let Some(thread) = self.ctx.thread_store.find_by_friendly_id(friendly_id) {
            return Ok(thread);
        }
        // The mirror may lag behind a thread created moments ago
        if let Some(thread) = self.ctx.threads.find_by_friendly_id(friendly_id).await? {
            return Ok(thread);
        }

        let thread = self.ctx.threads.create_thread(friendly_id).await?;
        tracing::info!(friendly_id, thread_id = %thread.id, "Created thread");
        Ok(thread)
    }

    /// Upload every file concurrently; failures are logged and the turn
    /// goes ahead without them
    ///
    /// Returns the ids of the stored media records.
    async fn persist_attachments(&self, thread: &Thread, message: &TextMessage, files: &[FileContent]) -> Vec<String> {
        let uploads = files.iter().map(|file| {
            self.ctx
                .media
                .create_media(&thread.id, &message.id, &file.name, file.bytes.clone())
        });

        let mut stored = Vec::new();
        for (file, result) in files.iter().zip(join_all(uploads).await) {
            match result {
                Ok(media) => stored.push(media.id),
                Err(e) => tracing::warn!(file = %file.name, "Failed to store attachment: {}", e),
            }
        }
        stored
    }

    /// Fire-and-forget; the outcome only shows up as a title change in the
    /// thread collection
    fn spawn_title(&self, thread_id: String, history: Vec<ProviderMessage>) {
        let client = Arc::clone(&self.ctx.client);
        let threads = self.ctx.threads.clone();
        let model = self.ctx.config.title_model().to_string();

        tokio::spawn(async move {
            match generate_title(client.as_ref(), &model, &history).await {
                Ok(title) => match threads.update_title(&thread_id, &title).await {
                    Ok(_) => tracing::info!(thread_id = %thread_id, title = %title, "Thread titled"),
                    Err(e) => tracing::warn!(thread_id = %thread_id, "Failed to save title: {}", e),
                },
                Err(e) => tracing::warn!(thread_id = %thread_id, "Title generation failed: {}", e),
            }
        });
    }

    async fn stream_completion(&self, history: Vec<ProviderMessage>) -> Result<String> {
        let config = &self.ctx.config;
        let mut options = ChatOptions::new().max_tokens(config.max_tokens);
        if let Some(system) = &config.system_prompt {
            options = options.system(system.clone());
        }
        if let Some(temperature) = config.temperature {
            options = options.temperature(temperature);
        }

        let request = ChatRequest::new(config.model.clone(), history).with_options(options);
        let mut stream = self.ctx.client.chat_stream(request).await?;

        let mut response = String::new();
        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::Message { content } => {
                    response.push_str(&content);
                    self.state.send_modify(|state| {
                        state.mode = ChatMode::Streaming;
                        state.streamed_text.push_str(&content);
                    });
                }
                StreamEvent::Done { finish_reason } => {
                    tracing::debug!(?finish_reason, "Completion finished");
                    return Ok(response);
                }
            }
        }

        Err(ChatError::IncompleteStream)
    }

    fn set_mode(&self, mode: ChatMode) {
        self.state.send_modify(|state| state.mode = mode);
    }
}

fn contains_all<T: Record>(records: &[T], ids: &[String]) -> bool {
    ids.iter().all(|id| records.iter().any(|r| r.id() == id))
}
