use std::collections::HashMap;
use std::sync::Arc;

use parley_chat::{ChatContext, ChatSession};
use parley_persist::MemoryBackend;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::config::Config;
use crate::error::{ApiError, ApiResult};

/// Session for one thread plus the lock held while a submission runs
#[derive(Clone)]
struct SessionSlot {
    session: Arc<ChatSession>,
    turn_lock: Arc<Mutex<()>>,
}

/// Shared application state passed to all handlers
///
/// Sessions are created lazily per thread slug and all share one chat
/// context, so every session sees the same collections and media cache.
/// A slot lives only while a submission for its thread is running.
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Arc<MemoryBackend>,
    pub chat: Arc<ChatContext>,
    sessions: RwLock<HashMap<String, SessionSlot>>,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<MemoryBackend>, chat: Arc<ChatContext>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            chat,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Session for `friendly_id` together with its turn guard
    ///
    /// Fails with `Busy` while another submission holds the thread.
    pub async fn claim_session(
        &self,
        friendly_id: &str,
    ) -> ApiResult<(Arc<ChatSession>, OwnedMutexGuard<()>)> {
        let slot = self.slot(friendly_id).await;
        let guard = slot
            .turn_lock
            .try_lock_owned()
            .map_err(|_| ApiError::Busy(friendly_id.to_string()))?;
        Ok((slot.session, guard))
    }

    /// Drop the slot of `friendly_id` unless a submission holds or is
    /// claiming its lock
    pub async fn release_session(&self, friendly_id: &str) {
        let mut sessions = self.sessions.write().await;
        let idle = sessions
            .get(friendly_id)
            .is_some_and(|slot| Arc::strong_count(&slot.turn_lock) == 1);
        if idle {
            sessions.remove(friendly_id);
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn slot(&self, friendly_id: &str) -> SessionSlot {
        if let Some(slot) = self.sessions.read().await.get(friendly_id) {
            return slot.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(friendly_id.to_string())
            .or_insert_with(|| SessionSlot {
                session: Arc::new(ChatSession::new(Arc::clone(&self.chat))),
                turn_lock: Arc::new(Mutex::new(())),
            })
            .clone()
    }
}
