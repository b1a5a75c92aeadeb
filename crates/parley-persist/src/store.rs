use std::sync::Arc;

use parley_types::{Record, Thread, ThreadScoped};
use tokio::sync::watch;

use crate::backend::RecordBackend;
use crate::collection::{RecordCollection, Subscription};
use crate::error::{PersistError, Result};

/// Load state of a [`RecordStore`]
#[derive(Debug, Clone)]
pub enum StoreState<T> {
    Loading,
    Ready(Arc<Vec<T>>),
    Failed(String),
}

impl<T> StoreState<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn records(&self) -> Option<&Arc<Vec<T>>> {
        match self {
            Self::Ready(records) => Some(records),
            _ => None,
        }
    }
}

/// Shared, observable mirror of one collection
///
/// Owns the collection's subscription; dropping the store stops syncing.
/// Errors from the backend move the store to `Failed` and it stays there.
pub struct RecordStore<T: Record> {
    state: Arc<watch::Sender<StoreState<T>>>,
    _subscription: Option<Subscription>,
}

impl<T: Record> RecordStore<T> {
    /// Subscribe to `T`'s collection and start mirroring it
    pub async fn connect(backend: Arc<dyn RecordBackend>) -> Arc<Self> {
        let (sender, _) = watch::channel(StoreState::Loading);
        let state = Arc::new(sender);

        let on_snapshot = {
            let state = Arc::clone(&state);
            move |records: Vec<T>| {
                state.send_replace(StoreState::Ready(Arc::new(records)));
            }
        };
        let on_error = {
            let state = Arc::clone(&state);
            move |err: &PersistError| {
                state.send_replace(StoreState::Failed(err.to_string()));
            }
        };

        let subscription = match RecordCollection::<T>::subscribe(backend, on_snapshot, on_error).await {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                tracing::warn!(collection = T::COLLECTION, "Store unavailable: {}", e);
                None
            }
        };

        Arc::new(Self {
            state,
            _subscription: subscription,
        })
    }

    pub fn state(&self) -> StoreState<T> {
        (*self.state.borrow()).clone()
    }

    /// Current records, empty unless the store is ready
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        self.state
            .borrow()
            .records()
            .cloned()
            .unwrap_or_default()
    }

    /// Receiver notified on every state change
    pub fn changed(&self) -> watch::Receiver<StoreState<T>> {
        self.state.subscribe()
    }

    /// Wait for a snapshot matching `predicate`
    ///
    /// Fails if the store fails first.
    pub async fn wait_until<F>(&self, mut predicate: F) -> Result<Arc<Vec<T>>>
    where
        F: FnMut(&[T]) -> bool,
    {
        let mut rx = self.changed();
        loop {
            let outcome = match &*rx.borrow_and_update() {
                StoreState::Ready(records) if predicate(records.as_slice()) => Some(Ok(Arc::clone(records))),
                StoreState::Failed(reason) => Some(Err(PersistError::Subscription(reason.clone()))),
                _ => None,
            };
            if let Some(outcome) = outcome {
                return outcome;
            }

            rx.changed()
                .await
                .map_err(|_| PersistError::Internal("store closed".to_string()))?;
        }
    }

    /// Wait for the first snapshot
    pub async fn wait_ready(&self) -> Result<Arc<Vec<T>>> {
        self.wait_until(|_| true).await
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.snapshot().iter().find(|r| r.id() == id).cloned()
    }
}

impl<T: ThreadScoped> RecordStore<T> {
    /// Records of one thread, in store order
    pub fn records_by_thread(&self, thread_id: &str) -> Vec<T> {
        self.snapshot()
            .iter()
            .filter(|r| r.thread_id() == thread_id)
            .cloned()
            .collect()
    }
}

impl RecordStore<Thread> {
    pub fn find_by_friendly_id(&self, friendly_id: &str) -> Option<Thread> {
        self.snapshot()
            .iter()
            .find(|t| t.friendly_id == friendly_id)
            .cloned()
    }
}
