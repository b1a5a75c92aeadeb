//! Local mirror of a remote collection.
//!
//! A [`RecordSet`] is rebuilt from a snapshot and then kept current by
//! applying change events. [`RecordCollection::subscribe`] wires the two
//! together against a [`RecordBackend`].

use std::marker::PhantomData;
use std::sync::Arc;

use futures::StreamExt;
use parley_types::{Record, RecordAction, RecordEvent};
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::backend::{RecordBackend, Sort};
use crate::error::{PersistError, Result};

/// Validated records of one collection, in arrival order
#[derive(Debug, Clone)]
pub struct RecordSet<T: Record> {
    records: Vec<T>,
}

impl<T: Record> Default for RecordSet<T> {
    fn default() -> Self {
        Self { records: Vec::new() }
    }
}

impl<T: Record> RecordSet<T> {
    /// Build from a full listing, dropping rows that fail validation
    pub fn from_snapshot(rows: Vec<Value>) -> Self {
        let records = rows
            .into_iter()
            .filter_map(|row| match T::parse(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(collection = T::COLLECTION, "Dropping invalid row: {}", e);
                    None
                }
            })
            .collect();
        Self { records }
    }

    /// Apply one change event
    ///
    /// Returns `false` when the payload failed validation and nothing changed.
    pub fn apply(&mut self, event: &RecordEvent) -> bool {
        let record = match T::parse(event.record.clone()) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    collection = T::COLLECTION,
                    action = ?event.action,
                    "Ignoring invalid event: {}",
                    e
                );
                return false;
            }
        };

        match event.action {
            RecordAction::Create | RecordAction::Update => self.upsert(record),
            RecordAction::Delete => {
                let id = record.id().to_string();
                self.records.retain(|r| r.id() != id);
            }
        }
        true
    }

    fn upsert(&mut self, record: T) {
        match self.records.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.records
    }
}

/// Live change-feed task; dropping it stops the feed
#[derive(Debug)]
pub struct Subscription {
    collection: &'static str,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn collection(&self) -> &'static str {
        self.collection
    }

    /// Whether the change feed is still being consumed
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Snapshot-plus-feed synchronisation for records of type `T`
pub struct RecordCollection<T> {
    _record: PhantomData<T>,
}

impl<T: Record> RecordCollection<T> {
    /// Load the collection, emit it, then follow its change feed
    ///
    /// The feed is opened before the list is loaded; events already
    /// reflected in the snapshot are upserts or no-op deletes when replayed.
    ///
    /// `on_snapshot` receives the full list once after loading and again
    /// after every applied event. `on_error` is called at most once; the
    /// feed is not reopened after a failure.
    pub async fn subscribe<S, E>(
        backend: Arc<dyn RecordBackend>,
        mut on_snapshot: S,
        mut on_error: E,
    ) -> Result<Subscription>
    where
        S: FnMut(Vec<T>) + Send + 'static,
        E: FnMut(&PersistError) + Send + 'static,
    {
        let collection = T::COLLECTION;

        // The feed is opened first so writes landing while the list loads
        // are buffered; replaying them over the snapshot is idempotent.
        let mut feed = match backend.subscribe(collection).await {
            Ok(feed) => feed,
            Err(e) => {
                tracing::error!(collection, "Failed to open change feed: {}", e);
                on_error(&e);
                return Err(e);
            }
        };

        let rows = match backend.list(collection, &Sort::newest_first()).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(collection, "Failed to load collection: {}", e);
                on_error(&e);
                return Err(e);
            }
        };

        let mut set = RecordSet::<T>::from_snapshot(rows);
        tracing::debug!(collection, records = set.len(), "Collection loaded");
        on_snapshot(set.records().to_vec());

        let task = tokio::spawn(async move {
            while let Some(item) = feed.next().await {
                match item {
                    Ok(event) => {
                        if set.apply(&event) {
                            on_snapshot(set.records().to_vec());
                        }
                    }
                    Err(e) => {
                        tracing::error!(collection, "Change feed failed: {}", e);
                        on_error(&e);
                        return;
                    }
                }
            }
            tracing::warn!(collection, "Change feed closed");
        });

        Ok(Subscription { collection, task })
    }
}
