use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use parley_persist::RecordStore;
use parley_types::{FileContent, MediaAttachment, MediaMessage};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::fetcher::FileFetcher;
use crate::mime::infer_media_type;

/// File reference to content, filled on demand
///
/// Entries are never evicted. Two callers racing on the same uncached
/// reference both fetch; the second insert overwrites the first with
/// identical content.
pub struct MediaCache {
    fetcher: Arc<dyn FileFetcher>,
    files: RwLock<HashMap<String, FileContent>>,
}

impl MediaCache {
    pub fn new(fetcher: Arc<dyn FileFetcher>) -> Self {
        Self {
            fetcher,
            files: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch `record`'s file unless it is already cached
    pub async fn ensure_cached(&self, record: &MediaMessage) -> Result<()> {
        if self.contains(&record.file).await {
            return Ok(());
        }

        let bytes = self.fetcher.fetch(record).await?;
        let content = FileContent::new(record.file.clone(), infer_media_type(&record.file), bytes);
        tracing::debug!(file = %record.file, size = content.len(), "Cached media file");

        self.files.write().await.insert(record.file.clone(), content);
        Ok(())
    }

    /// Pair a record with its content, if cached
    pub async fn with_cached_file(&self, record: &MediaMessage) -> MediaAttachment {
        MediaAttachment {
            record: record.clone(),
            file: self.get(&record.file).await,
        }
    }

    pub async fn attachments(&self, records: &[MediaMessage]) -> Vec<MediaAttachment> {
        let files = self.files.read().await;
        records
            .iter()
            .map(|record| MediaAttachment {
                record: record.clone(),
                file: files.get(&record.file).cloned(),
            })
            .collect()
    }

    pub async fn get(&self, file: &str) -> Option<FileContent> {
        self.files.read().await.get(file).cloned()
    }

    pub async fn contains(&self, file: &str) -> bool {
        self.files.read().await.contains_key(file)
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }

    /// Keep the cache hydrated from a media store
    ///
    /// Every snapshot triggers a fetch of each record not yet cached. A
    /// failed fetch is logged and tried again on the next snapshot. The task
    /// ends when the store is dropped.
    pub fn watch(self: &Arc<Self>, store: &RecordStore<MediaMessage>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        let mut rx = store.changed();

        tokio::spawn(async move {
            loop {
                let records = rx.borrow_and_update().records().cloned();
                if let Some(records) = records {
                    cache.hydrate(&records).await;
                }

                if rx.changed().await.is_err() {
                    tracing::debug!("Media store closed, watcher exiting");
                    break;
                }
            }
        })
    }

    async fn hydrate(&self, records: &[MediaMessage]) {
        let mut missing = Vec::new();
        {
            let files = self.files.read().await;
            for record in records {
                if !files.contains_key(&record.file) {
                    missing.push(record);
                }
            }
        }

        let results = join_all(missing.iter().map(|record| self.ensure_cached(record))).await;
        for (record, result) in missing.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(file = %record.file, "Failed to fetch media file: {}", e);
            }
        }
    }
}
