use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use parley_types::{timestamp, RecordEvent};
use serde_json::{Map, Value};
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::backend::{ChangeFeed, FileUpload, RecordBackend, Sort};
use crate::error::{PersistError, Result};

const ID_LEN: usize = 15;
const FILE_SUFFIX_LEN: usize = 10;
const FEED_CAPACITY: usize = 256;

#[derive(Default)]
struct StoreData {
    collections: HashMap<String, Vec<Value>>,
    files: HashMap<String, Bytes>,
    last_stamp: Option<DateTime<Utc>>,
}

impl StoreData {
    /// Millisecond timestamps, strictly increasing so `created` orders
    /// records the way they were written
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let now = timestamp::parse(&timestamp::format(&Utc::now())).unwrap_or_else(Utc::now);
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

#[derive(Default)]
struct Failures {
    creates: AtomicBool,
    lists: AtomicBool,
    subscriptions: AtomicBool,
}

/// In-process record store
///
/// Behaves like the hosted backend as far as the application can tell:
/// generated ids, store-format timestamps, uploaded files kept under a
/// unique reference and a broadcast change feed per collection. Failures can
/// be switched on per operation kind.
#[derive(Default)]
pub struct MemoryBackend {
    data: RwLock<StoreData>,
    feeds: RwLock<HashMap<String, broadcast::Sender<RecordEvent>>>,
    failures: Failures,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_creates(&self, fail: bool) {
        self.failures.creates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lists(&self, fail: bool) {
        self.failures.lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_subscriptions(&self, fail: bool) {
        self.failures.subscriptions.store(fail, Ordering::SeqCst);
    }

    /// Stored bytes of a record's file
    pub async fn file(&self, collection: &str, record_id: &str, file: &str) -> Option<Bytes> {
        let data = self.data.read().await;
        data.files.get(&file_key(collection, record_id, file)).cloned()
    }

    pub async fn count(&self, collection: &str) -> usize {
        let data = self.data.read().await;
        data.collections.get(collection).map_or(0, Vec::len)
    }

    /// Remove a record and notify subscribers
    pub async fn delete(&self, collection: &str, id: &str) -> Result<Value> {
        let removed = {
            let mut data = self.data.write().await;
            let records = data.collections.entry(collection.to_string()).or_default();
            let pos = records
                .iter()
                .position(|r| record_id(r) == Some(id))
                .ok_or_else(|| not_found(collection, id))?;
            let removed = records.remove(pos);
            let prefix = file_key(collection, id, "");
            data.files.retain(|key, _| !key.starts_with(&prefix));
            removed
        };

        self.publish(collection, RecordEvent::delete(removed.clone())).await;
        Ok(removed)
    }

    /// Push an event to subscribers without touching stored records
    pub async fn publish(&self, collection: &str, event: RecordEvent) {
        let sender = self.sender(collection).await;
        // No receivers is fine; nobody is watching yet.
        let _ = sender.send(event);
    }

    async fn sender(&self, collection: &str) -> broadcast::Sender<RecordEvent> {
        if let Some(sender) = self.feeds.read().await.get(collection) {
            return sender.clone();
        }

        let mut feeds = self.feeds.write().await;
        feeds
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl RecordBackend for MemoryBackend {
    async fn create(&self, collection: &str, fields: Value, files: Vec<FileUpload>) -> Result<Value> {
        if self.failures.creates.load(Ordering::SeqCst) {
            return Err(PersistError::Backend(format!("create rejected for {collection}")));
        }

        let mut record = into_object(collection, fields)?;
        let record = {
            let mut data = self.data.write().await;
            let id = random_token(ID_LEN);
            let stamp = timestamp::format(&data.next_stamp());

            for upload in files {
                let reference = file_reference(&upload.name);
                data.files
                    .insert(file_key(collection, &id, &reference), upload.bytes);
                record.insert(upload.field, Value::String(reference));
            }

            record.insert("collectionId".into(), Value::String(collection_id(collection)));
            record.insert("collectionName".into(), Value::String(collection.to_string()));
            record.insert("id".into(), Value::String(id));
            record.insert("created".into(), Value::String(stamp.clone()));
            record.insert("updated".into(), Value::String(stamp));

            let record = Value::Object(record);
            data.collections
                .entry(collection.to_string())
                .or_default()
                .push(record.clone());
            record
        };

        tracing::debug!(collection, id = ?record_id(&record), "Record created");
        self.publish(collection, RecordEvent::create(record.clone())).await;
        Ok(record)
    }

    async fn list(&self, collection: &str, sort: &Sort) -> Result<Vec<Value>> {
        if self.failures.lists.load(Ordering::SeqCst) {
            return Err(PersistError::Backend(format!("list rejected for {collection}")));
        }

        let data = self.data.read().await;
        let mut records = data.collections.get(collection).cloned().unwrap_or_default();
        records.sort_by(|a, b| {
            let ord = compare_field(a, b, &sort.field);
            if sort.descending {
                ord.reverse()
            } else {
                ord
            }
        });
        Ok(records)
    }

    async fn subscribe(&self, collection: &str) -> Result<ChangeFeed> {
        if self.failures.subscriptions.load(Ordering::SeqCst) {
            return Err(PersistError::Subscription(format!(
                "realtime connection refused for {collection}"
            )));
        }

        let receiver = self.sender(collection).await.subscribe();
        let feed = BroadcastStream::new(receiver).map(|item| {
            item.map_err(|err: BroadcastStreamRecvError| {
                PersistError::Subscription(format!("change feed interrupted: {err}"))
            })
        });

        Ok(Box::pin(feed))
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<Value> {
        let changes = into_object(collection, fields)?;
        let record = {
            let mut data = self.data.write().await;
            let stamp = timestamp::format(&data.next_stamp());
            let record = data
                .collections
                .get_mut(collection)
                .and_then(|records| records.iter_mut().find(|r| record_id(r) == Some(id)))
                .ok_or_else(|| not_found(collection, id))?;

            if let Value::Object(existing) = record {
                for (key, value) in changes {
                    if matches!(key.as_str(), "id" | "created" | "collectionId" | "collectionName") {
                        continue;
                    }
                    existing.insert(key, value);
                }
                existing.insert("updated".into(), Value::String(stamp));
            }
            record.clone()
        };

        self.publish(collection, RecordEvent::update(record.clone())).await;
        Ok(record)
    }
}

fn into_object(collection: &str, fields: Value) -> Result<Map<String, Value>> {
    match fields {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(PersistError::validation(
            collection,
            format!("expected an object of fields, got {other}"),
        )),
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

fn not_found(collection: &str, id: &str) -> PersistError {
    PersistError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}

fn file_key(collection: &str, record_id: &str, file: &str) -> String {
    format!("{collection}/{record_id}/{file}")
}

fn collection_id(collection: &str) -> String {
    format!("mem_{}", collection.to_lowercase())
}

fn random_token(len: usize) -> String {
    let mut token = uuid::Uuid::new_v4().simple().to_string();
    token.truncate(len);
    token
}

/// `{stem}_{random}.{ext}`, so two uploads of `cat.png` never collide
fn file_reference(name: &str) -> String {
    let path = Path::new(name);
    let stem: String = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let suffix = random_token(FILE_SUFFIX_LEN);

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{suffix}.{}", ext.to_lowercase()),
        None => format!("{stem}_{suffix}"),
    }
}

fn compare_field(a: &Value, b: &Value, field: &str) -> std::cmp::Ordering {
    let (a, b) = (a.get(field), b.get(field));
    match (a.and_then(Value::as_str), b.and_then(Value::as_str)) {
        (Some(x), Some(y)) => match (timestamp::parse(x), timestamp::parse(y)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x.cmp(y),
        },
        _ => a.map(Value::to_string).cmp(&b.map(Value::to_string)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::RecordAction;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_assigns_metadata() {
        let backend = MemoryBackend::new();
        let record = backend
            .create("aiThreads", json!({"friendlyId": "t1", "title": ""}), vec![])
            .await
            .unwrap();

        assert_eq!(record["id"].as_str().unwrap().len(), ID_LEN);
        assert_eq!(record["collectionName"], "aiThreads");
        assert!(timestamp::parse(record["created"].as_str().unwrap()).is_some());
        assert!(record["created"].as_str().unwrap().contains(' '));
    }

    #[tokio::test]
    async fn test_file_upload_reference() {
        let backend = MemoryBackend::new();
        let record = backend
            .create(
                "aiMediaMessages",
                json!({"threadId": "t"}),
                vec![FileUpload::new("file", "My Cat.PNG", vec![1u8, 2, 3])],
            )
            .await
            .unwrap();

        let reference = record["file"].as_str().unwrap();
        assert!(reference.starts_with("my_cat_"));
        assert!(reference.ends_with(".png"));
        assert_eq!(reference.len(), "my_cat_".len() + FILE_SUFFIX_LEN + ".png".len());

        let id = record["id"].as_str().unwrap();
        let bytes = backend.file("aiMediaMessages", id, reference).await.unwrap();
        assert_eq!(bytes.as_ref(), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_list_sorted_newest_first() {
        let backend = MemoryBackend::new();
        for name in ["a", "b", "c"] {
            backend.create("aiThreads", json!({"friendlyId": name}), vec![]).await.unwrap();
        }

        let records = backend.list("aiThreads", &Sort::newest_first()).await.unwrap();
        let names: Vec<_> = records.iter().map(|r| r["friendlyId"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_update_merges_and_notifies() {
        let backend = MemoryBackend::new();
        let created = backend
            .create("aiThreads", json!({"friendlyId": "t1", "title": ""}), vec![])
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap();

        let mut feed = backend.subscribe("aiThreads").await.unwrap();
        let updated = backend
            .update("aiThreads", id, json!({"title": "Trip", "id": "hijack"}))
            .await
            .unwrap();

        assert_eq!(updated["title"], "Trip");
        assert_eq!(updated["id"], created["id"]);
        assert_eq!(updated["friendlyId"], "t1");

        let event = feed.next().await.unwrap().unwrap();
        assert_eq!(event.action, RecordAction::Update);
        assert_eq!(event.record["title"], "Trip");
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let backend = MemoryBackend::new();
        let err = backend.update("aiThreads", "missing", json!({})).await.unwrap_err();
        assert!(matches!(err, PersistError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let backend = MemoryBackend::new();
        backend.fail_creates(true);
        backend.fail_lists(true);
        backend.fail_subscriptions(true);

        assert!(backend.create("c", json!({}), vec![]).await.is_err());
        assert!(backend.list("c", &Sort::newest_first()).await.is_err());
        assert!(backend.subscribe("c").await.is_err());

        backend.fail_creates(false);
        assert!(backend.create("c", json!({}), vec![]).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_emits_event() {
        let backend = MemoryBackend::new();
        let created = backend.create("c", json!({"x": 1}), vec![]).await.unwrap();
        let mut feed = backend.subscribe("c").await.unwrap();

        backend.delete("c", created["id"].as_str().unwrap()).await.unwrap();

        let event = feed.next().await.unwrap().unwrap();
        assert_eq!(event.action, RecordAction::Delete);
        assert_eq!(backend.count("c").await, 0);
    }

    #[test]
    fn test_rejects_non_object_fields() {
        assert!(into_object("c", json!([1, 2])).is_err());
        assert!(into_object("c", Value::Null).unwrap().is_empty());
    }
}
