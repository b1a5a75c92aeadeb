use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parley_persist::{
    ChangeFeed, FileUpload, MemoryBackend, PersistError, RecordBackend, RecordCollection, RecordStore,
    Sort, TextMessageRepository, ThreadRepository,
};
use parley_types::{MessageRole, RecordEvent, TextMessage, Thread, TEXT_MESSAGES_COLLECTION};
use serde_json::{json, Value};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

fn backend() -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new())
}

fn thread_row(id: &str, slug: &str) -> Value {
    json!({
        "collectionName": "aiThreads",
        "id": id,
        "friendlyId": slug,
        "title": "",
        "created": "2024-05-01 10:00:00.000Z",
        "updated": "2024-05-01 10:00:00.000Z"
    })
}

/// Feed that delivers one event, then breaks, then would deliver more
struct BreakingFeedBackend {
    inner: Arc<MemoryBackend>,
}

#[async_trait]
impl RecordBackend for BreakingFeedBackend {
    async fn create(&self, collection: &str, fields: Value, files: Vec<FileUpload>) -> parley_persist::Result<Value> {
        self.inner.create(collection, fields, files).await
    }

    async fn list(&self, collection: &str, sort: &Sort) -> parley_persist::Result<Vec<Value>> {
        self.inner.list(collection, sort).await
    }

    async fn subscribe(&self, _collection: &str) -> parley_persist::Result<ChangeFeed> {
        let items = vec![
            Ok(RecordEvent::create(thread_row("thr1", "before-break"))),
            Err(PersistError::Subscription("socket closed".to_string())),
            Ok(RecordEvent::create(thread_row("thr2", "after-break"))),
        ];
        Ok(Box::pin(stream::iter(items).chain(stream::pending())))
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> parley_persist::Result<Value> {
        self.inner.update(collection, id, fields).await
    }
}

/// Writes a thread around the list call, as a concurrent client would
struct BusyListBackend {
    inner: Arc<MemoryBackend>,
    write_before_list: bool,
}

#[async_trait]
impl RecordBackend for BusyListBackend {
    async fn create(&self, collection: &str, fields: Value, files: Vec<FileUpload>) -> parley_persist::Result<Value> {
        self.inner.create(collection, fields, files).await
    }

    async fn list(&self, collection: &str, sort: &Sort) -> parley_persist::Result<Vec<Value>> {
        let threads = ThreadRepository::new(self.inner.clone());
        if self.write_before_list {
            threads.create_thread("concurrent").await?;
            return self.inner.list(collection, sort).await;
        }
        let rows = self.inner.list(collection, sort).await?;
        threads.create_thread("concurrent").await?;
        Ok(rows)
    }

    async fn subscribe(&self, collection: &str) -> parley_persist::Result<ChangeFeed> {
        self.inner.subscribe(collection).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> parley_persist::Result<Value> {
        self.inner.update(collection, id, fields).await
    }
}

#[tokio::test]
async fn test_snapshot_then_live_events() {
    let backend = backend();
    let threads = ThreadRepository::new(backend.clone());
    threads.create_thread("first").await.unwrap();
    threads.create_thread("second").await.unwrap();

    let store = RecordStore::<Thread>::connect(backend.clone()).await;
    let initial = store.wait_ready().await.unwrap();
    let slugs: Vec<_> = initial.iter().map(|t| t.friendly_id.as_str()).collect();
    assert_eq!(slugs, vec!["second", "first"]);

    let third = threads.create_thread("third").await.unwrap();
    let records = timeout(WAIT, store.wait_until(|r| r.len() == 3)).await.unwrap().unwrap();
    assert_eq!(records.last().unwrap().id, third.id);

    threads.update_title(&third.id, "Trip planning").await.unwrap();
    timeout(WAIT, store.wait_until(|r| r.iter().any(|t| t.has_title())))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(store.find_by_friendly_id("third").unwrap().title, "Trip planning");
    assert_eq!(store.snapshot().len(), 3);
}

#[tokio::test]
async fn test_delete_and_unknown_delete() {
    let backend = backend();
    let messages = TextMessageRepository::new(backend.clone());
    let kept = messages.create_message("thr", MessageRole::User, "keep").await.unwrap();
    let gone = messages.create_message("thr", MessageRole::User, "drop").await.unwrap();

    let store = RecordStore::<TextMessage>::connect(backend.clone()).await;
    store.wait_ready().await.unwrap();

    // Unknown id: valid payload, nothing to remove
    let mut phantom = serde_json::to_value(&kept).unwrap();
    phantom["id"] = json!("not-there");
    backend
        .publish(TEXT_MESSAGES_COLLECTION, RecordEvent::delete(phantom))
        .await;

    backend.delete(TEXT_MESSAGES_COLLECTION, &gone.id).await.unwrap();
    let records = timeout(WAIT, store.wait_until(|r| r.len() == 1)).await.unwrap().unwrap();
    assert_eq!(records[0].id, kept.id);
}

#[tokio::test]
async fn test_malformed_event_ignored() {
    let backend = backend();
    let store = RecordStore::<TextMessage>::connect(backend.clone()).await;
    store.wait_ready().await.unwrap();

    backend
        .publish(
            TEXT_MESSAGES_COLLECTION,
            RecordEvent::create(json!({"id": "bad", "role": "narrator"})),
        )
        .await;
    let messages = TextMessageRepository::new(backend.clone());
    let good = messages.create_message("thr", MessageRole::Assistant, "ok").await.unwrap();

    let records = timeout(WAIT, store.wait_until(|r| !r.is_empty())).await.unwrap().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, good.id);
    assert!(store.state().is_ready());
}

#[tokio::test]
async fn test_records_by_thread() {
    let backend = backend();
    let messages = TextMessageRepository::new(backend.clone());
    messages.create_message("a", MessageRole::User, "one").await.unwrap();
    messages.create_message("b", MessageRole::User, "two").await.unwrap();
    messages.create_message("a", MessageRole::Assistant, "three").await.unwrap();

    let store = RecordStore::<TextMessage>::connect(backend.clone()).await;
    store.wait_ready().await.unwrap();

    let thread_a = store.records_by_thread("a");
    assert_eq!(thread_a.len(), 2);
    assert!(thread_a.iter().all(|m| m.thread_id == "a"));
}

#[tokio::test]
async fn test_list_failure_reports_error() {
    let backend = backend();
    backend.fail_lists(true);

    let errors = Arc::new(Mutex::new(Vec::new()));
    let snapshots = Arc::new(Mutex::new(0usize));

    let result = RecordCollection::<Thread>::subscribe(
        backend.clone() as Arc<dyn RecordBackend>,
        {
            let snapshots = snapshots.clone();
            move |_| *snapshots.lock().unwrap() += 1
        },
        {
            let errors = errors.clone();
            move |e: &PersistError| errors.lock().unwrap().push(e.to_string())
        },
    )
    .await;

    assert!(result.is_err());
    assert_eq!(errors.lock().unwrap().len(), 1);
    assert_eq!(*snapshots.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_subscription_failure_marks_store_failed() {
    let backend = backend();
    backend.fail_subscriptions(true);

    let store = RecordStore::<Thread>::connect(backend.clone()).await;
    assert!(store.state().is_failed());
    assert!(store.snapshot().is_empty());
    assert!(store.wait_ready().await.is_err());
}

#[tokio::test]
async fn test_dropping_subscription_stops_feed() {
    let backend = backend();
    let snapshots = Arc::new(Mutex::new(0usize));

    let subscription = RecordCollection::<Thread>::subscribe(
        backend.clone() as Arc<dyn RecordBackend>,
        {
            let snapshots = snapshots.clone();
            move |_| *snapshots.lock().unwrap() += 1
        },
        |_: &PersistError| {},
    )
    .await
    .unwrap();
    assert!(subscription.is_active());
    drop(subscription);
    tokio::task::yield_now().await;

    ThreadRepository::new(backend.clone())
        .create_thread("after-drop")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(*snapshots.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_feed_error_after_open_reports_once_and_stops() {
    let backend: Arc<dyn RecordBackend> = Arc::new(BreakingFeedBackend { inner: backend() });
    let errors = Arc::new(Mutex::new(Vec::new()));
    let snapshots = Arc::new(Mutex::new(Vec::new()));

    let subscription = RecordCollection::<Thread>::subscribe(
        backend.clone(),
        {
            let snapshots = snapshots.clone();
            move |records: Vec<Thread>| snapshots.lock().unwrap().push(records.len())
        },
        {
            let errors = errors.clone();
            move |e: &PersistError| errors.lock().unwrap().push(e.to_string())
        },
    )
    .await
    .unwrap();

    timeout(WAIT, async {
        while subscription.is_active() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(errors.lock().unwrap().len(), 1);
    assert_eq!(*snapshots.lock().unwrap(), vec![0, 1]);

    let store = RecordStore::<Thread>::connect(backend).await;
    let outcome = timeout(WAIT, store.wait_until(|r| r.len() > 1)).await.unwrap();
    assert!(outcome.is_err());
    assert!(store.state().is_failed());
}

#[tokio::test]
async fn test_write_during_initial_load_reaches_mirror() {
    let backend = Arc::new(BusyListBackend {
        inner: backend(),
        write_before_list: false,
    });

    let store = RecordStore::<Thread>::connect(backend).await;
    let records = timeout(WAIT, store.wait_until(|r| !r.is_empty())).await.unwrap().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].friendly_id, "concurrent");
}

#[tokio::test]
async fn test_buffered_event_already_in_snapshot_not_duplicated() {
    let backend = Arc::new(BusyListBackend {
        inner: backend(),
        write_before_list: true,
    });

    let store = RecordStore::<Thread>::connect(backend.clone()).await;
    assert_eq!(store.wait_ready().await.unwrap().len(), 1);

    // Anything after the replayed create arrives in order behind it
    ThreadRepository::new(backend.inner.clone())
        .create_thread("later")
        .await
        .unwrap();
    let records = timeout(WAIT, store.wait_until(|r| r.iter().any(|t| t.friendly_id == "later")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(records.len(), 2);
}
