use std::sync::Arc;
use std::time::Duration;

use parley_media::{FileFetcher, HttpFileFetcher, MediaCache, MediaError};
use parley_persist::{MediaMessageRepository, MemoryBackend, RecordStore};
use parley_types::{MediaMessage, Record};
use serde_json::json;

fn record(id: &str, file: &str) -> MediaMessage {
    MediaMessage::parse(json!({
        "collectionName": "aiMediaMessages",
        "id": id,
        "threadId": "thr",
        "aiTextMessageId": "txt",
        "file": file,
        "created": "2024-05-01 10:00:00.000Z",
        "updated": "2024-05-01 10:00:00.000Z"
    }))
    .unwrap()
}

#[tokio::test]
async fn test_http_fetch_populates_cache_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/files/aiMediaMessages/rec1/cat_0123456789.png")
        .with_status(200)
        .with_body(vec![0x89, b'P', b'N', b'G'])
        .expect(1)
        .create_async()
        .await;

    let cache = MediaCache::new(Arc::new(HttpFileFetcher::new(server.url())));
    let media = record("rec1", "cat_0123456789.png");

    cache.ensure_cached(&media).await.unwrap();
    cache.ensure_cached(&media).await.unwrap();

    let file = cache.get("cat_0123456789.png").await.unwrap();
    assert_eq!(file.media_type, "image/png");
    assert_eq!(file.bytes.as_ref(), &[0x89, b'P', b'N', b'G']);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_fetch_errors() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/files/aiMediaMessages/gone/a.png")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("GET", "/api/files/aiMediaMessages/broken/b.png")
        .with_status(500)
        .create_async()
        .await;

    let fetcher = HttpFileFetcher::new(server.url());

    let err = fetcher.fetch(&record("gone", "a.png")).await.unwrap_err();
    assert!(matches!(err, MediaError::NotFound(_)));

    let err = fetcher.fetch(&record("broken", "b.png")).await.unwrap_err();
    assert!(matches!(err, MediaError::Status { status: 500, .. }));
}

#[tokio::test]
async fn test_watcher_hydrates_new_media() {
    let backend = Arc::new(MemoryBackend::new());
    let store = RecordStore::<MediaMessage>::connect(backend.clone()).await;
    store.wait_ready().await.unwrap();

    let cache = Arc::new(MediaCache::new(backend.clone()));
    let _watcher = cache.watch(&store);

    let media = MediaMessageRepository::new(backend.clone())
        .create_media("thr", "txt", "report.pdf", b"%PDF-1.7".to_vec().into())
        .await
        .unwrap();

    let mut cached = None;
    for _ in 0..100 {
        if let Some(file) = cache.get(&media.file).await {
            cached = Some(file);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let file = cached.expect("watcher should cache the new file");
    assert_eq!(file.media_type, "application/pdf");
    assert_eq!(file.bytes.as_ref(), b"%PDF-1.7");
}
