use async_trait::async_trait;
use bytes::Bytes;
use parley_persist::MemoryBackend;
use parley_types::MediaMessage;

use crate::error::{MediaError, Result};
use crate::mime::file_url;

/// Source of attachment bytes
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, record: &MediaMessage) -> Result<Bytes>;
}

/// Downloads files from the record store's file endpoint
#[derive(Debug, Clone)]
pub struct HttpFileFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFileFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn url_for(&self, record: &MediaMessage) -> String {
        file_url(&self.base_url, record.collection(), &record.id, &record.file)
    }
}

#[async_trait]
impl FileFetcher for HttpFileFetcher {
    async fn fetch(&self, record: &MediaMessage) -> Result<Bytes> {
        let url = self.url_for(record);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MediaError::NotFound(record.file.clone()));
        }
        if !status.is_success() {
            return Err(MediaError::Status {
                url,
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?)
    }
}

/// Reads straight from an in-process store
#[async_trait]
impl FileFetcher for MemoryBackend {
    async fn fetch(&self, record: &MediaMessage) -> Result<Bytes> {
        self.file(record.collection(), &record.id, &record.file)
            .await
            .ok_or_else(|| MediaError::NotFound(record.file.clone()))
    }
}
