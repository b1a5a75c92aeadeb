pub mod cache;
pub mod error;
pub mod fetcher;
pub mod mime;

pub use cache::MediaCache;
pub use error::{MediaError, Result};
pub use fetcher::{FileFetcher, HttpFileFetcher};
pub use mime::{file_url, infer_media_type};
