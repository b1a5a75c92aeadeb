use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("File request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("File not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, MediaError>;
