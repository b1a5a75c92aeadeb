use parley_media::MediaError;
use parley_persist::PersistError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Provider error: {0}")]
    Provider(#[from] anyhow::Error),

    #[error("Completion stream ended before the provider finished")]
    IncompleteStream,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ChatError>;
