pub mod backend;
pub mod collection;
pub mod error;
pub mod memory;
pub mod repositories;
pub mod store;

pub use backend::{ChangeFeed, FileUpload, RecordBackend, Sort};
pub use collection::{RecordCollection, RecordSet, Subscription};
pub use error::{PersistError, Result};
pub use memory::MemoryBackend;
pub use repositories::{MediaMessageRepository, TextMessageRepository, ThreadRepository};
pub use store::{RecordStore, StoreState};
