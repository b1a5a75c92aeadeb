pub mod content;
pub mod message;

pub use content::{ContentBlock, ContentKind, MediaSource};
pub use message::{ProviderMessage, Role};
