use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One block of message content
///
/// Serializes to the provider's tagged shape, e.g.
/// `{"type":"image","source":{"type":"base64","media_type":"image/png","data":"..."}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },

    Image {
        source: MediaSource,
    },

    Document {
        source: MediaSource,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

impl MediaSource {
    /// Inline base64 source
    pub fn base64(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            source_type: "base64".to_string(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

/// Kinds of binary content the provider accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Image,
    Document,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "document" => Ok(Self::Document),
            other => Err(format!("unsupported content kind: {other:?}")),
        }
    }
}

impl ContentBlock {
    /// Create text block
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text { text: s.into() }
    }

    /// Create a base64 media block of the given kind
    pub fn media(kind: ContentKind, media_type: impl Into<String>, data: impl Into<String>) -> Self {
        let source = MediaSource::base64(media_type, data);
        match kind {
            ContentKind::Image => Self::Image { source },
            ContentKind::Document => Self::Document { source },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<ContentKind> {
        match self {
            Self::Text { .. } => None,
            Self::Image { .. } => Some(ContentKind::Image),
            Self::Document { .. } => Some(ContentKind::Document),
        }
    }
}

impl From<String> for ContentBlock {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

impl From<&str> for ContentBlock {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}
