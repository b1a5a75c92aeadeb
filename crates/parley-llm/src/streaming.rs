use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::buffer_utils::SseLineParser;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental response text
    Message {
        content: String,
    },

    /// Completion finished
    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

/// Server-sent payloads of the Messages streaming API
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagesStreamChunk {
    MessageStart {
        #[serde(default)]
        message: serde_json::Value,
    },
    ContentBlockStart {
        index: u32,
        #[serde(default)]
        content_block: serde_json::Value,
    },
    ContentBlockDelta {
        index: u32,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageDelta {
        delta: MessageDeltaBody,
    },
    MessageStop,
    Ping,
    Error {
        error: ApiErrorBody,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageDeltaBody {
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

/// Parser for the Messages API event stream
///
/// The stop reason arrives in `message_delta` and is reported on the final
/// `Done` emitted for `message_stop`.
#[derive(Debug, Default)]
pub struct MessagesSseParser {
    stop_reason: Option<String>,
    finished: bool,
}

impl MessagesSseParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SseLineParser for MessagesSseParser {
    fn parse_data_line(&mut self, data: &str) -> Result<Vec<StreamEvent>> {
        let chunk: MessagesStreamChunk = serde_json::from_str(data)
            .map_err(|e| anyhow::anyhow!("Failed to parse stream chunk: {}", e))?;

        let events = match chunk {
            MessagesStreamChunk::ContentBlockDelta {
                delta: BlockDelta::TextDelta { text },
                ..
            } if !text.is_empty() => vec![StreamEvent::Message { content: text }],
            MessagesStreamChunk::MessageDelta { delta } => {
                if delta.stop_reason.is_some() {
                    self.stop_reason = delta.stop_reason;
                }
                Vec::new()
            }
            MessagesStreamChunk::MessageStop => {
                self.finished = true;
                vec![StreamEvent::Done {
                    finish_reason: self.stop_reason.take(),
                }]
            }
            MessagesStreamChunk::Error { error } => {
                self.finished = true;
                anyhow::bail!("Provider stream error ({}): {}", error.error_type, error.message);
            }
            _ => Vec::new(),
        };

        Ok(events)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_delta() {
        let mut parser = MessagesSseParser::new();
        let events = parser
            .parse_data_line(r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#)
            .unwrap();
        assert_eq!(events, vec![StreamEvent::Message { content: "Hi".to_string() }]);
        assert!(!parser.is_finished());
    }

    #[test]
    fn test_stop_reason_carried_to_done() {
        let mut parser = MessagesSseParser::new();
        assert!(parser
            .parse_data_line(r#"{"type":"message_delta","delta":{"stop_reason":"end_turn","stop_sequence":null},"usage":{"output_tokens":5}}"#)
            .unwrap()
            .is_empty());
        let events = parser.parse_data_line(r#"{"type":"message_stop"}"#).unwrap();
        assert_eq!(
            events,
            vec![StreamEvent::Done { finish_reason: Some("end_turn".to_string()) }]
        );
        assert!(parser.is_finished());
    }

    #[test]
    fn test_ping_and_unknown_delta_ignored() {
        let mut parser = MessagesSseParser::new();
        assert!(parser.parse_data_line(r#"{"type":"ping"}"#).unwrap().is_empty());
        assert!(parser
            .parse_data_line(r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{"}}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_error_event() {
        let mut parser = MessagesSseParser::new();
        let err = parser
            .parse_data_line(r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("overloaded_error"));
        assert!(parser.is_finished());
    }

    #[test]
    fn test_stream_event_serialization() {
        let json = serde_json::to_string(&StreamEvent::Message { content: "Test".to_string() }).unwrap();
        assert!(json.contains("\"type\":\"message\""));
    }
}
