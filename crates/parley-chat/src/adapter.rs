use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use parley_llm::{ContentBlock, ContentKind, ProviderMessage, Role};
use parley_types::{ConversationTurn, FileContent, MessageRole};
use thiserror::Error;

const PDF_MEDIA_TYPE: &str = "application/pdf";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
}

/// Content kind the provider expects for a media type
///
/// PDFs are documents; anything else is classified by its primary type,
/// so `image/png` is an image.
pub fn classify(media_type: &str) -> Result<ContentKind, EncodingError> {
    let media_type = media_type.trim().to_ascii_lowercase();
    if media_type == PDF_MEDIA_TYPE {
        return Ok(ContentKind::Document);
    }

    let primary = media_type.split('/').next().unwrap_or_default();
    ContentKind::from_str(primary).map_err(|_| EncodingError::UnsupportedMediaType(media_type.clone()))
}

/// Base64 content block for a file
pub fn attachment_block(file: &FileContent) -> Result<ContentBlock, EncodingError> {
    let kind = classify(&file.media_type)?;
    Ok(ContentBlock::media(kind, file.media_type.clone(), STANDARD.encode(&file.bytes)))
}

/// Provider message for a stored turn
///
/// Attachments that are not loaded yet are skipped; ones that cannot be
/// encoded are dropped with a warning.
pub fn to_provider_message(turn: &ConversationTurn) -> ProviderMessage {
    let files = turn.media_messages.iter().filter_map(|a| a.file.as_ref());
    message_with_files(role(turn.text_message.role), &turn.text_message.content_text, files)
}

pub fn to_provider_messages(turns: &[ConversationTurn]) -> Vec<ProviderMessage> {
    turns.iter().map(to_provider_message).collect()
}

/// User message for a submission that has not been read back from the store
pub(crate) fn user_message(text: &str, files: &[FileContent]) -> ProviderMessage {
    message_with_files(Role::User, text, files.iter())
}

fn message_with_files<'a>(
    role: Role,
    text: &str,
    files: impl Iterator<Item = &'a FileContent>,
) -> ProviderMessage {
    let mut content = vec![ContentBlock::text(text)];
    for file in files {
        match attachment_block(file) {
            Ok(block) => content.push(block),
            Err(e) => tracing::warn!(file = %file.name, "Dropping attachment: {}", e),
        }
    }
    ProviderMessage::new(role, content)
}

fn role(role: MessageRole) -> Role {
    match role {
        MessageRole::User => Role::User,
        MessageRole::Assistant => Role::Assistant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::{timestamp, MediaAttachment, MediaMessage, TextMessage};

    fn turn(role: MessageRole, files: Vec<Option<FileContent>>) -> ConversationTurn {
        let created = timestamp::parse("2024-05-01 10:00:00.000Z").unwrap();
        let media_messages = files
            .into_iter()
            .enumerate()
            .map(|(i, file)| MediaAttachment {
                record: MediaMessage {
                    collection_id: None,
                    collection_name: None,
                    id: format!("m{i}"),
                    thread_id: "t1".to_string(),
                    ai_text_message_id: "x1".to_string(),
                    file: format!("f{i}"),
                    created,
                    updated: created,
                },
                file,
            })
            .collect();

        ConversationTurn {
            text_message: TextMessage {
                collection_id: None,
                collection_name: None,
                id: "x1".to_string(),
                thread_id: "t1".to_string(),
                role,
                content_text: "What is in these?".to_string(),
                created,
                updated: created,
            },
            media_messages,
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("application/pdf").unwrap(), ContentKind::Document);
        assert_eq!(classify("image/png").unwrap(), ContentKind::Image);
        assert_eq!(classify("image/jpeg").unwrap(), ContentKind::Image);
        assert!(classify("text/plain").is_err());
        assert!(classify("application/zip").is_err());
        assert!(classify("").is_err());
    }

    #[test]
    fn test_pdf_and_png_mapping() {
        let message = to_provider_message(&turn(
            MessageRole::User,
            vec![
                Some(FileContent::new("paper.pdf", "application/pdf", b"%PDF".to_vec())),
                Some(FileContent::new("cat.png", "image/png", vec![0x89u8, 0x50])),
            ],
        ));

        assert_eq!(message.role, Role::User);
        assert_eq!(message.content.len(), 3);
        assert_eq!(message.content[0].as_text(), Some("What is in these?"));
        assert_eq!(message.content[1].kind(), Some(ContentKind::Document));
        assert_eq!(message.content[2].kind(), Some(ContentKind::Image));

        match &message.content[1] {
            ContentBlock::Document { source } => {
                assert_eq!(source.source_type, "base64");
                assert_eq!(source.media_type, "application/pdf");
                assert_eq!(source.data, "JVBERg==");
            }
            other => panic!("expected document block, got {other:?}"),
        }
    }

    #[test]
    fn test_unclassifiable_and_unresolved_dropped() {
        let message = to_provider_message(&turn(
            MessageRole::Assistant,
            vec![
                Some(FileContent::new("notes.txt", "text/plain", b"hi".to_vec())),
                None,
            ],
        ));

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content.len(), 1);
    }

    #[test]
    fn test_user_message_from_submission() {
        let files = vec![FileContent::new("a.gif", "image/gif", vec![1u8, 2, 3])];
        let message = user_message("Look", &files);
        assert_eq!(message.content.len(), 2);
        assert_eq!(message.text(), "Look");
    }
}
