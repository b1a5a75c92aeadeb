use parley_types::{ConversationTurn, MediaAttachment, TextMessage};

/// Ordered turns of one thread
///
/// Turns are sorted oldest first; equal timestamps keep their input order.
/// Each turn carries every attachment pointing at its text message,
/// including ones whose content is not loaded yet.
pub fn build_turns(
    thread_id: &str,
    text_messages: &[TextMessage],
    media: &[MediaAttachment],
) -> Vec<ConversationTurn> {
    let mut turns: Vec<ConversationTurn> = text_messages
        .iter()
        .filter(|m| m.thread_id == thread_id)
        .map(|text_message| ConversationTurn {
            media_messages: media
                .iter()
                .filter(|a| a.record.ai_text_message_id == text_message.id)
                .cloned()
                .collect(),
            text_message: text_message.clone(),
        })
        .collect();

    turns.sort_by_key(|turn| turn.text_message.created);
    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::{timestamp, FileContent, MediaMessage, MessageRole};

    fn text(id: &str, thread: &str, created: &str) -> TextMessage {
        let created = timestamp::parse(created).unwrap();
        TextMessage {
            collection_id: None,
            collection_name: None,
            id: id.to_string(),
            thread_id: thread.to_string(),
            role: MessageRole::User,
            content_text: format!("message {id}"),
            created,
            updated: created,
        }
    }

    fn attachment(id: &str, text_id: &str, resolved: bool) -> MediaAttachment {
        let created = timestamp::parse("2024-05-01 10:00:00.000Z").unwrap();
        MediaAttachment {
            record: MediaMessage {
                collection_id: None,
                collection_name: None,
                id: id.to_string(),
                thread_id: "t1".to_string(),
                ai_text_message_id: text_id.to_string(),
                file: format!("{id}.png"),
                created,
                updated: created,
            },
            file: resolved.then(|| FileContent::new(format!("{id}.png"), "image/png", vec![1u8])),
        }
    }

    fn ids(turns: &[ConversationTurn]) -> Vec<&str> {
        turns.iter().map(|t| t.text_message.id.as_str()).collect()
    }

    #[test]
    fn test_ascending_regardless_of_input_order() {
        let messages = vec![
            text("t3", "t1", "2024-05-01 10:00:03.000Z"),
            text("t1", "t1", "2024-05-01T10:00:01Z"),
            text("t2", "t1", "2024-05-01 10:00:02.000Z"),
        ];
        assert_eq!(ids(&build_turns("t1", &messages, &[])), vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let messages = vec![
            text("b", "t1", "2024-05-01 10:00:00.000Z"),
            text("a", "t1", "2024-05-01 10:00:00.000Z"),
        ];
        assert_eq!(ids(&build_turns("t1", &messages, &[])), vec!["b", "a"]);
    }

    #[test]
    fn test_filters_by_thread() {
        let messages = vec![
            text("x", "other", "2024-05-01 10:00:00.000Z"),
            text("y", "t1", "2024-05-01 10:00:01.000Z"),
        ];
        assert_eq!(ids(&build_turns("t1", &messages, &[])), vec!["y"]);
    }

    #[test]
    fn test_attachments_include_unresolved() {
        let messages = vec![text("m1", "t1", "2024-05-01 10:00:00.000Z")];
        let media = vec![
            attachment("a1", "m1", true),
            attachment("a2", "m1", false),
            attachment("a3", "elsewhere", true),
        ];

        let turns = build_turns("t1", &messages, &media);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].media_messages.len(), 2);
        assert!(turns[0].media_messages[0].is_resolved());
        assert!(!turns[0].media_messages[1].is_resolved());
    }
}
