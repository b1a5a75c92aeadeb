use anyhow::Result;

use crate::traits::{ChatClient, ChatOptions, ChatRequest};
use crate::types::ProviderMessage;

pub const TITLE_SYSTEM_PROMPT: &str = "You name conversations. Reply with a short, specific title \
(at most six words) for the conversation so far. Reply with the title only: no quotes, no \
punctuation at the end, no preamble.";

const TITLE_INSTRUCTION: &str = "Give this conversation a title.";
const TITLE_MAX_TOKENS: u32 = 64;
const TITLE_MAX_CHARS: usize = 80;

/// Ask the provider for a thread title
///
/// Attachments are stripped from the history; the text is enough to name
/// the conversation.
pub async fn generate_title(
    client: &dyn ChatClient,
    model: &str,
    history: &[ProviderMessage],
) -> Result<String> {
    let mut messages: Vec<ProviderMessage> = history
        .iter()
        .map(ProviderMessage::text_only)
        .filter(|m| !m.content.is_empty())
        .collect();
    messages.push(ProviderMessage::user(TITLE_INSTRUCTION));

    let request = ChatRequest::new(model, messages).with_options(
        ChatOptions::new()
            .system(TITLE_SYSTEM_PROMPT)
            .max_tokens(TITLE_MAX_TOKENS),
    );

    let response = client.chat(request).await?;
    let raw = response
        .content
        .ok_or_else(|| anyhow::anyhow!("Title response had no text"))?;

    clean_title(&raw).ok_or_else(|| anyhow::anyhow!("Title response was empty"))
}

/// First non-empty line, unquoted and length-capped
pub fn clean_title(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line
        .trim_start_matches(&['"', '\'', '#', ' '][..])
        .trim_end_matches(&['"', '\'', '.', ' '][..]);

    if line.is_empty() {
        return None;
    }

    Some(line.chars().take(TITLE_MAX_CHARS).collect())
}
