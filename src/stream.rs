//! Producer side of the enhancer stream.
//!
//! [`stream_text`] rewrites the latest user message into a cleaned-up
//! prompt and serves it as a one-event SSE body, the format
//! [`StreamAssembler`](crate::assembler::StreamAssembler) consumes.

use itertools::Itertools;
use serde_json::json;

use crate::model::{FinishReason, Message, Role};
use crate::source::{from_chunks, ByteStream};
use crate::sse::encode_data_line;

const EMPTY_PROMPT: &str = "No prompt provided.";

/// Result of [`stream_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamText {
    text: String,
    finish: FinishReason,
}

impl StreamText {
    /// The full generated text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn finish_reason(&self) -> FinishReason {
        self.finish
    }

    /// Serve the text as a single SSE event:
    /// `data: {"type":"text","value":"..."}`.
    pub fn into_sse_body(self) -> ByteStream {
        let payload = json!({ "type": "text", "value": self.text }).to_string();
        from_chunks([encode_data_line(&payload)])
    }
}

/// Build the improved prompt for a conversation.
///
/// Only the latest user message counts. Its lines are trimmed, blank lines
/// dropped, and the rest joined with single spaces.
///
/// # Example
/// ```
/// use streamtext::model::Message;
/// use streamtext::stream::stream_text;
///
/// let result = stream_text(&[Message::user("  fix\n\n  the login page ")]);
/// assert_eq!(result.text(), "Please assist with: fix the login page");
/// ```
pub fn stream_text(messages: &[Message]) -> StreamText {
    let latest = messages
        .iter()
        .rev()
        .find(|message| message.role == Role::User)
        .map(|message| message.content.as_str())
        .unwrap_or_default();

    let normalized = latest
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .join(" ");

    let text = if normalized.is_empty() {
        EMPTY_PROMPT.to_string()
    } else {
        format!("Please assist with: {normalized}")
    };

    StreamText {
        text,
        finish: FinishReason::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{ParseOptions, StreamAssembler};
    use futures::StreamExt;

    #[test]
    fn test_uses_latest_user_message() {
        let messages = [
            Message::user("first"),
            Message::assistant("reply"),
            Message::user("second\nline"),
            Message::assistant("another reply"),
        ];
        let result = stream_text(&messages);
        assert_eq!(result.text(), "Please assist with: second line");
        assert_eq!(result.finish_reason(), FinishReason::Stop);
    }

    #[test]
    fn test_empty_prompt() {
        assert_eq!(stream_text(&[]).text(), EMPTY_PROMPT);
        assert_eq!(stream_text(&[Message::user(" \n\t\n")]).text(), EMPTY_PROMPT);
        assert_eq!(stream_text(&[Message::system("rules")]).text(), EMPTY_PROMPT);
    }

    #[tokio::test]
    async fn test_sse_body_is_one_event() {
        let mut body = stream_text(&[Message::user("hi")]).into_sse_body();
        let chunk = body.next().await.unwrap().unwrap();
        assert_eq!(
            chunk,
            "data: {\"type\":\"text\",\"value\":\"Please assist with: hi\"}\n\n"
        );
        assert!(body.next().await.is_none());
    }

    #[tokio::test]
    async fn test_sse_body_assembles_back_to_text() {
        let result = stream_text(&[Message::user("quote \"this\"\n  and ünïcode")]);
        let expected = result.text().to_string();

        let assembler = StreamAssembler::new();
        let text = assembler
            .parse(result.into_sse_body(), ParseOptions::new())
            .await
            .unwrap();
        assert_eq!(text, expected);
    }
}
