//! Server-Sent Events (SSE) line codec.
//!
//! Generation backends stream their output either as plain text or as
//! SSE events whose `data:` payload carries the next piece of text:
//! ```text
//! data: "Hello"
//!
//! data: {"type": "text", "value": " world"}
//!
//! data: [DONE]
//! ```
//!
//! This module handles single lines; chunk reassembly lives in
//! [`crate::assembler`].

use std::borrow::Cow;

use serde_json::Value;
use tracing::debug;

/// Field prefix marking an SSE data line.
pub const DATA_PREFIX: &str = "data:";

/// Payload a producer sends to mark the end of the stream.
pub const DONE_MARKER: &str = "[DONE]";

/// Parse an SSE line to extract the data portion.
///
/// The line is trimmed first; whitespace after the `data:` prefix is dropped.
///
/// # Example
/// ```
/// use streamtext::sse::parse_sse_line;
///
/// let line = "data: {\"key\": \"value\"}";
/// assert_eq!(parse_sse_line(line), Some("{\"key\": \"value\"}"));
///
/// assert_eq!(parse_sse_line("data:tight"), Some("tight"));
/// assert_eq!(parse_sse_line("event: ping"), None);
/// ```
pub fn parse_sse_line(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix(DATA_PREFIX)
        .map(|s| s.trim_start())
}

/// Check if an SSE data payload indicates the stream is done.
///
/// # Example
/// ```
/// use streamtext::sse::is_done_marker;
///
/// assert!(is_done_marker("[DONE]"));
/// assert!(!is_done_marker(""));
/// assert!(!is_done_marker("{\"data\": \"value\"}"));
/// ```
pub fn is_done_marker(data: &str) -> bool {
    data == DONE_MARKER
}

/// Pick the text carried by one SSE payload.
///
/// A JSON string is used as-is. A JSON object contributes its string
/// `value` field, or failing that its string `text` field. Anything else,
/// including payloads that are not JSON at all, is taken verbatim.
///
/// # Example
/// ```
/// use streamtext::sse::extract_fragment;
///
/// assert_eq!(extract_fragment("\"hi\""), "hi");
/// assert_eq!(extract_fragment("{\"value\":\"foo\"}"), "foo");
/// assert_eq!(extract_fragment("{\"text\":\"bar\"}"), "bar");
/// assert_eq!(extract_fragment("not-json"), "not-json");
/// ```
pub fn extract_fragment(payload: &str) -> Cow<'_, str> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::String(text)) => Cow::Owned(text),
        Ok(Value::Object(mut fields)) => {
            for key in ["value", "text"] {
                if let Some(Value::String(text)) = fields.remove(key) {
                    return Cow::Owned(text);
                }
            }
            Cow::Borrowed(payload)
        }
        Ok(_) => Cow::Borrowed(payload),
        Err(e) => {
            debug!(error = %e, "SSE payload is not JSON, using it verbatim");
            Cow::Borrowed(payload)
        }
    }
}

/// Frame one payload as a complete SSE event.
///
/// # Example
/// ```
/// use streamtext::sse::encode_data_line;
///
/// assert_eq!(encode_data_line("[DONE]"), "data: [DONE]\n\n");
/// ```
pub fn encode_data_line(payload: &str) -> String {
    format!("{DATA_PREFIX} {payload}\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sse_line() {
        assert_eq!(parse_sse_line("data: hello"), Some("hello"));
        assert_eq!(
            parse_sse_line("data: {\"key\": \"value\"}"),
            Some("{\"key\": \"value\"}")
        );
        assert_eq!(parse_sse_line("data:   spaces  "), Some("spaces"));
        assert_eq!(parse_sse_line("   data: indented\r"), Some("indented"));
        assert_eq!(parse_sse_line("data:"), Some(""));
        assert_eq!(parse_sse_line("invalid"), None);
        assert_eq!(parse_sse_line(""), None);
    }

    #[test]
    fn test_is_done_marker() {
        assert!(is_done_marker("[DONE]"));
        assert!(!is_done_marker(""));
        assert!(!is_done_marker("data"));
        assert!(!is_done_marker("\"[DONE]\""));
    }

    #[test]
    fn test_extract_fragment_prefers_value_over_text() {
        assert_eq!(extract_fragment(r#"{"text":"t","value":"v"}"#), "v");
        assert_eq!(extract_fragment(r#"{"value":3,"text":"t"}"#), "t");
        assert_eq!(extract_fragment(r#"{"type":"text","value":"x"}"#), "x");
    }

    #[test]
    fn test_extract_fragment_falls_back_to_payload() {
        assert_eq!(extract_fragment(r#"{"other":"x"}"#), r#"{"other":"x"}"#);
        assert_eq!(extract_fragment("42"), "42");
        assert_eq!(extract_fragment("null"), "null");
        assert_eq!(extract_fragment("{broken"), "{broken");
    }

    #[test]
    fn test_extract_fragment_keeps_escapes_decoded() {
        assert_eq!(extract_fragment(r#""line\nbreak""#), "line\nbreak");
        assert_eq!(extract_fragment(r#""é""#), "é");
    }

    #[test]
    fn test_encode_then_parse() {
        let line = encode_data_line("\"chunk\"");
        let first = line.lines().next().unwrap();
        assert_eq!(parse_sse_line(first).map(extract_fragment).as_deref(), Some("chunk"));
    }
}
