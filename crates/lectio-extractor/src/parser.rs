//! Locate and parse the JSON payload in an oracle reply
//!
//! Oracles wrap JSON in code fences or surround it with prose despite being
//! told not to. `extract_json` finds the most plausible JSON substring; the
//! caller deserializes it and reports a parse error if the guess was wrong.

use crate::error::ExtractorError;
use serde::de::DeserializeOwned;

const FENCE: &str = "```";

/// Find the JSON substring of a complete reply
///
/// Attempts, in order: fenced block content starting with `{` or `[`; the
/// span from the first `{` to the last `}`; the span from the first `[` to
/// the last `]` when no `{` comes before it; the trimmed text itself.
pub fn extract_json(response: &str) -> &str {
    if let Some(fenced) = fenced_block(response) {
        if starts_like_json(fenced) {
            return fenced;
        }
    }

    let first_brace = response.find('{');
    if let (Some(start), Some(end)) = (first_brace, response.rfind('}')) {
        if start < end {
            return &response[start..=end];
        }
    }

    if let (Some(start), Some(end)) = (response.find('['), response.rfind(']')) {
        let brace_first = first_brace.is_some_and(|brace| brace < start);
        if start < end && !brace_first {
            return &response[start..=end];
        }
    }

    response.trim()
}

/// Find the JSON substring of a reply that was cut off
///
/// Same fence handling as [`extract_json`], but the closing delimiter is
/// missing by definition, so the payload runs from the first `{` or `[` to
/// the end of the text.
pub fn extract_truncated_json(response: &str) -> &str {
    if let Some(fenced) = fenced_block(response) {
        if starts_like_json(fenced) {
            return fenced;
        }
    }

    match response.find(['{', '[']) {
        Some(start) => response[start..].trim_end(),
        None => response.trim(),
    }
}

/// Extract and deserialize the JSON payload of a reply
pub fn parse_json<T: DeserializeOwned>(response: &str) -> Result<T, ExtractorError> {
    let json = extract_json(response);
    Ok(serde_json::from_str(json)?)
}

/// Content of the first fenced code block; an unclosed fence runs to the end
fn fenced_block(response: &str) -> Option<&str> {
    let open = response.find(FENCE)?;
    let after_fence = &response[open + FENCE.len()..];
    // Skip the info string ("json", "JSON", ...)
    let body = match after_fence.find('\n') {
        Some(newline) => &after_fence[newline + 1..],
        None => after_fence,
    };
    let content = match body.find(FENCE) {
        Some(close) => &body[..close],
        None => body,
    };
    Some(content.trim())
}

fn starts_like_json(text: &str) -> bool {
    text.starts_with('{') || text.starts_with('[')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_raw_json() {
        assert_eq!(extract_json(r#"  {"title": "Ruth"} "#), r#"{"title": "Ruth"}"#);
    }

    #[test]
    fn test_fenced_json() {
        let response = "Here you go:\n```json\n{\"title\": \"Ruth\"}\n```\nEnjoy!";
        assert_eq!(extract_json(response), r#"{"title": "Ruth"}"#);
    }

    #[test]
    fn test_fence_without_language_tag() {
        let response = "```\n[1, 2]\n```";
        assert_eq!(extract_json(response), "[1, 2]");
    }

    #[test]
    fn test_non_json_fence_is_skipped() {
        let response = "```text\nnotes\n```\n{\"title\": \"Ruth\"}";
        assert_eq!(extract_json(response), r#"{"title": "Ruth"}"#);
    }

    #[test]
    fn test_prose_wrapped_object() {
        let response = r#"Sure! The study is {"title": "Ruth", "weeks": []} as requested."#;
        let value: Value = parse_json(response).unwrap();
        assert_eq!(value["title"], "Ruth");
    }

    #[test]
    fn test_array_only_when_no_brace_precedes() {
        assert_eq!(extract_json("Result: [1, 2, 3] done"), "[1, 2, 3]");
        // Brace span wins when an object starts first
        let response = r#"{"a": [1]} and [2]"#;
        assert_eq!(extract_json(response), r#"{"a": [1]}"#);
    }

    #[test]
    fn test_array_of_objects() {
        let response = r#"Here: [{"a": 1}, {"a": 2}]"#;
        // The first '[' precedes the first '{', but the brace span is tried first
        assert_eq!(extract_json(response), r#"{"a": 1}, {"a": 2}"#);
        assert!(parse_json::<Value>(response).is_err());
    }

    #[test]
    fn test_no_json_returns_trimmed_text() {
        assert_eq!(extract_json("  I cannot help with that.  "), "I cannot help with that.");
        let result = parse_json::<Value>("I cannot help with that.");
        assert!(matches!(result, Err(ExtractorError::JsonParse(_))));
    }

    #[test]
    fn test_truncated_keeps_tail() {
        let response = "```json\n{\"weeks\": [{\"title\": \"A\"}, {\"title\": \"B";
        assert_eq!(
            extract_truncated_json(response),
            "{\"weeks\": [{\"title\": \"A\"}, {\"title\": \"B"
        );

        let response = "Output: {\"weeks\": [{\"days\": [], \"title\": \"W\"";
        assert_eq!(
            extract_truncated_json(response),
            "{\"weeks\": [{\"days\": [], \"title\": \"W\""
        );
    }
}
