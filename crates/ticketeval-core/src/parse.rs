//! Raw model text to [`Ticket`]
//!
//! Parsing never fails hard: every input yields either a ticket or a typed
//! [`ParseError`] whose code is recorded on the sample.

use std::fmt;

use serde_json::Value;

use crate::ticket::Ticket;

const FENCE: &str = "```";

/// Why raw output could not be turned into a ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing left after trimming and fence removal
    EmptyOutput,
    /// Not valid JSON; carries the decoder's message
    JsonParse(String),
    /// Valid JSON, but not an object
    NotObject,
}

impl ParseError {
    /// Stable error code, e.g. `json_parse_error:<detail>`
    pub fn code(&self) -> String {
        match self {
            ParseError::EmptyOutput => "empty_output".to_string(),
            ParseError::JsonParse(detail) => format!("json_parse_error:{}", detail),
            ParseError::NotObject => "json_not_object".to_string(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// Remove one wrapping code fence. Both the first and the last line must start
/// with the fence marker; interior lines are kept verbatim.
pub fn strip_code_fences(raw: &str) -> &str {
    let s = raw.trim();
    if !s.starts_with(FENCE) {
        return s;
    }

    let lines: Vec<&str> = s.lines().collect();
    let (Some(first), Some(last)) = (lines.first(), lines.last()) else {
        return s;
    };

    if lines.len() >= 2 && first.starts_with(FENCE) && last.starts_with(FENCE) {
        // Interior spans from the end of the first line to the start of the last
        let start = first.len();
        let end = s.len() - last.len();
        if start <= end {
            return s[start..end].trim();
        }
    }

    s
}

/// Decode model output into a ticket object
pub fn parse_ticket(raw: &str) -> Result<Ticket, ParseError> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(ParseError::EmptyOutput);
    }

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => Ok(Ticket::new(fields)),
        Ok(_) => Err(ParseError::NotObject),
        Err(e) => Err(ParseError::JsonParse(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_json_object() {
        let ticket = parse_ticket(r#"{"title": "Crash"}"#).unwrap();
        assert_eq!(ticket.title(), Some("Crash"));
    }

    #[test]
    fn test_fenced_equals_raw() {
        let raw = "{\n  \"title\": \"Crash\",\n  \"steps\": [\"a\", \"b\"]\n}";
        let fenced = format!("```json\n{}\n```", raw);
        assert_eq!(parse_ticket(&fenced), parse_ticket(raw));
        assert!(parse_ticket(&fenced).is_ok());
    }

    #[test]
    fn test_fence_with_surrounding_whitespace() {
        let fenced = "  \n```\n{\"a\": 1}\n```  \n";
        assert!(parse_ticket(fenced).is_ok());
    }

    #[test]
    fn test_single_line_fence_is_left_alone() {
        let err = parse_ticket("```{\"a\": 1}```").unwrap_err();
        assert!(matches!(err, ParseError::JsonParse(_)));
    }

    #[test]
    fn test_fence_without_closing_line_is_left_alone() {
        let err = parse_ticket("```json\n{\"a\": 1}").unwrap_err();
        assert!(matches!(err, ParseError::JsonParse(_)));
    }

    #[test]
    fn test_interior_content_preserved() {
        let fenced = "```json\n{\"log\": \"line1\\n```inner\"}\n```";
        assert_eq!(
            strip_code_fences(fenced),
            "{\"log\": \"line1\\n```inner\"}"
        );
    }

    #[test]
    fn test_empty_output() {
        assert_eq!(parse_ticket(""), Err(ParseError::EmptyOutput));
        assert_eq!(parse_ticket("   \n "), Err(ParseError::EmptyOutput));
        assert_eq!(parse_ticket("```\n```"), Err(ParseError::EmptyOutput));
    }

    #[test]
    fn test_not_json() {
        let err = parse_ticket("not json").unwrap_err();
        assert!(err.code().starts_with("json_parse_error:"));
    }

    #[test]
    fn test_not_object() {
        assert_eq!(parse_ticket("[1, 2]"), Err(ParseError::NotObject));
        assert_eq!(parse_ticket("\"text\""), Err(ParseError::NotObject));
        assert_eq!(parse_ticket("null").unwrap_err().code(), "json_not_object");
    }
}
