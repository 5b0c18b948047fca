//! Tri-state JSON parsing over a partially received buffer.

use serde_json::Value;

/// Result of trying to read one JSON value from the front of a buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// A whole value was read; `consumed` is the byte offset just past it.
    Complete { value: Value, consumed: usize },
    /// The buffer is empty, whitespace, or ends before the value does.
    Incomplete,
    /// The buffer can never become valid JSON by appending more text.
    Malformed(String),
}

/// Read the first JSON value in `buffer`.
///
/// With `at_end == false` a bare number that runs up to the end of the buffer
/// is reported as `Incomplete`, since further digits may still arrive.
pub fn parse_leading(buffer: &str, at_end: bool) -> ParseOutcome {
    let mut values = serde_json::Deserializer::from_str(buffer).into_iter::<Value>();

    match values.next() {
        None => ParseOutcome::Incomplete,
        Some(Ok(value)) => {
            let consumed = values.byte_offset();
            if !at_end && value.is_number() && consumed == buffer.len() {
                ParseOutcome::Incomplete
            } else {
                ParseOutcome::Complete { value, consumed }
            }
        }
        Some(Err(e)) if e.is_eof() => ParseOutcome::Incomplete,
        Some(Err(e)) => ParseOutcome::Malformed(e.to_string()),
    }
}

/// Parse `text` as exactly one JSON value (surrounding whitespace allowed).
pub fn parse_whole(text: &str) -> ParseOutcome {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => ParseOutcome::Complete {
            value,
            consumed: text.len(),
        },
        Err(e) if e.is_eof() => ParseOutcome::Incomplete,
        Err(e) => ParseOutcome::Malformed(e.to_string()),
    }
}
