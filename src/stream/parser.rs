//! Incremental extraction of JSON values from streamed text.

use super::event::SseEvent;
use super::fragment::Fragment;
use super::parse::{parse_leading, parse_whole, ParseOutcome};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// How buffered text is split into candidate JSON documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramingPolicy {
    /// Re-parse the buffer after every fragment and emit each value as soon as
    /// it closes, wherever the upstream happened to cut the text. Text that
    /// can never parse blocks everything after it until the final flush.
    Incremental,
    /// Treat `\n` as the object delimiter and parse each complete line on its
    /// own. Lines that fail to parse (prose, code fences) are dropped and the
    /// next line starts fresh.
    #[default]
    LineDelimited,
}

impl FromStr for FramingPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "incremental" => Ok(Self::Incremental),
            "line" | "lines" | "line-delimited" => Ok(Self::LineDelimited),
            other => Err(format!(
                "Unknown framing policy '{}'. Expected 'incremental' or 'line'",
                other
            )),
        }
    }
}

impl fmt::Display for FramingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incremental => write!(f, "incremental"),
            Self::LineDelimited => write!(f, "line"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Nothing buffered.
    Empty,
    /// Holding text that has not resolved into a value yet.
    Accumulating,
    /// The upstream ended and the final flush has run. Terminal.
    Drained,
}

/// Turns an ordered run of fragments into SSE events, one per JSON value.
///
/// A parser serves exactly one upstream response. The buffer only ever holds
/// the text received since the last emitted value.
#[derive(Debug)]
pub struct StreamParser {
    policy: FramingPolicy,
    buffer: String,
    state: ParserState,
    emitted: usize,
    failed_attempts: usize,
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamParser {
    pub fn new() -> Self {
        Self::with_policy(FramingPolicy::default())
    }

    pub fn with_policy(policy: FramingPolicy) -> Self {
        Self {
            policy,
            buffer: String::new(),
            state: ParserState::Empty,
            emitted: 0,
            failed_attempts: 0,
        }
    }

    pub fn policy(&self) -> FramingPolicy {
        self.policy
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Text received but not yet resolved into an emitted value.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Number of events produced so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Feed one fragment, returning every event it completes.
    ///
    /// Fragments without text are skipped. Once the parser is drained further
    /// input is ignored.
    pub fn feed(&mut self, fragment: &Fragment) -> Vec<SseEvent> {
        if self.state == ParserState::Drained {
            warn!("Fragment received after the stream was drained; ignoring");
            return Vec::new();
        }

        let Some(text) = fragment.text() else {
            debug!("Received an empty fragment; skipping");
            return Vec::new();
        };

        self.buffer.push_str(text);
        let events = match self.policy {
            FramingPolicy::Incremental => self.drain_values(false),
            FramingPolicy::LineDelimited => self.drain_lines(),
        };
        self.refresh_state();
        events
    }

    /// Flush whatever is left once the upstream is exhausted.
    ///
    /// Leftover text that still does not parse is logged and discarded. The
    /// parser is drained afterwards whether or not the flush produced anything.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        if self.state == ParserState::Drained {
            return Vec::new();
        }

        let events = match self.policy {
            FramingPolicy::Incremental => self.drain_values(true),
            FramingPolicy::LineDelimited => {
                let remainder = std::mem::take(&mut self.buffer);
                self.process_line(&remainder).into_iter().collect()
            }
        };

        if !self.buffer.trim().is_empty() {
            warn!(
                "Dropping unparseable content left in the buffer after {} failed attempts: {:?}",
                self.failed_attempts, self.buffer
            );
        }
        self.buffer.clear();
        self.state = ParserState::Drained;

        info!("Finished processing the stream, emitted {} events", self.emitted);
        events
    }

    fn drain_values(&mut self, at_end: bool) -> Vec<SseEvent> {
        let mut events = Vec::new();

        loop {
            match parse_leading(&self.buffer, at_end) {
                ParseOutcome::Complete { value, consumed } => {
                    self.buffer.drain(..consumed);
                    if self.buffer.trim().is_empty() {
                        self.buffer.clear();
                    }
                    if let Some(event) = self.emit(&value) {
                        events.push(event);
                    }
                }
                ParseOutcome::Incomplete => break,
                ParseOutcome::Malformed(reason) => {
                    // Indistinguishable from a truncated value for our
                    // purposes; keep buffering until the stream ends.
                    self.failed_attempts += 1;
                    debug!(
                        "JSON parsing failed, continuing to buffer data ({}): {:?}",
                        reason, self.buffer
                    );
                    break;
                }
            }
        }

        events
    }

    fn drain_lines(&mut self) -> Vec<SseEvent> {
        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        let remainder = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, remainder);

        complete
            .split('\n')
            .filter_map(|line| self.process_line(line))
            .collect()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match parse_whole(line) {
            ParseOutcome::Complete { value, .. } => self.emit(&value),
            ParseOutcome::Incomplete | ParseOutcome::Malformed(_) => {
                self.failed_attempts += 1;
                warn!("Dropping line that is not valid JSON: {:?}", line);
                None
            }
        }
    }

    fn emit(&mut self, value: &Value) -> Option<SseEvent> {
        match SseEvent::from_value(value) {
            Ok(event) => {
                self.emitted += 1;
                self.failed_attempts = 0;
                debug!("Parsed JSON object #{}: {}", self.emitted, event.data());
                Some(event)
            }
            Err(e) => {
                warn!("Failed to encode parsed value: {}", e);
                None
            }
        }
    }

    fn refresh_state(&mut self) {
        if self.buffer.trim().is_empty() {
            self.buffer.clear();
        }
        self.state = if self.buffer.is_empty() {
            ParserState::Empty
        } else {
            ParserState::Accumulating
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn feed_all(parser: &mut StreamParser, fragments: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        for fragment in fragments {
            out.extend(parser.feed(&Fragment::from(*fragment)).iter().map(|e| e.to_wire()));
        }
        out.extend(parser.finish().iter().map(|e| e.to_wire()));
        out
    }

    #[test]
    fn test_emits_as_soon_as_object_closes() {
        let mut parser = StreamParser::with_policy(FramingPolicy::Incremental);
        assert!(parser.feed(&Fragment::from("{\"question\": ")).is_empty());
        assert_eq!(parser.state(), ParserState::Accumulating);

        let events = parser.feed(&Fragment::from("\"Who?\"}"));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].to_wire(), "data: {\"question\": \"Who?\"}\n\n");
        assert_eq!(parser.state(), ParserState::Empty);
        assert_eq!(parser.buffered(), "");
    }

    #[test]
    fn test_end_to_end_scenario_both_policies() {
        for policy in [FramingPolicy::Incremental, FramingPolicy::LineDelimited] {
            let mut parser = StreamParser::with_policy(policy);
            let out = feed_all(&mut parser, &["{\"a\":1}", "\n{\"b\"", ":2}\n"]);
            assert_eq!(
                out,
                vec!["data: {\"a\": 1}\n\n", "data: {\"b\": 2}\n\n"],
                "policy {policy}"
            );
        }
    }

    #[test]
    fn test_malformed_trailing_content_is_dropped() {
        for policy in [FramingPolicy::Incremental, FramingPolicy::LineDelimited] {
            let mut parser = StreamParser::with_policy(policy);
            let out = feed_all(&mut parser, &["{\"a\":1}\n", "not-json"]);
            assert_eq!(out, vec!["data: {\"a\": 1}\n\n"], "policy {policy}");
            assert_eq!(parser.state(), ParserState::Drained);
        }
    }

    #[test]
    fn test_incremental_keeps_text_after_a_closed_object() {
        let mut parser = StreamParser::with_policy(FramingPolicy::Incremental);
        let events = parser.feed(&Fragment::from("{\"a\":1}\n{\"b\":"));
        assert_eq!(events.len(), 1);
        assert_eq!(parser.buffered(), "\n{\"b\":");

        let events = parser.feed(&Fragment::from("2}"));
        assert_eq!(events[0].data(), "{\"b\": 2}");
    }

    #[test]
    fn test_incremental_emits_several_objects_from_one_fragment() {
        let mut parser = StreamParser::with_policy(FramingPolicy::Incremental);
        let events = parser.feed(&Fragment::from("{\"a\":1}\n{\"b\":2}\n{\"c\":3}\n"));
        let data: Vec<&str> = events.iter().map(|e| e.data()).collect();
        assert_eq!(data, vec!["{\"a\": 1}", "{\"b\": 2}", "{\"c\": 3}"]);
        assert_eq!(parser.state(), ParserState::Empty);
    }

    #[test]
    fn test_line_delimited_waits_for_newline() {
        let mut parser = StreamParser::with_policy(FramingPolicy::LineDelimited);
        assert!(parser.feed(&Fragment::from("{\"a\":1}")).is_empty());
        assert_eq!(parser.buffered(), "{\"a\":1}");

        let events = parser.feed(&Fragment::from("\n"));
        assert_eq!(events.len(), 1);
        assert_eq!(parser.state(), ParserState::Empty);
    }

    #[test]
    fn test_line_delimited_skips_bad_line_and_recovers() {
        let mut parser = StreamParser::with_policy(FramingPolicy::LineDelimited);
        let out = feed_all(
            &mut parser,
            &["Here is your quiz:\n{\"a\"", ":1}\n\n{\"b\":2}"],
        );
        assert_eq!(out, vec!["data: {\"a\": 1}\n\n", "data: {\"b\": 2}\n\n"]);
    }

    #[test]
    fn test_final_flush_completes_trailing_number() {
        let mut parser = StreamParser::with_policy(FramingPolicy::Incremental);
        assert!(parser.feed(&Fragment::from("4")).is_empty());
        assert!(parser.feed(&Fragment::from("2")).is_empty());
        let events = parser.finish();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data(), "42");
    }

    #[test]
    fn test_empty_fragments_do_not_change_state() {
        let mut parser = StreamParser::new();
        assert!(parser.feed(&Fragment::empty()).is_empty());
        assert_eq!(parser.state(), ParserState::Empty);

        parser.feed(&Fragment::from("{\"a\""));
        assert!(parser.feed(&Fragment::from("")).is_empty());
        assert_eq!(parser.state(), ParserState::Accumulating);
        assert_eq!(parser.buffered(), "{\"a\"");
    }

    #[test]
    fn test_whitespace_only_buffer_is_empty() {
        for policy in [FramingPolicy::Incremental, FramingPolicy::LineDelimited] {
            let mut parser = StreamParser::with_policy(policy);
            assert!(parser.feed(&Fragment::from("\n")).is_empty());
            assert!(parser.feed(&Fragment::from("  \t")).is_empty());
            assert_eq!(parser.state(), ParserState::Empty, "policy {policy}");
            assert_eq!(parser.buffered(), "");

            let events = parser.feed(&Fragment::from("{\"a\":1}\n  "));
            assert_eq!(events.len(), 1);
            assert_eq!(parser.state(), ParserState::Empty, "policy {policy}");
        }
    }

    #[test]
    fn test_line_delimited_is_the_default() {
        assert_eq!(StreamParser::new().policy(), FramingPolicy::LineDelimited);
        let mut parser = StreamParser::new();
        let out = feed_all(
            &mut parser,
            &["```json\n", "{\"a\":1}\n", "{\"b\":2}\n", "```"],
        );
        assert_eq!(out, vec!["data: {\"a\": 1}\n\n", "data: {\"b\": 2}\n\n"]);
    }

    #[test]
    fn test_incremental_stalls_behind_unparseable_prefix() {
        let mut parser = StreamParser::with_policy(FramingPolicy::Incremental);
        let out = feed_all(
            &mut parser,
            &["```json\n", "{\"a\":1}\n", "{\"b\":2}\n", "```"],
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_drained_parser_ignores_input() {
        let mut parser = StreamParser::new();
        parser.finish();
        assert!(parser.feed(&Fragment::from("{\"a\":1}")).is_empty());
        assert!(parser.finish().is_empty());
        assert_eq!(parser.emitted(), 0);
    }

    #[test]
    fn test_framing_policy_from_str() {
        assert_eq!(
            "incremental".parse::<FramingPolicy>().unwrap(),
            FramingPolicy::Incremental
        );
        assert_eq!(
            " LINE ".parse::<FramingPolicy>().unwrap(),
            FramingPolicy::LineDelimited
        );
        assert!("bytes".parse::<FramingPolicy>().is_err());
    }
}
