//! Streaming response parser
//!
//! Rebuilds complete JSON values from the text fragments of a streamed
//! completion and re-emits each one as a server-sent event the moment it
//! closes. Nothing here inspects the values themselves; the only question
//! asked of the buffer is whether it holds syntactically complete JSON.

mod consume;
mod event;
mod fragment;
mod parse;
mod parser;

pub use consume::{consume, consume_stream, SseEvents};
pub use event::{to_canonical_json, SseEvent};
pub use fragment::Fragment;
pub use parse::{parse_leading, parse_whole, ParseOutcome};
pub use parser::{FramingPolicy, ParserState, StreamParser};
