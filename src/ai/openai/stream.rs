//! Decoding of OpenAI's streamed completion body into fragments.
//!
//! The body is itself an SSE stream: one `data: {chunk}` line per token
//! batch, terminated by `data: [DONE]`. This is the only place that knows the
//! provider's chunk schema; everything downstream sees plain [`Fragment`]s.

use super::types::ChatCompletionChunk;
use crate::ai::FragmentStream;
use crate::stream::Fragment;
use crate::{Error, Result};
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

/// Splits a byte stream into lines, holding back any unterminated tail
/// (including one cut in the middle of a UTF-8 sequence) until more bytes
/// arrive.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            lines.push(decode_line(&line));
        }
        lines
    }

    /// Whatever is left after the body ends, if anything.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            let rest = std::mem::take(&mut self.buf);
            Some(decode_line(&rest))
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

#[derive(Debug, PartialEq)]
pub enum UpstreamLine {
    Fragment(Fragment),
    Done,
    Skip,
}

/// Interpret one line of the upstream body.
pub fn decode_sse_line(line: &str) -> Result<UpstreamLine> {
    let Some(data) = line.strip_prefix("data:") else {
        // Blank separators, comments, `event:` and `id:` fields.
        return Ok(UpstreamLine::Skip);
    };

    let data = data.trim();
    if data == "[DONE]" {
        return Ok(UpstreamLine::Done);
    }
    if data.is_empty() {
        return Ok(UpstreamLine::Skip);
    }

    let chunk: ChatCompletionChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            warn!("Unexpected chunk format from OpenAI ({}): {}", e, data);
            return Ok(UpstreamLine::Skip);
        }
    };

    if let Some(error) = chunk.error {
        return Err(Error::AiProvider(match error.error_type {
            Some(error_type) => {
                format!("OpenAI stream error ({}): {}", error_type, error.message)
            }
            None => format!("OpenAI stream error: {}", error.message),
        }));
    }

    if let Some(reason) = chunk.finish_reason() {
        debug!("OpenAI completion finished: {}", reason);
    }

    Ok(UpstreamLine::Fragment(chunk.into_fragment()))
}

/// Turn a raw response body into the fragment sequence of one completion.
pub fn fragments_from_sse<S, B, E>(body: S) -> FragmentStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    let stream = async_stream::stream! {
        futures::pin_mut!(body);
        let mut decoder = LineDecoder::default();
        let mut done = false;

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err::<Fragment, Error>(e.into());
                    return;
                }
            };

            for line in decoder.push(chunk.as_ref()) {
                match decode_sse_line(&line) {
                    Ok(UpstreamLine::Fragment(fragment)) => {
                        yield Ok(fragment);
                    }
                    Ok(UpstreamLine::Skip) => {}
                    Ok(UpstreamLine::Done) => {
                        done = true;
                        break;
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            if done {
                break;
            }
        }

        if done {
            debug!("OpenAI stream finished");
            return;
        }

        if let Some(line) = decoder.finish() {
            match decode_sse_line(&line) {
                Ok(UpstreamLine::Fragment(fragment)) => {
                    yield Ok(fragment);
                }
                Ok(_) => {}
                Err(e) => {
                    yield Err(e);
                }
            }
        }
        debug!("OpenAI stream closed without [DONE]");
    };

    Box::pin(stream)
}
