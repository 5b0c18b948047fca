//! Lazy, pull-driven event sequences over a fragment source.
//!
//! Both adapters take the [`StreamParser`] by value: a sequence is single-pass
//! and cannot be restarted, mirroring the one-shot upstream response it wraps.

use super::event::SseEvent;
use super::fragment::Fragment;
use super::parser::{ParserState, StreamParser};
use futures::{Stream, StreamExt};
use std::collections::VecDeque;

/// Consume a blocking fragment sequence with the default framing policy.
pub fn consume<I>(fragments: I) -> SseEvents<I::IntoIter>
where
    I: IntoIterator,
    I::Item: Into<Fragment>,
{
    StreamParser::new().events(fragments)
}

/// Consume an asynchronous fragment sequence with the default framing policy.
///
/// An upstream error is yielded once and ends the sequence; events produced
/// before it remain valid and a partially buffered value is never emitted.
pub fn consume_stream<S, F, E>(fragments: S) -> impl Stream<Item = Result<SseEvent, E>>
where
    S: Stream<Item = Result<F, E>>,
    F: Into<Fragment>,
{
    StreamParser::new().into_stream(fragments)
}

impl StreamParser {
    /// Wrap this parser around a blocking fragment source.
    pub fn events<I>(self, fragments: I) -> SseEvents<I::IntoIter>
    where
        I: IntoIterator,
        I::Item: Into<Fragment>,
    {
        SseEvents {
            parser: self,
            fragments: fragments.into_iter(),
            pending: VecDeque::new(),
        }
    }

    /// Wrap this parser around an asynchronous fragment source.
    pub fn into_stream<S, F, E>(mut self, fragments: S) -> impl Stream<Item = Result<SseEvent, E>>
    where
        S: Stream<Item = Result<F, E>>,
        F: Into<Fragment>,
    {
        async_stream::stream! {
            futures::pin_mut!(fragments);

            while let Some(fragment) = fragments.next().await {
                let fragment: Fragment = match fragment {
                    Ok(fragment) => fragment.into(),
                    Err(e) => {
                        yield Err::<SseEvent, E>(e);
                        return;
                    }
                };
                for event in self.feed(&fragment) {
                    yield Ok(event);
                }
            }

            for event in self.finish() {
                yield Ok(event);
            }
        }
    }
}

/// Iterator returned by [`StreamParser::events`].
///
/// Each call to `next` pulls fragments only until at least one event is ready.
#[derive(Debug)]
pub struct SseEvents<I> {
    parser: StreamParser,
    fragments: I,
    pending: VecDeque<SseEvent>,
}

impl<I> SseEvents<I> {
    pub fn parser(&self) -> &StreamParser {
        &self.parser
    }
}

impl<I> Iterator for SseEvents<I>
where
    I: Iterator,
    I::Item: Into<Fragment>,
{
    type Item = SseEvent;

    fn next(&mut self) -> Option<SseEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.parser.state() == ParserState::Drained {
                return None;
            }

            match self.fragments.next() {
                Some(fragment) => {
                    let events = self.parser.feed(&fragment.into());
                    self.pending.extend(events);
                }
                None => {
                    let events = self.parser.finish();
                    self.pending.extend(events);
                }
            }
        }
    }
}
