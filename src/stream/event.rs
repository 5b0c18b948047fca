//! SSE events and the canonical JSON encoding they carry.

use crate::{Error, Result};
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;
use std::fmt;
use std::io;

/// One server-sent event wrapping a single JSON value.
///
/// On the wire this is exactly `data: <json>\n\n`, with no event name, id or
/// retry field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    data: String,
}

impl SseEvent {
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Self {
            data: to_canonical_json(value)?,
        })
    }

    /// The canonical JSON text carried by this event.
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn into_data(self) -> String {
        self.data
    }

    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data: {}\n\n", self.data)
    }
}

/// Serialize `value` on a single line with `", "` / `": "` separators,
/// original key order, and every non-ASCII character escaped as `\uXXXX`.
pub fn to_canonical_json(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, CanonicalFormatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| Error::Generic(format!("Non UTF-8 JSON output: {}", e)))
}

struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }

        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}
