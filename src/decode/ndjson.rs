//! NDJSON encoding and decoding of page items

use crate::error::{Error, Result};
use crate::protocol::{Cursor, Event, PageItem};
use crate::types::{Headers, PartitionId};
use bytes::{Bytes, BytesMut};
use serde_json::{json, Map, Value};

/// Content type of a page body
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Encode one page item as a newline-terminated JSON line
pub fn encode_item(item: &PageItem) -> Result<Bytes> {
    let mut line = match item {
        PageItem::Event(event) => serde_json::to_vec(event)?,
        PageItem::Checkpoint(cursor) => serde_json::to_vec(cursor)?,
    };
    line.push(b'\n');
    Ok(Bytes::from(line))
}

/// Encode the line that terminates a page whose producer failed
pub fn encode_error(error: &Error) -> Bytes {
    let line = json!({
        "error": error.to_string(),
        "status": error.status_code(),
    });
    Bytes::from(format!("{line}\n"))
}

/// Decode one line of a page body.
///
/// Blank lines yield `None`. An error line yields `Error::Api`.
pub fn decode_line(line: &str) -> Result<Option<PageItem>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(line)
        .map_err(|e| Error::decode(format!("invalid JSON line: {e}")))?;
    let Value::Object(mut object) = value else {
        return Err(Error::decode("expected a JSON object per line"));
    };

    if let Some(error) = object.remove("error") {
        return Err(decode_error(error, &object));
    }

    let partition = object
        .get("partition")
        .and_then(Value::as_u64)
        .and_then(|p| PartitionId::try_from(p).ok())
        .ok_or_else(|| Error::decode("missing or invalid partition"))?;

    if let Some(cursor) = object.remove("cursor") {
        let token = match cursor {
            Value::String(token) => token,
            Value::Number(n) => n.to_string(),
            other => return Err(Error::decode(format!("invalid cursor: {other}"))),
        };
        return Ok(Some(PageItem::Checkpoint(Cursor::new(partition, token))));
    }

    let headers = match object.remove("headers") {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            serde_json::from_value::<Headers>(value)
                .map_err(|e| Error::decode(format!("invalid headers: {e}")))?,
        ),
    };
    let data = object.remove("data").unwrap_or(Value::Null);

    Ok(Some(PageItem::Event(Event::new(partition, headers, data))))
}

fn decode_error(error: Value, object: &Map<String, Value>) -> Error {
    let status = object
        .get("status")
        .and_then(Value::as_u64)
        .and_then(|s| u16::try_from(s).ok())
        .unwrap_or(500);
    let message = match error {
        Value::String(message) => message,
        other => other.to_string(),
    };
    Error::api(status, message)
}

/// Longest line a `LineDecoder` buffers by default (16 MiB)
pub const DEFAULT_MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Incremental decoder for a chunked page body.
///
/// Chunks are fed as they arrive; complete lines are decoded in order so that
/// items before a malformed line are still delivered.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: BytesMut,
    /// Prefix of `buffer` already searched for a newline
    scanned: usize,
    max_line_bytes: usize,
    lines: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self {
            buffer: BytesMut::new(),
            scanned: 0,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            lines: 0,
        }
    }
}

impl LineDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the longest line accepted before decoding fails
    #[must_use]
    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max;
        self
    }

    /// Append a body chunk
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Decode the next complete line, if any
    pub fn next_item(&mut self) -> Result<Option<PageItem>> {
        loop {
            let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') else {
                self.scanned = self.buffer.len();
                if self.scanned > self.max_line_bytes {
                    return Err(Error::decode(format!(
                        "line {} exceeds {} bytes",
                        self.lines + 1,
                        self.max_line_bytes
                    )));
                }
                return Ok(None);
            };

            let line = self.buffer.split_to(self.scanned + offset + 1);
            self.scanned = 0;
            if line.len() > self.max_line_bytes + 1 {
                return Err(Error::decode(format!(
                    "line {} exceeds {} bytes",
                    self.lines + 1,
                    self.max_line_bytes
                )));
            }
            if let Some(item) = self.decode_bytes(&line)? {
                return Ok(Some(item));
            }
        }
    }

    /// Decode whatever remains once the body has ended
    pub fn finish(&mut self) -> Result<Option<PageItem>> {
        if let Some(item) = self.next_item()? {
            return Ok(Some(item));
        }
        let rest = self.buffer.split();
        self.scanned = 0;
        self.decode_bytes(&rest)
    }

    /// Number of lines consumed so far
    pub fn lines(&self) -> usize {
        self.lines
    }

    fn decode_bytes(&mut self, bytes: &[u8]) -> Result<Option<PageItem>> {
        if bytes.is_empty() {
            return Ok(None);
        }
        self.lines += 1;
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::decode(format!("line {} is not UTF-8: {e}", self.lines)))?;
        decode_line(text).map_err(|e| match e {
            Error::Decode { message } => {
                Error::decode(format!("line {}: {message}", self.lines))
            }
            other => other,
        })
    }
}
