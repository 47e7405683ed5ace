//! Page body codec
//!
//! A page travels as NDJSON: one JSON object per line, either an event
//! (`{"partition", "headers"?, "data"}`), a checkpoint (`{"partition", "cursor"}`)
//! or, as the last line of a failed page, an error (`{"error", "status"}`).
//!
//! # Overview
//!
//! - `encode_item` / `encode_error` - producer side, one line each
//! - `decode_line` - consumer side, one line at a time
//! - `LineDecoder` - reassembles lines split across body chunks

mod ndjson;

pub use ndjson::{
    decode_line, encode_error, encode_item, LineDecoder, DEFAULT_MAX_LINE_BYTES,
    NDJSON_CONTENT_TYPE,
};
