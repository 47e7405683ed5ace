//! Protocol module
//!
//! Value types shared by the producer and consumer sides of a feed.
//!
//! # Overview
//!
//! - `Cursor` - partition-scoped opaque resumption token, with the
//!   `FIRST_CURSOR` / `LAST_CURSOR` sentinels
//! - `Event` - one partition-ordered payload
//! - `PageItem` - an event or a checkpoint, as emitted within a page
//! - `HeaderSelection` - which event headers a client asks for
//! - `PageRequest` - partition count, starting cursors, header selection and
//!   page size hint for one page
//! - `PageBudget` - per-partition bound on a page

mod request;
mod types;

pub use request::PageRequest;
pub use types::{
    Cursor, Event, HeaderSelection, PageBudget, PageItem, ALL_HEADERS, FIRST_CURSOR, LAST_CURSOR,
};
