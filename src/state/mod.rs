//! State management module
//!
//! Handles the consumer's cursor table and its persistence.
//! The table is saved between runs so a consumer resumes where its last
//! fully handled page ended.
//!
//! # Overview
//!
//! The state module provides:
//! - `CursorTable` - partition -> cursor mapping with update timestamp
//! - `CursorStore` - file-backed or in-memory store with atomic updates

mod store;
mod types;

pub use store::CursorStore;
pub use types::CursorTable;
