//! Byte-level key/value storage
//!
//! The SQL layer (`sql::engine`) encodes tables and rows into keys and values
//! and stores them through the [`engine::Engine`] trait defined here.

pub mod engine;
pub mod memory;
