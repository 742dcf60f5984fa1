//! Deterministic, pure logic shared by the pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on text and
//! in-memory data and return deterministic outputs suitable for tests.

pub mod context;
pub mod entry;
pub mod extract;
pub mod sanitize;
pub mod types;
