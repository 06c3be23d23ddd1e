//! # Connector Layer
//!
//! External integrations implementing application-layer ports:
//! - File system scanning (gitignore-aware walk via the `ignore` crate)
//! - Tree-sitter parsing/extraction, pooled across worker threads
//! - Graph snapshot storage (JSONL, standing in for a database)

pub mod adapter;

pub use adapter::*;
