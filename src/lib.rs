//! # GitNexus
//!
//! A code-knowledge-graph ingestion pipeline: scans a repository, parses it
//! with tree-sitter, resolves imports/calls/inheritance into a typed graph,
//! and detects communities and call-chain "processes" within it.
//!
//! ## Architecture
//!
//! Organized following hexagonal/clean-architecture principles:
//!
//! - `domain`: entities, value objects, the closed enums, `DomainError`.
//! - `application`: the six ingestion phases as use cases, plus the ports
//!   the connector layer implements and the orchestrator that sequences them.
//! - `connector`: adapters — gitignore-aware file system scanning, the
//!   tree-sitter extractor and its worker pool, a JSONL graph sink.

pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use application::*;
pub use connector::*;
pub use domain::*;
