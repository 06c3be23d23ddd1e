use std::path::Path;

use async_trait::async_trait;

use crate::domain::{DomainError, Language, WalkOutcome};

/// The narrow filesystem interface the core ingestion pipeline consumes
/// (spec.md §6 "Consumed"). Implementations live in the connector layer;
/// git cloning, remote-host scanning, and credential handling are out of
/// scope and never reached through this trait.
#[async_trait]
pub trait FileSystemPort: Send + Sync {
    /// Walks `root`, honouring the ignore policy and size cap, returning
    /// every admitted file plus real skip counts (spec.md §7). Language
    /// awareness plays no part here — a non-parseable file is still a
    /// `File` node (spec.md §4.1/§4.3); the chunk planner is the one that
    /// decides which admitted files are worth sending to a parser.
    async fn walk_paths(&self, root: &Path) -> Result<WalkOutcome, DomainError>;

    /// Reads the UTF-8 content of the given repo-relative paths.
    /// Unreadable files are silently omitted from the result map
    /// (spec.md §6).
    async fn read_contents(
        &self,
        root: &Path,
        relative_paths: &[String],
    ) -> Result<std::collections::HashMap<String, String>, DomainError>;

    /// Whether `path` should be skipped under the repository-global
    /// ignore policy fixed at construction.
    fn ignore_policy(&self, path: &Path) -> bool;

    /// Infers the language of a file from its extension.
    fn language_for(&self, path: &Path) -> Language {
        Language::from_path(path)
    }
}
