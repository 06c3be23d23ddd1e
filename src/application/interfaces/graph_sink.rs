use async_trait::async_trait;

use crate::domain::{DomainError, GraphSnapshot};

/// Port for the downstream storage adapter (spec.md §1 "Out of scope":
/// embedded database engine). The core pipeline only ever hands a
/// finished [`GraphSnapshot`] across this boundary — it never queries or
/// mutates the database itself, matching the teacher's pattern of
/// depending on `*Repository` traits (e.g. `CallGraphRepository`) rather
/// than a concrete database type.
#[async_trait]
pub trait GraphSink: Send + Sync {
    async fn write_snapshot(&self, snapshot: &GraphSnapshot) -> Result<(), DomainError>;
}
