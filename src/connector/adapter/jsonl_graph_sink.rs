use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::application::GraphSink;
use crate::domain::{DomainError, GraphSnapshot};

/// One line of a JSONL graph dump: a node or a relationship, tagged so a
/// single file can hold both without a schema per line.
#[derive(Serialize)]
#[serde(tag = "kind")]
enum JsonlRecord<'a> {
    Node(&'a crate::domain::Node),
    Relationship(&'a crate::domain::Relationship),
}

/// `GraphSink` that writes newline-delimited JSON to a file — the demo
/// binary's storage backend, standing in for the teacher's DuckDB/Chroma
/// writers now that the embedded database is out of scope (spec.md §1
/// "Non-goals"). One node or relationship per line, nodes before
/// relationships, so a consumer can stream it without buffering.
pub struct JsonlGraphSink {
    path: PathBuf,
}

impl JsonlGraphSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl GraphSink for JsonlGraphSink {
    async fn write_snapshot(&self, snapshot: &GraphSnapshot) -> Result<(), DomainError> {
        let path = self.path.clone();
        let nodes: Vec<_> = snapshot.nodes.clone();
        let relationships: Vec<_> = snapshot.relationships.clone();

        tokio::task::spawn_blocking(move || -> Result<(), DomainError> {
            let file = std::fs::File::create(&path)?;
            let mut buffered = std::io::BufWriter::new(file);

            for node in &nodes {
                let line = serde_json::to_string(&JsonlRecord::Node(node))
                    .map_err(|e| DomainError::internal(format!("failed to encode node: {e}")))?;
                writeln!(buffered, "{line}")?;
            }
            for relationship in &relationships {
                let line = serde_json::to_string(&JsonlRecord::Relationship(relationship))
                    .map_err(|e| DomainError::internal(format!("failed to encode relationship: {e}")))?;
                writeln!(buffered, "{line}")?;
            }
            buffered.flush()?;
            Ok(())
        })
        .await
        .map_err(|e| DomainError::internal(format!("jsonl writer panicked: {e}")))??;

        info!(path = %self.path.display(), nodes = snapshot.nodes.len(), relationships = snapshot.relationships.len(), "wrote graph snapshot");
        Ok(())
    }
}
