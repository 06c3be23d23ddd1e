use std::collections::HashMap;

use crate::domain::{ExtractedRecord, PhaseErrorLog, ScannedFile};

/// The parse/extract boundary (spec.md §4.4, §5 "worker pool"): given a
/// chunk's files and their already-read source text, returns one
/// [`ExtractedRecord`] per file that parsed successfully. Files that
/// fail to parse are counted in the returned [`PhaseErrorLog`] rather
/// than failing the whole chunk.
///
/// Implemented by the connector layer's thread-pool-backed adapter; kept
/// synchronous since extraction is CPU-bound, not I/O-bound — the
/// orchestrator is responsible for running it off the async executor
/// (`tokio::task::spawn_blocking`).
pub trait ExtractionPort: Send + Sync {
    fn extract_chunk(
        &self,
        files: &[ScannedFile],
        sources: &HashMap<String, String>,
    ) -> (Vec<ExtractedRecord>, PhaseErrorLog);
}
