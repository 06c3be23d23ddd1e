use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use tracing::warn;
use tree_sitter::Parser;

use crate::application::ExtractionPort;
use crate::connector::adapter::{AstCache, TreeSitterExtractor};
use crate::domain::{ExtractedRecord, Language, PhaseErrorLog, PipelineConfig, ScannedFile};

/// A unit of work handed to a single worker: a slice of a chunk small
/// enough to bound one thread's memory footprint (spec.md §4.4 "Parser
/// worker pool" / §5).
struct SubBatch {
    id: usize,
    files: Vec<ScannedFile>,
}

/// One parser thread's finished work, or the reason it didn't finish.
enum SubBatchOutcome {
    Done { records: Vec<ExtractedRecord>, errors: Vec<String> },
    Crashed(String),
}

/// `ExtractionPort` backed by a pool of parser threads, one `Parser` and
/// one [`AstCache`] per thread (spec.md §4.4 "Parser worker pool", §5
/// "Concurrency invariant"). Scoped to the lifetime of a single
/// `extract_chunk` call — `std::thread::scope` stands in for the
/// teacher's tokio worker tasks since parsing is CPU-bound, not I/O-bound,
/// and `tree_sitter::Parser` is `!Send` across an await point but fine to
/// move into a plain OS thread.
pub struct WorkerPool {
    worker_count: usize,
    sub_batch_size: usize,
    sub_batch_timeout: Duration,
    ast_cache_capacity: usize,
}

impl WorkerPool {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            worker_count: config.effective_worker_count(),
            sub_batch_size: config.sub_batch_size.max(1),
            sub_batch_timeout: Duration::from_millis(config.sub_batch_timeout_ms),
            ast_cache_capacity: config.ast_cache_capacity,
        }
    }
}

impl ExtractionPort for WorkerPool {
    fn extract_chunk(
        &self,
        files: &[ScannedFile],
        sources: &HashMap<String, String>,
    ) -> (Vec<ExtractedRecord>, PhaseErrorLog) {
        let mut errors = PhaseErrorLog::new();
        if files.is_empty() {
            return (Vec::new(), errors);
        }

        let sub_batches: Vec<SubBatch> = files
            .chunks(self.sub_batch_size)
            .enumerate()
            .map(|(id, batch)| SubBatch { id, files: batch.to_vec() })
            .collect();
        let worker_count = self.worker_count.min(sub_batches.len()).max(1);

        let (task_tx, task_rx) = crossbeam_channel::unbounded::<SubBatch>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, SubBatchOutcome)>();
        let total = sub_batches.len();
        for sub_batch in sub_batches {
            let _ = task_tx.send(sub_batch);
        }
        drop(task_tx);

        let ast_cache_capacity = self.ast_cache_capacity;
        std::thread::scope(|scope| {
            for _ in 0..worker_count {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    let mut parser = Parser::new();
                    let mut cache = AstCache::new(ast_cache_capacity);
                    while let Ok(sub_batch) = task_rx.recv() {
                        let outcome = run_sub_batch(&mut parser, &mut cache, &sub_batch.files, sources);
                        if result_tx.send((sub_batch.id, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);
        });

        let mut records = Vec::new();
        for _ in 0..total {
            match result_rx.recv_timeout(self.sub_batch_timeout) {
                Ok((_, SubBatchOutcome::Done { records: mut r, errors: errs })) => {
                    records.append(&mut r);
                    for e in errs {
                        errors.record(e);
                    }
                }
                Ok((id, SubBatchOutcome::Crashed(reason))) => {
                    warn!(sub_batch = id, reason = %reason, "worker crashed on sub-batch");
                    errors.record(format!("sub-batch {id} crashed: {reason}"));
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(timeout_ms = self.sub_batch_timeout.as_millis(), "worker sub-batch timed out");
                    errors.record(format!("sub-batch timed out after {:?}", self.sub_batch_timeout));
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        (records, errors)
    }
}

fn run_sub_batch(
    parser: &mut Parser,
    cache: &mut AstCache,
    files: &[ScannedFile],
    sources: &HashMap<String, String>,
) -> SubBatchOutcome {
    let mut records = Vec::new();
    let mut errors = Vec::new();

    for file in files {
        let Some(source) = sources.get(&file.relative_path) else {
            errors.push(format!("{}: source not read", file.relative_path));
            continue;
        };
        let language = Language::from_path(Path::new(&file.relative_path));
        if !language.is_known() {
            continue;
        }

        let tree = match cache.get(&file.relative_path) {
            Some(tree) => Ok(tree),
            None => TreeSitterExtractor::parse(parser, language, &file.relative_path, source),
        };

        match tree {
            Ok(tree) => {
                let record = TreeSitterExtractor::walk(&tree, language, &file.relative_path, source);
                cache.insert(file.relative_path.clone(), tree);
                records.push(record);
            }
            Err(err) => errors.push(format!("{}: {}", file.relative_path, err)),
        }
    }

    SubBatchOutcome::Done { records, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PipelineConfig;

    fn sources(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn extracts_records_across_multiple_sub_batches() {
        let config = PipelineConfig { sub_batch_size: 1, worker_count: Some(2), ..PipelineConfig::default() };
        let pool = WorkerPool::new(&config);
        let files = vec![ScannedFile::new("a.ts", 10), ScannedFile::new("b.ts", 10)];
        let src = sources(&[("a.ts", "function f() {}"), ("b.ts", "function g() {}")]);

        let (records, errors) = pool.extract_chunk(&files, &src);
        assert_eq!(records.len(), 2);
        assert!(errors.is_empty());
    }

    #[test]
    fn missing_source_is_recorded_as_a_non_fatal_error() {
        let pool = WorkerPool::new(&PipelineConfig::default());
        let files = vec![ScannedFile::new("missing.ts", 10)];
        let (records, errors) = pool.extract_chunk(&files, &HashMap::new());
        assert!(records.is_empty());
        assert_eq!(errors.count(), 1);
    }

    #[test]
    fn unknown_language_files_are_skipped_without_error() {
        let pool = WorkerPool::new(&PipelineConfig::default());
        let files = vec![ScannedFile::new("readme.md", 10)];
        let src = sources(&[("readme.md", "# hi")]);
        let (records, errors) = pool.extract_chunk(&files, &src);
        assert!(records.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn empty_chunk_returns_empty() {
        let pool = WorkerPool::new(&PipelineConfig::default());
        let (records, errors) = pool.extract_chunk(&[], &HashMap::new());
        assert!(records.is_empty());
        assert!(errors.is_empty());
    }
}
