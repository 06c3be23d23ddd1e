use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::application::{FileSystemPort, ProgressReporter};
use crate::domain::{DomainError, Phase, ScannedFile};

/// Outcome of the scan phase (spec.md §4.1 + §7 "non-fatal error
/// counter").
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    pub admitted: u64,
    pub skipped_oversized: u64,
    pub skipped_unreadable: u64,
}

/// Phase 1 — walks the repository and reports progress (spec.md §4.1).
///
/// Oversized/unreadable-file accounting happens in the `FileSystemPort`
/// adapter, which is the one that knows the size cap; this use case just
/// carries the adapter's `WalkOutcome` counts into `ScanStats` and drives
/// the progress channel the way the teacher's `IndexRepositoryUseCase::index`
/// drives its `ProgressBar`.
pub struct Scanner {
    fs: Arc<dyn FileSystemPort>,
}

impl Scanner {
    pub fn new(fs: Arc<dyn FileSystemPort>) -> Self {
        Self { fs }
    }

    pub async fn scan(
        &self,
        root: &Path,
        progress: &ProgressReporter,
    ) -> Result<(Vec<ScannedFile>, ScanStats), DomainError> {
        progress.emit(Phase::Scan, 0.0, "scanning repository");

        let outcome = self.fs.walk_paths(root).await.map_err(|e| {
            warn!("scan failed for unreadable root {}: {}", root.display(), e);
            e
        })?;
        let files = outcome.files;

        let total = files.len() as u64;
        for (i, file) in files.iter().enumerate() {
            let percent = if total == 0 {
                100.0
            } else {
                ((i + 1) as f64 / total as f64) * 100.0
            };
            progress.emit_detail(
                Phase::Scan,
                percent,
                "scanning repository",
                file.relative_path.clone(),
            );
        }

        info!("scan complete: {} files admitted", total);
        progress.emit(Phase::Scan, 100.0, "scan complete");

        let stats = ScanStats {
            admitted: total,
            skipped_oversized: outcome.skipped_oversized,
            skipped_unreadable: outcome.skipped_unreadable,
        };
        Ok((files, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Language, WalkOutcome};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FakeFs {
        files: Vec<ScannedFile>,
        skipped_oversized: u64,
        skipped_unreadable: u64,
    }

    #[async_trait]
    impl FileSystemPort for FakeFs {
        async fn walk_paths(&self, _root: &Path) -> Result<WalkOutcome, DomainError> {
            Ok(WalkOutcome {
                files: self.files.clone(),
                skipped_oversized: self.skipped_oversized,
                skipped_unreadable: self.skipped_unreadable,
            })
        }

        async fn read_contents(
            &self,
            _root: &Path,
            _relative_paths: &[String],
        ) -> Result<HashMap<String, String>, DomainError> {
            Ok(HashMap::new())
        }

        fn ignore_policy(&self, _path: &Path) -> bool {
            false
        }

        fn language_for(&self, _path: &Path) -> Language {
            Language::Unknown
        }
    }

    #[tokio::test]
    async fn empty_repo_reaches_100_percent_with_zero_files() {
        let fs = Arc::new(FakeFs { files: vec![], skipped_oversized: 0, skipped_unreadable: 0 });
        let scanner = Scanner::new(fs);
        let progress = ProgressReporter::new_discarding();
        let (files, stats) = scanner.scan(Path::new("/tmp/empty"), &progress).await.unwrap();
        assert!(files.is_empty());
        assert_eq!(stats.admitted, 0);
    }

    #[tokio::test]
    async fn admits_every_file_the_port_returns() {
        let fs = Arc::new(FakeFs {
            files: vec![
                ScannedFile::new("a.ts", 10),
                ScannedFile::new("b.py", 20),
            ],
            skipped_oversized: 0,
            skipped_unreadable: 0,
        });
        let scanner = Scanner::new(fs);
        let progress = ProgressReporter::new_discarding();
        let (files, stats) = scanner.scan(Path::new("/tmp/repo"), &progress).await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(stats.admitted, 2);
    }

    #[tokio::test]
    async fn real_skip_counts_surface_in_scan_stats() {
        let fs = Arc::new(FakeFs {
            files: vec![ScannedFile::new("a.ts", 10)],
            skipped_oversized: 2,
            skipped_unreadable: 1,
        });
        let scanner = Scanner::new(fs);
        let progress = ProgressReporter::new_discarding();
        let (_, stats) = scanner.scan(Path::new("/tmp/repo"), &progress).await.unwrap();
        assert_eq!(stats.skipped_oversized, 2);
        assert_eq!(stats.skipped_unreadable, 1);
    }
}
