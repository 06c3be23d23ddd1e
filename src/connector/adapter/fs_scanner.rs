use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use ignore::WalkBuilder;
use tracing::debug;

use crate::application::FileSystemPort;
use crate::domain::{normalize_path, DomainError, Language, ScannedFile, WalkOutcome};

/// `FileSystemPort` backed by the `ignore` crate's gitignore-aware walker
/// (spec.md §4.1). Honours `.gitignore`/`.ignore` files the same way a
/// plain `git ls-files` would, plus a fixed size cap so pathological
/// generated files (bundles, lockfiles, vendored blobs) never reach the
/// parser pool.
pub struct FsScanner {
    max_file_size_bytes: u64,
}

impl FsScanner {
    pub fn new(max_file_size_bytes: u64) -> Self {
        Self { max_file_size_bytes }
    }
}

#[async_trait]
impl FileSystemPort for FsScanner {
    async fn walk_paths(&self, root: &Path) -> Result<WalkOutcome, DomainError> {
        let root = root.to_path_buf();
        let max_size = self.max_file_size_bytes;

        tokio::task::spawn_blocking(move || {
            let mut files = Vec::new();
            let mut skipped_oversized = 0u64;
            let mut skipped_unreadable = 0u64;
            let walker = WalkBuilder::new(&root).hidden(false).git_ignore(true).build();

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        debug!("skipping unreadable directory entry: {}", err);
                        skipped_unreadable += 1;
                        continue;
                    }
                };

                let Some(file_type) = entry.file_type() else {
                    continue;
                };
                if !file_type.is_file() {
                    continue;
                }

                let metadata = match entry.metadata() {
                    Ok(metadata) => metadata,
                    Err(err) => {
                        debug!("skipping unreadable file {}: {}", entry.path().display(), err);
                        skipped_unreadable += 1;
                        continue;
                    }
                };
                if metadata.len() > max_size {
                    debug!("skipping oversized file {}", entry.path().display());
                    skipped_oversized += 1;
                    continue;
                }

                let Ok(relative) = entry.path().strip_prefix(&root) else {
                    continue;
                };
                let relative_path = normalize_path(&relative.to_string_lossy());
                files.push(ScannedFile::new(relative_path, metadata.len()));
            }

            files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
            Ok(WalkOutcome { files, skipped_oversized, skipped_unreadable })
        })
        .await
        .map_err(|e| DomainError::internal(format!("scan worker panicked: {e}")))?
    }

    async fn read_contents(
        &self,
        root: &Path,
        relative_paths: &[String],
    ) -> Result<HashMap<String, String>, DomainError> {
        let root = root.to_path_buf();
        let relative_paths = relative_paths.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut contents = HashMap::with_capacity(relative_paths.len());
            for relative_path in relative_paths {
                let full_path = root.join(&relative_path);
                match std::fs::read_to_string(&full_path) {
                    Ok(source) => {
                        contents.insert(relative_path, source);
                    }
                    Err(err) => {
                        debug!("unreadable file {}: {}", full_path.display(), err);
                    }
                }
            }
            Ok(contents)
        })
        .await
        .map_err(|e| DomainError::internal(format!("read worker panicked: {e}")))?
    }

    fn ignore_policy(&self, path: &Path) -> bool {
        !Language::from_path(path).is_known()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn walks_admit_non_code_files_alongside_parseable_ones() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "export const a = 1;").unwrap();
        std::fs::write(dir.path().join("readme.md"), "# hi").unwrap();

        let scanner = FsScanner::new(1024 * 1024);
        let outcome = scanner.walk_paths(dir.path()).await.unwrap();
        let mut paths: Vec<&str> = outcome.files.iter().map(|f| f.relative_path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["a.ts", "readme.md"]);
    }

    #[tokio::test]
    async fn oversized_files_are_skipped_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("big.py")).unwrap();
        file.write_all(&vec![b'x'; 200]).unwrap();

        let scanner = FsScanner::new(100);
        let outcome = scanner.walk_paths(dir.path()).await.unwrap();
        assert!(outcome.files.is_empty());
        assert_eq!(outcome.skipped_oversized, 1);
    }

    #[tokio::test]
    async fn read_contents_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "content").unwrap();

        let scanner = FsScanner::new(1024);
        let result = scanner
            .read_contents(dir.path(), &["a.ts".to_string(), "missing.ts".to_string()])
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.get("a.ts").unwrap(), "content");
    }
}
