use std::collections::{HashMap, HashSet};

use crate::domain::{GraphSnapshot, ImportStatement, Language, Relationship, RelationshipType};

/// Directed `source_file -> {imported files}` map (spec.md §3 "ImportMap").
/// Populated by [`ImportResolver`], queried during call resolution,
/// discarded after use.
#[derive(Debug, Default)]
pub struct ImportMap {
    edges: HashMap<String, HashSet<String>>,
}

impl ImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, source_file: &str, target_file: &str) {
        self.edges
            .entry(source_file.to_string())
            .or_default()
            .insert(target_file.to_string());
    }

    pub fn targets_of(&self, source_file: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(source_file)
            .into_iter()
            .flat_map(|set| set.iter().map(|s| s.as_str()))
    }

    pub fn imports(&self, source_file: &str, target_file: &str) -> bool {
        self.edges
            .get(source_file)
            .map(|set| set.contains(target_file))
            .unwrap_or(false)
    }
}

/// Builds the suffix index over the normalised file list and resolves
/// import specifiers to target files (spec.md §4.5).
pub struct ImportResolutionContext {
    normalized_files: HashSet<String>,
    /// Every path-segment suffix (e.g. for `src/utils/foo.ts`:
    /// `foo.ts`, `utils/foo.ts`, `src/utils/foo.ts`) maps to the files
    /// that end with it, so a bare specifier can be matched by suffix.
    suffix_index: HashMap<String, Vec<String>>,
    cache: HashMap<(String, String), Option<String>>,
}

impl ImportResolutionContext {
    pub fn new(files: &[String]) -> Self {
        let normalized_files: HashSet<String> = files.iter().cloned().collect();
        let mut suffix_index: HashMap<String, Vec<String>> = HashMap::new();
        for file in &normalized_files {
            for suffix in suffixes_of(file) {
                suffix_index.entry(suffix).or_default().push(file.clone());
            }
        }
        Self {
            normalized_files,
            suffix_index,
            cache: HashMap::new(),
        }
    }

    /// Resolves `specifier` as imported from `importer_file`, caching
    /// both hits and misses keyed by `(importer_dir, specifier)`
    /// (spec.md §4.5 step 4).
    pub fn resolve(&mut self, importer_file: &str, specifier: &str) -> Option<String> {
        let importer_dir = parent_dir(importer_file);
        let key = (importer_dir.clone(), specifier.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let resolved = if specifier.starts_with("./") || specifier.starts_with("../") {
            let base = join_relative(&importer_dir, specifier);
            self.probe(&base)
        } else if specifier.starts_with('/') {
            let base = specifier.trim_start_matches('/').to_string();
            self.probe(&base)
        } else {
            self.resolve_bare(specifier)
        };

        self.cache.insert(key, resolved.clone());
        resolved
    }

    /// Probes `base` with the candidate extensions in spec.md §4.5's
    /// fixed order, also accepting `base` verbatim when the specifier
    /// already carries an extension.
    fn probe(&self, base: &str) -> Option<String> {
        if self.normalized_files.contains(base) {
            return Some(base.to_string());
        }
        for suffix in Language::index_suffixes() {
            let candidate = format!("{}{}", base, suffix);
            if self.normalized_files.contains(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Bare specifier (step 3): suffix match against the normalised file
    /// list, preferring longer matches and then shorter total path.
    fn resolve_bare(&self, specifier: &str) -> Option<String> {
        let mut candidates: Vec<String> = self.suffix_index.get(specifier).cloned().unwrap_or_default();

        if candidates.is_empty() {
            for suffix in Language::index_suffixes() {
                let with_ext = format!("{}{}", specifier, suffix);
                if let Some(hits) = self.suffix_index.get(&with_ext) {
                    candidates.extend(hits.iter().cloned());
                }
            }
        }

        candidates.sort();
        candidates.dedup();
        candidates.into_iter().min_by_key(|path| path.len())
    }
}

fn parent_dir(file_path: &str) -> String {
    match file_path.rfind('/') {
        Some(idx) => file_path[..idx].to_string(),
        None => String::new(),
    }
}

fn join_relative(dir: &str, specifier: &str) -> String {
    let mut segments: Vec<&str> = if dir.is_empty() {
        Vec::new()
    } else {
        dir.split('/').collect()
    };
    for part in specifier.split('/') {
        match part {
            "." | "" => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn suffixes_of(path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split('/').collect();
    let mut result = Vec::with_capacity(segments.len());
    for start in (0..segments.len()).rev() {
        result.push(segments[start..].join("/"));
    }
    result
}

/// Phase 4a — resolves every extracted import to a target file and
/// records `IMPORTS` edges (spec.md §4.5). Runs after Parse for the
/// owning chunk, against the [`ImportResolutionContext`] built from the
/// full repository file list (so cross-chunk imports still resolve).
pub struct ImportResolver;

impl ImportResolver {
    pub fn resolve_file(
        &self,
        source_file: &str,
        imports: &[ImportStatement],
        context: &mut ImportResolutionContext,
        import_map: &mut ImportMap,
        file_node_ids: &std::collections::BTreeMap<String, String>,
        snapshot: &mut GraphSnapshot,
    ) -> u64 {
        let mut resolved_count = 0;
        for import in imports {
            let Some(target_file) = context.resolve(source_file, &import.source) else {
                continue; // Resolution-miss: silently omitted, spec.md §4.5/§7.
            };

            import_map.record(source_file, &target_file);

            let (Some(source_id), Some(target_id)) =
                (file_node_ids.get(source_file), file_node_ids.get(&target_file))
            else {
                continue;
            };

            snapshot.add_relationship(Relationship::new(
                source_id.clone(),
                target_id.clone(),
                RelationshipType::Imports,
                1.0,
                "",
            ));
            resolved_count += 1;
        }
        resolved_count
    }
}

impl Default for ImportResolver {
    fn default() -> Self {
        Self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> Vec<String> {
        vec!["a.ts".into(), "b.ts".into(), "utils/helper.ts".into()]
    }

    #[test]
    fn resolves_relative_specifier_with_extension_probe() {
        let mut ctx = ImportResolutionContext::new(&files());
        assert_eq!(ctx.resolve("a.ts", "./b"), Some("b.ts".to_string()));
    }

    #[test]
    fn resolves_nested_relative_specifier() {
        let mut ctx = ImportResolutionContext::new(&files());
        assert_eq!(
            ctx.resolve("a.ts", "./utils/helper"),
            Some("utils/helper.ts".to_string())
        );
    }

    #[test]
    fn resolves_bare_specifier_by_suffix() {
        let mut ctx = ImportResolutionContext::new(&files());
        assert_eq!(
            ctx.resolve("a.ts", "utils/helper"),
            Some("utils/helper.ts".to_string())
        );
    }

    #[test]
    fn unresolvable_specifier_returns_none() {
        let mut ctx = ImportResolutionContext::new(&files());
        assert_eq!(ctx.resolve("a.ts", "lodash"), None);
    }

    #[test]
    fn caches_misses_so_repeated_lookups_stay_none() {
        let mut ctx = ImportResolutionContext::new(&files());
        assert_eq!(ctx.resolve("a.ts", "lodash"), None);
        assert_eq!(ctx.resolve("a.ts", "lodash"), None);
    }

    #[test]
    fn import_map_records_directed_edges() {
        let mut map = ImportMap::new();
        map.record("a.ts", "b.ts");
        assert!(map.imports("a.ts", "b.ts"));
        assert!(!map.imports("b.ts", "a.ts"));
    }
}
