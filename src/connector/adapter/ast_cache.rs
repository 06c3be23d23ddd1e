use indexmap::IndexMap;

/// Bounded LRU over parsed syntax trees, one instance per worker thread
/// (spec.md §4.4 "AST cache"). Keyed by file path; a later re-submission
/// of the same path (e.g. a sub-batch retried after a timeout) reuses the
/// tree instead of re-parsing.
///
/// Built on `indexmap::IndexMap` rather than a dedicated `lru` crate —
/// none of the example repos in the pack depend on one, while
/// `repotoire`'s dependency on ordered hash maps is the closest match in
/// the corpus. Insertion order doubles as recency order: a hit moves its
/// entry to the back, eviction pops the front.
pub struct AstCache {
    capacity: usize,
    entries: IndexMap<String, tree_sitter::Tree>,
}

impl AstCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: IndexMap::with_capacity(capacity),
        }
    }

    pub fn get(&mut self, file_path: &str) -> Option<tree_sitter::Tree> {
        let tree = self.entries.shift_remove(file_path)?;
        self.entries.insert(file_path.to_string(), tree.clone());
        Some(tree)
    }

    pub fn insert(&mut self, file_path: String, tree: tree_sitter::Tree) {
        self.entries.shift_remove(&file_path);
        self.entries.insert(file_path, tree);
        while self.entries.len() > self.capacity {
            self.entries.shift_remove_index(0);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn evicts_the_least_recently_used_entry() {
        let mut cache = AstCache::new(2);
        cache.insert("a.ts".to_string(), parse("const a = 1;"));
        cache.insert("b.ts".to_string(), parse("const b = 1;"));
        cache.insert("c.ts".to_string(), parse("const c = 1;"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a.ts").is_none());
        assert!(cache.get("b.ts").is_some());
        assert!(cache.get("c.ts").is_some());
    }

    #[test]
    fn a_hit_refreshes_recency() {
        let mut cache = AstCache::new(2);
        cache.insert("a.ts".to_string(), parse("const a = 1;"));
        cache.insert("b.ts".to_string(), parse("const b = 1;"));
        assert!(cache.get("a.ts").is_some());
        cache.insert("c.ts".to_string(), parse("const c = 1;"));

        assert!(cache.get("a.ts").is_some());
        assert!(cache.get("b.ts").is_none());
    }
}
