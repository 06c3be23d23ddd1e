use std::collections::HashMap;

/// Dual index populated during parsing and queried during resolution
/// (spec.md §3 "SymbolTable", §9 glossary).
///
/// Written only on the orchestrator thread after consuming worker output
/// (spec.md §5 "Shared resources") — workers never see this type.
#[derive(Debug, Default)]
pub struct SymbolTable {
    /// `(file_path, name) -> node_id`, exact match.
    exact: HashMap<(String, String), String>,
    /// `name -> [(file_path, node_id)]`, fuzzy match across the whole repo.
    fuzzy: HashMap<String, Vec<(String, String)>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, file_path: &str, name: &str, node_id: &str) {
        self.exact
            .insert((file_path.to_string(), name.to_string()), node_id.to_string());
        self.fuzzy
            .entry(name.to_string())
            .or_default()
            .push((file_path.to_string(), node_id.to_string()));
    }

    pub fn lookup_exact(&self, file_path: &str, name: &str) -> Option<&str> {
        self.exact
            .get(&(file_path.to_string(), name.to_string()))
            .map(|s| s.as_str())
    }

    /// All `(file_path, node_id)` candidates for a fuzzy, cross-file
    /// lookup by bare name.
    pub fn lookup_fuzzy(&self, name: &str) -> &[(String, String)] {
        self.fuzzy.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.exact.clear();
        self.fuzzy.clear();
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}
