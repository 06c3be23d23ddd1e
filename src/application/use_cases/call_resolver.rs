use std::collections::BTreeMap;

use crate::application::{ImportMap, SymbolTable};
use crate::domain::{CallSite, GraphSnapshot, Node, NodeLabel, Relationship, RelationshipType};

/// Resolves a bare name referenced from `file_path` to a single definition
/// node, in priority order (spec.md §4.6):
///
/// 1. `import-resolved` — the name is defined in a file this one imports.
/// 2. `same-file` — the name is defined in the same file.
/// 3. `fuzzy-global` — exactly one file in the whole repo defines the name.
/// 4. `fuzzy-global-ambiguous` — more than one file defines the name; the
///    deterministic tie-break (shortest normalised path, then
///    lexicographic path, then lexicographic node id) picks a winner but
///    at reduced confidence.
///
/// Returns `None` when nothing defines the name anywhere in the repo.
pub fn resolve_symbol(
    file_path: &str,
    name: &str,
    symbol_table: &SymbolTable,
    import_map: &ImportMap,
) -> Option<(String, f64, &'static str)> {
    for imported_file in import_map.targets_of(file_path) {
        if let Some(node_id) = symbol_table.lookup_exact(imported_file, name) {
            return Some((node_id.to_string(), 1.0, "import-resolved"));
        }
    }

    if let Some(node_id) = symbol_table.lookup_exact(file_path, name) {
        return Some((node_id.to_string(), 1.0, "same-file"));
    }

    let candidates = symbol_table.lookup_fuzzy(name);
    match candidates.len() {
        0 => None,
        1 => Some((candidates[0].1.clone(), 0.8, "fuzzy-global")),
        _ => {
            let winner = break_tie(candidates)?;
            Some((winner.to_string(), 0.5, "fuzzy-global-ambiguous"))
        }
    }
}

fn break_tie(candidates: &[(String, String)]) -> Option<&str> {
    candidates
        .iter()
        .min_by(|(path_a, id_a), (path_b, id_b)| {
            path_a
                .len()
                .cmp(&path_b.len())
                .then_with(|| path_a.cmp(path_b))
                .then_with(|| id_a.cmp(id_b))
        })
        .map(|(_, id)| id.as_str())
}

/// Phase 4b — resolves every call site to a `CALLS` edge, attributed to
/// the enclosing function/method node when known, or the file node when
/// the call sits at module top level (spec.md §4.6).
pub struct CallResolver;

impl CallResolver {
    pub fn resolve_file(
        &self,
        file_path: &str,
        file_node_id: &str,
        calls: &[CallSite],
        enclosing_ids: &BTreeMap<String, String>,
        symbol_table: &SymbolTable,
        import_map: &ImportMap,
        snapshot: &mut GraphSnapshot,
    ) -> u64 {
        let mut resolved_count = 0;
        for call in calls {
            let Some((target_id, confidence, reason)) =
                resolve_symbol(file_path, &call.callee_name, symbol_table, import_map)
            else {
                continue;
            };

            let source_id = call
                .enclosing_function
                .as_deref()
                .and_then(|name| enclosing_ids.get(name))
                .map(|s| s.as_str())
                .unwrap_or(file_node_id);

            snapshot.add_relationship(Relationship::new(
                source_id,
                target_id,
                RelationshipType::Calls,
                confidence,
                reason,
            ));
            resolved_count += 1;
        }
        resolved_count
    }
}

impl Default for CallResolver {
    fn default() -> Self {
        Self
    }
}
