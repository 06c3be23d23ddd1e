use crate::application::use_cases::call_resolver::resolve_symbol;
use crate::application::{ImportMap, SymbolTable};
use crate::domain::{GraphSnapshot, HeritageClause, HeritageKind, Relationship, RelationshipType};

/// Phase 4c — resolves `extends`/`implements` clauses to `EXTENDS`/
/// `IMPLEMENTS` edges using the same priority-ordered lookup as call
/// resolution (spec.md §4.7), attributed to the child class/interface
/// node rather than an enclosing function.
pub struct HeritageResolver;

impl HeritageResolver {
    pub fn resolve_file(
        &self,
        file_path: &str,
        class_node_ids: &std::collections::BTreeMap<String, String>,
        heritage: &[HeritageClause],
        symbol_table: &SymbolTable,
        import_map: &ImportMap,
        snapshot: &mut GraphSnapshot,
    ) -> u64 {
        let mut resolved_count = 0;
        for clause in heritage {
            let Some(child_id) = class_node_ids.get(&clause.child_name) else {
                continue;
            };
            let Some((parent_id, confidence, reason)) =
                resolve_symbol(file_path, &clause.parent_name, symbol_table, import_map)
            else {
                continue;
            };

            let relationship_type = match clause.kind {
                HeritageKind::Extends => RelationshipType::Extends,
                HeritageKind::Implements => RelationshipType::Implements,
            };

            snapshot.add_relationship(Relationship::new(
                child_id.clone(),
                parent_id,
                relationship_type,
                confidence,
                reason,
            ));
            resolved_count += 1;
        }
        resolved_count
    }
}

impl Default for HeritageResolver {
    fn default() -> Self {
        Self
    }
}
