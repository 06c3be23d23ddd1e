use serde::{Deserialize, Serialize};

use super::{Node, Relationship};

/// The pipeline's produced output (spec.md §6 "Produced" #1): a storage
/// agnostic pair of nodes and relationships, keyed by stable string ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
}

impl GraphSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    pub fn node_ids(&self) -> std::collections::HashSet<&str> {
        self.nodes.iter().map(|n| n.id()).collect()
    }

    /// Drops any relationship whose endpoints are not both present in
    /// `nodes` (spec.md invariant 2 — the resolver is responsible for not
    /// emitting these in the first place; this is a defense-in-depth
    /// check exercised by tests, not relied on by the resolvers).
    pub fn retain_relationships_with_known_endpoints(&mut self) {
        let ids = self.node_ids().into_iter().map(|s| s.to_string()).collect::<std::collections::HashSet<_>>();
        self.relationships
            .retain(|r| ids.contains(r.source_id()) && ids.contains(r.target_id()));
    }
}

/// Non-fatal error counter threaded through every phase (spec.md §7
/// "Progress reporting includes a non-fatal error counter"). Per-file and
/// per-symbol failures accumulate here instead of aborting their phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseErrorLog {
    pub messages: Vec<String>,
}

impl PhaseErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn merge(&mut self, other: PhaseErrorLog) {
        self.messages.extend(other.messages);
    }
}

/// Aggregate run statistics surfaced alongside the snapshot (supplemented
/// ambient feature, SPEC_FULL.md §12).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    pub files_scanned: u64,
    pub files_skipped_oversized: u64,
    pub files_skipped_unreadable: u64,
    pub files_parsed: u64,
    pub chunks_processed: u64,
    pub definitions: u64,
    pub imports_resolved: u64,
    pub calls_resolved: u64,
    pub heritage_resolved: u64,
    pub communities: u64,
    pub processes: u64,
    pub cross_community_processes: u64,
    pub non_fatal_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NodeLabel, RelationshipType};

    #[test]
    fn retains_only_relationships_with_known_endpoints() {
        let mut snapshot = GraphSnapshot::new();
        let a = Node::new(NodeLabel::File, "a.ts", "a.ts");
        let a_id = a.id().to_string();
        snapshot.add_node(a);
        snapshot.add_relationship(Relationship::new(
            &a_id,
            "missing",
            RelationshipType::Imports,
            1.0,
            "import-resolved",
        ));
        snapshot.retain_relationships_with_known_endpoints();
        assert!(snapshot.relationships.is_empty());
    }

    #[test]
    fn error_log_merges() {
        let mut a = PhaseErrorLog::new();
        a.record("x failed");
        let mut b = PhaseErrorLog::new();
        b.record("y failed");
        a.merge(b);
        assert_eq!(a.count(), 2);
    }
}
