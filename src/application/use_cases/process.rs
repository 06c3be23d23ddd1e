use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::domain::{
    GraphSnapshot, Node, NodeLabel, PipelineConfig, Relationship, RelationshipType,
};

/// Filename fragments that mark a symbol's file as a plausible entry point
/// regardless of its `CALLS` in-degree (spec.md §4.9 item 1).
const ENTRY_FILENAME_PATTERNS: &[&str] = &["cli", "main", "index", "handler"];

/// Filename/name fragments that mark a symbol as a plausible terminal —
/// something that talks to the outside world rather than calling further
/// into the codebase (spec.md §4.9 item 2).
const SINK_PATTERNS: &[&str] = &[
    "io", "fs", "file", "db", "database", "query", "sql", "http", "fetch", "request", "client",
    "socket", "send", "write", "read", "save", "load", "log",
];

fn matches_any(haystack: &str, patterns: &[&str]) -> bool {
    let haystack = haystack.to_lowercase();
    patterns.iter().any(|p| haystack.contains(p))
}

/// Phase 6 — traces call chains from entry points (no incoming `CALLS`
/// edge, or a name/filename matching an entry pattern) to terminals (no
/// outgoing `CALLS` edge, or a name/filename matching a sink pattern) with
/// a bounded, deterministic DFS, and materialises the longest,
/// most-confident chains as `Process` nodes with `STEP_IN_PROCESS` edges
/// (spec.md §4.9).
pub struct ProcessDetector<'a> {
    config: &'a PipelineConfig,
}

impl<'a> ProcessDetector<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn detect(&self, snapshot: &mut GraphSnapshot) -> (u64, u64) {
        let (graph, index_to_id) = self.project_call_graph(snapshot);
        if graph.node_count() == 0 {
            return (0, 0);
        }

        let member_of: HashMap<&str, &str> = snapshot
            .relationships
            .iter()
            .filter(|r| r.relationship_type() == RelationshipType::MemberOf)
            .map(|r| (r.source_id(), r.target_id()))
            .collect();

        let node_by_id: HashMap<&str, &Node> = snapshot.nodes.iter().map(|n| (n.id(), n)).collect();
        let looks_like_entry = |id: &str| -> bool {
            node_by_id
                .get(id)
                .map(|n| matches_any(n.name(), ENTRY_FILENAME_PATTERNS) || matches_any(n.file_path(), ENTRY_FILENAME_PATTERNS))
                .unwrap_or(false)
        };

        let mut entries: Vec<NodeIndex> = graph
            .node_indices()
            .filter(|&idx| {
                let has_outgoing = graph.edges_directed(idx, petgraph::Direction::Outgoing).next().is_some();
                let no_incoming = graph.edges_directed(idx, petgraph::Direction::Incoming).next().is_none();
                has_outgoing && (no_incoming || looks_like_entry(&index_to_id[&idx]))
            })
            .collect();
        entries.sort_by_key(|idx| index_to_id[idx].clone());

        let mut candidates: Vec<(Vec<NodeIndex>, f64)> = Vec::new();
        for &entry in &entries {
            if let Some((path, confidence_sum)) = self.trace(&graph, entry, &node_by_id, &index_to_id) {
                if path.len() as u32 >= self.config.process_min_steps {
                    candidates.push((path, confidence_sum));
                }
            }
        }

        // Longest, most-confident chains first; ties broken by the entry
        // node's id so selection stays deterministic (spec.md invariant 1,
        // §4.9 item 4 "rank paths by length and the sum of confidence
        // along the chain").
        candidates.sort_by(|(a, a_conf), (b, b_conf)| {
            b.len()
                .cmp(&a.len())
                .then_with(|| b_conf.partial_cmp(a_conf).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| index_to_id[&a[0]].cmp(&index_to_id[&b[0]]))
        });
        let mut candidates: Vec<Vec<NodeIndex>> = candidates.into_iter().map(|(path, _)| path).collect();

        let symbol_count = graph.node_count();
        let max_processes = self.config.max_processes(symbol_count);
        candidates.truncate(max_processes);

        let mut processes_created = 0u64;
        let mut cross_community = 0u64;
        let mut new_nodes = Vec::new();
        let mut new_edges = Vec::new();

        for path in &candidates {
            let step_ids: Vec<String> = path.iter().map(|idx| index_to_id[idx].clone()).collect();
            let label = process_label(&step_ids, snapshot);

            let process_node = Node::new(NodeLabel::Process, step_ids.join(">"), label)
                .with_property("step_count", step_ids.len().to_string());
            let process_id = process_node.id().to_string();
            new_nodes.push(process_node);

            for (step, node_id) in step_ids.iter().enumerate() {
                new_edges.push(
                    Relationship::new(
                        node_id.clone(),
                        process_id.clone(),
                        RelationshipType::StepInProcess,
                        1.0,
                        "",
                    )
                    .with_step(step as u32),
                );
            }

            let communities: HashSet<&str> = step_ids
                .iter()
                .filter_map(|id| member_of.get(id.as_str()).copied())
                .collect();
            if communities.len() > 1 {
                cross_community += 1;
            }
            processes_created += 1;
        }

        for node in new_nodes {
            snapshot.add_node(node);
        }
        for edge in new_edges {
            snapshot.add_relationship(edge);
        }

        (processes_created, cross_community)
    }

    fn project_call_graph(
        &self,
        snapshot: &GraphSnapshot,
    ) -> (DiGraph<(), f64>, HashMap<NodeIndex, String>) {
        let callable: HashSet<&str> = snapshot
            .nodes
            .iter()
            .filter(|n| matches!(n.label(), NodeLabel::Function | NodeLabel::Method))
            .map(|n| n.id())
            .collect();

        let mut graph = DiGraph::<(), f64>::new();
        let mut index_of: HashMap<String, NodeIndex> = HashMap::new();
        let mut index_to_id: HashMap<NodeIndex, String> = HashMap::new();

        let ensure = |id: &str,
                          graph: &mut DiGraph<(), f64>,
                          index_of: &mut HashMap<String, NodeIndex>,
                          index_to_id: &mut HashMap<NodeIndex, String>| {
            if let Some(idx) = index_of.get(id) {
                *idx
            } else {
                let idx = graph.add_node(());
                index_of.insert(id.to_string(), idx);
                index_to_id.insert(idx, id.to_string());
                idx
            }
        };

        for rel in &snapshot.relationships {
            if rel.relationship_type() != RelationshipType::Calls {
                continue;
            }
            if !callable.contains(rel.source_id()) || !callable.contains(rel.target_id()) {
                continue;
            }
            let a = ensure(rel.source_id(), &mut graph, &mut index_of, &mut index_to_id);
            let b = ensure(rel.target_id(), &mut graph, &mut index_of, &mut index_to_id);
            if a != b && graph.find_edge(a, b).is_none() {
                graph.add_edge(a, b, rel.confidence());
            }
        }

        (graph, index_to_id)
    }

    /// Depth-bounded, deterministic DFS from `start`: at each step, visits
    /// the lexicographically-smallest unvisited outgoing neighbour, and
    /// stops at a terminal (no outgoing edges, or a name/filename matching
    /// a sink pattern per spec.md §4.9 item 2) or `process_max_depth`.
    /// Returns the path plus the summed `CALLS` confidence along it.
    fn trace(
        &self,
        graph: &DiGraph<(), f64>,
        start: NodeIndex,
        node_by_id: &HashMap<&str, &Node>,
        index_to_id: &HashMap<NodeIndex, String>,
    ) -> Option<(Vec<NodeIndex>, f64)> {
        let is_sink = |idx: NodeIndex| -> bool {
            node_by_id
                .get(index_to_id[&idx].as_str())
                .map(|n| matches_any(n.name(), SINK_PATTERNS) || matches_any(n.file_path(), SINK_PATTERNS))
                .unwrap_or(false)
        };

        let mut path = vec![start];
        let mut visited: HashSet<NodeIndex> = [start].into_iter().collect();
        let mut confidence_sum = 0.0;

        loop {
            let current = *path.last().unwrap();
            if path.len() as u32 >= self.config.process_max_depth {
                break;
            }
            // Only treat a sink-pattern match as a stopping point once the
            // chain has moved past its entry — the entry itself may well
            // share vocabulary with a sink pattern (e.g. `handleRequest`)
            // without actually being a dead end.
            if path.len() > 1 && is_sink(current) {
                break;
            }
            let mut next_candidates: Vec<(NodeIndex, f64)> = graph
                .edges_directed(current, petgraph::Direction::Outgoing)
                .filter(|e| !visited.contains(&e.target()))
                .map(|e| (e.target(), *e.weight()))
                .collect();
            next_candidates.sort_by_key(|(idx, _)| *idx);

            match next_candidates.first() {
                Some(&(next, weight)) => {
                    path.push(next);
                    visited.insert(next);
                    confidence_sum += weight;
                }
                None => break,
            }
        }

        Some((path, confidence_sum))
    }
}

fn process_label(step_ids: &[String], snapshot: &GraphSnapshot) -> String {
    let node_index: HashMap<&str, &Node> = snapshot.nodes.iter().map(|n| (n.id(), n)).collect();
    let first = step_ids.first().and_then(|id| node_index.get(id.as_str())).map(|n| n.name());
    let last = step_ids.last().and_then(|id| node_index.get(id.as_str())).map(|n| n.name());
    match (first, last) {
        (Some(a), Some(b)) if a != b => format!("{} to {}", a, b),
        (Some(a), _) => format!("{} chain", a),
        _ => "process".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_snapshot() -> GraphSnapshot {
        let mut snapshot = GraphSnapshot::new();
        let a = Node::new(NodeLabel::Function, "a.ts", "handleRequest");
        let b = Node::new(NodeLabel::Function, "a.ts", "validate");
        let c = Node::new(NodeLabel::Function, "a.ts", "persist");
        let (a_id, b_id, c_id) = (a.id().to_string(), b.id().to_string(), c.id().to_string());
        snapshot.add_node(a);
        snapshot.add_node(b);
        snapshot.add_node(c);
        snapshot.add_relationship(Relationship::new(a_id.clone(), b_id.clone(), RelationshipType::Calls, 1.0, "same-file"));
        snapshot.add_relationship(Relationship::new(b_id, c_id, RelationshipType::Calls, 1.0, "same-file"));
        snapshot
    }

    #[test]
    fn traces_a_linear_chain_into_one_process() {
        let config = PipelineConfig {
            process_min_steps: 3,
            ..PipelineConfig::default()
        };
        let mut snapshot = chain_snapshot();
        let (created, cross_community) = ProcessDetector::new(&config).detect(&mut snapshot);
        assert_eq!(created, 1);
        assert_eq!(cross_community, 0);

        let steps = snapshot
            .relationships
            .iter()
            .filter(|r| r.relationship_type() == RelationshipType::StepInProcess)
            .count();
        assert_eq!(steps, 3);
    }

    #[test]
    fn chain_shorter_than_min_steps_is_dropped() {
        let config = PipelineConfig {
            process_min_steps: 10,
            ..PipelineConfig::default()
        };
        let mut snapshot = chain_snapshot();
        let (created, _) = ProcessDetector::new(&config).detect(&mut snapshot);
        assert_eq!(created, 0);
    }

    #[test]
    fn no_call_edges_yields_no_processes() {
        let config = PipelineConfig::default();
        let mut snapshot = GraphSnapshot::new();
        snapshot.add_node(Node::new(NodeLabel::Function, "a.ts", "lonely"));
        let (created, _) = ProcessDetector::new(&config).detect(&mut snapshot);
        assert_eq!(created, 0);
    }

    #[test]
    fn a_filename_matching_an_entry_pattern_is_traced_even_with_incoming_calls() {
        // `producer` and `trigger` call each other, so neither has a zero
        // `CALLS` in-degree and neither qualifies as an entry under pure
        // in-degree; the only way `middle`'s chain (in `cli.ts`) gets
        // traced is via the filename-pattern alternative.
        let config = PipelineConfig { process_min_steps: 3, ..PipelineConfig::default() };
        let mut snapshot = GraphSnapshot::new();
        let producer = Node::new(NodeLabel::Function, "a.ts", "producer");
        let trigger = Node::new(NodeLabel::Function, "a.ts", "trigger");
        let middle = Node::new(NodeLabel::Function, "cli.ts", "middle");
        let step = Node::new(NodeLabel::Function, "cli.ts", "step");
        let finish = Node::new(NodeLabel::Function, "cli.ts", "finish");
        let (producer_id, trigger_id, middle_id, step_id, finish_id) = (
            producer.id().to_string(),
            trigger.id().to_string(),
            middle.id().to_string(),
            step.id().to_string(),
            finish.id().to_string(),
        );
        snapshot.add_node(producer);
        snapshot.add_node(trigger);
        snapshot.add_node(middle);
        snapshot.add_node(step);
        snapshot.add_node(finish);
        snapshot.add_relationship(Relationship::new(producer_id.clone(), trigger_id.clone(), RelationshipType::Calls, 1.0, "same-file"));
        snapshot.add_relationship(Relationship::new(trigger_id, producer_id, RelationshipType::Calls, 1.0, "same-file"));
        snapshot.add_relationship(Relationship::new(middle_id.clone(), step_id.clone(), RelationshipType::Calls, 1.0, "same-file"));
        snapshot.add_relationship(Relationship::new(step_id, finish_id, RelationshipType::Calls, 1.0, "same-file"));

        let (created, _) = ProcessDetector::new(&config).detect(&mut snapshot);
        assert_eq!(created, 1);

        let process = snapshot.nodes.iter().find(|n| n.label() == NodeLabel::Process).unwrap();
        assert!(process.file_path().contains(&middle_id));
    }

    #[test]
    fn higher_confidence_chain_of_equal_length_ranks_first() {
        let config = PipelineConfig { process_min_steps: 3, ..PipelineConfig::default() };
        let mut snapshot = GraphSnapshot::new();

        // Chain 1 (entry "aWeak"): low confidence throughout.
        let a1 = Node::new(NodeLabel::Function, "a.ts", "aWeak");
        let b1 = Node::new(NodeLabel::Function, "a.ts", "bWeak");
        let c1 = Node::new(NodeLabel::Function, "a.ts", "cWeak");
        let (a1_id, b1_id, c1_id) = (a1.id().to_string(), b1.id().to_string(), c1.id().to_string());
        snapshot.add_node(a1);
        snapshot.add_node(b1);
        snapshot.add_node(c1);
        snapshot.add_relationship(Relationship::new(a1_id.clone(), b1_id.clone(), RelationshipType::Calls, 0.5, "fuzzy-global-ambiguous"));
        snapshot.add_relationship(Relationship::new(b1_id, c1_id, RelationshipType::Calls, 0.5, "fuzzy-global-ambiguous"));

        // Chain 2 (entry "zStrong"): same length, full confidence.
        let a2 = Node::new(NodeLabel::Function, "z.ts", "zStrong");
        let b2 = Node::new(NodeLabel::Function, "z.ts", "yStrong");
        let c2 = Node::new(NodeLabel::Function, "z.ts", "xStrong");
        let (a2_id, b2_id, c2_id) = (a2.id().to_string(), b2.id().to_string(), c2.id().to_string());
        snapshot.add_node(a2);
        snapshot.add_node(b2);
        snapshot.add_node(c2);
        snapshot.add_relationship(Relationship::new(a2_id.clone(), b2_id.clone(), RelationshipType::Calls, 1.0, "same-file"));
        snapshot.add_relationship(Relationship::new(b2_id, c2_id, RelationshipType::Calls, 1.0, "same-file"));

        let (created, _) = ProcessDetector::new(&config).detect(&mut snapshot);
        assert_eq!(created, 2);

        // The higher-confidence chain sorts first and so is emitted first.
        let first_process = snapshot.nodes.iter().find(|n| n.label() == NodeLabel::Process).unwrap();
        assert!(first_process.file_path().contains(&a2_id), "expected the high-confidence chain to win");
    }
}
