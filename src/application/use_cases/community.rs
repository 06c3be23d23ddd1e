use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::domain::{
    GraphSnapshot, Node, NodeLabel, PipelineConfig, Relationship, RelationshipType,
};

/// Node labels eligible for community projection (spec.md §4.8):
/// structural nodes (`File`, `Folder`, ...) carry no call/heritage edges
/// of their own and are excluded from the subgraph.
fn is_code_element(label: NodeLabel) -> bool {
    matches!(
        label,
        NodeLabel::Class
            | NodeLabel::Function
            | NodeLabel::Method
            | NodeLabel::Interface
            | NodeLabel::Enum
            | NodeLabel::Variable
            | NodeLabel::Decorator
            | NodeLabel::Type
            | NodeLabel::CodeElement
    )
}

/// Phase 5 — projects a weighted undirected subgraph over code-element
/// nodes from `CALLS`/`EXTENDS`/`IMPLEMENTS` edges, clusters it with a
/// Louvain-style local-moving pass (the teacher's `petgraph` dependency,
/// declared for "Leiden cluster detection" but never previously
/// exercised), and materialises `Community` nodes + `MEMBER_OF` edges
/// (spec.md §4.8).
pub struct CommunityProcessor<'a> {
    config: &'a PipelineConfig,
}

impl<'a> CommunityProcessor<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn detect(&self, snapshot: &mut GraphSnapshot) -> u64 {
        let node_labels: HashMap<String, NodeLabel> =
            snapshot.nodes.iter().map(|n| (n.id().to_string(), n.label())).collect();

        let (graph, index_to_id) = self.project_subgraph(snapshot, &node_labels);
        if graph.node_count() < 2 || graph.edge_count() == 0 {
            return 0;
        }

        let assignment = self.local_move(&graph);
        let mut groups: HashMap<usize, Vec<NodeIndex>> = HashMap::new();
        for (idx, comm) in assignment.iter().enumerate() {
            groups.entry(*comm).or_default().push(NodeIndex::new(idx));
        }

        let node_index: HashMap<String, &Node> =
            snapshot.nodes.iter().map(|n| (n.id().to_string(), n)).collect();

        let mut new_nodes = Vec::new();
        let mut new_edges = Vec::new();
        let mut communities_created = 0u64;

        let mut ordered_groups: Vec<_> = groups.into_iter().collect();
        ordered_groups.sort_by_key(|(comm, _)| *comm);

        for (_, members) in ordered_groups {
            if members.len() < 2 {
                continue;
            }
            let mut member_ids: Vec<String> =
                members.iter().map(|idx| index_to_id[idx].clone()).collect();
            member_ids.sort();

            let cohesion = self.cohesion(&graph, &members);
            let label = heuristic_label(&member_ids, &node_index);

            let community_node = Node::new(NodeLabel::Community, member_ids.join(","), label)
                .with_property("cohesion", format!("{:.4}", cohesion))
                .with_property("member_count", member_ids.len().to_string());
            let community_id = community_node.id().to_string();
            new_nodes.push(community_node);

            for member_id in &member_ids {
                new_edges.push(Relationship::new(
                    member_id.clone(),
                    community_id.clone(),
                    RelationshipType::MemberOf,
                    1.0,
                    "",
                ));
            }
            communities_created += 1;
        }

        for node in new_nodes {
            snapshot.add_node(node);
        }
        for edge in new_edges {
            snapshot.add_relationship(edge);
        }

        communities_created
    }

    fn project_subgraph(
        &self,
        snapshot: &GraphSnapshot,
        node_labels: &HashMap<String, NodeLabel>,
    ) -> (UnGraph<(), f64>, HashMap<NodeIndex, String>) {
        let mut graph = UnGraph::<(), f64>::new_undirected();
        let mut index_of: HashMap<String, NodeIndex> = HashMap::new();
        let mut index_to_id: HashMap<NodeIndex, String> = HashMap::new();

        fn get_index(
            id: &str,
            graph: &mut UnGraph<(), f64>,
            index_of: &mut HashMap<String, NodeIndex>,
            index_to_id: &mut HashMap<NodeIndex, String>,
        ) -> NodeIndex {
            if let Some(idx) = index_of.get(id) {
                return *idx;
            }
            let idx = graph.add_node(());
            index_of.insert(id.to_string(), idx);
            index_to_id.insert(idx, id.to_string());
            idx
        }

        for rel in &snapshot.relationships {
            let weighted = matches!(
                rel.relationship_type(),
                RelationshipType::Calls | RelationshipType::Extends | RelationshipType::Implements
            );
            if !weighted {
                continue;
            }
            let source_is_code = node_labels.get(rel.source_id()).copied().map(is_code_element).unwrap_or(false);
            let target_is_code = node_labels.get(rel.target_id()).copied().map(is_code_element).unwrap_or(false);
            if !source_is_code || !target_is_code {
                continue;
            }

            let a = get_index(rel.source_id(), &mut graph, &mut index_of, &mut index_to_id);
            let b = get_index(rel.target_id(), &mut graph, &mut index_of, &mut index_to_id);
            if a == b {
                continue;
            }
            if let Some(edge) = graph.find_edge(a, b) {
                graph[edge] += rel.confidence();
            } else {
                graph.add_edge(a, b, rel.confidence());
            }
        }

        (graph, index_to_id)
    }

    /// Single-level Louvain local-moving (spec.md §4.8 "iterative
    /// local-move ... loop"), capped at `community_max_iterations` passes
    /// and stopped early once a pass's total modularity gain falls below
    /// `community_modularity_epsilon`.
    fn local_move(&self, graph: &UnGraph<(), f64>) -> Vec<usize> {
        let n = graph.node_count();
        let degree: Vec<f64> = (0..n)
            .map(|i| {
                graph
                    .edges(NodeIndex::new(i))
                    .map(|e| *e.weight())
                    .sum::<f64>()
            })
            .collect();
        let m2: f64 = degree.iter().sum::<f64>().max(f64::MIN_POSITIVE);

        let mut community: Vec<usize> = (0..n).collect();
        let mut comm_tot: Vec<f64> = degree.clone();

        for _ in 0..self.config.community_max_iterations {
            let mut pass_gain = 0.0;
            for node in 0..n {
                let node_idx = NodeIndex::new(node);
                let current = community[node];
                comm_tot[current] -= degree[node];

                let mut weight_to: HashMap<usize, f64> = HashMap::new();
                for edge in graph.edges(node_idx) {
                    let neighbor = edge.target().index();
                    if neighbor == node {
                        continue;
                    }
                    *weight_to.entry(community[neighbor]).or_insert(0.0) += *edge.weight();
                }

                let home_gain = weight_to.get(&current).copied().unwrap_or(0.0)
                    - comm_tot[current] * degree[node] / m2;
                let mut best_comm = current;
                let mut best_gain = home_gain;

                for (&comm, &w) in &weight_to {
                    if comm == current {
                        continue;
                    }
                    let gain = w - comm_tot[comm] * degree[node] / m2;
                    if gain > best_gain {
                        best_gain = gain;
                        best_comm = comm;
                    }
                }

                comm_tot[best_comm] += degree[node];
                if best_comm != current {
                    pass_gain += best_gain - home_gain;
                }
                community[node] = best_comm;
            }

            if pass_gain.abs() < self.config.community_modularity_epsilon {
                break;
            }
        }

        community
    }

    /// Intra-community edge weight over total edge weight incident on the
    /// community (spec.md:157), not over a complete graph on its members —
    /// a chain or star community is not a clique and shouldn't be scored
    /// as if it fell short of one.
    fn cohesion(&self, graph: &UnGraph<(), f64>, members: &[NodeIndex]) -> f64 {
        let member_set: std::collections::HashSet<NodeIndex> = members.iter().copied().collect();
        let mut intra_weight = 0.0;
        let mut inter_weight = 0.0;
        for &idx in members {
            for edge in graph.edges(idx) {
                if member_set.contains(&edge.target()) {
                    intra_weight += *edge.weight();
                } else {
                    inter_weight += *edge.weight();
                }
            }
        }
        intra_weight /= 2.0;

        (intra_weight / (intra_weight + inter_weight).max(1.0)).min(1.0)
    }
}

/// Names a community from its dominant member kind and shared path
/// prefix, e.g. `"function cluster in src/auth"` (spec.md §4.8 "heuristic
/// labelling").
fn heuristic_label(member_ids: &[String], node_index: &HashMap<String, &Node>) -> String {
    let mut kind_counts: HashMap<NodeLabel, u32> = HashMap::new();
    let mut paths: Vec<&str> = Vec::new();
    for id in member_ids {
        if let Some(node) = node_index.get(id) {
            *kind_counts.entry(node.label()).or_insert(0) += 1;
            paths.push(node.file_path());
        }
    }

    let dominant = kind_counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(label, _)| format!("{:?}", label).to_lowercase())
        .unwrap_or_else(|| "code".to_string());

    match common_prefix(&paths) {
        Some(prefix) if !prefix.is_empty() => format!("{} cluster in {}", dominant, prefix),
        _ => format!("{} cluster", dominant),
    }
}

fn common_prefix(paths: &[&str]) -> Option<String> {
    let first = paths.first()?;
    let mut segments: Vec<&str> = first.split('/').collect();
    segments.pop(); // drop file name, keep only directory segments.

    for path in &paths[1..] {
        let other: Vec<&str> = path.split('/').collect();
        let shared = segments
            .iter()
            .zip(other.iter())
            .take_while(|(a, b)| a == b)
            .count();
        segments.truncate(shared);
        if segments.is_empty() {
            break;
        }
    }

    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RelationshipType;

    fn connected_snapshot() -> GraphSnapshot {
        let mut snapshot = GraphSnapshot::new();
        let a = Node::new(NodeLabel::Function, "a.ts", "a");
        let b = Node::new(NodeLabel::Function, "a.ts", "b");
        let c = Node::new(NodeLabel::Function, "a.ts", "c");
        let (a_id, b_id, c_id) = (a.id().to_string(), b.id().to_string(), c.id().to_string());
        snapshot.add_node(a);
        snapshot.add_node(b);
        snapshot.add_node(c);
        snapshot.add_relationship(Relationship::new(a_id.clone(), b_id.clone(), RelationshipType::Calls, 1.0, "same-file"));
        snapshot.add_relationship(Relationship::new(b_id, c_id, RelationshipType::Calls, 1.0, "same-file"));
        snapshot
    }

    #[test]
    fn tightly_connected_functions_form_one_community() {
        let config = PipelineConfig::default();
        let mut snapshot = connected_snapshot();
        let processor = CommunityProcessor::new(&config);
        let created = processor.detect(&mut snapshot);
        assert_eq!(created, 1);
        let member_of_edges = snapshot
            .relationships
            .iter()
            .filter(|r| r.relationship_type() == RelationshipType::MemberOf)
            .count();
        assert_eq!(member_of_edges, 3);
    }

    #[test]
    fn a_chain_community_scores_high_cohesion_despite_not_being_a_clique() {
        // a-b-c is a chain, not a clique (a and c never call each other
        // directly), but every edge it has is intra-community: cohesion
        // should reflect that, not the clique-based "possible pairs" ratio.
        let config = PipelineConfig::default();
        let mut snapshot = connected_snapshot();
        let created = CommunityProcessor::new(&config).detect(&mut snapshot);
        assert_eq!(created, 1);

        let community = snapshot.nodes.iter().find(|n| n.label() == NodeLabel::Community).unwrap();
        let cohesion: f64 = community.property("cohesion").unwrap().parse().unwrap();
        assert!(cohesion > 0.7, "expected high cohesion for an all-intra-edge chain, got {cohesion}");
    }

    #[test]
    fn disconnected_graph_yields_no_communities() {
        let config = PipelineConfig::default();
        let mut snapshot = GraphSnapshot::new();
        snapshot.add_node(Node::new(NodeLabel::Function, "a.ts", "a"));
        snapshot.add_node(Node::new(NodeLabel::Function, "b.ts", "b"));
        let created = CommunityProcessor::new(&config).detect(&mut snapshot);
        assert_eq!(created, 0);
    }

    #[test]
    fn common_prefix_of_shared_directory() {
        assert_eq!(
            common_prefix(&["src/auth/login.ts", "src/auth/logout.ts"]),
            Some("src/auth".to_string())
        );
        assert_eq!(common_prefix(&["a.ts", "b.ts"]), Some(String::new()));
    }
}
