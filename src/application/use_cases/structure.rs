use std::collections::BTreeMap;

use crate::domain::{GraphSnapshot, Node, NodeLabel, RelationshipType, ScannedFile};
use crate::domain::{normalize_path, Relationship};

/// Phase 2 — builds `Folder`/`File` nodes and `CONTAINS` edges from the
/// scanned path set (spec.md §4.2).
pub struct StructureProcessor;

impl StructureProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Returns the node id of every `File` node created, keyed by its
    /// normalised relative path, so later phases can attach `DEFINES`
    /// edges without re-deriving ids.
    pub fn build(&self, files: &[ScannedFile], snapshot: &mut GraphSnapshot) -> BTreeMap<String, String> {
        let mut folder_ids: BTreeMap<String, String> = BTreeMap::new();
        let mut file_ids: BTreeMap<String, String> = BTreeMap::new();

        for file in files {
            let path = normalize_path(&file.relative_path);
            let ancestors = ancestor_folders(&path);

            // Ensure every ancestor folder node + CONTAINS edge from its
            // parent exists, root-first so the forest invariant (spec.md
            // invariant 3) holds incrementally.
            let mut parent: Option<String> = None;
            for folder_path in &ancestors {
                let folder_id = folder_ids.entry(folder_path.clone()).or_insert_with(|| {
                    let name = folder_path.rsplit('/').next().unwrap_or(folder_path).to_string();
                    let node = Node::new(NodeLabel::Folder, folder_path.clone(), name);
                    let id = node.id().to_string();
                    snapshot.add_node(node);
                    id
                }).clone();

                if let Some(parent_id) = &parent {
                    if parent_id != &folder_id {
                        snapshot.add_relationship(Relationship::new(
                            parent_id.clone(),
                            folder_id.clone(),
                            RelationshipType::Contains,
                            1.0,
                            "",
                        ));
                    }
                }
                parent = Some(folder_id);
            }

            let file_name = path.rsplit('/').next().unwrap_or(&path).to_string();
            let file_node = Node::new(NodeLabel::File, path.clone(), file_name);
            let file_id = file_node.id().to_string();
            snapshot.add_node(file_node);
            file_ids.insert(path.clone(), file_id.clone());

            if let Some(parent_id) = &parent {
                snapshot.add_relationship(Relationship::new(
                    parent_id.clone(),
                    file_id,
                    RelationshipType::Contains,
                    1.0,
                    "",
                ));
            }
        }

        file_ids
    }
}

impl Default for StructureProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns every ancestor directory of `path`, root-first, e.g.
/// `"src/a/b.ts"` -> `["src", "src/a"]`.
fn ancestor_folders(path: &str) -> Vec<String> {
    let mut folders = Vec::new();
    let mut acc: Option<String> = None;
    let segments: Vec<&str> = path.split('/').collect();
    for segment in &segments[..segments.len().saturating_sub(1)] {
        acc = Some(match acc {
            Some(prefix) => format!("{}/{}", prefix, segment),
            None => segment.to_string(),
        });
        folders.push(acc.clone().unwrap());
    }
    folders
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestor_folders_are_root_first() {
        assert_eq!(ancestor_folders("src/a/b.ts"), vec!["src", "src/a"]);
        assert_eq!(ancestor_folders("a.ts"), Vec::<String>::new());
    }

    #[test]
    fn builds_a_contains_forest() {
        let files = vec![ScannedFile::new("src/a/b.ts", 1), ScannedFile::new("src/c.ts", 1)];
        let mut snapshot = GraphSnapshot::new();
        let processor = StructureProcessor::new();
        let file_ids = processor.build(&files, &mut snapshot);

        assert_eq!(file_ids.len(), 2);
        // 2 folders (src, src/a) + 2 files = 4 nodes
        assert_eq!(snapshot.nodes.len(), 4);
        // src->src/a, src/a->b.ts, src->c.ts = 3 edges
        assert_eq!(snapshot.relationships.len(), 3);
        for r in &snapshot.relationships {
            assert_eq!(r.relationship_type(), RelationshipType::Contains);
            assert_eq!(r.confidence(), 1.0);
        }
    }

    #[test]
    fn two_files_in_the_same_folder_share_one_folder_node() {
        let files = vec![ScannedFile::new("src/a.ts", 1), ScannedFile::new("src/b.ts", 1)];
        let mut snapshot = GraphSnapshot::new();
        StructureProcessor::new().build(&files, &mut snapshot);
        let folder_nodes = snapshot
            .nodes
            .iter()
            .filter(|n| n.label() == NodeLabel::Folder)
            .count();
        assert_eq!(folder_nodes, 1);
    }
}
