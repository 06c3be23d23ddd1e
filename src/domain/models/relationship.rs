use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Closed set of relationship types (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    Contains,
    Defines,
    Imports,
    Calls,
    Extends,
    Implements,
    MemberOf,
    StepInProcess,
}

/// A directed, immutable edge between two node ids (spec.md §3).
///
/// `confidence` and `reason` only carry meaning for `Calls`/`Extends`/
/// `Implements` (spec.md invariant 5); other relationship types always
/// use confidence `1.0` and an empty reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    id: String,
    source_id: String,
    target_id: String,
    relationship_type: RelationshipType,
    confidence: f64,
    reason: String,
    /// Set only for `StepInProcess` edges (spec.md invariant 7).
    step: Option<u32>,
}

impl Relationship {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relationship_type: RelationshipType,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Self {
        let source_id = source_id.into();
        let target_id = target_id.into();
        let reason = reason.into();
        let id = derive_relationship_id(&source_id, &target_id, relationship_type, &reason);
        Self {
            id,
            source_id,
            target_id,
            relationship_type,
            confidence,
            reason,
            step: None,
        }
    }

    pub fn with_step(mut self, step: u32) -> Self {
        self.step = Some(step);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn relationship_type(&self) -> RelationshipType {
        self.relationship_type
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn step(&self) -> Option<u32> {
        self.step
    }
}

/// Derives a stable relationship id so re-running the pipeline coalesces
/// duplicate edges (spec.md §4.6 "duplicates are coalesced") instead of
/// re-emitting them under a fresh random id.
pub fn derive_relationship_id(
    source_id: &str,
    target_id: &str,
    relationship_type: RelationshipType,
    reason: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(target_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(format!("{:?}", relationship_type).as_bytes());
    hasher.update(b"\0");
    hasher.update(reason.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest[..16].iter().map(|b| format!("{:02x}", b)).collect();
    format!("rel:{}", hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_edges_coalesce_to_the_same_id() {
        let a = Relationship::new("f1", "f2", RelationshipType::Calls, 1.0, "same-file");
        let b = Relationship::new("f1", "f2", RelationshipType::Calls, 1.0, "same-file");
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn different_reasons_are_distinct_edges() {
        let a = Relationship::new("f1", "f2", RelationshipType::Calls, 1.0, "same-file");
        let b = Relationship::new("f1", "f2", RelationshipType::Calls, 0.8, "fuzzy-global");
        assert_ne!(a.id(), b.id());
    }
}
