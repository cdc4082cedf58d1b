use std::collections::BTreeMap;

/// Identifier of a genome or protein-set assembly, usually a file path or
/// file name stem.
pub type EntityId = String;

/// Per-entity quality used to choose between cluster members. Higher is
/// better.
pub type QualityMap = BTreeMap<EntityId, f64>;

/// One pairwise comparison reported by an external similarity tool. Scores
/// are percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityRecord {
    pub entity_a: EntityId,
    pub entity_b: EntityId,
    pub score: f64,
}

impl SimilarityRecord {
    pub fn new(entity_a: &str, entity_b: &str, score: f64) -> SimilarityRecord {
        SimilarityRecord {
            entity_a: entity_a.to_string(),
            entity_b: entity_b.to_string(),
            score,
        }
    }

    pub fn is_self_pair(&self) -> bool {
        self.entity_a == self.entity_b
    }
}
