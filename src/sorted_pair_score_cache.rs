use std::collections::BTreeMap;

use crate::similarity::{EntityId, SimilarityRecord};

/// Like a BTreeMap except the pair of ids in each key is sorted before
/// insertion / get etc, so (a, b) and (b, a) are the same entry.
#[derive(Debug, Default, PartialEq)]
pub struct SortedPairScoreCache {
    internal: BTreeMap<(EntityId, EntityId), f64>,
}

fn sorted_key(entity1: &str, entity2: &str) -> (EntityId, EntityId) {
    if entity1 <= entity2 {
        (entity1.to_string(), entity2.to_string())
    } else {
        (entity2.to_string(), entity1.to_string())
    }
}

impl SortedPairScoreCache {
    pub fn new() -> SortedPairScoreCache {
        SortedPairScoreCache {
            internal: BTreeMap::new(),
        }
    }

    /// Cache every non-self record. Where a pair was measured in both
    /// directions the higher score is kept.
    pub fn from_records(records: &[SimilarityRecord]) -> SortedPairScoreCache {
        let mut cache = SortedPairScoreCache::new();
        for record in records.iter().filter(|r| !r.is_self_pair()) {
            cache.insert(&record.entity_a, &record.entity_b, record.score);
        }
        cache
    }

    /// Insert a score, keeping the existing one if it is higher.
    pub fn insert(&mut self, entity1: &str, entity2: &str, score: f64) {
        let entry = self
            .internal
            .entry(sorted_key(entity1, entity2))
            .or_insert(score);
        if score > *entry {
            *entry = score;
        }
    }

    pub fn get(&self, entity1: &str, entity2: &str) -> Option<f64> {
        self.internal.get(&sorted_key(entity1, entity2)).copied()
    }

    pub fn contains_key(&self, entity1: &str, entity2: &str) -> bool {
        self.internal.contains_key(&sorted_key(entity1, entity2))
    }

    /// Pairs in key order, each with the smaller id first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.internal
            .iter()
            .map(|((a, b), score)| (a.as_str(), b.as_str(), *score))
    }

    pub fn len(&self) -> usize {
        self.internal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.internal.is_empty()
    }
}
