use crate::clusterer::all_entities;
use crate::error::{AniClusterError, Result};
use crate::similarity::{EntityId, SimilarityRecord};
use crate::sorted_pair_score_cache::SortedPairScoreCache;
use crate::SELF_SIMILARITY;

/// Score given to pairs that were never measured.
pub const MISSING_SCORE: f64 = 0.0;

/// Band edges used to summarise near-identical pairs.
pub const SCORE_BAND_EDGES: &[f64] = &[98.0, 98.5, 99.0, 99.5, 100.0];

/// Square, symmetric matrix of pairwise scores over every entity, in sorted
/// id order.
#[derive(Debug, PartialEq)]
pub struct SimilarityMatrix {
    pub ids: Vec<EntityId>,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    pub fn from_records(records: &[SimilarityRecord]) -> SimilarityMatrix {
        let cache = SortedPairScoreCache::from_records(records);
        let ids: Vec<EntityId> = all_entities(records).into_iter().collect();
        let n = ids.len();
        let mut values = vec![MISSING_SCORE; n * n];
        for (i, id1) in ids.iter().enumerate() {
            for (j, id2) in ids.iter().enumerate() {
                values[i * n + j] = if i == j {
                    SELF_SIMILARITY
                } else {
                    cache.get(id1, id2).unwrap_or(MISSING_SCORE)
                };
            }
        }
        SimilarityMatrix { ids, values }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.ids.len() + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.ids.len();
        &self.values[i * n..(i + 1) * n]
    }

    /// Write as CSV with ids labelling both rows and columns.
    pub fn write_csv(&self, path: &str) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path).map_err(|e| AniClusterError::csv(path, e))?;
        let mut header = vec![String::new()];
        header.extend(self.ids.iter().cloned());
        wtr.write_record(&header)
            .map_err(|e| AniClusterError::csv(path, e))?;
        for (i, id) in self.ids.iter().enumerate() {
            let mut row = vec![id.clone()];
            row.extend(self.row(i).iter().map(|v| format!("{}", v)));
            wtr.write_record(&row)
                .map_err(|e| AniClusterError::csv(path, e))?;
        }
        wtr.flush().map_err(|e| AniClusterError::io(path, e))?;
        info!(
            "Wrote {}x{} similarity matrix to {}",
            self.len(),
            self.len(),
            path
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScorePair {
    pub entity_a: EntityId,
    pub entity_b: EntityId,
    pub score: f64,
}

/// Measured pairs scoring below `threshold`, lowest first.
pub fn low_score_pairs(records: &[SimilarityRecord], threshold: f64) -> Vec<ScorePair> {
    let cache = SortedPairScoreCache::from_records(records);
    let mut pairs: Vec<ScorePair> = cache
        .iter()
        .filter(|(_, _, score)| *score < threshold)
        .map(|(a, b, score)| ScorePair {
            entity_a: a.to_string(),
            entity_b: b.to_string(),
            score,
        })
        .collect();
    pairs.sort_by(|p1, p2| {
        p1.score
            .total_cmp(&p2.score)
            .then_with(|| p1.entity_a.cmp(&p2.entity_a))
            .then_with(|| p1.entity_b.cmp(&p2.entity_b))
    });
    pairs
}

pub fn write_low_score_pairs(path: &str, pairs: &[ScorePair]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|e| AniClusterError::csv(path, e))?;
    wtr.write_record(&["entity_a", "entity_b", "score"])
        .map_err(|e| AniClusterError::csv(path, e))?;
    for pair in pairs {
        wtr.write_record(&[
            pair.entity_a.as_str(),
            pair.entity_b.as_str(),
            format!("{}", pair.score).as_str(),
        ])
        .map_err(|e| AniClusterError::csv(path, e))?;
    }
    wtr.flush().map_err(|e| AniClusterError::io(path, e))?;
    info!("Wrote {} low scoring pairs to {}", pairs.len(), path);
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBand {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

impl ScoreBand {
    pub fn label(&self) -> String {
        format!("{:.1}-{:.1}", self.lower, self.upper)
    }
}

/// Count measured pairs per band of `SCORE_BAND_EDGES`. Bands are closed on
/// the left; the last band is also closed on the right.
pub fn score_bands(records: &[SimilarityRecord]) -> Vec<ScoreBand> {
    let cache = SortedPairScoreCache::from_records(records);
    let mut bands: Vec<ScoreBand> = SCORE_BAND_EDGES
        .windows(2)
        .map(|w| ScoreBand {
            lower: w[0],
            upper: w[1],
            count: 0,
        })
        .collect();
    let last = bands.len() - 1;
    for (_, _, score) in cache.iter() {
        if let Some(i) = bands.iter().position(|b| score >= b.lower && score < b.upper) {
            bands[i].count += 1;
        } else if score == bands[last].upper {
            bands[last].count += 1;
        }
    }
    bands
}
