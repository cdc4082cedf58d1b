use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use disjoint::DisjointSetVec;

use crate::clusterer::{all_entities, Cluster};
use crate::error::{AniClusterError, Result};
use crate::similarity::{EntityId, SimilarityRecord};
use crate::sorted_pair_score_cache::SortedPairScoreCache;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationProblem {
    RepresentativeNotMember {
        representative: EntityId,
    },
    DuplicateEntity {
        entity: EntityId,
    },
    /// A cluster in the file that single linkage at the threshold does not
    /// produce.
    UnexpectedCluster {
        members: Vec<EntityId>,
    },
    /// A single linkage cluster missing from the file.
    MissingCluster {
        members: Vec<EntityId>,
    },
    LinkedRepresentatives {
        representative1: EntityId,
        representative2: EntityId,
        score: f64,
    },
}

impl fmt::Display for ValidationProblem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationProblem::RepresentativeNotMember { representative } => write!(
                f,
                "Representative {} is not a member of its own cluster",
                representative
            ),
            ValidationProblem::DuplicateEntity { entity } => {
                write!(f, "{} is listed in more than one cluster", entity)
            }
            ValidationProblem::UnexpectedCluster { members } => write!(
                f,
                "Cluster {:?} does not match single linkage clustering of the similarity tables",
                members
            ),
            ValidationProblem::MissingCluster { members } => write!(
                f,
                "Expected cluster {:?} from the similarity tables was not found",
                members
            ),
            ValidationProblem::LinkedRepresentatives {
                representative1,
                representative2,
                score,
            } => write!(
                f,
                "Score between representatives {} and {} is not ok: {}",
                representative1, representative2, score
            ),
        }
    }
}

/// Read a cluster definition file: `representative<TAB>member` lines, each
/// cluster starting with the representative's line for itself.
pub fn read_cluster_definition(path: &str) -> Result<Vec<Cluster>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_path(path)
        .map_err(|e| AniClusterError::csv(path, e))?;

    let mut all_clusters = vec![];
    let mut current_cluster: Option<Cluster> = None;

    for record_res in rdr.records() {
        let record = record_res.map_err(|e| AniClusterError::csv(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() != 2 {
            return Err(AniClusterError::InvalidInput {
                path: path.to_string(),
                line,
                reason: format!("expected exactly 2 fields, found {:?}", record),
            });
        }

        if record[0] == record[1] {
            if let Some(cluster) = current_cluster.take() {
                all_clusters.push(cluster);
            }
            current_cluster = Some(Cluster {
                representative: record[0].to_string(),
                members: vec![],
            });
        }
        match current_cluster.as_mut() {
            Some(cluster) if cluster.representative == record[0] => {
                cluster.members.push(record[1].to_string())
            }
            _ => {
                return Err(AniClusterError::InvalidInput {
                    path: path.to_string(),
                    line,
                    reason: format!(
                        "{} is listed before its representative {} heads a cluster",
                        &record[1], &record[0]
                    ),
                })
            }
        }
    }
    if let Some(cluster) = current_cluster {
        all_clusters.push(cluster);
    }
    debug!("Read {} clusters from {}", all_clusters.len(), path);
    Ok(all_clusters)
}

/// Single linkage partition at `threshold`, computed with a disjoint-set
/// forest so that it is independent of the clusterer's traversal.
fn single_linkage_sets(
    entities: &[EntityId],
    records: &[SimilarityRecord],
    threshold: f64,
) -> BTreeSet<BTreeSet<EntityId>> {
    let index: BTreeMap<&str, usize> = entities
        .iter()
        .enumerate()
        .map(|(i, e)| (e.as_str(), i))
        .collect();
    let mut forest: DisjointSetVec<usize> = DisjointSetVec::with_capacity(entities.len());
    for (i, _) in entities.iter().enumerate() {
        forest.push(i);
    }
    for record in records
        .iter()
        .filter(|r| !r.is_self_pair() && r.score >= threshold)
    {
        if let (Some(a), Some(b)) = (
            index.get(record.entity_a.as_str()),
            index.get(record.entity_b.as_str()),
        ) {
            forest.join(*a, *b);
        }
    }
    forest
        .indices()
        .sets()
        .iter()
        .map(|set| set.iter().map(|i| entities[*i].clone()).collect())
        .collect()
}

/// Check clusters against the similarity records they were made from.
pub fn validate_clusters(
    clusters: &[Cluster],
    records: &[SimilarityRecord],
    threshold: f64,
) -> Vec<ValidationProblem> {
    let mut problems = vec![];

    let mut seen = BTreeSet::new();
    for cluster in clusters {
        if !cluster.members.contains(&cluster.representative) {
            problems.push(ValidationProblem::RepresentativeNotMember {
                representative: cluster.representative.clone(),
            });
        }
        for member in &cluster.members {
            if !seen.insert(member.clone()) {
                problems.push(ValidationProblem::DuplicateEntity {
                    entity: member.clone(),
                });
            }
        }
    }

    let mut entities = all_entities(records);
    entities.extend(seen.into_iter());
    let entities: Vec<EntityId> = entities.into_iter().collect();
    let expected = single_linkage_sets(&entities, records, threshold);
    let found: BTreeSet<BTreeSet<EntityId>> = clusters
        .iter()
        .map(|c| c.members.iter().cloned().collect())
        .collect();
    for set in found.difference(&expected) {
        problems.push(ValidationProblem::UnexpectedCluster {
            members: set.iter().cloned().collect(),
        });
    }
    for set in expected.difference(&found) {
        problems.push(ValidationProblem::MissingCluster {
            members: set.iter().cloned().collect(),
        });
    }

    let cache = SortedPairScoreCache::from_records(records);
    for (i, cluster1) in clusters.iter().enumerate() {
        for cluster2 in &clusters[(i + 1)..] {
            let rep1 = &cluster1.representative;
            let rep2 = &cluster2.representative;
            match cache.get(rep1, rep2) {
                Some(score) if rep1 != rep2 && score >= threshold => {
                    problems.push(ValidationProblem::LinkedRepresentatives {
                        representative1: rep1.clone(),
                        representative2: rep2.clone(),
                        score,
                    })
                }
                Some(score) => {
                    debug!("Score between reps {} and {} is ok: {}", rep1, rep2, score)
                }
                None => {
                    trace!("No score between reps {} and {}", rep1, rep2)
                }
            }
        }
    }
    problems
}
