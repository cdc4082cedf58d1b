use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::similarity::{EntityId, QualityMap, SimilarityRecord};

/// Neighbours of every entity that has at least one edge at or above the
/// clustering threshold.
pub type AdjacencyMap = BTreeMap<EntityId, BTreeSet<EntityId>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub representative: EntityId,
    /// Sorted, and always containing the representative.
    pub members: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Clustering {
    pub clusters: Vec<Cluster>,
}

impl Clustering {
    pub fn representatives(&self) -> Vec<&str> {
        self.clusters
            .iter()
            .map(|c| c.representative.as_str())
            .collect()
    }

    pub fn representative_of(&self, entity: &str) -> Option<&str> {
        self.clusters
            .iter()
            .find(|c| c.members.iter().any(|m| m == entity))
            .map(|c| c.representative.as_str())
    }

    pub fn num_entities(&self) -> usize {
        self.clusters.iter().map(|c| c.members.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

/// Build an undirected graph with one edge per record scoring at least
/// `threshold`. Self pairs never create an edge.
pub fn build_graph(records: &[SimilarityRecord], threshold: f64) -> AdjacencyMap {
    let mut adjacency = AdjacencyMap::new();
    for record in records {
        if record.is_self_pair() || record.score < threshold {
            continue;
        }
        trace!(
            "Adding edge {} - {} ({})",
            record.entity_a,
            record.entity_b,
            record.score
        );
        adjacency
            .entry(record.entity_a.clone())
            .or_default()
            .insert(record.entity_b.clone());
        adjacency
            .entry(record.entity_b.clone())
            .or_default()
            .insert(record.entity_a.clone());
    }
    adjacency
}

/// Every id seen in any record, whatever its score.
pub fn all_entities(records: &[SimilarityRecord]) -> BTreeSet<EntityId> {
    let mut nodes = BTreeSet::new();
    for record in records {
        nodes.insert(record.entity_a.clone());
        nodes.insert(record.entity_b.clone());
    }
    nodes
}

/// Breadth-first connected components. Nodes are visited in sorted order, so
/// components come out ordered by their smallest member, and each
/// component's members are sorted.
pub fn connected_components(
    all_nodes: &BTreeSet<EntityId>,
    adjacency: &AdjacencyMap,
) -> Vec<Vec<EntityId>> {
    let mut visited: BTreeSet<&str> = BTreeSet::new();
    let mut components = vec![];

    for node in all_nodes {
        if visited.contains(node.as_str()) {
            continue;
        }
        let mut component: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        visited.insert(node.as_str());
        queue.push_back(node.as_str());

        while let Some(current) = queue.pop_front() {
            component.insert(current);
            if let Some(neighbours) = adjacency.get(current) {
                for neighbour in neighbours {
                    if visited.insert(neighbour.as_str()) {
                        queue.push_back(neighbour.as_str());
                    }
                }
            }
        }
        components.push(component.into_iter().map(|s| s.to_string()).collect());
    }
    components
}

fn quality_of(quality: &QualityMap, entity: &str) -> f64 {
    quality.get(entity).copied().unwrap_or(f64::NEG_INFINITY)
}

/// Choose the representative of a cluster: the highest quality member when
/// qualities are given, otherwise (and on exact quality ties) the
/// lexicographically smallest id. Returns None only for an empty cluster.
pub fn select_representative<'a>(
    cluster: &'a [EntityId],
    quality: Option<&QualityMap>,
) -> Option<&'a EntityId> {
    match quality {
        None => cluster.iter().min(),
        Some(quality) => cluster.iter().min_by(|a, b| {
            let qa = quality_of(quality, a);
            let qb = quality_of(quality, b);
            match qb.total_cmp(&qa) {
                Ordering::Equal => a.cmp(b),
                o => o,
            }
        }),
    }
}

/// Cluster entities by single linkage at `threshold` and pick one
/// representative per cluster.
pub fn cluster(
    records: &[SimilarityRecord],
    threshold: f64,
    quality: Option<&QualityMap>,
) -> Clustering {
    let adjacency = build_graph(records, threshold);
    let nodes = all_entities(records);
    debug!(
        "Built similarity graph at threshold {}: {} entities, {} with edges",
        threshold,
        nodes.len(),
        adjacency.len()
    );

    let clusters = connected_components(&nodes, &adjacency)
        .into_iter()
        .filter_map(|members| {
            let representative = select_representative(&members, quality)?.clone();
            Some(Cluster {
                representative,
                members,
            })
        })
        .collect::<Vec<_>>();
    debug!(
        "Found {} clusters at threshold {}",
        clusters.len(),
        threshold
    );

    Clustering { clusters }
}
