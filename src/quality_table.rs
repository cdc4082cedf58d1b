use crate::error::{AniClusterError, Result};
use std::collections::BTreeSet;

use crate::similarity::{EntityId, QualityMap};
use crate::similarity_table::delimiter_for;

pub const ID_COLUMNS: &[&str] = &["genome", "Genome", "entity_id"];
pub const SCORE_COLUMNS: &[&str] = &["quality_score", "Quality_Score"];

const N50_COLUMN: &str = "N50";
const TOTAL_LENGTH_COLUMN: &str = "Total_Length";
const L50_COLUMN: &str = "L50";

/// Assembly statistics of one genome, as written to a genome quality table.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyStats {
    pub n50: f64,
    pub total_length: f64,
    pub l50: f64,
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    AssemblyStats {
        n50: usize,
        total_length: usize,
        l50: usize,
    },
    Score(usize),
}

fn column(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn first_column(path: &str, field: &'static str, names: &[&str], headers: &[String]) -> Result<usize> {
    names
        .iter()
        .find_map(|name| column(headers, name))
        .ok_or_else(|| AniClusterError::SchemaMismatch {
            path: path.to_string(),
            field,
            candidates: names.iter().map(|s| s.to_string()).collect(),
            headers: headers.to_vec(),
        })
}

fn parse_number(path: &str, line: u64, name: &str, raw: Option<&str>) -> Result<f64> {
    let raw = raw.map(|s| s.trim()).unwrap_or("");
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(AniClusterError::InvalidInput {
            path: path.to_string(),
            line,
            reason: format!("{} value '{}' is not a finite number", name, raw),
        }),
    }
}

/// Standard scores using the sample standard deviation. A column without
/// spread scores 0 throughout.
fn z_scores(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let sd = variance.sqrt();
    if sd > 0.0 {
        values.iter().map(|v| (v - mean) / sd).collect()
    } else {
        vec![0.0; n]
    }
}

/// Quality from assembly statistics: z(N50) + 0.5 z(total length) - 0.2 L50.
/// Scores are relative to the set of genomes given.
pub fn assembly_quality_scores(stats: &[AssemblyStats]) -> Vec<f64> {
    let n50_z = z_scores(&stats.iter().map(|s| s.n50).collect::<Vec<_>>());
    let length_z = z_scores(&stats.iter().map(|s| s.total_length).collect::<Vec<_>>());
    stats
        .iter()
        .enumerate()
        .map(|(i, s)| n50_z[i] + 0.5 * length_z[i] - 0.2 * s.l50)
        .collect()
}

fn insert_unique(qualities: &mut QualityMap, path: &str, line: u64, id: &str, score: f64) -> Result<()> {
    match qualities.insert(id.to_string(), score) {
        None => Ok(()),
        Some(_) => Err(AniClusterError::InvalidInput {
            path: path.to_string(),
            line,
            reason: format!("the genome {} was found multiple times", id),
        }),
    }
}

/// Read a per-genome quality table. Either an id column and a quality score
/// column, or an id column with N50, Total_Length and L50 columns, from
/// which scores are derived. When both are present the statistics are used.
pub fn read_quality_table(path: &str) -> Result<QualityMap> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .has_headers(true)
        .from_path(path)
        .map_err(|e| AniClusterError::csv(path, e))?;
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| AniClusterError::csv(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let id_col = first_column(path, "genome", ID_COLUMNS, &headers)?;
    let layout = match (
        column(&headers, N50_COLUMN),
        column(&headers, TOTAL_LENGTH_COLUMN),
        column(&headers, L50_COLUMN),
    ) {
        (Some(n50), Some(total_length), Some(l50)) => Layout::AssemblyStats {
            n50,
            total_length,
            l50,
        },
        _ => Layout::Score(first_column(path, "quality_score", SCORE_COLUMNS, &headers)?),
    };

    let mut qualities = QualityMap::new();
    let mut ids_and_stats = vec![];
    for result in rdr.records() {
        let row = result.map_err(|e| AniClusterError::csv(path, e))?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let id = row.get(id_col).map(|s| s.trim()).unwrap_or("");
        if id.is_empty() {
            return Err(AniClusterError::InvalidInput {
                path: path.to_string(),
                line,
                reason: "empty genome id".to_string(),
            });
        }
        match layout {
            Layout::AssemblyStats {
                n50,
                total_length,
                l50,
            } => {
                let stats = AssemblyStats {
                    n50: parse_number(path, line, N50_COLUMN, row.get(n50))?,
                    total_length: parse_number(
                        path,
                        line,
                        TOTAL_LENGTH_COLUMN,
                        row.get(total_length),
                    )?,
                    l50: parse_number(path, line, L50_COLUMN, row.get(l50))?,
                };
                trace!("For {}, found assembly stats {:?}", id, stats);
                ids_and_stats.push((id.to_string(), line, stats));
            }
            Layout::Score(score) => {
                let quality = parse_number(path, line, "quality score", row.get(score))?;
                trace!("For {}, found quality {}", id, quality);
                insert_unique(&mut qualities, path, line, id, quality)?;
            }
        }
    }

    if let Layout::AssemblyStats { .. } = layout {
        info!("Deriving genome qualities from N50, total length and L50 in {}", path);
        let stats: Vec<AssemblyStats> = ids_and_stats.iter().map(|(_, _, s)| s.clone()).collect();
        for ((id, line, _), score) in ids_and_stats.iter().zip(assembly_quality_scores(&stats)) {
            insert_unique(&mut qualities, path, *line, id, score)?;
        }
    }
    debug!("Read in qualities for {} genomes from {}", qualities.len(), path);
    Ok(qualities)
}

/// Number of `entities` that have a quality entry. Warns when none do, since
/// representatives then fall back to id order.
pub fn count_covered_entities(quality: &QualityMap, entities: &BTreeSet<EntityId>) -> usize {
    let covered = entities.iter().filter(|e| quality.contains_key(*e)).count();
    if covered == 0 && !entities.is_empty() {
        warn!(
            "None of the {} clustered genomes has an entry in the quality table, so representatives are chosen by sort order of their ids. Check that quality table ids match the similarity table ids (see --id-style)",
            entities.len()
        );
    } else if covered < entities.len() {
        debug!(
            "Quality table covers {} of {} clustered genomes",
            covered,
            entities.len()
        );
    }
    covered
}
