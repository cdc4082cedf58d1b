use std::io::Write;

use rayon::prelude::*;

use crate::clusterer::cluster;
use crate::error::{AniClusterError, Result};
use crate::similarity::{EntityId, QualityMap, SimilarityRecord};

/// Representatives listed per threshold in the text summary.
const TEXT_SUMMARY_MAX_REPRESENTATIVES: usize = 5;

lazy_static! {
    /// 98 to 100 in steps of 0.5, plus 99 to 100 in steps of 0.1.
    pub static ref DEFAULT_SWEEP_THRESHOLDS: Vec<f64> = {
        let coarse = (0..=4).map(|i| 98.0 + 0.5 * i as f64);
        let fine = (0..=10).map(|i| 99.0 + 0.1 * i as f64);
        let rounded: Vec<f64> = coarse
            .chain(fine)
            .map(|t| (t * 100.0).round() / 100.0)
            .collect();
        normalise_thresholds(&rounded)
    };
}

/// Sort ascending and drop duplicates. Values are used as given.
pub fn normalise_thresholds(thresholds: &[f64]) -> Vec<f64> {
    let mut sorted = thresholds.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.dedup_by(|a, b| a.total_cmp(b).is_eq());
    sorted
}

pub fn format_threshold(threshold: f64) -> String {
    format!("{:?}", threshold)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepRow {
    pub threshold: f64,
    pub num_groups: usize,
    pub representatives: Vec<EntityId>,
    pub group_sizes: Vec<usize>,
}

/// Cluster at each threshold. Thresholds are independent so they are run in
/// parallel; rows come back in ascending threshold order.
pub fn sweep(
    records: &[SimilarityRecord],
    thresholds: &[f64],
    quality: Option<&QualityMap>,
) -> Vec<SweepRow> {
    let thresholds = normalise_thresholds(thresholds);
    info!(
        "Clustering {} similarity records at {} thresholds ..",
        records.len(),
        thresholds.len()
    );
    let rows: Vec<SweepRow> = thresholds
        .par_iter()
        .map(|threshold| {
            let clustering = cluster(records, *threshold, quality);
            SweepRow {
                threshold: *threshold,
                num_groups: clustering.clusters.len(),
                representatives: clustering
                    .clusters
                    .iter()
                    .map(|c| c.representative.clone())
                    .collect(),
                group_sizes: clustering.clusters.iter().map(|c| c.members.len()).collect(),
            }
        })
        .collect();
    for row in &rows {
        info!(
            "At threshold {}%, found {} groups",
            format_threshold(row.threshold),
            row.num_groups
        );
    }
    rows
}

fn join_sizes(sizes: &[usize]) -> String {
    sizes
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

pub fn write_sweep_csv(path: &str, rows: &[SweepRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| AniClusterError::csv(path, e))?;
    wtr.write_record(&["threshold", "num_groups", "representatives", "group_sizes"])
        .map_err(|e| AniClusterError::csv(path, e))?;
    for row in rows {
        wtr.write_record(&[
            format_threshold(row.threshold),
            row.num_groups.to_string(),
            row.representatives.join(";"),
            join_sizes(&row.group_sizes),
        ])
        .map_err(|e| AniClusterError::csv(path, e))?;
    }
    wtr.flush().map_err(|e| AniClusterError::io(path, e))?;
    Ok(())
}

pub fn write_sweep_text(path: &str, rows: &[SweepRow]) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| AniClusterError::io(path, e))?;
    let mut out = std::io::BufWriter::new(file);
    let io_err = |e| AniClusterError::io(path, e);

    writeln!(out, "Clustering summary by threshold").map_err(io_err)?;
    writeln!(out, "{}", "=".repeat(31)).map_err(io_err)?;
    for row in rows {
        let shown = &row.representatives
            [..row.representatives.len().min(TEXT_SUMMARY_MAX_REPRESENTATIVES)];
        let ellipsis = if shown.len() < row.representatives.len() {
            ", ..."
        } else {
            ""
        };
        writeln!(out, "Threshold: {}%", format_threshold(row.threshold)).map_err(io_err)?;
        writeln!(out, "  - Groups: {}", row.num_groups).map_err(io_err)?;
        writeln!(
            out,
            "  - Representatives (up to {}): {}{}",
            TEXT_SUMMARY_MAX_REPRESENTATIVES,
            shown.join(", "),
            ellipsis
        )
        .map_err(io_err)?;
        writeln!(out, "  - Group sizes: {}", join_sizes(&row.group_sizes)).map_err(io_err)?;
        writeln!(out).map_err(io_err)?;
    }
    out.flush().map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn records() -> Vec<SimilarityRecord> {
        vec![
            SimilarityRecord::new("A", "B", 100.0),
            SimilarityRecord::new("B", "C", 99.95),
            SimilarityRecord::new("D", "E", 98.2),
            SimilarityRecord::new("C", "D", 90.0),
        ]
    }

    #[test]
    fn test_default_thresholds() {
        assert_eq!(
            vec![
                98.0, 98.5, 99.0, 99.1, 99.2, 99.3, 99.4, 99.5, 99.6, 99.7, 99.8, 99.9, 100.0
            ],
            *DEFAULT_SWEEP_THRESHOLDS
        );
    }

    #[test]
    fn test_sweep() {
        init();
        let rows = sweep(&records(), &[100.0, 98.0, 99.0, 98.0], None);
        assert_eq!(
            vec![
                SweepRow {
                    threshold: 98.0,
                    num_groups: 2,
                    representatives: vec!["A".to_string(), "D".to_string()],
                    group_sizes: vec![3, 2],
                },
                SweepRow {
                    threshold: 99.0,
                    num_groups: 3,
                    representatives: vec!["A".to_string(), "D".to_string(), "E".to_string()],
                    group_sizes: vec![3, 1, 1],
                },
                SweepRow {
                    threshold: 100.0,
                    num_groups: 4,
                    representatives: vec![
                        "A".to_string(),
                        "C".to_string(),
                        "D".to_string(),
                        "E".to_string()
                    ],
                    group_sizes: vec![2, 1, 1, 1],
                },
            ],
            rows
        );
    }

    #[test]
    fn test_sweep_keeps_given_thresholds() {
        init();
        let records = vec![SimilarityRecord::new("A", "B", 99.992)];
        let rows = sweep(&records, &[99.995, 99.994, 99.994], None);
        assert_eq!(
            vec![99.994, 99.995],
            rows.iter().map(|r| r.threshold).collect::<Vec<_>>()
        );
        assert_eq!(
            cluster(&records, 99.994, None).clusters.len(),
            rows[0].num_groups
        );
        assert_eq!(2, rows[0].num_groups);
        assert_eq!("99.994", format_threshold(rows[0].threshold));
    }

    #[test]
    fn test_sweep_with_quality() {
        init();
        let mut quality = QualityMap::new();
        quality.insert("C".to_string(), 10.0);
        quality.insert("E".to_string(), 10.0);
        let rows = sweep(&records(), &[98.0], Some(&quality));
        assert_eq!(vec!["C", "E"], rows[0].representatives);
    }

    #[test]
    fn test_writers() {
        init();
        let td = tempfile::TempDir::new().unwrap();
        let csv_path = td.path().join("sweep.csv");
        let text_path = td.path().join("sweep.txt");
        let rows = sweep(&records(), &[98.0, 100.0], None);
        write_sweep_csv(csv_path.to_str().unwrap(), &rows).unwrap();
        write_sweep_text(text_path.to_str().unwrap(), &rows).unwrap();

        assert_eq!(
            "threshold,num_groups,representatives,group_sizes\n\
            98.0,2,A;D,3;2\n\
            100.0,4,A;C;D;E,2;1;1;1\n",
            std::fs::read_to_string(csv_path).unwrap()
        );
        let text = std::fs::read_to_string(text_path).unwrap();
        assert!(text.contains("Threshold: 100.0%\n  - Groups: 4\n"));
        assert!(text.contains("  - Representatives (up to 5): A, C, D, E\n"));
        assert!(text.contains("  - Group sizes: 3;2\n"));
    }
}
