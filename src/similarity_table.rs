use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{AniClusterError, Result};
use crate::similarity::{EntityId, SimilarityRecord};

/// How the columns of a similarity table map onto (entity_a, entity_b,
/// score).
#[derive(Debug, Clone, PartialEq)]
pub enum TableSchema {
    /// Headed table. Each field lists the exact header names accepted for it,
    /// in order of preference.
    Named {
        name: String,
        entity_a: Vec<String>,
        entity_b: Vec<String>,
        score: Vec<String>,
    },
    /// Headerless table with fixed column positions.
    Positional {
        name: String,
        entity_a: usize,
        entity_b: usize,
        score: usize,
    },
}

fn named(name: &str, entity_a: &[&str], entity_b: &[&str], score: &[&str]) -> TableSchema {
    let owned = |names: &[&str]| -> Vec<String> { names.iter().map(|s| s.to_string()).collect() };
    TableSchema::Named {
        name: name.to_string(),
        entity_a: owned(entity_a),
        entity_b: owned(entity_b),
        score: owned(score),
    }
}

lazy_static! {
    /// Headed presets, in the order `auto` tries them.
    static ref HEADED_PRESETS: Vec<TableSchema> = vec![
        named("canonical", &["entity_a"], &["entity_b"], &["score"]),
        named("fastani", &["Genome1"], &["Genome2"], &["ANI"]),
        named("skani", &["Ref_file"], &["Query_file"], &["ANI"]),
        named(
            "comparem",
            &["Genome A", "Genome_A", "genome1"],
            &["Genome B", "Genome_B", "genome2"],
            &["Mean AAI", "AAI", "aai"],
        ),
    ];
}

pub const TABLE_FORMAT_NAMES: &[&str] =
    &["auto", "canonical", "fastani", "fastani-raw", "skani", "comparem"];

impl TableSchema {
    pub fn preset(name: &str) -> Option<TableSchema> {
        match name {
            "fastani-raw" => Some(TableSchema::Positional {
                name: name.to_string(),
                entity_a: 0,
                entity_b: 1,
                score: 2,
            }),
            _ => HEADED_PRESETS
                .iter()
                .find(|s| s.name() == name)
                .cloned(),
        }
    }

    /// A headed schema from three user-supplied column names.
    pub fn custom(entity_a: &str, entity_b: &str, score: &str) -> TableSchema {
        named("custom", &[entity_a], &[entity_b], &[score])
    }

    pub fn name(&self) -> &str {
        match self {
            TableSchema::Named { name, .. } => name,
            TableSchema::Positional { name, .. } => name,
        }
    }

    fn has_headers(&self) -> bool {
        matches!(self, TableSchema::Named { .. })
    }

    /// Column indices of (entity_a, entity_b, score) given the table's
    /// headers.
    fn resolve(&self, path: &str, headers: &[String]) -> Result<(usize, usize, usize)> {
        match self {
            TableSchema::Positional {
                entity_a,
                entity_b,
                score,
                ..
            } => Ok((*entity_a, *entity_b, *score)),
            TableSchema::Named {
                entity_a,
                entity_b,
                score,
                ..
            } => Ok((
                find_column(path, "entity_a", entity_a, headers)?,
                find_column(path, "entity_b", entity_b, headers)?,
                find_column(path, "score", score, headers)?,
            )),
        }
    }
}

fn find_column(
    path: &str,
    field: &'static str,
    candidates: &[String],
    headers: &[String],
) -> Result<usize> {
    candidates
        .iter()
        .find_map(|candidate| headers.iter().position(|h| h == candidate))
        .ok_or_else(|| AniClusterError::SchemaMismatch {
            path: path.to_string(),
            field,
            candidates: candidates.to_vec(),
            headers: headers.to_vec(),
        })
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableFormat {
    /// Try each headed preset until one matches the headers.
    Auto,
    Schema(TableSchema),
}

impl TableFormat {
    pub fn from_name(name: &str) -> Result<TableFormat> {
        match name {
            "auto" => Ok(TableFormat::Auto),
            _ => TableSchema::preset(name)
                .map(TableFormat::Schema)
                .ok_or_else(|| AniClusterError::InvalidArgument {
                    parameter: "table-format".to_string(),
                    reason: format!(
                        "unknown format '{}', expected one of {:?}",
                        name, TABLE_FORMAT_NAMES
                    ),
                }),
        }
    }
}

/// How entity ids are derived from the values in the id columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IdStyle {
    /// Use the value as written.
    Path,
    /// Use the file name without its final extension.
    Stem,
}

impl IdStyle {
    pub fn from_name(name: &str) -> Result<IdStyle> {
        match name {
            "path" => Ok(IdStyle::Path),
            "stem" => Ok(IdStyle::Stem),
            _ => Err(AniClusterError::InvalidArgument {
                parameter: "id-style".to_string(),
                reason: format!("unknown id style '{}', expected path or stem", name),
            }),
        }
    }

    pub fn apply(&self, raw: &str) -> EntityId {
        match self {
            IdStyle::Path => raw.to_string(),
            IdStyle::Stem => Path::new(raw)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableOptions {
    pub format: TableFormat,
    pub id_style: IdStyle,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            format: TableFormat::Auto,
            id_style: IdStyle::Path,
        }
    }
}

/// Comma for .csv files, tab for anything else.
pub fn delimiter_for(path: &str) -> u8 {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
        _ => b'\t',
    }
}

fn choose_schema(path: &str, format: &TableFormat, headers: &[String]) -> Result<TableSchema> {
    match format {
        TableFormat::Schema(schema) => Ok(schema.clone()),
        TableFormat::Auto => {
            for schema in HEADED_PRESETS.iter() {
                if schema.resolve(path, headers).is_ok() {
                    debug!("Detected {} format for {}", schema.name(), path);
                    return Ok(schema.clone());
                }
            }
            Err(AniClusterError::SchemaMismatch {
                path: path.to_string(),
                field: "entity_a, entity_b and score",
                candidates: HEADED_PRESETS
                    .iter()
                    .map(|s| s.name().to_string())
                    .collect(),
                headers: headers.to_vec(),
            })
        }
    }
}

fn parse_id(path: &str, line: u64, raw: Option<&str>, id_style: IdStyle) -> Result<EntityId> {
    let raw = raw.map(|s| s.trim()).unwrap_or("");
    if raw.is_empty() {
        return Err(AniClusterError::InvalidInput {
            path: path.to_string(),
            line,
            reason: "empty entity id".to_string(),
        });
    }
    Ok(id_style.apply(raw))
}

fn parse_score(path: &str, line: u64, raw: Option<&str>) -> Result<f64> {
    let raw = raw.map(|s| s.trim()).unwrap_or("");
    match raw.parse::<f64>() {
        Ok(score) if score.is_finite() => Ok(score),
        _ => Err(AniClusterError::InvalidInput {
            path: path.to_string(),
            line,
            reason: format!("score '{}' is not a finite number", raw),
        }),
    }
}

/// Read one similarity table, normalising it to similarity records.
pub fn read_similarity_table(path: &str, options: &TableOptions) -> Result<Vec<SimilarityRecord>> {
    let has_headers = match &options.format {
        TableFormat::Auto => true,
        TableFormat::Schema(schema) => schema.has_headers(),
    };
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .has_headers(has_headers)
        .flexible(true)
        .from_path(path)
        .map_err(|e| AniClusterError::csv(path, e))?;

    let headers: Vec<String> = if has_headers {
        rdr.headers()
            .map_err(|e| AniClusterError::csv(path, e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect()
    } else {
        vec![]
    };
    let schema = choose_schema(path, &options.format, &headers)?;
    let (a_col, b_col, score_col) = schema.resolve(path, &headers)?;
    trace!(
        "Using columns {}, {} and {} of {}",
        a_col,
        b_col,
        score_col,
        path
    );

    let mut records = vec![];
    for result in rdr.records() {
        let row = result.map_err(|e| AniClusterError::csv(path, e))?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        records.push(SimilarityRecord {
            entity_a: parse_id(path, line, row.get(a_col), options.id_style)?,
            entity_b: parse_id(path, line, row.get(b_col), options.id_style)?,
            score: parse_score(path, line, row.get(score_col))?,
        });
    }
    debug!(
        "Read {} similarity records from {} as {}",
        records.len(),
        path,
        schema.name()
    );
    Ok(records)
}

/// Concatenate tables, dropping exact duplicate records. The first
/// occurrence of a duplicate is kept.
pub fn merge_tables(tables: Vec<Vec<SimilarityRecord>>) -> Vec<SimilarityRecord> {
    let mut seen: BTreeSet<(EntityId, EntityId, u64)> = BTreeSet::new();
    let mut merged = vec![];
    let mut duplicates = 0usize;
    for record in tables.into_iter().flatten() {
        let key = (
            record.entity_a.clone(),
            record.entity_b.clone(),
            record.score.to_bits(),
        );
        if seen.insert(key) {
            merged.push(record);
        } else {
            duplicates += 1;
        }
    }
    if duplicates > 0 {
        debug!("Dropped {} duplicate similarity records", duplicates);
    }
    merged
}

/// Read and merge several similarity tables.
pub fn read_similarity_tables(
    paths: &[&str],
    options: &TableOptions,
) -> Result<Vec<SimilarityRecord>> {
    let mut tables = vec![];
    for path in paths {
        tables.push(read_similarity_table(path, options)?);
    }
    let merged = merge_tables(tables);
    info!(
        "Read {} similarity records from {} table(s)",
        merged.len(),
        paths.len()
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn read(path: &str, format: &str, id_style: IdStyle) -> Result<Vec<SimilarityRecord>> {
        read_similarity_table(
            path,
            &TableOptions {
                format: TableFormat::from_name(format).unwrap(),
                id_style,
            },
        )
    }

    #[test]
    fn test_fastani_table() {
        init();
        let records = read("tests/data/fastani_pairs.tsv", "fastani", IdStyle::Path).unwrap();
        assert_eq!(6, records.len());
        assert_eq!(SimilarityRecord::new("gA", "gB", 100.0), records[0]);
        assert_eq!(SimilarityRecord::new("gD", "gE", 97.5), records[5]);
    }

    #[test]
    fn test_auto_detects_skani_and_strips_paths() {
        init();
        let records = read("tests/data/skani_triangle.tsv", "auto", IdStyle::Stem).unwrap();
        assert_eq!(3, records.len());
        assert_eq!(SimilarityRecord::new("gA", "gB", 99.995), records[0]);
        assert_eq!(SimilarityRecord::new("gC", "gE", 96.2), records[2]);
    }

    #[test]
    fn test_auto_detects_comparem() {
        init();
        let records = read("tests/data/comparem_aai_summary.tsv", "auto", IdStyle::Path).unwrap();
        assert_eq!(
            vec![
                SimilarityRecord::new("p1", "p2", 99.1),
                SimilarityRecord::new("p1", "p3", 72.4),
            ],
            records
        );
    }

    #[test]
    fn test_headerless_fastani_output() {
        init();
        let records = read("tests/data/fastani_raw.txt", "fastani-raw", IdStyle::Stem).unwrap();
        assert_eq!(vec![SimilarityRecord::new("gA", "gC", 99.2)], records);
    }

    #[test]
    fn test_comma_separated_custom_columns() {
        init();
        let records = read_similarity_table(
            "tests/data/custom_columns.csv",
            &TableOptions {
                format: TableFormat::Schema(TableSchema::custom("query", "reference", "identity")),
                id_style: IdStyle::Path,
            },
        )
        .unwrap();
        assert_eq!(vec![SimilarityRecord::new("x", "y", 98.0)], records);
    }

    #[test]
    fn test_unknown_headers_are_a_schema_mismatch() {
        init();
        match read("tests/data/custom_columns.csv", "auto", IdStyle::Path) {
            Err(AniClusterError::SchemaMismatch { headers, .. }) => {
                assert_eq!(vec!["query", "reference", "identity"], headers)
            }
            other => panic!("Unexpected result {:?}", other),
        }
        match read("tests/data/custom_columns.csv", "skani", IdStyle::Path) {
            Err(AniClusterError::SchemaMismatch { field, .. }) => assert_eq!("entity_a", field),
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_empty_id_rejected() {
        init();
        match read("tests/data/empty_id.tsv", "fastani", IdStyle::Path) {
            Err(AniClusterError::InvalidInput { line, .. }) => assert_eq!(3, line),
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_score_rejected() {
        init();
        assert!(matches!(
            read("tests/data/bad_score.tsv", "fastani", IdStyle::Path),
            Err(AniClusterError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_unknown_format_name() {
        init();
        assert!(TableFormat::from_name("blast").is_err());
        assert!(IdStyle::from_name("basename").is_err());
    }

    #[test]
    fn test_stem() {
        assert_eq!("genome1", IdStyle::Stem.apply("data/genomes/genome1.fna"));
        assert_eq!("genome1.v2", IdStyle::Stem.apply("genome1.v2.fasta"));
        assert_eq!("genome1", IdStyle::Stem.apply("genome1"));
    }

    #[test]
    fn test_merge_drops_exact_duplicates_only() {
        init();
        let merged = merge_tables(vec![
            vec![
                SimilarityRecord::new("a", "b", 99.0),
                SimilarityRecord::new("a", "c", 98.0),
            ],
            vec![
                SimilarityRecord::new("a", "b", 99.0),
                SimilarityRecord::new("b", "a", 99.0),
                SimilarityRecord::new("a", "c", 97.0),
            ],
        ]);
        assert_eq!(
            vec![
                SimilarityRecord::new("a", "b", 99.0),
                SimilarityRecord::new("a", "c", 98.0),
                SimilarityRecord::new("b", "a", 99.0),
                SimilarityRecord::new("a", "c", 97.0),
            ],
            merged
        );
    }
}
