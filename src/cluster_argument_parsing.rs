use clap::builder::PossibleValuesParser;
use clap::*;

use bird_tool_utils::clap_utils::*;

use crate::cluster_output::{self, RepresentativeFileMode};
use crate::clusterer;
use crate::error::{AniClusterError, Result};
use crate::quality_table::{count_covered_entities, read_quality_table};
use crate::similarity::{QualityMap, SimilarityRecord};
use crate::similarity_matrix::{self, SimilarityMatrix};
use crate::similarity_table::*;
use crate::threshold_sweep::{self, DEFAULT_SWEEP_THRESHOLDS};

/// Where the results of a `cluster` run should be written.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClusterOutputs {
    pub cluster_definition: Option<String>,
    pub representative_list: Option<String>,
    pub representative_symlink_directory: Option<String>,
    pub representative_copy_directory: Option<String>,
    pub summary: Option<String>,
    pub matrix: Option<String>,
    pub low_score_pairs: Option<String>,
}

impl ClusterOutputs {
    fn from_matches(m: &ArgMatches) -> ClusterOutputs {
        let get = |name: &str| m.get_one::<String>(name).cloned();
        ClusterOutputs {
            cluster_definition: get("output-cluster-definition"),
            representative_list: get("output-representative-list"),
            representative_symlink_directory: get("output-representative-fasta-directory"),
            representative_copy_directory: get("output-representative-fasta-directory-copy"),
            summary: get("output-summary"),
            matrix: get("output-matrix"),
            low_score_pairs: get("output-low-score-pairs"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &ClusterOutputs::default()
    }
}

/// Parse a similarity threshold, given as a percentage. Values outside 0-100
/// are allowed since they simply make every entity a singleton or join every
/// measured pair.
pub fn parse_threshold(m: &ArgMatches, parameter: &str) -> Result<f64> {
    let raw = m
        .get_one::<String>(parameter)
        .ok_or_else(|| AniClusterError::InvalidArgument {
            parameter: parameter.to_string(),
            reason: "no value given".to_string(),
        })?;
    let threshold: f64 = raw
        .trim()
        .parse()
        .map_err(|_| AniClusterError::InvalidArgument {
            parameter: parameter.to_string(),
            reason: format!("'{}' is not a number", raw),
        })?;
    if !threshold.is_finite() {
        return Err(AniClusterError::InvalidArgument {
            parameter: parameter.to_string(),
            reason: format!("'{}' is not a finite number", raw),
        });
    }
    if !(0.0..=100.0).contains(&threshold) {
        warn!(
            "Threshold for --{} of {} is outside 0-100, continuing anyway",
            parameter, threshold
        );
    }
    debug!("Using {} {}%", parameter, threshold);
    Ok(threshold)
}

pub fn parse_table_options(m: &ArgMatches) -> Result<TableOptions> {
    let format = match m.get_many::<String>("columns") {
        Some(columns) => {
            let columns: Vec<&String> = columns.collect();
            match columns.as_slice() {
                [a, b, score] => TableFormat::Schema(TableSchema::custom(a, b, score)),
                _ => {
                    return Err(AniClusterError::InvalidArgument {
                        parameter: "columns".to_string(),
                        reason: format!("expected 3 column names, found {:?}", columns),
                    })
                }
            }
        }
        None => TableFormat::from_name(
            m.get_one::<String>("table-format")
                .map(|s| s.as_str())
                .unwrap_or(crate::DEFAULT_TABLE_FORMAT),
        )?,
    };
    let id_style = IdStyle::from_name(
        m.get_one::<String>("id-style")
            .map(|s| s.as_str())
            .unwrap_or(crate::DEFAULT_ID_STYLE),
    )?;
    Ok(TableOptions { format, id_style })
}

/// Read and merge every table given with --similarity-table.
pub fn read_tables_from_matches(m: &ArgMatches) -> Result<Vec<SimilarityRecord>> {
    let options = parse_table_options(m)?;
    let paths: Vec<&str> = m
        .get_many::<String>("similarity-table")
        .map(|v| v.map(|s| s.as_str()).collect())
        .unwrap_or_default();
    read_similarity_tables(&paths, &options)
}

fn read_quality_from_matches(m: &ArgMatches) -> Result<Option<QualityMap>> {
    match m.get_one::<String>("quality-table") {
        None => {
            warn!("Since no quality table was given, representatives are chosen by sort order of their ids");
            Ok(None)
        }
        Some(path) => {
            info!("Reading genome qualities from {} ..", path);
            Ok(Some(read_quality_table(path)?))
        }
    }
}

pub fn run_cluster_subcommand(
    matches: &clap::ArgMatches,
    program_name: &str,
    version: &str,
) -> Result<()> {
    let m = matches
        .subcommand_matches("cluster")
        .ok_or_else(|| AniClusterError::InvalidArgument {
            parameter: "cluster".to_string(),
            reason: "subcommand matches not found".to_string(),
        })?;
    set_log_level(m, true, program_name, version);

    let outputs = ClusterOutputs::from_matches(m);
    if outputs.is_empty() {
        return Err(AniClusterError::InvalidArgument {
            parameter: "output-*".to_string(),
            reason: "at least one output must be specified".to_string(),
        });
    }
    let threshold = parse_threshold(m, "ani")?;
    let records = read_tables_from_matches(m)?;
    let quality = read_quality_from_matches(m)?;
    if let Some(quality) = &quality {
        count_covered_entities(quality, &clusterer::all_entities(&records));
    }

    info!("Clustering at {}% ..", threshold);
    let clustering = clusterer::cluster(&records, threshold, quality.as_ref());
    info!(
        "Found {} clusters among {} genomes",
        clustering.clusters.len(),
        clustering.num_entities()
    );

    if let Some(path) = &outputs.cluster_definition {
        cluster_output::write_cluster_definition(path, &clustering)?;
    }
    if let Some(path) = &outputs.representative_list {
        cluster_output::write_representative_list(path, &clustering)?;
    }
    let genome_directory = m.get_one::<String>("genome-directory").map(|s| s.as_str());
    if let Some(dir) = &outputs.representative_symlink_directory {
        cluster_output::write_representative_files(
            dir,
            &clustering,
            genome_directory,
            RepresentativeFileMode::Symlink,
        )?;
    }
    if let Some(dir) = &outputs.representative_copy_directory {
        cluster_output::write_representative_files(
            dir,
            &clustering,
            genome_directory,
            RepresentativeFileMode::Copy,
        )?;
    }
    if let Some(path) = &outputs.summary {
        let tool_name = m
            .get_one::<String>("tool-name")
            .map(|s| s.as_str())
            .unwrap_or(crate::DEFAULT_TOOL_NAME);
        cluster_output::write_summary(path, &clustering, threshold, tool_name)?;
    }
    if let Some(path) = &outputs.matrix {
        SimilarityMatrix::from_records(&records).write_csv(path)?;
    }
    if let Some(path) = &outputs.low_score_pairs {
        let pairs = similarity_matrix::low_score_pairs(&records, threshold);
        similarity_matrix::write_low_score_pairs(path, &pairs)?;
    }
    for band in similarity_matrix::score_bands(&records) {
        debug!("Pairs scoring {}%: {}", band.label(), band.count);
    }
    info!("Finished clustering.");
    Ok(())
}

pub fn run_threshold_sweep_subcommand(m: &clap::ArgMatches) -> Result<()> {
    let outputs = (
        m.get_one::<String>("output-csv"),
        m.get_one::<String>("output-text"),
    );
    if let (None, None) = outputs {
        return Err(AniClusterError::InvalidArgument {
            parameter: "output-csv".to_string(),
            reason: "at least one of --output-csv and --output-text must be specified"
                .to_string(),
        });
    }
    let thresholds: Vec<f64> = match m.get_many::<f64>("thresholds") {
        Some(thresholds) => thresholds.copied().collect(),
        None => DEFAULT_SWEEP_THRESHOLDS.clone(),
    };
    if let Some(t) = thresholds.iter().find(|t| !t.is_finite()) {
        return Err(AniClusterError::InvalidArgument {
            parameter: "thresholds".to_string(),
            reason: format!("{} is not a finite number", t),
        });
    }
    let records = read_tables_from_matches(m)?;
    let quality = read_quality_from_matches(m)?;
    if let Some(quality) = &quality {
        count_covered_entities(quality, &clusterer::all_entities(&records));
    }

    let rows = threshold_sweep::sweep(&records, &thresholds, quality.as_ref());
    if let Some(path) = outputs.0 {
        threshold_sweep::write_sweep_csv(path, &rows)?;
        info!("Wrote threshold sweep table to {}", path);
    }
    if let Some(path) = outputs.1 {
        threshold_sweep::write_sweep_text(path, &rows)?;
        info!("Wrote threshold sweep summary to {}", path);
    }
    Ok(())
}

/// Arguments describing the similarity tables, shared by every subcommand.
pub fn add_table_arguments(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("similarity-table")
            .long("similarity-table")
            .required(true)
            .num_args(1..)
            .action(ArgAction::Append)
            .help("Pairwise similarity table(s) from fastANI, skani, CompareM etc. Tab separated unless the file name ends in .csv"),
    )
    .arg(
        Arg::new("table-format")
            .long("table-format")
            .value_parser(PossibleValuesParser::new(TABLE_FORMAT_NAMES.iter().copied()))
            .default_value(crate::DEFAULT_TABLE_FORMAT)
            .help("Layout of the similarity tables. 'auto' detects headed layouts from their column names"),
    )
    .arg(
        Arg::new("columns")
            .long("columns")
            .num_args(1)
            .value_delimiter(',')
            .help("Comma separated names of the two id columns and the score column, overriding --table-format"),
    )
    .arg(
        Arg::new("id-style")
            .long("id-style")
            .value_parser(["path", "stem"])
            .default_value(crate::DEFAULT_ID_STYLE)
            .help("Use ids as written ('path') or reduce them to the file name without extension ('stem')"),
    )
}

fn quality_table_argument() -> Arg {
    Arg::new("quality-table")
        .long("quality-table")
        .help("Per-genome quality table (genome,quality_score or genome quality statistics with N50, Total_Length and L50). Representatives are the highest quality member of each cluster")
}

pub fn add_cluster_subcommand(app: clap::Command) -> clap::Command {
    let mut cluster_subcommand = add_clap_verbosity_flags(Command::new("cluster"))
        .about("Cluster genomes by pairwise similarity and choose representatives")
        .arg(quality_table_argument())
        .arg(
            Arg::new("ani")
                .long("ani")
                .help("Similarity threshold (percent) at or above which two genomes are joined")
                .default_value(crate::DEFAULT_ANI),
        )
        .arg(
            Arg::new("output-cluster-definition")
                .long("output-cluster-definition")
                .help("Output a file of representative<TAB>member lines"),
        )
        .arg(
            Arg::new("output-representative-list")
                .long("output-representative-list")
                .help("Output a list of representative genomes, one per line"),
        )
        .arg(
            Arg::new("output-representative-fasta-directory")
                .long("output-representative-fasta-directory")
                .help("Symlink representative genomes into this directory"),
        )
        .arg(
            Arg::new("output-representative-fasta-directory-copy")
                .long("output-representative-fasta-directory-copy")
                .help("Copy representative genomes into this directory"),
        )
        .arg(
            Arg::new("genome-directory")
                .long("genome-directory")
                .help("Directory holding the genome files, for when ids are not paths. Files are looked up as <id>, <id>.fna, <id>.fasta and <id>.fa"),
        )
        .arg(
            Arg::new("output-summary")
                .long("output-summary")
                .help("Output a plain text summary of the clustering"),
        )
        .arg(
            Arg::new("output-matrix")
                .long("output-matrix")
                .help("Output the square similarity matrix as CSV"),
        )
        .arg(
            Arg::new("output-low-score-pairs")
                .long("output-low-score-pairs")
                .help("Output the measured pairs scoring below --ani"),
        )
        .arg(
            Arg::new("tool-name")
                .long("tool-name")
                .help("Name of the tool that produced the similarity tables, for the summary")
                .default_value(crate::DEFAULT_TOOL_NAME),
        );

    cluster_subcommand = add_table_arguments(cluster_subcommand);

    app.subcommand(cluster_subcommand)
}

pub fn add_threshold_sweep_subcommand(app: clap::Command) -> clap::Command {
    let mut sweep_subcommand = add_clap_verbosity_flags(Command::new("threshold-sweep"))
        .about("Summarise clusters across a range of similarity thresholds")
        .arg(quality_table_argument())
        .arg(
            Arg::new("thresholds")
                .long("thresholds")
                .num_args(1)
                .value_delimiter(',')
                .value_parser(value_parser!(f64))
                .help("Comma separated thresholds [default: 98 to 100 by 0.5, and 99 to 100 by 0.1]"),
        )
        .arg(
            Arg::new("output-csv")
                .long("output-csv")
                .help("Output a CSV table of groups per threshold"),
        )
        .arg(
            Arg::new("output-text")
                .long("output-text")
                .help("Output a plain text summary of groups per threshold"),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .help("Number of CPU threads to use")
                .value_parser(value_parser!(usize))
                .default_value("1"),
        );

    sweep_subcommand = add_table_arguments(sweep_subcommand);

    app.subcommand(sweep_subcommand)
}
