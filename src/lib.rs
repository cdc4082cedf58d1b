pub mod cluster_argument_parsing;
pub mod cluster_output;
pub mod cluster_validation;
pub mod clusterer;
pub mod error;
pub mod quality_table;
pub mod similarity;
pub mod similarity_matrix;
pub mod similarity_table;
pub mod sorted_pair_score_cache;
pub mod threshold_sweep;

#[macro_use]
extern crate log;
extern crate clap;
extern crate rayon;
#[macro_use]
extern crate lazy_static;

pub use crate::error::{AniClusterError, Result};

pub const DEFAULT_ANI: &str = "99.99";
pub const DEFAULT_TABLE_FORMAT: &str = "auto";
pub const DEFAULT_ID_STYLE: &str = "path";
pub const DEFAULT_TOOL_NAME: &str = "unspecified";

/// Score given to the diagonal of a similarity matrix.
pub const SELF_SIMILARITY: f64 = 100.0;

pub const AUTHOR: &str = "anicluster contributors";
