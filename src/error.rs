use thiserror::Error;

#[derive(Error, Debug)]
pub enum AniClusterError {
    /// A row that cannot become a similarity or quality record, e.g. an
    /// empty id or a score that is not a finite number.
    #[error("Invalid input in {path}, line {line}: {reason}")]
    InvalidInput {
        path: String,
        line: u64,
        reason: String,
    },

    #[error(
        "No column for '{field}' in {path}: expected one of {candidates:?}, found headers {headers:?}"
    )]
    SchemaMismatch {
        path: String,
        field: &'static str,
        candidates: Vec<String>,
        headers: Vec<String>,
    },

    #[error("Error parsing {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for --{parameter}: {reason}")]
    InvalidArgument { parameter: String, reason: String },
}

pub type Result<T> = std::result::Result<T, AniClusterError>;

impl AniClusterError {
    pub fn csv(path: &str, source: csv::Error) -> AniClusterError {
        AniClusterError::Csv {
            path: path.to_string(),
            source,
        }
    }

    pub fn io(path: &str, source: std::io::Error) -> AniClusterError {
        AniClusterError::Io {
            path: path.to_string(),
            source,
        }
    }
}
