use crate::version::Version;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DslError {
    #[error("Unsupported backend version {0}: expected at least 5.0 and below 8.0")]
    InvalidVersion(Version),

    #[error("Malformed clause spec: {0}")]
    MalformedClauseSpec(String),

    #[error("Unknown clause kind: {0}")]
    UnknownClause(String),

    #[error("Clause '{clause}' requires a {what}")]
    MissingField { clause: &'static str, what: &'static str },

    #[error("No aggregation bucket named '{0}'")]
    UnknownBucket(String),
}

pub type Result<T> = std::result::Result<T, DslError>;
