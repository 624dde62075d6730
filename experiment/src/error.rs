//! Configuration / input error taxonomy.
//!
//! Every variant here is fatal for a run: bad input files, missing keys,
//! unknown model aliases. Unit-scoped failures (a single condition or a
//! single criterion) live in the agent crate and never reach this type.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration or input error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be opened or read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File contents were not valid JSON for the expected shape.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required key was missing (or empty) in an input record.
    #[error("item {index} is missing required key '{field}'")]
    MissingField { index: usize, field: &'static str },

    /// Top-level JSON value had the wrong shape.
    #[error("{path}: expected a JSON array of items")]
    NotAnArray { path: PathBuf },

    /// `--id-range` could not be parsed.
    #[error("invalid id filter '{0}': expected 'N-M' or a comma separated list")]
    InvalidIdFilter(String),

    /// Output file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Results could not be serialized; nothing was written.
    #[error("failed to encode results: {0}")]
    Encode(#[source] serde_json::Error),

    /// Model alias not present in the configured model table.
    #[error("unsupported model: {0}")]
    UnknownModel(String),

    /// None of the requested criterion ids exist in the rubric.
    #[error("no evaluation criteria matched the specified ids: {0:?}")]
    NoMatchingCriteria(Vec<u32>),

    /// Runtime configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
