//! Error taxonomy
//!
//! Structural failures (a ledger that no longer matches the expected block
//! shape, a missing or invalid configuration) abort the run. Per-record
//! failures (a single achievement lookup) are recovered where they happen
//! and only surface as [`LookupError`] in logs.

use std::path::PathBuf;
use thiserror::Error;

/// The license ledger text did not match the expected three-line blocks.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    /// A block was cut off before all of its lines were printed
    #[error("ledger block starting at line {line} is truncated: expected {expected} lines, found {found}")]
    TruncatedBlock {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A required field could not be located on a line
    #[error("line {line}: missing {field} in {content:?}")]
    MissingField {
        line: usize,
        field: &'static str,
        content: String,
    },

    /// The acquisition timestamp was present but not in the expected format
    #[error("line {line}: invalid acquisition timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        line: usize,
        value: String,
        reason: String,
    },

    /// An integer token did not fit the id type
    #[error("line {line}: {field} {value:?} is out of range")]
    IdOutOfRange {
        line: usize,
        field: &'static str,
        value: String,
    },
}

/// Startup configuration is missing or unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("no configuration file found (tried {tried})")]
    NoneFound { tried: String },

    #[error("failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// A single remote lookup failed. Never fatal to a batch.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("lookup timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("unexpected response payload: {0}")]
    Decode(String),
}
