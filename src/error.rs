//! Error types for the fallible boundaries of the index.
//!
//! Parsers never fail; these cover the document host, the validation oracle
//! and configuration loading.

use std::path::PathBuf;

use thiserror::Error;

use crate::base::DocUri;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("document {0} could not be opened")]
    NotFound(DocUri),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("validation oracle unavailable: {0}")]
    Unavailable(String),

    #[error("validation oracle failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
