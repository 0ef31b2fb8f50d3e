//! Error types for extraction, caching, configuration and the import pipeline

use std::path::PathBuf;

use thiserror::Error;

/// A single file could not be turned into nodes.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("no extractor for {} and no AI provider configured", .0.display())]
    Unsupported(PathBuf),

    #[error("{} is not valid UTF-8", .0.display())]
    NotText(PathBuf),

    #[error("cannot parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("AI extraction failed for {}: {reason}", .path.display())]
    Ai { path: PathBuf, reason: String },
}

/// Cache I/O failure. Never fatal to an import.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt cache entry {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode patch: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for {var}: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Failure of one file's import.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("import of {} was cancelled", .path.display())]
    Cancelled { path: PathBuf },

    #[error("cannot set up AI provider: {0}")]
    Provider(String),
}
