//! Error taxonomy for the graph store, patch codec and validator

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::NodeId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A persisted graph line is not a valid node record.
    #[error("malformed record at {}:{line}: {reason}", .path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// A patch operation has an unrecognized shape or is missing a field.
    #[error("malformed patch operation #{index}: {reason}")]
    MalformedPatch { index: usize, reason: String },

    #[error("{0}")]
    SchemaViolation(SchemaViolations),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// One failed schema check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub node: NodeId,
    /// Field path, e.g. `props.title` or `edges[2].type`.
    pub field: String,
    pub reason: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {} field {}: {}", self.node, self.field, self.reason)
    }
}

/// Every violation found in one validation pass, in deterministic order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolations(pub Vec<Violation>);

impl SchemaViolations {
    pub fn first(&self) -> Option<&Violation> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }
}

impl fmt::Display for SchemaViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "schema violation"),
            [only] => write!(f, "schema violation: {only}"),
            [first, rest @ ..] => {
                write!(f, "schema violation: {first} (and {} more)", rest.len())
            }
        }
    }
}
