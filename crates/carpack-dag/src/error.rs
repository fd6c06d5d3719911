//! Error types for DAG construction.

use std::path::PathBuf;

use carpack_store::StoreError;
use carpack_types::{ContentId, TypeError};

/// Errors that can occur while chunking, building, or folding.
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// Read or write failure on a source file or staging copy.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed byte-range request. Raised before any chunking of the entry.
    #[error("invalid byte range [{start}, {end}) for {path} of size {size}")]
    Range {
        path: String,
        start: i64,
        end: i64,
        size: i64,
    },

    /// Internal invariant violated (stack underflow, non-directory parent).
    #[error("structural invariant violated: {0}")]
    Structural(String),

    /// A block referenced by a committed node is missing from the store.
    #[error("dangling reference: {0}")]
    DanglingReference(ContentId),

    /// Two manifest entries resolve to the same path.
    #[error("duplicate path in manifest: {0}")]
    DuplicatePath(String),

    /// A path collides with the directory structure built so far.
    #[error("path conflict at {path}: {reason}")]
    PathConflict { path: String, reason: String },

    /// A path that cannot be used as a tree key.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A manifest entry does not live under the dataset parent.
    #[error("{path} is not under parent {parent}")]
    OutsideParent { path: PathBuf, parent: PathBuf },

    /// Chunking parameters are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The manifest could not be read or parsed.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Block store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl DagError {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<TypeError> for DagError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidRange {
                path,
                start,
                end,
                size,
            } => Self::Range {
                path,
                start,
                end,
                size,
            },
            other => Self::Manifest(other.to_string()),
        }
    }
}

/// Convenience alias for DAG results.
pub type DagResult<T> = Result<T, DagError>;
