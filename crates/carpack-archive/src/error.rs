use thiserror::Error;

use carpack_store::StoreError;
use carpack_types::ContentId;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("unsupported archive version: {0}")]
    UnsupportedVersion(u64),

    #[error("digest mismatch: record claims {expected}, data hashes to {actual}")]
    DigestMismatch {
        expected: ContentId,
        actual: ContentId,
    },

    #[error("truncated archive at offset {offset}: {reason}")]
    Truncated { offset: u64, reason: String },

    #[error("corrupt record at offset {offset}: {reason}")]
    CorruptRecord { offset: u64, reason: String },

    #[error("archive header lists no roots")]
    NoRoots,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
