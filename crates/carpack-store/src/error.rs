use carpack_types::ContentId;

/// Errors from block store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested block was not found.
    #[error("block not found: {0}")]
    NotFound(ContentId),

    /// Content hash mismatch on read (data corruption or a changed source file).
    #[error("hash mismatch for {id}: computed {computed}")]
    HashMismatch { id: ContentId, computed: ContentId },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The block data is malformed or cannot be decoded.
    #[error("corrupt block {id}: {reason}")]
    CorruptBlock { id: ContentId, reason: String },

    /// A metadata key escapes the sink root or is otherwise unusable.
    #[error("invalid metadata key: {0}")]
    InvalidKey(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
