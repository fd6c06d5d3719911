use std::path::PathBuf;

use carpack_types::ContentId;

use crate::block::Block;
use crate::error::{StoreError, StoreResult};

/// Location of a leaf block's bytes inside a source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRef {
    pub path: PathBuf,
    /// Absolute byte offset in the file.
    pub offset: u64,
    pub len: u64,
}

/// Content-addressed block store.
///
/// All implementations must satisfy these invariants:
/// - Blocks are immutable once written. The same bytes always produce the
///   same ID, so a repeated `put` is a no-op.
/// - `put` returns the ID computed from the block's kind and data.
/// - A parent block is only put after all of its children; callers uphold
///   this, stores do not check it.
/// - All I/O errors are propagated, never silently ignored.
pub trait BlockStore: Send + Sync {
    /// Read a block by its content-addressed ID.
    ///
    /// Returns `Ok(None)` if the block does not exist.
    /// Returns `Err` on I/O failure or data corruption.
    fn get(&self, id: &ContentId) -> StoreResult<Option<Block>>;

    /// Write a block and return its content-addressed ID.
    fn put(&self, block: &Block) -> StoreResult<ContentId>;

    /// Check whether a block exists in the store.
    fn has(&self, id: &ContentId) -> StoreResult<bool> {
        Ok(self.get(id)?.is_some())
    }

    /// Write a leaf block whose bytes also live at `origin`.
    ///
    /// Backends that can re-read the source file may keep only the
    /// reference. The default stores the bytes.
    fn put_backed(&self, block: &Block, origin: &FileRef) -> StoreResult<ContentId> {
        let _ = origin;
        self.put(block)
    }

    /// Source location of a leaf stored by reference, if any.
    fn origin(&self, id: &ContentId) -> StoreResult<Option<FileRef>> {
        let _ = id;
        Ok(None)
    }

    /// Read a block that must exist.
    fn require(&self, id: &ContentId) -> StoreResult<Block> {
        self.get(id)?.ok_or(StoreError::NotFound(*id))
    }
}
