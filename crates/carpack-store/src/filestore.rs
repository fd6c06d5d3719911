//! Block store that keeps leaf chunks as references into their source files.
//!
//! Leaves are the bulk of any dataset; holding only `(path, offset, len)` per
//! leaf keeps memory proportional to the number of nodes rather than the
//! number of bytes. Reads re-open the source file and verify the digest, so a
//! file modified after ingestion surfaces as [`StoreError::HashMismatch`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::sync::RwLock;

use carpack_types::{BlockKind, ContentId};
use tracing::warn;

use crate::block::Block;
use crate::error::{StoreError, StoreResult};
use crate::memory::InMemoryBlockStore;
use crate::traits::{BlockStore, FileRef};

/// File-backed ("no-copy") block store.
#[derive(Debug, Default)]
pub struct FileBackedStore {
    nodes: InMemoryBlockStore,
    refs: RwLock<HashMap<ContentId, FileRef>>,
}

impl FileBackedStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of leaf references held.
    pub fn reference_count(&self) -> usize {
        self.refs.read().expect("lock poisoned").len()
    }

    /// Number of blocks held in memory.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn read_ref(&self, id: &ContentId, origin: &FileRef) -> StoreResult<Block> {
        let mut file = File::open(&origin.path)?;
        file.seek(SeekFrom::Start(origin.offset))?;
        let mut data = vec![0u8; origin.len as usize];
        file.read_exact(&mut data)?;

        let block = Block::leaf(data);
        let computed = block.compute_id();
        if computed != *id {
            warn!(path = %origin.path.display(), offset = origin.offset, %id, "source file changed since ingestion");
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(block)
    }
}

impl BlockStore for FileBackedStore {
    fn get(&self, id: &ContentId) -> StoreResult<Option<Block>> {
        let origin = self.refs.read().expect("lock poisoned").get(id).cloned();
        match origin {
            Some(origin) => self.read_ref(id, &origin).map(Some),
            None => self.nodes.get(id),
        }
    }

    fn put(&self, block: &Block) -> StoreResult<ContentId> {
        self.nodes.put(block)
    }

    fn has(&self, id: &ContentId) -> StoreResult<bool> {
        if self.refs.read().expect("lock poisoned").contains_key(id) {
            return Ok(true);
        }
        self.nodes.has(id)
    }

    fn origin(&self, id: &ContentId) -> StoreResult<Option<FileRef>> {
        Ok(self.refs.read().expect("lock poisoned").get(id).cloned())
    }

    fn put_backed(&self, block: &Block, origin: &FileRef) -> StoreResult<ContentId> {
        if block.kind != BlockKind::Leaf {
            return self.put(block);
        }
        let id = block.compute_id();
        self.refs
            .write()
            .expect("lock poisoned")
            .entry(id)
            .or_insert_with(|| origin.clone());
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{FileLink, FileNode};

    fn write_source(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn backed_leaf_is_reread_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(&dir, "src.bin", b"0123456789");
        let store = FileBackedStore::new();

        let block = Block::leaf(b"3456".to_vec());
        let origin = FileRef { path, offset: 3, len: 4 };
        let id = store.put_backed(&block, &origin).unwrap();

        assert_eq!(store.origin(&id).unwrap(), Some(origin));
        assert_eq!(store.reference_count(), 1);
        assert_eq!(store.node_count(), 0);
        assert!(store.has(&id).unwrap());
        assert_eq!(store.get(&id).unwrap(), Some(block));
    }

    #[test]
    fn modified_source_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(&dir, "src.bin", b"abcdef");
        let store = FileBackedStore::new();
        let id = store
            .put_backed(
                &Block::leaf(b"abcdef".to_vec()),
                &FileRef { path: path.clone(), offset: 0, len: 6 },
            )
            .unwrap();

        std::fs::write(&path, b"ABCDEF").unwrap();
        assert!(matches!(store.get(&id), Err(StoreError::HashMismatch { .. })));
    }

    #[test]
    fn truncated_source_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(&dir, "src.bin", b"abcdef");
        let store = FileBackedStore::new();
        let id = store
            .put_backed(
                &Block::leaf(b"abcdef".to_vec()),
                &FileRef { path: path.clone(), offset: 0, len: 6 },
            )
            .unwrap();

        std::fs::write(&path, b"abc").unwrap();
        assert!(matches!(store.get(&id), Err(StoreError::Io(_))));
    }

    #[test]
    fn non_leaf_blocks_stay_in_memory() {
        let store = FileBackedStore::new();
        let leaf = Block::leaf(b"x".to_vec()).compute_id();
        let node = FileNode::new(vec![FileLink { id: leaf, size: 1 }]).to_block().unwrap();
        let origin = FileRef { path: "/unused".into(), offset: 0, len: 0 };

        let id = store.put_backed(&node, &origin).unwrap();
        assert_eq!(store.reference_count(), 0);
        assert_eq!(store.origin(&id).unwrap(), None);
        assert_eq!(store.get(&id).unwrap(), Some(node));
    }
}
