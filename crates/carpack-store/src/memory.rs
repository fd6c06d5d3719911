use std::collections::HashMap;
use std::sync::RwLock;

use carpack_types::ContentId;

use crate::block::Block;
use crate::error::StoreResult;
use crate::traits::BlockStore;

/// In-memory, HashMap-based block store.
///
/// Intended for tests and small inputs. Blocks are held behind a `RwLock`
/// and cloned on read/write.
pub struct InMemoryBlockStore {
    blocks: RwLock<HashMap<ContentId, Block>>,
}

impl InMemoryBlockStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.blocks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().expect("lock poisoned").is_empty()
    }

    /// Total encoded bytes across all stored blocks.
    pub fn total_bytes(&self) -> u64 {
        self.blocks
            .read()
            .expect("lock poisoned")
            .values()
            .map(|b| b.len() as u64)
            .sum()
    }

    /// Return a sorted list of all block IDs in the store.
    pub fn all_ids(&self) -> Vec<ContentId> {
        let map = self.blocks.read().expect("lock poisoned");
        let mut ids: Vec<ContentId> = map.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Drop a block. Only used to simulate a damaged store.
    pub fn remove(&self, id: &ContentId) -> bool {
        self.blocks.write().expect("lock poisoned").remove(id).is_some()
    }
}

impl Default for InMemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore for InMemoryBlockStore {
    fn get(&self, id: &ContentId) -> StoreResult<Option<Block>> {
        let map = self.blocks.read().expect("lock poisoned");
        Ok(map.get(id).cloned())
    }

    fn put(&self, block: &Block) -> StoreResult<ContentId> {
        let id = block.compute_id();
        let mut map = self.blocks.write().expect("lock poisoned");
        // Idempotent: the same ID always maps to the same content.
        map.entry(id).or_insert_with(|| block.clone());
        Ok(id)
    }

    fn has(&self, id: &ContentId) -> StoreResult<bool> {
        let map = self.blocks.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }
}

impl std::fmt::Debug for InMemoryBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlockStore")
            .field("block_count", &self.len())
            .finish()
    }
}
