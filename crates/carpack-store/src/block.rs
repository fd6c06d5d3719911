use serde::{Deserialize, Serialize};

use carpack_crypto::ContentHasher;
use carpack_types::{BlockKind, ContentId};

use crate::error::{StoreError, StoreResult};

/// A stored block: kind tag + canonical encoded bytes.
///
/// `Block` is the unit of storage. For leaves the data is the raw chunk; for
/// file and directory nodes it is the `bincode` encoding of the node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// The type of this block.
    pub kind: BlockKind,
    /// The canonical bytes of the block.
    pub data: Vec<u8>,
}

impl Block {
    /// Create a new block from kind and data.
    pub fn new(kind: BlockKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// A leaf block holding raw chunk bytes.
    pub fn leaf(data: Vec<u8>) -> Self {
        Self::new(BlockKind::Leaf, data)
    }

    /// Compute the content-addressed ID for this block.
    pub fn compute_id(&self) -> ContentId {
        ContentHasher::for_kind(self.kind).hash(&self.data)
    }

    /// Size of the encoded bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the block carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn expect_kind(&self, kind: BlockKind) -> StoreResult<()> {
        if self.kind != kind {
            return Err(StoreError::CorruptBlock {
                id: self.compute_id(),
                reason: format!("expected {kind}, got {}", self.kind),
            });
        }
        Ok(())
    }

    fn decode<'a, T: Deserialize<'a>>(&'a self) -> StoreResult<T> {
        bincode::deserialize(&self.data).map_err(|e| StoreError::CorruptBlock {
            id: self.compute_id(),
            reason: e.to_string(),
        })
    }
}

fn encode<T: Serialize>(kind: BlockKind, value: &T) -> StoreResult<Block> {
    let data = bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(Block::new(kind, data))
}

// ---------------------------------------------------------------------------
// FileNode
// ---------------------------------------------------------------------------

/// Link from an internal file node to one of its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLink {
    pub id: ContentId,
    /// Cumulative content size of the child.
    pub size: u64,
}

/// Internal node of a file's content tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    /// Sum of the children's sizes.
    pub size: u64,
    pub links: Vec<FileLink>,
}

impl FileNode {
    /// Build a node over the given children; the size is their sum.
    pub fn new(links: Vec<FileLink>) -> Self {
        let size = links.iter().map(|l| l.size).sum();
        Self { size, links }
    }

    /// Encode into a `Block` for storage.
    pub fn to_block(&self) -> StoreResult<Block> {
        encode(BlockKind::File, self)
    }

    /// Decode from a `Block`.
    pub fn from_block(block: &Block) -> StoreResult<Self> {
        block.expect_kind(BlockKind::File)?;
        block.decode()
    }
}

// ---------------------------------------------------------------------------
// DirectoryNode
// ---------------------------------------------------------------------------

/// A named entry in a directory node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryLink {
    pub name: String,
    pub id: ContentId,
    /// Cumulative size of the child.
    pub size: u64,
}

impl DirectoryLink {
    /// Create a new directory link.
    pub fn new(name: impl Into<String>, id: ContentId, size: u64) -> Self {
        Self {
            name: name.into(),
            id,
            size,
        }
    }
}

/// Directory listing. Entries keep insertion order; they are not sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryNode {
    pub links: Vec<DirectoryLink>,
}

impl DirectoryNode {
    /// Create an empty directory.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, link: DirectoryLink) {
        self.links.push(link);
    }

    /// Sum of the children's sizes.
    pub fn size(&self) -> u64 {
        self.links.iter().map(|l| l.size).sum()
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&DirectoryLink> {
        self.links.iter().find(|l| l.name == name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` if the directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Encode into a `Block` for storage.
    pub fn to_block(&self) -> StoreResult<Block> {
        encode(BlockKind::Directory, self)
    }

    /// Decode from a `Block`.
    pub fn from_block(block: &Block) -> StoreResult<Self> {
        block.expect_kind(BlockKind::Directory)?;
        block.decode()
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A decoded block of any kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Leaf(Vec<u8>),
    File(FileNode),
    Directory(DirectoryNode),
}

impl Node {
    /// Decode a block according to its kind.
    pub fn decode(block: &Block) -> StoreResult<Self> {
        match block.kind {
            BlockKind::Leaf => Ok(Self::Leaf(block.data.clone())),
            BlockKind::File => FileNode::from_block(block).map(Self::File),
            BlockKind::Directory => DirectoryNode::from_block(block).map(Self::Directory),
        }
    }

    /// Cumulative content size of the node.
    pub fn size(&self) -> u64 {
        match self {
            Self::Leaf(data) => data.len() as u64,
            Self::File(file) => file.size,
            Self::Directory(dir) => dir.size(),
        }
    }

    /// Child identifiers in stored order.
    pub fn children(&self) -> Vec<ContentId> {
        match self {
            Self::Leaf(_) => Vec::new(),
            Self::File(file) => file.links.iter().map(|l| l.id).collect(),
            Self::Directory(dir) => dir.links.iter().map(|l| l.id).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_id(data: &[u8]) -> ContentId {
        Block::leaf(data.to_vec()).compute_id()
    }

    #[test]
    fn leaf_id_is_leaf_kind() {
        assert_eq!(leaf_id(b"chunk").kind(), BlockKind::Leaf);
    }

    #[test]
    fn file_node_size_is_sum_of_links() {
        let node = FileNode::new(vec![
            FileLink { id: leaf_id(b"a"), size: 10 },
            FileLink { id: leaf_id(b"b"), size: 5 },
        ]);
        assert_eq!(node.size, 15);
    }

    #[test]
    fn file_node_roundtrip() {
        let node = FileNode::new(vec![FileLink { id: leaf_id(b"a"), size: 3 }]);
        let block = node.to_block().unwrap();
        assert_eq!(block.kind, BlockKind::File);
        assert_eq!(FileNode::from_block(&block).unwrap(), node);
    }

    #[test]
    fn directory_keeps_insertion_order() {
        let mut dir = DirectoryNode::empty();
        dir.push(DirectoryLink::new("zebra", leaf_id(b"z"), 1));
        dir.push(DirectoryLink::new("alpha", leaf_id(b"a"), 2));
        let decoded = DirectoryNode::from_block(&dir.to_block().unwrap()).unwrap();
        assert_eq!(decoded.links[0].name, "zebra");
        assert_eq!(decoded.links[1].name, "alpha");
        assert_eq!(decoded.size(), 3);
        assert!(decoded.get("alpha").is_some());
        assert!(decoded.get("missing").is_none());
    }

    #[test]
    fn link_order_changes_id() {
        let mut ab = DirectoryNode::empty();
        ab.push(DirectoryLink::new("a", leaf_id(b"a"), 1));
        ab.push(DirectoryLink::new("b", leaf_id(b"b"), 1));
        let mut ba = DirectoryNode::empty();
        ba.push(DirectoryLink::new("b", leaf_id(b"b"), 1));
        ba.push(DirectoryLink::new("a", leaf_id(b"a"), 1));
        assert_ne!(
            ab.to_block().unwrap().compute_id(),
            ba.to_block().unwrap().compute_id()
        );
    }

    #[test]
    fn empty_directory_encodes() {
        let block = DirectoryNode::empty().to_block().unwrap();
        assert!(block.compute_id().is_directory());
        assert!(DirectoryNode::from_block(&block).unwrap().is_empty());
    }

    #[test]
    fn kind_mismatch_is_corrupt() {
        let block = Block::leaf(b"not a directory".to_vec());
        let err = DirectoryNode::from_block(&block).unwrap_err();
        assert!(matches!(err, StoreError::CorruptBlock { .. }));
    }

    #[test]
    fn garbage_file_node_is_corrupt() {
        let block = Block::new(BlockKind::File, vec![1, 2]);
        assert!(matches!(
            FileNode::from_block(&block),
            Err(StoreError::CorruptBlock { .. })
        ));
    }

    #[test]
    fn node_decode_reports_children_and_size() {
        let a = leaf_id(b"a");
        let b = leaf_id(b"b");
        let file = FileNode::new(vec![FileLink { id: a, size: 4 }, FileLink { id: b, size: 2 }]);
        let node = Node::decode(&file.to_block().unwrap()).unwrap();
        assert_eq!(node.children(), vec![a, b]);
        assert_eq!(node.size(), 6);

        let leaf = Node::decode(&Block::leaf(vec![0; 9])).unwrap();
        assert!(leaf.children().is_empty());
        assert_eq!(leaf.size(), 9);
    }
}
