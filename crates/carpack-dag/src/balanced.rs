//! Balanced multiway tree over one file's chunks.
//!
//! Leaves are grouped into internal nodes of up to `max_links` children, and
//! those nodes into the next level, until one root remains. Every leaf sits
//! at the same depth. Nodes are committed to the store as soon as they fill,
//! so memory stays bounded by `max_links` links per level.

use std::io;
use std::path::Path;

use tracing::debug;

use carpack_store::{Block, BlockStore, FileLink, FileNode, FileRef};
use carpack_types::{ContentId, ManifestEntry};

use crate::builder::BuildContext;
use crate::chunker::{Chunk, Chunker, FileSlice};
use crate::error::{DagError, DagResult};

/// Root of a committed file tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuiltFile {
    pub id: ContentId,
    /// Cumulative content size in bytes.
    pub size: u64,
    /// Logical start offset in the source file. Not part of any encoding.
    pub offset: u64,
    /// Number of leaf chunks.
    pub leaves: u64,
    /// Number of internal levels above the leaves.
    pub depth: u32,
}

/// Where a file's bytes come from, for stores that reference rather than copy.
#[derive(Clone, Copy, Debug)]
pub struct LeafOrigin<'p> {
    pub path: &'p Path,
    /// Absolute offset of the first chunk.
    pub start: u64,
}

/// Builds balanced file trees into a block store.
pub struct BalancedBuilder<'a> {
    store: &'a dyn BlockStore,
    chunk_size: usize,
    max_links: usize,
}

impl<'a> BalancedBuilder<'a> {
    /// Create a builder from a validated context.
    pub fn new(ctx: &BuildContext<'a>) -> Self {
        Self {
            store: ctx.store,
            chunk_size: ctx.config.chunk_size as usize,
            max_links: ctx.config.max_links,
        }
    }

    /// Chunk and build the byte range described by a normalized entry.
    pub fn build_entry(&self, entry: &ManifestEntry) -> DagResult<BuiltFile> {
        let start = entry.start as u64;
        let slice = FileSlice::open(&entry.path, start, entry.end as u64)?;
        let len = slice.remaining();
        let origin = LeafOrigin {
            path: &entry.path,
            start,
        };
        self.build(Chunker::new(slice, self.chunk_size).with_len(len), Some(origin))
    }

    /// Build a tree from an arbitrary chunk sequence.
    ///
    /// With an `origin`, leaves go through [`BlockStore::put_backed`].
    pub fn build<I>(&self, chunks: I, origin: Option<LeafOrigin<'_>>) -> DagResult<BuiltFile>
    where
        I: IntoIterator<Item = io::Result<Chunk>>,
    {
        let source = origin.map_or(Path::new("<stream>"), |o| o.path);
        let mut levels: Vec<Vec<FileLink>> = vec![Vec::new()];
        let mut leaves = 0u64;

        for chunk in chunks {
            let chunk = chunk.map_err(|e| DagError::io(source, e))?;
            let link = self.put_leaf(chunk, origin)?;
            leaves += 1;
            self.push(&mut levels, 0, link)?;
        }

        let (root, depth) = if leaves == 0 {
            let id = self.store.put(&Block::leaf(Vec::new()))?;
            (FileLink { id, size: 0 }, 0)
        } else {
            self.finish(&mut levels)?
        };

        let built = BuiltFile {
            id: root.id,
            size: root.size,
            offset: origin.map_or(0, |o| o.start),
            leaves,
            depth,
        };
        debug!(
            path = %source.display(),
            id = %built.id,
            size = built.size,
            offset = built.offset,
            leaves,
            depth,
            "committed file"
        );
        Ok(built)
    }

    fn put_leaf(&self, chunk: Chunk, origin: Option<LeafOrigin<'_>>) -> DagResult<FileLink> {
        let size = chunk.data.len() as u64;
        let block = Block::leaf(chunk.data);
        let id = match origin {
            Some(origin) => {
                let file_ref = FileRef {
                    path: origin.path.to_path_buf(),
                    offset: origin.start + chunk.offset,
                    len: size,
                };
                self.store.put_backed(&block, &file_ref)?
            }
            None => self.store.put(&block)?,
        };
        Ok(FileLink { id, size })
    }

    fn commit(&self, links: Vec<FileLink>) -> DagResult<FileLink> {
        let node = FileNode::new(links);
        let id = self.store.put(&node.to_block()?)?;
        Ok(FileLink {
            id,
            size: node.size,
        })
    }

    /// Append a link at `level`, committing the level when it fills.
    fn push(&self, levels: &mut Vec<Vec<FileLink>>, level: usize, link: FileLink) -> DagResult<()> {
        if levels.len() <= level {
            levels.resize_with(level + 1, Vec::new);
        }
        levels[level].push(link);
        if levels[level].len() == self.max_links {
            let full = std::mem::take(&mut levels[level]);
            let parent = self.commit(full)?;
            self.push(levels, level + 1, parent)?;
        }
        Ok(())
    }

    /// Close every partial level bottom-up and return the root with its level.
    fn finish(&self, levels: &mut Vec<Vec<FileLink>>) -> DagResult<(FileLink, u32)> {
        let mut level = 0;
        loop {
            if level >= levels.len() {
                return Err(DagError::Structural("file tree has no root".into()));
            }
            let higher_pending = levels[level + 1..].iter().any(|l| !l.is_empty());
            let current = std::mem::take(&mut levels[level]);

            if !higher_pending && current.len() == 1 {
                return Ok((current[0], level as u32));
            }
            if !current.is_empty() {
                let parent = self.commit(current)?;
                self.push(levels, level + 1, parent)?;
            }
            level += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DagConfig;
    use carpack_store::{InMemoryBlockStore, Node};
    use carpack_types::BlockKind;
    use proptest::prelude::*;

    fn chunks(data: &[u8], size: usize) -> Vec<io::Result<Chunk>> {
        Chunker::new(io::Cursor::new(data.to_vec()), size).collect()
    }

    fn ctx(store: &InMemoryBlockStore, chunk_size: u64, max_links: usize) -> BuildContext<'_> {
        BuildContext::new(
            store,
            DagConfig {
                chunk_size,
                max_links,
            },
        )
    }

    /// Collect leaves in stored order and check fan-out and uniform depth.
    fn walk(store: &InMemoryBlockStore, id: ContentId, max_links: usize, depth: u32, out: &mut Vec<u8>) -> u32 {
        match Node::decode(&store.require(&id).unwrap()).unwrap() {
            Node::Leaf(data) => {
                out.extend_from_slice(&data);
                depth
            }
            Node::File(node) => {
                assert!(node.links.len() <= max_links);
                assert_eq!(node.size, node.links.iter().map(|l| l.size).sum::<u64>());
                let depths: Vec<u32> = node
                    .links
                    .iter()
                    .map(|l| walk(store, l.id, max_links, depth + 1, out))
                    .collect();
                assert!(depths.windows(2).all(|w| w[0] == w[1]));
                depths[0]
            }
            Node::Directory(_) => panic!("directory inside file tree"),
        }
    }

    fn build(data: &[u8], chunk_size: u64, max_links: usize) -> (InMemoryBlockStore, BuiltFile) {
        let store = InMemoryBlockStore::new();
        let built = {
            let ctx = ctx(&store, chunk_size, max_links);
            BalancedBuilder::new(&ctx)
                .build(chunks(data, chunk_size as usize), None)
                .unwrap()
        };
        (store, built)
    }

    #[test]
    fn empty_file_is_single_empty_leaf() {
        let (store, built) = build(b"", 4, 4);
        assert_eq!(built.id.kind(), BlockKind::Leaf);
        assert_eq!((built.size, built.leaves, built.depth), (0, 0, 0));
        assert!(store.require(&built.id).unwrap().is_empty());
    }

    #[test]
    fn single_chunk_is_the_leaf_itself() {
        let (store, built) = build(b"hello", 16, 4);
        assert_eq!(built.id.kind(), BlockKind::Leaf);
        assert_eq!(built.id, Block::leaf(b"hello".to_vec()).compute_id());
        assert_eq!(store.len(), 1);
        assert_eq!(built.depth, 0);
    }

    #[test]
    fn exactly_max_links_chunks_is_one_level() {
        let (store, built) = build(&[7u8; 16], 4, 4);
        assert_eq!(built.id.kind(), BlockKind::File);
        assert_eq!((built.leaves, built.depth), (4, 1));
        match Node::decode(&store.require(&built.id).unwrap()).unwrap() {
            Node::File(node) => assert_eq!(node.links.len(), 4),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn one_more_than_max_links_adds_a_level() {
        let data: Vec<u8> = (0..17u8).collect();
        let (store, built) = build(&data, 4, 4);
        assert_eq!((built.leaves, built.depth, built.size), (5, 2, 17));
        let mut out = Vec::new();
        assert_eq!(walk(&store, built.id, 4, 0, &mut out), 2);
        assert_eq!(out, data);
    }

    #[test]
    fn same_chunks_same_root() {
        let data = vec![0x5Au8; 1000];
        let (_, a) = build(&data, 10, 3);
        let (_, b) = build(&data, 10, 3);
        assert_eq!(a, b);
        let (_, c) = build(&data, 10, 4);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn read_error_carries_path() {
        let store = InMemoryBlockStore::new();
        let ctx = ctx(&store, 4, 4);
        let failing = vec![Err(io::Error::new(io::ErrorKind::Other, "boom"))];
        let origin = LeafOrigin {
            path: Path::new("broken.bin"),
            start: 0,
        };
        let err = BalancedBuilder::new(&ctx).build(failing, Some(origin)).unwrap_err();
        match err {
            DagError::Io { path, .. } => assert_eq!(path, Path::new("broken.bin")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn build_entry_reads_slice_and_tags_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let data: Vec<u8> = (0..=255u8).collect();
        std::fs::write(&path, &data).unwrap();

        let store = InMemoryBlockStore::new();
        let ctx = ctx(&store, 32, 4);
        let mut entry = ManifestEntry::slice(&path, 256, 10, 110);
        entry.normalize().unwrap();
        let built = BalancedBuilder::new(&ctx).build_entry(&entry).unwrap();

        assert_eq!((built.size, built.offset, built.leaves), (100, 10, 4));
        let mut out = Vec::new();
        walk(&store, built.id, 4, 0, &mut out);
        assert_eq!(out, &data[10..110]);
    }

    #[test]
    fn build_entry_records_absolute_leaf_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let data: Vec<u8> = (0..100u8).collect();
        std::fs::write(&path, &data).unwrap();

        let store = carpack_store::FileBackedStore::new();
        let built = {
            let ctx = BuildContext::new(
                &store,
                DagConfig {
                    chunk_size: 16,
                    max_links: 8,
                },
            );
            let mut entry = ManifestEntry::slice(&path, 100, 20, 70);
            entry.normalize().unwrap();
            BalancedBuilder::new(&ctx).build_entry(&entry).unwrap()
        };
        assert_eq!(store.reference_count(), 4);
        let root = FileNode::from_block(&store.require(&built.id).unwrap()).unwrap();
        let last = store.require(&root.links[3].id).unwrap();
        assert_eq!(last.data, &data[68..70]);
    }

    proptest! {
        #[test]
        fn fan_out_and_depth_bounds(
            len in 0usize..400,
            chunk_size in 1u64..8,
            max_links in 2usize..6,
        ) {
            let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let (store, built) = build(&data, chunk_size, max_links);

            let n = (len as u64).div_ceil(chunk_size);
            let mut expected_depth = 0u32;
            let mut capacity = 1u64;
            while capacity < n {
                capacity *= max_links as u64;
                expected_depth += 1;
            }
            prop_assert_eq!(built.leaves, n);
            prop_assert_eq!(built.depth, expected_depth);
            prop_assert_eq!(built.size, len as u64);

            let mut out = Vec::new();
            let leaf_depth = walk(&store, built.id, max_links, 0, &mut out);
            prop_assert_eq!(out, data);
            if n > 0 {
                prop_assert_eq!(leaf_depth, expected_depth);
            }
        }
    }
}
