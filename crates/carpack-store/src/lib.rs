//! Content-addressed block storage for carpack.
//!
//! Every node of a built tree -- leaf chunks, internal file nodes, directory
//! listings -- is stored as an immutable [`Block`] identified by its
//! kind-tagged BLAKE3 [`ContentId`](carpack_types::ContentId).
//!
//! # Node Types
//!
//! - Leaf -- raw chunk bytes
//! - [`FileNode`] -- ordered child links plus cumulative size
//! - [`DirectoryNode`] -- ordered `(name, id, size)` links
//!
//! # Storage Backends
//!
//! All backends implement the [`BlockStore`] trait:
//!
//! - [`InMemoryBlockStore`] -- `HashMap`-based store for tests and small inputs
//! - [`FileBackedStore`] -- keeps leaf blocks as references into source files
//!
//! Auxiliary records (proof caches, path maps) go through a [`MetaSink`].
//!
//! # Design Rules
//!
//! 1. Blocks are immutable once written (content-addressing guarantees this).
//! 2. A parent is only written after all of its children.
//! 3. The store never interprets block contents on the write path.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod block;
pub mod error;
pub mod filestore;
pub mod memory;
pub mod meta;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use block::{Block, DirectoryLink, DirectoryNode, FileLink, FileNode, Node};
pub use error::{StoreError, StoreResult};
pub use filestore::FileBackedStore;
pub use memory::InMemoryBlockStore;
pub use meta::{DirectoryMetaSink, InMemoryMetaSink, MetaSink};
pub use traits::{BlockStore, FileRef};
