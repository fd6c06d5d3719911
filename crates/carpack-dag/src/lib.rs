//! Content trees for carpack datasets.
//!
//! Turns a manifest of files (or byte-range slices of files) into a single
//! content-addressed directory tree. Each file is split into fixed-size
//! chunks and assembled into a balanced multiway tree; the file roots are
//! then folded, in manifest order, into nested directory nodes using a
//! bounded stack. Every node is committed to a
//! [`BlockStore`](carpack_store::BlockStore) before its parent.
//!
//! # Pipeline
//!
//! ```text
//! manifest -> Chunker -> BalancedBuilder -> DirectoryFolder -> root
//!                                                           -> SummaryProjector
//! ```
//!
//! [`DagBuilder`] drives the whole pipeline for one manifest.

pub mod balanced;
pub mod builder;
pub mod chunker;
pub mod config;
pub mod error;
pub mod folder;
pub mod manifest;
pub mod staging;
pub mod summary;

pub use balanced::{BalancedBuilder, BuiltFile, LeafOrigin};
pub use builder::{BuildContext, BuiltDag, DagBuilder};
pub use chunker::{Chunk, Chunker, FileSlice};
pub use config::{DagConfig, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_LINKS, MAX_CHUNK_SIZE};
pub use error::{DagError, DagResult};
pub use folder::{DirectoryFolder, FoldOutcome, FoldStats, PathMap, PathMapValue};
pub use manifest::{load_manifest, read_manifest, relative_key, walk_single};
pub use staging::stage_entry;
pub use summary::{FsNode, SummaryProjector};
