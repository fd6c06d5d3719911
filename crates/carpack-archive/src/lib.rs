//! Archive format for carpack.
//!
//! An archive is a header record followed by one record per block of a
//! committed tree. Every record is prefixed with its length as an unsigned
//! LEB128 varint:
//!
//! ```text
//! varint(len) bincode(ArchiveHeader { version, roots })
//! varint(33 + n) content_id[33] data[n]
//! ...
//! ```
//!
//! Blocks appear root first, in depth-first pre-order with children in
//! stored order, each at most once. The same tree always yields the same
//! bytes.
//!
//! - [`write_archive`]: streams a tree from a [`BlockStore`](carpack_store::BlockStore)
//! - [`write_archive_with`]: the same, reporting where each block landed
//! - [`TeeWriter`]: sends one byte stream to two destinations
//! - [`ArchiveReader`]: parses and verifies an archive

pub mod error;
pub mod header;
pub mod reader;
pub mod tee;
pub mod writer;

pub use error::{ArchiveError, ArchiveResult};
pub use header::{ArchiveHeader, ARCHIVE_VERSION};
pub use reader::{ArchiveBlock, ArchiveReader, VerifyReport};
pub use tee::TeeWriter;
pub use writer::{write_archive, write_archive_with, ArchiveSummary, ArchiveWriter, BlockPlacement};
