//! Foundation types for carpack.
//!
//! This crate provides the identifier and input types shared by every other
//! carpack crate.
//!
//! # Key Types
//!
//! - [`ContentId`]: Kind-tagged content identifier (BLAKE3 digest)
//! - [`BlockKind`]: The type tag carried by every [`ContentId`]
//! - [`ManifestEntry`]: One file (or byte-range slice of a file) to ingest

pub mod error;
pub mod manifest;
pub mod object;

pub use error::TypeError;
pub use manifest::ManifestEntry;
pub use object::{BlockKind, ContentId, CONTENT_ID_LEN};
