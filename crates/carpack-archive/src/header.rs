use serde::{Deserialize, Serialize};

use carpack_types::ContentId;

use crate::error::{ArchiveError, ArchiveResult};
use crate::writer::encode_varint;

/// Current archive format version.
pub const ARCHIVE_VERSION: u64 = 1;

/// First record of every archive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveHeader {
    pub version: u64,
    pub roots: Vec<ContentId>,
}

impl ArchiveHeader {
    /// Header for the current version.
    pub fn new(roots: Vec<ContentId>) -> Self {
        Self {
            version: ARCHIVE_VERSION,
            roots,
        }
    }

    pub fn to_bytes(&self) -> ArchiveResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| ArchiveError::Serialization(e.to_string()))
    }

    /// The full header record: varint length prefix, then the body.
    pub fn to_record(&self) -> ArchiveResult<Vec<u8>> {
        let body = self.to_bytes()?;
        let mut record = Vec::with_capacity(body.len() + 10);
        encode_varint(&mut record, body.len() as u64);
        record.extend_from_slice(&body);
        Ok(record)
    }

    /// Decode and check the version.
    pub fn from_bytes(data: &[u8]) -> ArchiveResult<Self> {
        let header: Self = bincode::deserialize(data).map_err(|e| ArchiveError::CorruptRecord {
            offset: 0,
            reason: format!("bad header: {e}"),
        })?;
        if header.version != ARCHIVE_VERSION {
            return Err(ArchiveError::UnsupportedVersion(header.version));
        }
        if header.roots.is_empty() {
            return Err(ArchiveError::NoRoots);
        }
        Ok(header)
    }
}
