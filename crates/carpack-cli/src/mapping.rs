//! Per-block mapping records saved next to each piece.
//!
//! Every block in the archive is listed with its archive offset and either
//! the source range it was read from or, for blocks that only exist in
//! memory, its bytes as hex. Together with the header this is enough to
//! rebuild the archive from the source files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use carpack_archive::BlockPlacement;
use carpack_store::{Block, FileRef};
use carpack_types::ContentId;

/// Mapping file body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveMapping {
    pub data_cid: ContentId,
    /// Hex of the header record, length prefix included.
    pub header: String,
    pub blocks: Vec<BlockMapping>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMapping {
    pub id: ContentId,
    pub archive_offset: u64,
    pub len: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    pub path: PathBuf,
    pub offset: u64,
}

impl BlockMapping {
    pub fn new(placement: &BlockPlacement, block: &Block, origin: Option<FileRef>) -> Self {
        let (source, data) = match origin {
            Some(origin) => (
                Some(SourceRange {
                    path: origin.path,
                    offset: origin.offset,
                }),
                None,
            ),
            None => (None, Some(hex::encode(&block.data))),
        };
        Self {
            id: placement.id,
            archive_offset: placement.data_offset,
            len: placement.len,
            source,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(id: ContentId, len: u64) -> BlockPlacement {
        BlockPlacement {
            id,
            record_offset: 40,
            data_offset: 74,
            len,
        }
    }

    #[test]
    fn referenced_leaf_has_source_only() {
        let block = Block::leaf(b"abc".to_vec());
        let origin = FileRef {
            path: "/data/f".into(),
            offset: 9,
            len: 3,
        };
        let m = BlockMapping::new(&placement(block.compute_id(), 3), &block, Some(origin));
        assert_eq!(m.archive_offset, 74);
        assert_eq!(m.source.as_ref().unwrap().offset, 9);
        assert!(m.data.is_none());

        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["archiveOffset"], 74);
        assert!(json.get("data").is_none());
    }

    #[test]
    fn in_memory_block_is_inlined() {
        let block = Block::leaf(b"abc".to_vec());
        let m = BlockMapping::new(&placement(block.compute_id(), 3), &block, None);
        assert_eq!(m.data.as_deref(), Some("616263"));
        assert!(m.source.is_none());
    }
}
