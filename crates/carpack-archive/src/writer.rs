use std::collections::HashSet;
use std::io::{self, Read, Write};

use tracing::{debug, info};

use carpack_store::{Block, BlockStore, Node};
use carpack_types::{BlockKind, ContentId, CONTENT_ID_LEN};

use crate::error::{ArchiveError, ArchiveResult};
use crate::header::ArchiveHeader;

/// Totals for a finished archive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub blocks: u64,
    /// Archive length in bytes, header included.
    pub bytes: u64,
}

/// Where one block record landed in the archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockPlacement {
    pub id: ContentId,
    /// Offset of the record's length prefix.
    pub record_offset: u64,
    /// Offset of the block data, past the prefix and id.
    pub data_offset: u64,
    pub len: u64,
}

/// Low-level record writer. Streams straight into `W`.
pub struct ArchiveWriter<W: Write> {
    inner: W,
    summary: ArchiveSummary,
    scratch: Vec<u8>,
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            summary: ArchiveSummary::default(),
            scratch: Vec::with_capacity(10),
        }
    }

    /// Write the header record. Must come first.
    pub fn write_header(&mut self, header: &ArchiveHeader) -> ArchiveResult<()> {
        self.write_raw(&header.to_record()?)
    }

    /// Write one `(id, data)` block record.
    pub fn write_block(&mut self, id: &ContentId, data: &[u8]) -> ArchiveResult<BlockPlacement> {
        let record_offset = self.summary.bytes;
        self.write_len((CONTENT_ID_LEN + data.len()) as u64)?;
        self.write_raw(&id.to_bytes())?;
        let data_offset = self.summary.bytes;
        self.write_raw(data)?;
        self.summary.blocks += 1;
        Ok(BlockPlacement {
            id: *id,
            record_offset,
            data_offset,
            len: data.len() as u64,
        })
    }

    pub fn summary(&self) -> ArchiveSummary {
        self.summary
    }

    /// Flush and hand back the destination.
    pub fn finish(mut self) -> ArchiveResult<(W, ArchiveSummary)> {
        self.inner.flush()?;
        Ok((self.inner, self.summary))
    }

    fn write_len(&mut self, len: u64) -> ArchiveResult<()> {
        self.scratch.clear();
        encode_varint(&mut self.scratch, len);
        self.inner.write_all(&self.scratch)?;
        self.summary.bytes += self.scratch.len() as u64;
        Ok(())
    }

    fn write_raw(&mut self, data: &[u8]) -> ArchiveResult<()> {
        self.inner.write_all(data)?;
        self.summary.bytes += data.len() as u64;
        Ok(())
    }
}

/// Serialize `root` and everything reachable from it.
///
/// Order is root first, then depth-first pre-order with children in stored
/// order; a block reachable along several paths is written once, at its
/// first visit. Any store or write failure aborts the whole archive.
pub fn write_archive<W: Write>(
    store: &dyn BlockStore,
    root: &ContentId,
    out: W,
) -> ArchiveResult<(W, ArchiveSummary)> {
    write_archive_with(store, root, out, |_, _| Ok(()))
}

/// [`write_archive`], reporting each block's placement as it is written.
///
/// An error from `on_block` aborts the archive.
pub fn write_archive_with<W, F>(
    store: &dyn BlockStore,
    root: &ContentId,
    out: W,
    mut on_block: F,
) -> ArchiveResult<(W, ArchiveSummary)>
where
    W: Write,
    F: FnMut(&BlockPlacement, &Block) -> ArchiveResult<()>,
{
    let mut writer = ArchiveWriter::new(out);
    writer.write_header(&ArchiveHeader::new(vec![*root]))?;

    let mut visited = HashSet::new();
    let mut pending = vec![*root];
    while let Some(id) = pending.pop() {
        if !visited.insert(id) {
            continue;
        }
        let block = store.require(&id)?;
        let placement = writer.write_block(&id, &block.data)?;
        on_block(&placement, &block)?;

        if id.kind() != BlockKind::Leaf {
            let children = Node::decode(&block)?.children();
            pending.extend(children.into_iter().rev());
        }
        debug!(%id, bytes = block.len(), "archived block");
    }

    let (out, summary) = writer.finish()?;
    info!(root = %root, blocks = summary.blocks, bytes = summary.bytes, "archive written");
    Ok((out, summary))
}

/// Encode a u64 as a variable-length integer.
pub(crate) fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a variable-length integer. Returns (value, bytes_consumed).
pub(crate) fn decode_varint(data: &[u8]) -> ArchiveResult<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        value |= ((byte & 0x7F) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        if shift >= 64 {
            return Err(ArchiveError::CorruptRecord {
                offset: 0,
                reason: "varint overflow".into(),
            });
        }
    }
    Err(ArchiveError::Truncated {
        offset: 0,
        reason: "truncated varint".into(),
    })
}

/// Read a varint from a stream. `Ok(None)` on a clean end of stream.
pub(crate) fn read_varint<R: Read>(reader: &mut R) -> ArchiveResult<Option<(u64, usize)>> {
    let mut buf = Vec::with_capacity(10);
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) if buf.is_empty() => return Ok(None),
            Ok(0) => return decode_varint(&buf).map(Some),
            Ok(_) => {
                buf.push(byte[0]);
                if byte[0] & 0x80 == 0 || buf.len() >= 10 {
                    return decode_varint(&buf).map(Some);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
