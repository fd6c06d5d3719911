use std::io::Read;

use carpack_store::Block;
use carpack_types::{ContentId, CONTENT_ID_LEN};

use crate::error::{ArchiveError, ArchiveResult};
use crate::header::ArchiveHeader;
use crate::writer::read_varint;

/// One block record read back from an archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveBlock {
    pub id: ContentId,
    pub data: Vec<u8>,
    /// Offset of the record's length prefix.
    pub offset: u64,
}

impl ArchiveBlock {
    /// Recompute the digest and compare it with the record's id.
    pub fn verify(&self) -> ArchiveResult<()> {
        let actual = Block::new(self.id.kind(), self.data.clone()).compute_id();
        if actual != self.id {
            return Err(ArchiveError::DigestMismatch {
                expected: self.id,
                actual,
            });
        }
        Ok(())
    }
}

/// Result of [`ArchiveReader::verify_all`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyReport {
    pub roots: Vec<ContentId>,
    pub blocks: Vec<(ContentId, u64)>,
    pub bytes: u64,
}

/// Sequential archive reader.
pub struct ArchiveReader<R: Read> {
    inner: R,
    header: ArchiveHeader,
    offset: u64,
}

impl<R: Read> ArchiveReader<R> {
    /// Read and validate the header.
    pub fn from_reader(mut inner: R) -> ArchiveResult<Self> {
        let (len, prefix) = read_varint(&mut inner)?.ok_or(ArchiveError::Truncated {
            offset: 0,
            reason: "missing header".into(),
        })?;
        let body = read_exact_len(&mut inner, len, prefix as u64)?;
        let header = ArchiveHeader::from_bytes(&body)?;
        Ok(Self {
            inner,
            header,
            offset: prefix as u64 + len,
        })
    }

    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Next block record, or `None` at the end of the archive.
    pub fn next_block(&mut self) -> ArchiveResult<Option<ArchiveBlock>> {
        let start = self.offset;
        let Some((len, prefix)) = read_varint(&mut self.inner)? else {
            return Ok(None);
        };
        if len < CONTENT_ID_LEN as u64 {
            return Err(ArchiveError::CorruptRecord {
                offset: start,
                reason: format!("record length {len} shorter than a content id"),
            });
        }
        let record = read_exact_len(&mut self.inner, len, start + prefix as u64)?;
        let id = ContentId::from_bytes(&record[..CONTENT_ID_LEN]).map_err(|e| {
            ArchiveError::CorruptRecord {
                offset: start,
                reason: e.to_string(),
            }
        })?;
        self.offset = start + prefix as u64 + len;
        Ok(Some(ArchiveBlock {
            id,
            data: record[CONTENT_ID_LEN..].to_vec(),
            offset: start,
        }))
    }

    /// Read every remaining record, checking each digest.
    pub fn verify_all(mut self) -> ArchiveResult<VerifyReport> {
        let mut blocks = Vec::new();
        while let Some(block) = self.next_block()? {
            block.verify()?;
            blocks.push((block.id, block.data.len() as u64));
        }
        Ok(VerifyReport {
            roots: self.header.roots,
            blocks,
            bytes: self.offset,
        })
    }
}

impl<R: Read> Iterator for ArchiveReader<R> {
    type Item = ArchiveResult<ArchiveBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block().transpose()
    }
}

fn read_exact_len<R: Read>(reader: &mut R, len: u64, offset: u64) -> ArchiveResult<Vec<u8>> {
    // take() keeps a corrupt length from forcing a huge allocation up front
    let mut buf = Vec::new();
    reader.take(len).read_to_end(&mut buf)?;
    if (buf.len() as u64) < len {
        return Err(ArchiveError::Truncated {
            offset,
            reason: format!("expected {len} bytes, found {}", buf.len()),
        });
    }
    Ok(buf)
}
