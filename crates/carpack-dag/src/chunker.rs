//! Fixed-size chunk splitting over whole files or byte-range slices.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{DagError, DagResult};

/// A single leaf chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Byte offset relative to the start of the source slice.
    pub offset: u64,
    /// The raw chunk data.
    pub data: Vec<u8>,
}

/// Reader over `[start, end)` of an underlying seekable source.
///
/// Seeks to `start` before the first read and reports end-of-stream exactly
/// at `end`. A source that runs dry before `end` is an
/// [`io::ErrorKind::UnexpectedEof`] error rather than a short slice.
#[derive(Debug)]
pub struct FileSlice<R> {
    inner: R,
    start: u64,
    end: u64,
    offset: u64,
    positioned: bool,
}

impl<R: Read + Seek> FileSlice<R> {
    /// Wrap `inner`, exposing only `[start, end)`.
    pub fn new(inner: R, start: u64, end: u64) -> Self {
        Self {
            inner,
            start,
            end,
            offset: start,
            positioned: false,
        }
    }

    /// Absolute offset of the next byte to be read.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes left before the end of the slice.
    pub fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.offset)
    }
}

impl FileSlice<File> {
    /// Open `[start, end)` of the file at `path`.
    ///
    /// The range must lie within the file's current length.
    pub fn open(path: &Path, start: u64, end: u64) -> DagResult<Self> {
        let file = File::open(path).map_err(|e| DagError::io(path, e))?;
        let size = file.metadata().map_err(|e| DagError::io(path, e))?.len();
        if start > end || end > size {
            return Err(DagError::Range {
                path: path.display().to_string(),
                start: start as i64,
                end: end as i64,
                size: size as i64,
            });
        }
        Ok(Self::new(file, start, end))
    }
}

impl<R: Read + Seek> Read for FileSlice<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.positioned {
            self.inner.seek(SeekFrom::Start(self.start))?;
            self.offset = self.start;
            self.positioned = true;
        }
        let remaining = self.end.checked_sub(self.offset).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("read offset {} past slice end {}", self.offset, self.end),
            )
        })?;
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = remaining.min(buf.len() as u64) as usize;
        let n = self.inner.read(&mut buf[..want])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("source ended at offset {} before slice end {}", self.offset, self.end),
            ));
        }
        self.offset += n as u64;
        Ok(n)
    }
}

/// Lazy fixed-size chunk sequence over a reader.
///
/// Every chunk is exactly `chunk_size` bytes except possibly the last. An
/// empty source yields no chunks. After an error or end-of-stream the
/// iterator is exhausted and cannot be restarted.
pub struct Chunker<R> {
    reader: R,
    chunk_size: usize,
    offset: u64,
    /// Expected source length, when known up front.
    len: Option<u64>,
    done: bool,
}

impl<R: Read> Chunker<R> {
    /// Create a chunker with the given chunk size in bytes.
    pub fn new(reader: R, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        Self {
            reader,
            chunk_size,
            offset: 0,
            len: None,
            done: false,
        }
    }

    /// Declare the source length so buffers are sized to what is left.
    pub fn with_len(mut self, len: u64) -> Self {
        self.len = Some(len);
        self
    }

    fn fill(&mut self) -> io::Result<Option<Chunk>> {
        let want = match self.len {
            Some(len) => len.saturating_sub(self.offset).min(self.chunk_size as u64),
            None => self.chunk_size as u64,
        };
        let mut buf = Vec::with_capacity(want as usize);

        // Read exactly chunk_size bytes, or until EOF.
        let filled = (&mut self.reader)
            .take(self.chunk_size as u64)
            .read_to_end(&mut buf)?;

        if filled < self.chunk_size {
            self.done = true;
        }
        if filled == 0 {
            return Ok(None);
        }

        let chunk = Chunk {
            offset: self.offset,
            data: buf,
        };
        self.offset += filled as u64;
        Ok(Some(chunk))
    }
}

impl<R: Read> Iterator for Chunker<R> {
    type Item = io::Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.fill() {
            Ok(chunk) => chunk.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn chunk_all(data: &[u8], chunk_size: usize) -> Vec<Chunk> {
        Chunker::new(Cursor::new(data.to_vec()), chunk_size)
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn empty_source_yields_nothing() {
        assert!(chunk_all(b"", 16).is_empty());
    }

    #[test]
    fn exact_multiple_has_full_last_chunk() {
        let chunks = chunk_all(&[0xAB; 32], 16);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].data.len(), 16);
        assert_eq!(chunks[1].offset, 16);
    }

    #[test]
    fn remainder_goes_to_last_chunk() {
        let chunks = chunk_all(&[0xFF; 350], 100);
        let lens: Vec<usize> = chunks.iter().map(|c| c.data.len()).collect();
        assert_eq!(lens, vec![100, 100, 100, 50]);
        assert_eq!(chunks[3].offset, 300);
    }

    #[test]
    fn slice_reads_only_its_range() {
        let data: Vec<u8> = (0..100u8).collect();
        let mut slice = FileSlice::new(Cursor::new(data), 10, 25);
        let mut out = Vec::new();
        slice.read_to_end(&mut out).unwrap();
        assert_eq!(out, (10..25u8).collect::<Vec<_>>());
        assert_eq!(slice.offset(), 25);
        assert_eq!(slice.remaining(), 0);
    }

    #[test]
    fn empty_slice_is_empty() {
        let mut slice = FileSlice::new(Cursor::new(vec![1u8; 10]), 4, 4);
        let mut out = Vec::new();
        slice.read_to_end(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn short_source_is_unexpected_eof() {
        let mut slice = FileSlice::new(Cursor::new(vec![0u8; 10]), 5, 20);
        let mut out = Vec::new();
        let err = slice.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn chunker_stops_after_error() {
        let slice = FileSlice::new(Cursor::new(vec![0u8; 10]), 0, 40);
        let mut chunker = Chunker::new(slice, 4);
        let mut saw_error = false;
        for item in &mut chunker {
            if item.is_err() {
                saw_error = true;
            }
        }
        assert!(saw_error);
        assert!(chunker.next().is_none());
    }

    #[test]
    fn open_rejects_inverted_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"abc").unwrap();
        assert!(matches!(
            FileSlice::open(&path, 3, 1),
            Err(DagError::Range { .. })
        ));
    }

    #[test]
    fn open_reports_actual_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"abc").unwrap();
        match FileSlice::open(&path, 1, 9) {
            Err(DagError::Range { start, end, size, .. }) => {
                assert_eq!((start, end, size), (1, 9, 3));
            }
            other => panic!("expected range error, got {other:?}"),
        }
    }

    #[test]
    fn known_length_bounds_the_buffer() {
        let data = vec![7u8; 3];
        let chunks: Vec<Chunk> = Chunker::new(Cursor::new(data.clone()), 1 << 22)
            .with_len(3)
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].data, data);
        assert!(chunks[0].data.capacity() < 1024);
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSlice::open(&dir.path().join("nope"), 0, 0).unwrap_err();
        assert!(matches!(err, DagError::Io { .. }));
    }

    proptest! {
        #[test]
        fn chunks_reassemble_requested_range(
            data in proptest::collection::vec(any::<u8>(), 0..600),
            a in 0usize..600,
            b in 0usize..600,
            chunk_size in 1usize..64,
        ) {
            let (start, end) = (a.min(b).min(data.len()), a.max(b).min(data.len()));
            let slice = FileSlice::new(Cursor::new(data.clone()), start as u64, end as u64);
            let chunks: Vec<Chunk> = Chunker::new(slice, chunk_size)
                .collect::<io::Result<_>>()
                .unwrap();

            let joined: Vec<u8> = chunks.iter().flat_map(|c| c.data.clone()).collect();
            prop_assert_eq!(&joined[..], &data[start..end]);
            for (i, c) in chunks.iter().enumerate() {
                prop_assert_eq!(c.offset, (i * chunk_size) as u64);
                if i + 1 < chunks.len() {
                    prop_assert_eq!(c.data.len(), chunk_size);
                }
            }
        }
    }
}
