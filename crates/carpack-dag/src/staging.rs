//! Copy an entry's byte range into a staging directory before chunking.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use carpack_types::ManifestEntry;

use crate::chunker::FileSlice;
use crate::error::{DagError, DagResult};

/// Copy `[start, end)` of `entry` to `<tmp_dir>/<key>` and point the entry at
/// the copy (`start = 0`, `size = end = len`).
///
/// `entry` must already be normalized.
pub fn stage_entry(entry: &mut ManifestEntry, key: &str, tmp_dir: &Path) -> DagResult<()> {
    let target = key.split('/').fold(tmp_dir.to_path_buf(), |acc, seg| acc.join(seg));
    if let Some(dir) = target.parent() {
        fs::create_dir_all(dir).map_err(|e| DagError::io(dir, e))?;
    }

    let expected = entry.len();
    let mut source = FileSlice::open(&entry.path, entry.start as u64, entry.end as u64)?;
    let file = File::create(&target).map_err(|e| DagError::io(&target, e))?;
    let mut out = BufWriter::new(file);
    let copied = io::copy(&mut source.by_ref().take(expected), &mut out)
        .map_err(|e| DagError::io(&entry.path, e))?;
    out.flush().map_err(|e| DagError::io(&target, e))?;

    if copied != expected {
        return Err(DagError::io(
            &entry.path,
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("staged {copied} of {expected} bytes"),
            ),
        ));
    }

    debug!(from = %entry.path.display(), to = %target.display(), bytes = copied, "staged entry");
    entry.restage(&target);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_slice_and_rewrites_entry() {
        let src = tempfile::tempdir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let path = src.path().join("big.bin");
        let data: Vec<u8> = (0..200u8).collect();
        fs::write(&path, &data).unwrap();

        let mut entry = ManifestEntry::slice(&path, 200, 50, 120);
        entry.normalize().unwrap();
        stage_entry(&mut entry, "nested/dir/big.bin", tmp.path()).unwrap();

        let staged = tmp.path().join("nested/dir/big.bin");
        assert_eq!(entry.path, staged);
        assert_eq!((entry.size, entry.start, entry.end), (70, 0, 70));
        assert_eq!(fs::read(&staged).unwrap(), &data[50..120]);
    }

    #[test]
    fn staging_empty_range_creates_empty_file() {
        let src = tempfile::tempdir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let path = src.path().join("f");
        fs::write(&path, b"abc").unwrap();

        let mut entry = ManifestEntry::slice(&path, 3, 2, 2);
        entry.normalize().unwrap();
        stage_entry(&mut entry, "f", tmp.path()).unwrap();
        assert!(entry.is_empty());
        assert_eq!(fs::metadata(tmp.path().join("f")).unwrap().len(), 0);
    }

    #[test]
    fn source_shorter_than_entry_fails() {
        let src = tempfile::tempdir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let path = src.path().join("short");
        fs::write(&path, b"abc").unwrap();

        let mut entry = ManifestEntry::slice(&path, 10, 0, 10);
        entry.normalize().unwrap();
        let err = stage_entry(&mut entry, "short", tmp.path()).unwrap_err();
        assert!(matches!(err, DagError::Range { size: 3, .. }));
        assert_eq!(entry.path, path);
    }
}
