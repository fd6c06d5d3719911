use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// One file, or one byte-range slice of a file, to ingest.
///
/// Field names follow the manifest JSON (`path`, `size`, `start`, `end`); the
/// capitalised spellings are accepted as well.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Location of the source file.
    #[serde(alias = "Path")]
    pub path: PathBuf,
    /// Size of the whole source file in bytes.
    #[serde(alias = "Size")]
    pub size: i64,
    /// First byte of the slice (inclusive).
    #[serde(alias = "Start", default)]
    pub start: i64,
    /// End of the slice (exclusive). `0` means "to end of file".
    #[serde(alias = "End", default)]
    pub end: i64,
}

impl ManifestEntry {
    /// An entry covering the whole file.
    pub fn full(path: impl Into<PathBuf>, size: u64) -> Self {
        let size = size as i64;
        Self {
            path: path.into(),
            size,
            start: 0,
            end: size,
        }
    }

    /// An entry covering `[start, end)` of a file of `size` bytes.
    pub fn slice(path: impl Into<PathBuf>, size: i64, start: i64, end: i64) -> Self {
        Self {
            path: path.into(),
            size,
            start,
            end,
        }
    }

    /// Resolve `end == 0` to the file size and check `0 <= start <= end <= size`.
    pub fn normalize(&mut self) -> Result<(), TypeError> {
        if self.end == 0 {
            self.end = self.size;
        }
        if self.start < 0 || self.start > self.end || self.end > self.size {
            return Err(TypeError::InvalidRange {
                path: self.path.display().to_string(),
                start: self.start,
                end: self.end,
                size: self.size,
            });
        }
        Ok(())
    }

    /// Number of bytes in the slice. Only meaningful after [`normalize`](Self::normalize).
    pub fn len(&self) -> u64 {
        (self.end - self.start).max(0) as u64
    }

    /// Returns `true` if the slice has no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the slice covers the whole file.
    pub fn is_full_range(&self) -> bool {
        self.start == 0 && self.end == self.size
    }

    /// Point the entry at a staged copy holding exactly the slice bytes.
    pub fn restage(&mut self, staged: &Path) {
        let len = self.len() as i64;
        self.path = staged.to_path_buf();
        self.size = len;
        self.start = 0;
        self.end = len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_end_means_whole_file() {
        let mut entry = ManifestEntry::slice("a.txt", 4038, 1, 0);
        entry.normalize().unwrap();
        assert_eq!(entry.end, 4038);
        assert_eq!(entry.len(), 4037);
        assert!(!entry.is_full_range());
    }

    #[test]
    fn end_past_size_is_rejected() {
        let mut entry = ManifestEntry::slice("a.txt", 10, 0, 11);
        let err = entry.normalize().unwrap_err();
        assert!(matches!(err, TypeError::InvalidRange { end: 11, size: 10, .. }));
    }

    #[test]
    fn start_after_end_is_rejected() {
        let mut entry = ManifestEntry::slice("a.txt", 10, 6, 5);
        assert!(entry.normalize().is_err());
    }

    #[test]
    fn negative_start_is_rejected() {
        let mut entry = ManifestEntry::slice("a.txt", 10, -1, 5);
        assert!(entry.normalize().is_err());
    }

    #[test]
    fn empty_file_is_valid() {
        let mut entry = ManifestEntry::full("empty", 0);
        entry.normalize().unwrap();
        assert!(entry.is_empty());
        assert!(entry.is_full_range());
    }

    #[test]
    fn restage_rebases_range() {
        let mut entry = ManifestEntry::slice("/data/big.bin", 100, 10, 40);
        entry.normalize().unwrap();
        entry.restage(Path::new("/tmp/stage/big.bin"));
        assert_eq!(entry.path, PathBuf::from("/tmp/stage/big.bin"));
        assert_eq!((entry.size, entry.start, entry.end), (30, 0, 30));
    }

    #[test]
    fn json_accepts_both_spellings() {
        let lower: ManifestEntry =
            serde_json::from_str(r#"{"path":"x","size":5,"start":1,"end":4}"#).unwrap();
        let upper: ManifestEntry =
            serde_json::from_str(r#"{"Path":"x","Size":5,"Start":1,"End":4}"#).unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn json_defaults_missing_range() {
        let entry: ManifestEntry = serde_json::from_str(r#"{"path":"x","size":5}"#).unwrap();
        assert_eq!((entry.start, entry.end), (0, 0));
    }
}
