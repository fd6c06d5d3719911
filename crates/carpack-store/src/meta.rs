//! Key-value sink for auxiliary records written alongside an archive.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};

/// Write-through sink for auxiliary records (proof caches, block mappings).
///
/// Keys are relative, `/`-separated names such as `proofs/x.json`.
pub trait MetaSink {
    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;
}

fn check_key(key: &str) -> StoreResult<()> {
    let path = Path::new(key);
    let valid = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !valid {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Sink that writes each key as a file under a root directory.
///
/// Files are written to a temporary sibling and renamed into place, so a
/// reader never observes a half-written record.
#[derive(Clone, Debug)]
pub struct DirectoryMetaSink {
    root: PathBuf,
}

impl DirectoryMetaSink {
    /// Create a sink rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path a key is stored at.
    pub fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        check_key(key)?;
        Ok(self.root.join(key))
    }
}

impl MetaSink for DirectoryMetaSink {
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let parent = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(value)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct InMemoryMetaSink {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryMetaSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored keys in order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().expect("lock poisoned").keys().cloned().collect()
    }
}

impl MetaSink for InMemoryMetaSink {
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        check_key(key)?;
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        check_key(key)?;
        Ok(self.entries.read().expect("lock poisoned").get(key).cloned())
    }
}
