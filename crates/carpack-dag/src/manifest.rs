//! Manifest loading, directory walking, and folder key derivation.

use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use carpack_types::ManifestEntry;

use crate::error::{DagError, DagResult};

/// Parse a JSON array of manifest entries.
pub fn read_manifest<R: Read>(reader: R) -> DagResult<Vec<ManifestEntry>> {
    serde_json::from_reader(reader).map_err(|e| DagError::Manifest(e.to_string()))
}

/// Read a manifest from a file, or from stdin when `input` is `-`.
pub fn load_manifest(input: &str) -> DagResult<Vec<ManifestEntry>> {
    if input == "-" {
        return read_manifest(io::stdin().lock());
    }
    let file = fs::File::open(input).map_err(|e| DagError::io(input, e))?;
    read_manifest(io::BufReader::new(file))
}

/// Synthesize full-range entries for a single file or every regular file
/// under a directory, in sorted walk order.
///
/// Symlinks are followed; an entry keeps the link's path, not its target's.
pub fn walk_single(path: &Path) -> DagResult<Vec<ManifestEntry>> {
    let meta = fs::metadata(path).map_err(|e| DagError::io(path, e))?;
    if !meta.is_dir() {
        return Ok(vec![ManifestEntry::full(path, meta.len())]);
    }

    let mut entries = Vec::new();
    for item in WalkDir::new(path).follow_links(true).sort_by_file_name() {
        let item = item.map_err(|e| {
            let at = e.path().unwrap_or(path).to_path_buf();
            DagError::io(at, io::Error::from(e))
        })?;
        if !item.file_type().is_file() {
            continue;
        }
        let len = item
            .metadata()
            .map_err(|e| DagError::io(item.path(), io::Error::from(e)))?
            .len();
        entries.push(ManifestEntry::full(item.path(), len));
    }
    debug!(root = %path.display(), files = entries.len(), "walked input directory");
    Ok(entries)
}

/// Normalize every entry and check it against the file on disk.
///
/// Runs over the whole manifest before any chunking, so a bad range
/// anywhere rejects the run up front.
pub fn normalize_all(entries: &mut [ManifestEntry]) -> DagResult<()> {
    for entry in entries.iter_mut() {
        entry.normalize()?;
        let actual = fs::metadata(&entry.path)
            .map_err(|e| DagError::io(&entry.path, e))?
            .len();
        if entry.end as u64 > actual {
            return Err(DagError::Range {
                path: entry.path.display().to_string(),
                start: entry.start,
                end: entry.end,
                size: actual as i64,
            });
        }
    }
    Ok(())
}

/// Forward-slash key of `path` relative to `parent`.
///
/// Both sides are made absolute and lexically cleaned; symlinks are not
/// resolved.
pub fn relative_key(parent: &Path, path: &Path) -> DagResult<String> {
    let parent_abs = clean(&std::path::absolute(parent).map_err(|e| DagError::io(parent, e))?);
    let path_abs = clean(&std::path::absolute(path).map_err(|e| DagError::io(path, e))?);

    let rel = path_abs
        .strip_prefix(&parent_abs)
        .map_err(|_| DagError::OutsideParent {
            path: path.to_path_buf(),
            parent: parent.to_path_buf(),
        })?;

    let mut segments = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(name) => segments.push(
                name.to_str()
                    .ok_or_else(|| DagError::InvalidPath(path.display().to_string()))?,
            ),
            _ => return Err(DagError::InvalidPath(path.display().to_string())),
        }
    }
    if segments.is_empty() {
        return Err(DagError::InvalidPath(path.display().to_string()));
    }
    Ok(segments.join("/"))
}

fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
