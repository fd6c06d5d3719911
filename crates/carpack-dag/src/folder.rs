//! Incremental directory folding.
//!
//! [`DirectoryFolder`] consumes `(path, file root)` pairs in manifest order
//! and builds the directory hierarchy with an explicit stack. Entries under
//! the same directory must arrive contiguously: a directory is committed as
//! soon as the input moves past it, and never reopened.
//!
//! # Invariants
//!
//! - `stack.len() == previous.len()`; slot `d` of the stack belongs to
//!   segment `d` of the previous path, slot 0 being the root.
//! - Only the top slot may hold a closed file root; every slot beneath it is
//!   an open directory.
//! - A directory is committed only after all of its children, and recorded
//!   in the path map exactly once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use carpack_store::{BlockStore, DirectoryLink, DirectoryNode};
use carpack_types::ContentId;

use crate::balanced::BuiltFile;
use crate::error::{DagError, DagResult};

/// Flat path to identifier index. The root is keyed by `""`.
pub type PathMap = BTreeMap<String, PathMapValue>;

/// One entry of the [`PathMap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathMapValue {
    pub is_directory: bool,
    pub id: ContentId,
}

/// Directory open and close counters for one fold. The root counts as one of each.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldStats {
    pub opened: u64,
    pub closed: u64,
    pub files: u64,
}

/// Result of a finished fold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoldOutcome {
    pub root: ContentId,
    /// Cumulative size of the whole tree.
    pub size: u64,
    pub path_map: PathMap,
    pub stats: FoldStats,
}

#[derive(Debug)]
enum StackEntry {
    OpenDirectory { name: String, dir: DirectoryNode },
    ClosedFileRoot { link: DirectoryLink },
}

/// Stack-based directory builder.
pub struct DirectoryFolder<'a> {
    store: &'a dyn BlockStore,
    stack: Vec<StackEntry>,
    previous: Vec<String>,
    path_map: PathMap,
    stats: FoldStats,
}

impl<'a> DirectoryFolder<'a> {
    /// Start a fold with an open, empty root.
    pub fn new(store: &'a dyn BlockStore) -> Self {
        Self {
            store,
            stack: vec![StackEntry::OpenDirectory {
                name: String::new(),
                dir: DirectoryNode::empty(),
            }],
            previous: vec![String::new()],
            path_map: PathMap::new(),
            stats: FoldStats {
                opened: 1,
                ..FoldStats::default()
            },
        }
    }

    /// Current stack depth, root included.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Fold one file under its forward-slash `key`.
    ///
    /// All conflict checks happen before any directory is closed, so a
    /// rejected entry leaves the fold unchanged.
    pub fn add(&mut self, key: &str, file: &BuiltFile) -> DagResult<()> {
        let current = split_key(key)?;

        if let Some(existing) = self.path_map.get(key) {
            return Err(if existing.is_directory {
                conflict(key, "a directory with this path was already folded")
            } else {
                DagError::DuplicatePath(key.to_string())
            });
        }

        let i = self
            .previous
            .iter()
            .zip(&current)
            .take_while(|(a, b)| a == b)
            .count();

        if i == current.len() {
            return Err(conflict(key, "names a directory that is still open"));
        }
        if i == self.previous.len() && self.previous.len() > 1 {
            return Err(conflict(key, "descends through a file"));
        }
        for depth in i..current.len() - 1 {
            let dir_key = current[1..=depth].join("/");
            match self.path_map.get(&dir_key) {
                Some(v) if v.is_directory => {
                    return Err(conflict(key, &format!("directory {dir_key} was already closed")))
                }
                Some(_) => return Err(conflict(key, &format!("{dir_key} is a file"))),
                None => {}
            }
        }

        self.close_to(i)?;

        let leaf = current.len() - 1;
        for (depth, name) in current.iter().enumerate().take(leaf).skip(i) {
            debug!(path = %current[1..=depth].join("/"), depth, "open directory");
            self.stack.push(StackEntry::OpenDirectory {
                name: name.clone(),
                dir: DirectoryNode::empty(),
            });
            self.stats.opened += 1;
        }
        self.stack.push(StackEntry::ClosedFileRoot {
            link: DirectoryLink::new(current[leaf].clone(), file.id, file.size),
        });
        self.path_map.insert(
            key.to_string(),
            PathMapValue {
                is_directory: false,
                id: file.id,
            },
        );
        self.stats.files += 1;
        self.previous = current;
        Ok(())
    }

    /// Close everything and commit the root.
    pub fn finish(mut self) -> DagResult<FoldOutcome> {
        self.close_to(1)?;

        let root = match self.stack.pop() {
            Some(StackEntry::OpenDirectory { dir, .. }) => dir,
            Some(StackEntry::ClosedFileRoot { link }) => {
                return Err(DagError::Structural(format!(
                    "file {} left at the root slot",
                    link.name
                )))
            }
            None => return Err(DagError::Structural("stack underflow at root".into())),
        };
        if !self.stack.is_empty() {
            return Err(DagError::Structural(format!(
                "{} frames left after unwinding",
                self.stack.len()
            )));
        }

        let (id, size) = self.commit("", 0, &root)?;
        self.stats.closed += 1;
        self.path_map.insert(
            String::new(),
            PathMapValue {
                is_directory: true,
                id,
            },
        );

        Ok(FoldOutcome {
            root: id,
            size,
            path_map: self.path_map,
            stats: self.stats,
        })
    }

    /// Pop frames until `depth` remain, attaching each to its parent.
    fn close_to(&mut self, depth: usize) -> DagResult<()> {
        while self.stack.len() > depth {
            let Some(top) = self.stack.pop() else {
                return Err(DagError::Structural("stack underflow".into()));
            };
            let popped_depth = self.stack.len();

            let link = match top {
                StackEntry::ClosedFileRoot { link } => link,
                StackEntry::OpenDirectory { name, dir } => {
                    let key = self.previous[1..=popped_depth].join("/");
                    let (id, size) = self.commit(&key, popped_depth, &dir)?;
                    self.stats.closed += 1;
                    self.path_map.insert(
                        key,
                        PathMapValue {
                            is_directory: true,
                            id,
                        },
                    );
                    DirectoryLink::new(name, id, size)
                }
            };

            match self.stack.last_mut() {
                Some(StackEntry::OpenDirectory { dir, .. }) => dir.push(link),
                Some(StackEntry::ClosedFileRoot { link: parent }) => {
                    return Err(DagError::Structural(format!(
                        "parent of {} is the file {}",
                        link.name, parent.name
                    )))
                }
                None => {
                    return Err(DagError::Structural(format!(
                        "no parent for {}",
                        link.name
                    )))
                }
            }
        }
        Ok(())
    }

    fn commit(&self, key: &str, depth: usize, dir: &DirectoryNode) -> DagResult<(ContentId, u64)> {
        let id = self.store.put(&dir.to_block()?)?;
        debug!(path = key, depth, %id, children = dir.len(), "committed directory");
        Ok((id, dir.size()))
    }
}

/// Split a key into `["", seg1, ..., leaf]`.
fn split_key(key: &str) -> DagResult<Vec<String>> {
    let mut segments = vec![String::new()];
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(DagError::InvalidPath(key.to_string()));
        }
        segments.push(segment.to_string());
    }
    Ok(segments)
}

fn conflict(path: &str, reason: &str) -> DagError {
    DagError::PathConflict {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
