//! Whole-manifest DAG construction.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::info;

use carpack_store::BlockStore;
use carpack_types::{ContentId, ManifestEntry};

use crate::balanced::{BalancedBuilder, BuiltFile};
use crate::config::DagConfig;
use crate::error::{DagError, DagResult};
use crate::folder::{DirectoryFolder, FoldStats, PathMap};
use crate::manifest::{normalize_all, relative_key};
use crate::staging::stage_entry;

/// Shared state handed to every component of one build.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub store: &'a dyn BlockStore,
    pub config: DagConfig,
}

impl<'a> BuildContext<'a> {
    pub fn new(store: &'a dyn BlockStore, config: DagConfig) -> Self {
        Self { store, config }
    }
}

/// A committed dataset tree.
#[derive(Clone, Debug)]
pub struct BuiltDag {
    pub root: ContentId,
    pub size: u64,
    pub path_map: PathMap,
    pub stats: FoldStats,
    /// Folded files in manifest order, by key.
    pub files: Vec<(String, BuiltFile)>,
}

/// Drives chunking, tree building, and folding for one manifest.
///
/// Not re-entrant: one builder, one manifest, one thread.
pub struct DagBuilder<'a> {
    ctx: BuildContext<'a>,
    parent: PathBuf,
    tmp_dir: Option<PathBuf>,
}

impl<'a> DagBuilder<'a> {
    /// Create a builder whose folder keys are relative to `parent`.
    pub fn new(ctx: BuildContext<'a>, parent: impl Into<PathBuf>) -> DagResult<Self> {
        ctx.config.validate()?;
        Ok(Self {
            ctx,
            parent: parent.into(),
            tmp_dir: None,
        })
    }

    /// Stage every entry into `dir` before chunking.
    pub fn with_tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = Some(dir.into());
        self
    }

    pub fn parent(&self) -> &Path {
        &self.parent
    }

    /// Build the tree for `entries`, in order.
    ///
    /// Every entry is validated and keyed before the first byte is chunked.
    /// Staged entries are rewritten in place to point at their copies.
    pub fn build(&self, entries: &mut [ManifestEntry]) -> DagResult<BuiltDag> {
        normalize_all(entries)?;

        let mut keys = Vec::with_capacity(entries.len());
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in entries.iter() {
            let key = relative_key(&self.parent, &entry.path)?;
            if !seen.insert(key.clone()) {
                return Err(DagError::DuplicatePath(key));
            }
            keys.push(key);
        }

        info!(
            entries = entries.len(),
            parent = %self.parent.display(),
            chunk_size = self.ctx.config.chunk_size,
            max_links = self.ctx.config.max_links,
            "building dag"
        );

        let files = BalancedBuilder::new(&self.ctx);
        let mut folder = DirectoryFolder::new(self.ctx.store);
        let mut built_files = Vec::with_capacity(entries.len());

        for (entry, key) in entries.iter_mut().zip(keys) {
            if let Some(tmp) = &self.tmp_dir {
                stage_entry(entry, &key, tmp)?;
            }
            let built = files.build_entry(entry)?;
            folder.add(&key, &built)?;
            built_files.push((key, built));
        }

        let outcome = folder.finish()?;
        info!(
            root = %outcome.root,
            size = outcome.size,
            files = outcome.stats.files,
            directories = outcome.stats.closed,
            "dag complete"
        );

        Ok(BuiltDag {
            root: outcome.root,
            size: outcome.size,
            path_map: outcome.path_map,
            stats: outcome.stats,
            files: built_files,
        })
    }
}
