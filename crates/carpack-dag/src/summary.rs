//! Summary tree projection over a committed root.

use serde::{Deserialize, Serialize};

use carpack_store::{BlockStore, DirectoryNode, Node};
use carpack_types::ContentId;

use crate::error::{DagError, DagResult};

/// Summary of one node of the directory tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsNode {
    pub name: String,
    pub id: ContentId,
    pub size: u64,
    pub children: Vec<FsNode>,
}

/// Rebuilds [`FsNode`] trees by re-reading committed blocks.
pub struct SummaryProjector<'a> {
    store: &'a dyn BlockStore,
}

impl<'a> SummaryProjector<'a> {
    pub fn new(store: &'a dyn BlockStore) -> Self {
        Self { store }
    }

    /// Project the tree under `root`, which is named `""`.
    ///
    /// Only directories are expanded. Every referenced block must be present.
    pub fn project(&self, root: &ContentId) -> DagResult<FsNode> {
        let node = self.resolve(root)?;
        let size = node.size();
        let children = match node {
            Node::Directory(dir) => self.expand(&dir)?,
            _ => Vec::new(),
        };
        Ok(FsNode {
            name: String::new(),
            id: *root,
            size,
            children,
        })
    }

    fn expand(&self, dir: &DirectoryNode) -> DagResult<Vec<FsNode>> {
        dir.links
            .iter()
            .map(|link| {
                let children = if link.id.is_directory() {
                    match self.resolve(&link.id)? {
                        Node::Directory(child) => self.expand(&child)?,
                        _ => {
                            return Err(DagError::Structural(format!(
                                "{} is tagged as a directory but does not decode as one",
                                link.id
                            )))
                        }
                    }
                } else {
                    if !self.store.has(&link.id)? {
                        return Err(DagError::DanglingReference(link.id));
                    }
                    Vec::new()
                };
                Ok(FsNode {
                    name: link.name.clone(),
                    id: link.id,
                    size: link.size,
                    children,
                })
            })
            .collect()
    }

    fn resolve(&self, id: &ContentId) -> DagResult<Node> {
        let block = self
            .store
            .get(id)?
            .ok_or(DagError::DanglingReference(*id))?;
        Ok(Node::decode(&block)?)
    }
}
