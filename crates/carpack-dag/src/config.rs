use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DagError, DagResult};

/// Default leaf chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 1 << 20;

/// Largest accepted leaf chunk size: 4 MiB.
pub const MAX_CHUNK_SIZE: u64 = 1 << 22;

/// Default maximum children per internal file node.
pub const DEFAULT_MAX_LINKS: usize = 1 << 10;

/// Chunking and fan-out parameters.
///
/// Both values feed into every node identifier, so changing either one
/// changes the root identifier of the same dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DagConfig {
    /// Leaf chunk size in bytes.
    pub chunk_size: u64,
    /// Maximum children per internal file node.
    pub max_links: usize,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_links: DEFAULT_MAX_LINKS,
        }
    }
}

impl DagConfig {
    /// Reject parameters that cannot produce a tree.
    pub fn validate(&self) -> DagResult<()> {
        if self.chunk_size == 0 {
            return Err(DagError::InvalidConfig("chunk_size must be positive".into()));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(DagError::InvalidConfig(format!(
                "chunk_size {} exceeds the {MAX_CHUNK_SIZE} byte limit",
                self.chunk_size
            )));
        }
        if self.max_links < 2 {
            return Err(DagError::InvalidConfig(format!(
                "max_links must be at least 2, got {}",
                self.max_links
            )));
        }
        Ok(())
    }

    /// Parse from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> DagResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| DagError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> DagResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| DagError::io(path, e))?;
        Self::from_toml_str(&text)
    }
}
