use carpack_types::{BlockKind, ContentId};

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g., `"carpack-leaf-v1"`) that is
/// prepended to every hash computation, and the [`BlockKind`] stamped on the
/// resulting [`ContentId`]. A leaf and a directory with identical bytes
/// produce different identifiers.
pub struct ContentHasher {
    domain: &'static str,
    kind: BlockKind,
}

impl ContentHasher {
    /// Hasher for leaf chunks.
    pub const LEAF: Self = Self {
        domain: "carpack-leaf-v1",
        kind: BlockKind::Leaf,
    };
    /// Hasher for internal file nodes.
    pub const FILE: Self = Self {
        domain: "carpack-file-v1",
        kind: BlockKind::File,
    };
    /// Hasher for directory nodes.
    pub const DIRECTORY: Self = Self {
        domain: "carpack-dir-v1",
        kind: BlockKind::Directory,
    };

    /// The hasher for a given block kind.
    pub fn for_kind(kind: BlockKind) -> &'static Self {
        match kind {
            BlockKind::Leaf => &Self::LEAF,
            BlockKind::File => &Self::FILE,
            BlockKind::Directory => &Self::DIRECTORY,
        }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ContentId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ContentId::from_hash(self.kind, *hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected content ID.
    pub fn verify(&self, data: &[u8], expected: &ContentId) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }

    /// The block kind stamped on produced identifiers.
    pub fn kind(&self) -> BlockKind {
        self.kind
    }
}
