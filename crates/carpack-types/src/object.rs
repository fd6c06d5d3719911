use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Length of the binary form of a [`ContentId`]: one tag byte plus the digest.
pub const CONTENT_ID_LEN: usize = 33;

/// The kind of block a [`ContentId`] refers to.
///
/// The kind is part of the identifier, so a reader can tell a directory from
/// a file without fetching the block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BlockKind {
    /// Raw chunk bytes, no children.
    Leaf,
    /// Internal file node: ordered child links plus cumulative size.
    File,
    /// Directory listing: ordered `(name, id, size)` links.
    Directory,
}

impl BlockKind {
    /// Tag byte used in the binary form.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Leaf => 0x01,
            Self::File => 0x02,
            Self::Directory => 0x03,
        }
    }

    /// Parse from a tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(Self::Leaf),
            0x02 => Some(Self::File),
            0x03 => Some(Self::Directory),
            _ => None,
        }
    }

    /// Prefix used in the string form.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Leaf => "leaf",
            Self::File => "file",
            Self::Directory => "dir",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Content-addressed identifier for a committed block.
///
/// A `ContentId` is the BLAKE3 digest of a block's canonical encoding, tagged
/// with the block's [`BlockKind`]. Equal content of equal kind always produces
/// the same `ContentId`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId {
    kind: BlockKind,
    digest: [u8; 32],
}

impl ContentId {
    /// Create a `ContentId` from a pre-computed digest.
    pub fn from_hash(kind: BlockKind, digest: [u8; 32]) -> Self {
        Self { kind, digest }
    }

    /// The kind tag.
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Returns `true` if this identifies a directory node.
    pub fn is_directory(&self) -> bool {
        self.kind == BlockKind::Directory
    }

    /// The raw 32-byte digest.
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Binary form: tag byte followed by the digest.
    pub fn to_bytes(&self) -> [u8; CONTENT_ID_LEN] {
        let mut out = [0u8; CONTENT_ID_LEN];
        out[0] = self.kind.tag();
        out[1..].copy_from_slice(&self.digest);
        out
    }

    /// Parse the binary form produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() != CONTENT_ID_LEN {
            return Err(TypeError::InvalidLength {
                expected: CONTENT_ID_LEN,
                actual: bytes.len(),
            });
        }
        let kind = BlockKind::from_tag(bytes[0])
            .ok_or_else(|| TypeError::UnknownKind(format!("tag {:#04x}", bytes[0])))?;
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes[1..]);
        Ok(Self { kind, digest })
    }

    /// Hex-encoded digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.digest[..4])
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({}:{})", self.kind, self.short_hex())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.to_hex())
    }
}

impl FromStr for ContentId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, hex_part) = s
            .split_once(':')
            .ok_or_else(|| TypeError::UnknownKind(s.to_string()))?;
        let kind = match prefix {
            "leaf" => BlockKind::Leaf,
            "file" => BlockKind::File,
            "dir" => BlockKind::Directory,
            other => return Err(TypeError::UnknownKind(other.to_string())),
        };
        let bytes = hex::decode(hex_part).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes);
        Ok(Self { kind, digest })
    }
}

// Human-readable formats (JSON) carry the string form; binary formats carry
// the structured form so node encodings stay compact.
impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            (self.kind, self.digest).serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            let (kind, digest) = <(BlockKind, [u8; 32])>::deserialize(deserializer)?;
            Ok(Self { kind, digest })
        }
    }
}
