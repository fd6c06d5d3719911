//! Streaming piece commitment over an archive byte stream.
//!
//! The archive is split into 32-byte leaves and folded into a binary Merkle
//! tree whose leaf count is a power of two. Padding leaves are all-zero and
//! are never materialised: whole zero subtrees are folded in by their
//! precomputed hashes.

use std::fmt;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

/// Size of one tree leaf in bytes.
pub const NODE_SIZE: usize = 32;

/// Smallest padded piece size.
pub const MIN_PIECE_SIZE: u64 = 128;

/// Errors from piece commitment.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommitmentError {
    #[error("invalid piece size {requested}: must be a power of two and at least {minimum}")]
    InvalidPieceSize { requested: u64, minimum: u64 },
}

/// Result alias for commitment operations.
pub type CommitmentResult<T> = Result<T, CommitmentError>;

/// A finished piece commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceCommitment {
    /// Root of the padded Merkle tree.
    #[serde(with = "hex_digest")]
    pub digest: [u8; 32],
    /// Padded piece size in bytes (power of two).
    pub padded_size: u64,
    /// Number of archive bytes that were committed.
    pub unpadded_size: u64,
}

impl PieceCommitment {
    /// Hex-encoded digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Form used for archive and cache file names (no `:`).
    pub fn file_stem(&self) -> String {
        format!("piece-{}", self.to_hex())
    }
}

impl fmt::Display for PieceCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "piece:{}", self.to_hex())
    }
}

mod hex_digest {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(digest: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(digest))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("digest must be 32 bytes"))
    }
}

/// Smallest valid padded size for `unpadded` bytes of input.
pub fn minimum_piece_size(unpadded: u64) -> u64 {
    let expanded = (unpadded * 128).div_ceil(127);
    expanded.next_power_of_two().max(MIN_PIECE_SIZE)
}

/// Incremental piece hasher.
///
/// Implements [`Write`] so it can sit on one side of a tee while the archive
/// is written to disk. Memory use is bounded by the tree height.
#[derive(Debug, Default)]
pub struct PieceHasher {
    /// Bytes of the current, not yet complete, leaf.
    pending: Vec<u8>,
    /// Completed subtree roots as `(level, hash)`, levels strictly decreasing.
    stack: Vec<(u32, [u8; 32])>,
    written: u64,
}

impl PieceHasher {
    /// Create an empty hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes consumed so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Feed bytes into the tree.
    pub fn update(&mut self, mut data: &[u8]) {
        self.written += data.len() as u64;

        if !self.pending.is_empty() {
            let take = (NODE_SIZE - self.pending.len()).min(data.len());
            self.pending.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.pending.len() < NODE_SIZE {
                return;
            }
            let mut leaf = [0u8; 32];
            leaf.copy_from_slice(&self.pending);
            self.pending.clear();
            self.push(0, leaf);
        }

        let mut leaves = data.chunks_exact(NODE_SIZE);
        for chunk in &mut leaves {
            let mut leaf = [0u8; 32];
            leaf.copy_from_slice(chunk);
            self.push(0, leaf);
        }
        self.pending.extend_from_slice(leaves.remainder());
    }

    /// Close the tree at `target_size` (`0` selects the smallest valid size).
    pub fn finish(mut self, target_size: u64) -> CommitmentResult<PieceCommitment> {
        let minimum = minimum_piece_size(self.written);
        let padded_size = if target_size == 0 {
            minimum
        } else if !target_size.is_power_of_two() || target_size < minimum {
            return Err(CommitmentError::InvalidPieceSize {
                requested: target_size,
                minimum,
            });
        } else {
            target_size
        };

        if !self.pending.is_empty() {
            let mut leaf = [0u8; 32];
            leaf[..self.pending.len()].copy_from_slice(&self.pending);
            self.pending.clear();
            self.push(0, leaf);
        }

        let height = (padded_size / NODE_SIZE as u64).trailing_zeros();
        let zeros = zero_subtrees(height);

        let digest = loop {
            let Some(&(level, hash)) = self.stack.last() else {
                break zeros[height as usize];
            };
            if self.stack.len() == 1 && level == height {
                break hash;
            }
            // Fill the smallest open gap with a zero subtree of the same height.
            self.push(level, zeros[level as usize]);
        };

        Ok(PieceCommitment {
            digest,
            padded_size,
            unpadded_size: self.written,
        })
    }

    fn push(&mut self, mut level: u32, mut hash: [u8; 32]) {
        while let Some(&(top_level, left)) = self.stack.last() {
            if top_level != level {
                break;
            }
            self.stack.pop();
            hash = hash_pair(&left, &hash);
            level += 1;
        }
        self.stack.push((level, hash));
    }
}

impl Write for PieceHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Commit a complete in-memory byte buffer.
pub fn commit_bytes(data: &[u8], target_size: u64) -> CommitmentResult<PieceCommitment> {
    let mut hasher = PieceHasher::new();
    hasher.update(data);
    hasher.finish(target_size)
}

/// Hashes of all-zero subtrees for levels `0..=height`.
fn zero_subtrees(height: u32) -> Vec<[u8; 32]> {
    let mut zeros = Vec::with_capacity(height as usize + 1);
    zeros.push([0u8; 32]);
    for level in 0..height as usize {
        let prev = zeros[level];
        zeros.push(hash_pair(&prev, &prev));
    }
    zeros
}

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"carpack-piece-v1:");
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}
