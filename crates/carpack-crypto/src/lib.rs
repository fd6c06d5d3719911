//! Cryptographic primitives for carpack.
//!
//! Provides domain-separated BLAKE3 hashing for blocks and the streaming
//! piece commitment computed over a finished archive.
//!
//! All crypto operations wrap established libraries.

pub mod hasher;
pub mod piece;

pub use hasher::ContentHasher;
pub use piece::{
    commit_bytes, minimum_piece_size, CommitmentError, CommitmentResult, PieceCommitment,
    PieceHasher, MIN_PIECE_SIZE,
};
