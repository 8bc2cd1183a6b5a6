//! Core Bitcoin-style codecs used when generating a new coin.
//!
//! This crate provides pure Rust implementations of:
//! - Variable-length and fixed-width little-endian integer encoding
//! - Double SHA256 and scrypt proof-of-work hashing behind one `Hasher` trait
//! - Merkle tree folding with a pluggable hasher
//! - Compact target, full target and difficulty conversion
//! - Transaction and block construction and serialization
//! - Genesis block construction from a handful of parameters

pub mod block;
pub mod codec;
pub mod difficulty;
pub mod genesis;
pub mod hash;
pub mod merkle;
pub mod tx;

pub use block::{Block, HEADER_SIZE};
pub use codec::{encode_varint, varint, write_varint};
pub use difficulty::{bits_to_difficulty, difficulty_to_bits, target_to_bits, bits_to_target, TargetError, DIFF1_BITS};
pub use genesis::{GenesisBuilder, GenesisError};
pub use hash::{double_sha256, scrypt_hash, Hash, HashError, HashOrder, Hasher, Scrypt, Sha256d, HASH_SIZE};
pub use merkle::{merkle_root, merkle_tree};
pub use tx::Transaction;

/// Number of value units in one coin.
pub const COIN: u64 = 100_000_000;
/// Number of value units in one millicoin.
pub const MILLI: u64 = 100_000;
/// Number of value units in one microcoin.
pub const MICRO: u64 = 100;
/// Decimal places of a coin amount.
pub const COIN_PRECISION: usize = 8;
