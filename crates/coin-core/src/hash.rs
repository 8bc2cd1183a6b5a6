//! Hash values and the hashing capability used for chain and proof-of-work hashing.

use core::fmt;

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of a hash value in bytes.
pub const HASH_SIZE: usize = 32;

/// scrypt cost parameters used by Litecoin-style proof of work (N = 1024).
const SCRYPT_LOG_N: u8 = 10;
const SCRYPT_R: u32 = 1;
const SCRYPT_P: u32 = 1;

/// Errors when constructing (not computing) a hash value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HashError {
    /// Input did not contain exactly 32 bytes
    #[error("incorrect length for hash: expected {HASH_SIZE} bytes, got {0}")]
    Length(usize),
    /// Input was not valid hex
    #[error("invalid hex for hash: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Byte order of raw bytes a hash is constructed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashOrder {
    /// Bytes are already in internal (serialization) order.
    Internal,
    /// Bytes are in display order and get reversed into internal order.
    Display,
}

/// A 32-byte hash value as used throughout the block and transaction codecs.
///
/// Storage is in internal byte order; `Display` renders the reversed
/// (big-endian) hex form that block explorers show.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// The all-zero hash.
    pub const ZERO: Hash = Hash([0u8; HASH_SIZE]);

    /// Wrap a byte array that is already in internal order.
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Construct a hash from raw bytes, failing unless there are exactly 32.
    pub fn from_bytes(input: &[u8], order: HashOrder) -> Result<Self, HashError> {
        let mut bytes: [u8; HASH_SIZE] = input
            .try_into()
            .map_err(|_| HashError::Length(input.len()))?;
        if order == HashOrder::Display {
            bytes.reverse();
        }
        Ok(Hash(bytes))
    }

    /// Construct a hash from its display hex string, with or without `0x`.
    pub fn from_hex(input: &str) -> Result<Self, HashError> {
        let digits = input.strip_prefix("0x").unwrap_or(input);
        if digits.len() != HASH_SIZE * 2 {
            return Err(HashError::Length(digits.len() / 2));
        }
        let bytes = hex::decode(digits)?;
        Self::from_bytes(&bytes, HashOrder::Display)
    }

    /// The bytes in internal order.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// The bytes in display order.
    pub fn to_display_bytes(&self) -> [u8; HASH_SIZE] {
        let mut reversed = self.0;
        reversed.reverse();
        reversed
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_display_bytes()))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

/// Hashers compute (not construct) hashes from arbitrary byte sequences.
pub trait Hasher {
    fn hash(&self, input: &[u8]) -> Hash;
}

/// Double SHA256, the primary chain hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256d;

impl Hasher for Sha256d {
    fn hash(&self, input: &[u8]) -> Hash {
        double_sha256(input)
    }
}

/// scrypt with Litecoin proof-of-work constants.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scrypt;

impl Hasher for Scrypt {
    fn hash(&self, input: &[u8]) -> Hash {
        scrypt_hash(input)
    }
}

/// Bitcoin's double SHA256: SHA256(SHA256(data)).
#[inline]
pub fn double_sha256(data: &[u8]) -> Hash {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    Hash(second.into())
}

/// scrypt(N=1024, r=1, p=1) of `data`, salted with itself.
pub fn scrypt_hash(data: &[u8]) -> Hash {
    let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, HASH_SIZE)
        .expect("constant scrypt parameters are valid");
    let mut output = [0u8; HASH_SIZE];
    scrypt::scrypt(data, data, &params, &mut output)
        .expect("output buffer matches the configured scrypt length");
    Hash(output)
}
