//! Genesis block construction.
//!
//! A genesis block holds a single coinbase transaction whose input carries a
//! free-form message and whose only output pays the minted amount to a
//! "push key, check signature" script.

use thiserror::Error;

use crate::block::Block;
use crate::difficulty::{difficulty_to_bits, TargetError, DIFF1_BITS};
use crate::hash::{Hash, Hasher};
use crate::tx::Transaction;

/// Block version used for genesis blocks.
pub const GENESIS_BLOCK_VERSION: u32 = 1;
/// Default genesis header nonce.
pub const GENESIS_NONCE: u32 = 0;
/// Longest permissible coinbase message and output public key.
pub const MAX_DATA_LEN: usize = 75;
/// Script opcode for the checksig operation.
pub const OP_CHECKSIG: u8 = 0xac;
/// Output index spent by a coinbase input.
const COINBASE_OUTPUT_INDEX: u32 = 0xffff_ffff;
/// First coinbase stack item: 0x1d00ffff pushed as 4 bytes.
const COINBASE_BITS_PUSH: u32 = 486_604_799;

/// Genesis construction errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenesisError {
    /// Coinbase message longer than [`MAX_DATA_LEN`]
    #[error("coinbase message too long: {0} bytes (max {MAX_DATA_LEN})")]
    MessageTooLong(usize),
    /// Output public key longer than [`MAX_DATA_LEN`]
    #[error("coinbase pubkey too long: {0} bytes (max {MAX_DATA_LEN})")]
    PubkeyTooLong(usize),
    /// Difficulty could not be turned into a target
    #[error(transparent)]
    Target(#[from] TargetError),
}

/// Builder for genesis blocks.
#[derive(Debug, Clone)]
pub struct GenesisBuilder {
    /// Units minted by the coinbase output.
    value: u64,
    /// Message embedded in the coinbase input.
    message: Vec<u8>,
    /// Public key the minted units are paid to.
    pubkey: Vec<u8>,
    /// Header timestamp (Unix time).
    timestamp: u32,
    /// Header compact target.
    bits: u32,
    /// Header nonce.
    nonce: u32,
}

impl GenesisBuilder {
    /// Create a genesis builder with difficulty 1 and a zero timestamp and nonce.
    pub fn new(value: u64, message: impl AsRef<[u8]>, pubkey: impl AsRef<[u8]>) -> Self {
        GenesisBuilder {
            value,
            message: message.as_ref().to_vec(),
            pubkey: pubkey.as_ref().to_vec(),
            timestamp: 0,
            bits: DIFF1_BITS,
            nonce: GENESIS_NONCE,
        }
    }

    /// Set the header timestamp.
    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the compact target directly.
    pub fn with_bits(mut self, bits: u32) -> Self {
        self.bits = bits;
        self
    }

    /// Set the compact target from a floating difficulty.
    pub fn with_difficulty(mut self, difficulty: f64) -> Result<Self, GenesisError> {
        self.bits = difficulty_to_bits(difficulty)?;
        Ok(self)
    }

    /// Set the header nonce.
    pub fn with_nonce(mut self, nonce: u32) -> Self {
        self.nonce = nonce;
        self
    }

    /// Build the coinbase transaction.
    pub fn transaction(&self) -> Result<Transaction, GenesisError> {
        let script_sig = coinbase_script(&self.message)?;
        let script_pubkey = output_script(&self.pubkey)?;

        Ok(Transaction::new()
            .with_input(Hash::ZERO, COINBASE_OUTPUT_INDEX, &script_sig)
            .with_output(self.value, &script_pubkey))
    }

    /// Build the one-transaction genesis block.
    pub fn build(&self) -> Result<Block, GenesisError> {
        let tx = self.transaction()?;
        Ok(Block::new(GENESIS_BLOCK_VERSION, self.bits, self.nonce, Hash::ZERO, self.timestamp).with_tx(tx))
    }

    /// Shortcut for the genesis block hash when the block itself is not needed.
    pub fn hash(&self) -> Result<Hash, GenesisError> {
        Ok(self.build()?.hash())
    }

    /// Hash the genesis header with an alternate proof-of-work hasher.
    pub fn pow_hash<H: Hasher + ?Sized>(&self, hasher: &H) -> Result<Hash, GenesisError> {
        Ok(self.build()?.hash_with(hasher))
    }
}

/// Build the coinbase input script.
///
/// Layout: push 4 bytes of 0x1d00ffff, push 1 byte of 0x04, then the
/// length-prefixed message.
pub fn coinbase_script(message: &[u8]) -> Result<Vec<u8>, GenesisError> {
    if message.len() > MAX_DATA_LEN {
        return Err(GenesisError::MessageTooLong(message.len()));
    }

    let mut script = Vec::with_capacity(8 + message.len());
    script.push(4);
    script.extend_from_slice(&COINBASE_BITS_PUSH.to_le_bytes());
    script.push(1);
    script.push(4);
    script.push(message.len() as u8);
    script.extend_from_slice(message);

    Ok(script)
}

/// Build the coinbase output script: push the key, then OP_CHECKSIG.
pub fn output_script(pubkey: &[u8]) -> Result<Vec<u8>, GenesisError> {
    if pubkey.len() > MAX_DATA_LEN {
        return Err(GenesisError::PubkeyTooLong(pubkey.len()));
    }

    let mut script = Vec::with_capacity(2 + pubkey.len());
    script.push(pubkey.len() as u8);
    script.extend_from_slice(pubkey);
    script.push(OP_CHECKSIG);

    Ok(script)
}
