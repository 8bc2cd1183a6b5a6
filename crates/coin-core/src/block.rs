//! Block header construction and serialization.

use std::io::{self, Write};

use crate::codec::{write_bytes, write_varint};
use crate::hash::{Hash, Hasher, Sha256d};
use crate::merkle::merkle_root;
use crate::tx::Transaction;

/// Size of a serialized block header in bytes.
pub const HEADER_SIZE: usize = 80;

/// A block: header fields plus an ordered list of transactions.
///
/// The merkle root is computed from the transactions unless one has been set
/// explicitly with [`Block::with_merkle_root`]. A set root is a cache that is
/// never invalidated: transactions added afterwards do not change the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block format version.
    pub version: u32,
    /// Hash of the previous block (internal byte order).
    pub prev_block_hash: Hash,
    /// Block timestamp (Unix time).
    pub timestamp: u32,
    /// Difficulty target in compact "bits" format.
    pub bits: u32,
    /// Nonce for proof of work.
    pub nonce: u32,
    merkle_root: Option<Hash>,
    txs: Vec<Transaction>,
}

impl Block {
    /// Create a new block with no transactions.
    pub fn new(version: u32, bits: u32, nonce: u32, prev_block_hash: Hash, timestamp: u32) -> Self {
        Block {
            version,
            prev_block_hash,
            timestamp,
            bits,
            nonce,
            merkle_root: None,
            txs: Vec::with_capacity(1),
        }
    }

    /// Append a transaction to the end of the block.
    pub fn with_tx(mut self, tx: Transaction) -> Self {
        self.push_tx(tx);
        self
    }

    /// Append a transaction in place.
    pub fn push_tx(&mut self, tx: Transaction) {
        self.txs.push(tx);
    }

    /// Pin the merkle root used in the header.
    pub fn with_merkle_root(mut self, root: Hash) -> Self {
        self.merkle_root = Some(root);
        self
    }

    /// The transactions in block order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.txs
    }

    /// The pinned merkle root, if any.
    pub fn cached_merkle_root(&self) -> Option<Hash> {
        self.merkle_root
    }

    /// Compute the merkle root from the current transactions.
    ///
    /// Each transaction is hashed once with double SHA256 and the hashes are
    /// folded into a tree. No transactions gives the all-zero hash.
    pub fn merkle_root(&self) -> Hash {
        let txids: Vec<Hash> = self.txs.iter().map(|tx| Sha256d.hash(&tx.to_bytes())).collect();
        merkle_root(&txids, &Sha256d)
    }

    /// Merkle root as written in the header: the pinned one or a fresh one.
    fn header_merkle_root(&self) -> Hash {
        self.merkle_root.unwrap_or_else(|| self.merkle_root())
    }

    /// Serialize the block header to 80 bytes.
    pub fn header(&self) -> [u8; HEADER_SIZE] {
        let mut header = [0u8; HEADER_SIZE];

        header[0..4].copy_from_slice(&self.version.to_le_bytes());
        header[4..36].copy_from_slice(self.prev_block_hash.as_bytes());
        header[36..68].copy_from_slice(self.header_merkle_root().as_bytes());
        header[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        header[72..76].copy_from_slice(&self.bits.to_le_bytes());
        header[76..80].copy_from_slice(&self.nonce.to_le_bytes());

        header
    }

    /// Write the header, returning the number of bytes written.
    pub fn write_header<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<usize> {
        write_bytes(out, &self.header())
    }

    /// Write the entire block, returning the number of bytes written.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<usize> {
        let mut count = self.write_header(out)?;
        count += write_varint(out, self.txs.len() as u64)?;
        for tx in &self.txs {
            count += tx.write_to(out)?;
        }
        Ok(count)
    }

    /// Get the serialization of the entire block.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(HEADER_SIZE + 1);
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut raw);
        raw
    }

    /// Compute the block hash (double SHA256 of the header).
    pub fn hash(&self) -> Hash {
        self.hash_with(&Sha256d)
    }

    /// Hash the header with an arbitrary hasher, e.g. scrypt proof of work.
    pub fn hash_with<H: Hasher + ?Sized>(&self, hasher: &H) -> Hash {
        hasher.hash(&self.header())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{double_sha256, Scrypt};

    const BITCOIN_GENESIS_MERKLE: &str =
        "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";

    fn bitcoin_genesis_header_block() -> Block {
        Block::new(1, 0x1d00ffff, 2083236893, Hash::ZERO, 1231006505)
            .with_merkle_root(Hash::from_hex(BITCOIN_GENESIS_MERKLE).unwrap())
    }

    #[test]
    fn test_bitcoin_genesis_hash() {
        let block = bitcoin_genesis_header_block();
        assert_eq!(
            block.hash().to_string(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }

    #[test]
    fn test_header_layout() {
        let block = Block::new(2, 0x1e0ffff0, 0x01020304, Hash::new([0x11; 32]), 0x0a0b0c0d)
            .with_merkle_root(Hash::new([0x22; 32]));
        let header = block.header();

        assert_eq!(header.len(), HEADER_SIZE);
        assert_eq!(&header[0..4], &[0x02, 0x00, 0x00, 0x00]);
        assert_eq!(&header[4..36], &[0x11; 32]);
        assert_eq!(&header[36..68], &[0x22; 32]);
        assert_eq!(&header[68..72], &[0x0d, 0x0c, 0x0b, 0x0a]);
        assert_eq!(&header[72..76], &[0xf0, 0xff, 0x0f, 0x1e]);
        assert_eq!(&header[76..80], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_empty_block_merkle_root_is_zero() {
        let block = Block::new(1, 0x1d00ffff, 0, Hash::ZERO, 0);
        assert_eq!(block.merkle_root(), Hash::ZERO);
        assert_eq!(&block.header()[36..68], &[0u8; 32]);
    }

    #[test]
    fn test_single_tx_merkle_root_is_txid() {
        let tx = Transaction::new().with_output(1, &[0xac]);
        let block = Block::new(1, 0x1d00ffff, 0, Hash::ZERO, 0).with_tx(tx.clone());

        assert_eq!(block.merkle_root(), double_sha256(&tx.to_bytes()));
    }

    #[test]
    fn test_cached_merkle_root_is_not_invalidated() {
        let pinned = Hash::new([0x77; 32]);
        let mut block = Block::new(1, 0x1d00ffff, 0, Hash::ZERO, 0).with_merkle_root(pinned);
        let before = block.header();

        block.push_tx(Transaction::new().with_output(1, &[0xac]));

        assert_eq!(block.header(), before);
        assert_eq!(block.cached_merkle_root(), Some(pinned));
        assert_ne!(block.merkle_root(), pinned);
    }

    #[test]
    fn test_full_block_serialization() {
        let tx = Transaction::new().with_output(1, &[0xac]);
        let block = Block::new(1, 0x1d00ffff, 0, Hash::ZERO, 0).with_tx(tx.clone());
        let raw = block.to_bytes();

        assert_eq!(&raw[..HEADER_SIZE], &block.header());
        assert_eq!(raw[HEADER_SIZE], 0x01);
        assert_eq!(&raw[HEADER_SIZE + 1..], tx.to_bytes().as_slice());

        let mut out = Vec::new();
        assert_eq!(block.write_to(&mut out).unwrap(), raw.len());
    }

    #[test]
    fn test_hash_with_scrypt() {
        let block = bitcoin_genesis_header_block();
        assert_eq!(block.hash_with(&Scrypt), Scrypt.hash(&block.header()));
        assert_ne!(block.hash_with(&Scrypt), block.hash());
    }
}
