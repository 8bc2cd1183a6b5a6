//! Transaction construction and serialization.
//!
//! Inputs and outputs are encoded as soon as they are added, so a
//! transaction is an ordered list of immutable pre-encoded blobs.

use std::io::{self, Write};

use crate::codec::{encode_varint, write_bytes, write_u32_le, write_varint};
use crate::hash::Hash;

/// Transaction format version.
pub const TX_VERSION: u32 = 1;
/// Sequence number of a finalized input (other values are nonstandard).
pub const FINAL_SEQUENCE: u32 = 0xffff_ffff;
/// Lock time of an unlocked transaction.
pub const UNLOCKED_TIME: u32 = 0;
/// Length of an uncompressed public key in bytes.
pub const PUBKEY_LEN: usize = 65;
/// Length of a compressed public key in bytes.
pub const COMPRESSED_PUBKEY_LEN: usize = 33;

/// A transaction built from encoded inputs and outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    inputs: Vec<Vec<u8>>,
    outputs: Vec<Vec<u8>>,
}

impl Transaction {
    /// Create an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode an input spending `output_index` of `source` and append it.
    ///
    /// Layout: source hash, output index (LE), varint script length, script,
    /// final sequence.
    pub fn with_input(mut self, source: Hash, output_index: u32, script_sig: &[u8]) -> Self {
        let mut input = Vec::with_capacity(41 + script_sig.len());
        input.extend_from_slice(source.as_bytes());
        input.extend_from_slice(&output_index.to_le_bytes());
        encode_varint(script_sig.len() as u64, &mut input);
        input.extend_from_slice(script_sig);
        input.extend_from_slice(&FINAL_SEQUENCE.to_le_bytes());
        self.inputs.push(input);
        self
    }

    /// Encode an output paying `value` units to `script_pubkey` and append it.
    pub fn with_output(mut self, value: u64, script_pubkey: &[u8]) -> Self {
        let mut output = Vec::with_capacity(9 + script_pubkey.len());
        output.extend_from_slice(&value.to_le_bytes());
        encode_varint(script_pubkey.len() as u64, &mut output);
        output.extend_from_slice(script_pubkey);
        self.outputs.push(output);
        self
    }

    /// Number of inputs.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Number of outputs.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Write the serialized transaction, returning the number of bytes written.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<usize> {
        let mut count = write_u32_le(out, TX_VERSION)?;
        for category in [&self.inputs, &self.outputs] {
            count += write_varint(out, category.len() as u64)?;
            for item in category {
                count += write_bytes(out, item)?;
            }
        }
        count += write_u32_le(out, UNLOCKED_TIME)?;
        Ok(count)
    }

    /// Get the serialized transaction.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.serialized_len());
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut raw);
        raw
    }

    fn serialized_len(&self) -> usize {
        let items: usize = self.inputs.iter().chain(&self.outputs).map(Vec::len).sum();
        8 + 18 + items
    }
}
