//! Wire encoding primitives: varints and fixed-width little-endian integers.

use std::io::{self, Write};

/// Encode a variable-length integer (Bitcoin varint) onto a byte vector.
pub fn encode_varint(value: u64, output: &mut Vec<u8>) {
    if value < 0xfd {
        output.push(value as u8);
    } else if value <= 0xffff {
        output.push(0xfd);
        output.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        output.push(0xfe);
        output.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        output.push(0xff);
        output.extend_from_slice(&value.to_le_bytes());
    }
}

/// Get the varint serialization of an integer.
pub fn varint(value: u64) -> Vec<u8> {
    let mut output = Vec::with_capacity(9);
    encode_varint(value, &mut output);
    output
}

/// Write a varint to `out`, returning the number of bytes written.
pub fn write_varint<W: Write + ?Sized>(out: &mut W, value: u64) -> io::Result<usize> {
    let encoded = varint(value);
    out.write_all(&encoded)?;
    Ok(encoded.len())
}

/// Write a little-endian `u32`, returning the number of bytes written.
pub(crate) fn write_u32_le<W: Write + ?Sized>(out: &mut W, value: u32) -> io::Result<usize> {
    out.write_all(&value.to_le_bytes())?;
    Ok(4)
}

/// Write raw bytes, returning the number of bytes written.
pub(crate) fn write_bytes<W: Write + ?Sized>(out: &mut W, bytes: &[u8]) -> io::Result<usize> {
    out.write_all(bytes)?;
    Ok(bytes.len())
}
