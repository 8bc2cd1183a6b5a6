//! Compact target, full target and difficulty conversion.
//!
//! The compact ("bits") format is: [length (1 byte)][mantissa (3 bytes)].
//! The full target is a big-endian integer of `length` bytes whose leading
//! bytes are the mantissa and whose remaining bytes are zero.

use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero};
use thiserror::Error;

/// Compact target representing a difficulty of exactly 1.0.
pub const DIFF1_BITS: u32 = 0x1d00ffff;

/// Errors converting between targets and difficulties.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TargetError {
    /// Compact target expands to zero, so no difficulty exists
    #[error("compact target {0:#010x} expands to a zero target")]
    ZeroTarget(u32),
    /// Difficulty was zero, negative, NaN or infinite
    #[error("invalid difficulty {0}")]
    InvalidDifficulty(f64),
    /// Full target needs more bytes than a compact length byte can express
    #[error("target of {0} bytes does not fit a compact length byte")]
    Overflow(usize),
    /// Difficulty ratio cannot be represented as a float
    #[error("difficulty for {0:#010x} is not representable as a float")]
    Unrepresentable(u32),
}

/// Convert a compact target to its full-length form.
///
/// Lengths below 3 keep only the first `length` mantissa bytes.
pub fn bits_to_target(bits: u32) -> BigUint {
    let [length, m0, m1, m2] = bits.to_be_bytes();
    let length = length as usize;
    let mantissa = [m0, m1, m2];

    let mut full = vec![0u8; length];
    let n = length.min(mantissa.len());
    full[..n].copy_from_slice(&mantissa[..n]);

    BigUint::from_bytes_be(&full)
}

/// Convert a full-length target back to compact form.
///
/// The mantissa is truncated to 3 bytes; any further significant bytes are
/// silently dropped, which is the wire-compatible behaviour.
pub fn target_to_bits(target: &BigUint) -> Result<u32, TargetError> {
    if target.is_zero() {
        return Ok(0);
    }

    let mut magnitude = target.to_bytes_be();
    // A set high bit would read as a sign, so pad with a zero byte
    if magnitude[0] > 0x7f {
        magnitude.insert(0, 0x00);
    }

    let length = u8::try_from(magnitude.len()).map_err(|_| TargetError::Overflow(magnitude.len()))?;

    let mut compact = [length, 0, 0, 0];
    let n = magnitude.len().min(3);
    compact[1..1 + n].copy_from_slice(&magnitude[..n]);

    Ok(u32::from_be_bytes(compact))
}

/// Calculate the difficulty of a compact target.
///
/// Difficulty = full(DIFF1_BITS) / full(bits), computed as an exact rational
/// and only then converted to a float.
pub fn bits_to_difficulty(bits: u32) -> Result<f64, TargetError> {
    let target = bits_to_target(bits);
    if target.is_zero() {
        return Err(TargetError::ZeroTarget(bits));
    }

    let ratio = BigRational::new(
        BigInt::from(bits_to_target(DIFF1_BITS)),
        BigInt::from(target),
    );
    ratio.to_f64().ok_or(TargetError::Unrepresentable(bits))
}

/// Calculate the compact target for a difficulty.
///
/// The inverse of [`bits_to_difficulty`]: the exact quotient
/// full(DIFF1_BITS) / difficulty is floored to an integer and compacted.
pub fn difficulty_to_bits(difficulty: f64) -> Result<u32, TargetError> {
    if !difficulty.is_finite() || difficulty <= 0.0 {
        return Err(TargetError::InvalidDifficulty(difficulty));
    }
    let factor = BigRational::from_float(difficulty).ok_or(TargetError::InvalidDifficulty(difficulty))?;
    let base = BigRational::from_integer(BigInt::from(bits_to_target(DIFF1_BITS)));

    let target = (base / factor).floor().to_integer();
    let target = target.to_biguint().ok_or(TargetError::InvalidDifficulty(difficulty))?;

    target_to_bits(&target)
}
