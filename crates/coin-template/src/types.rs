//! Value producer registry.
//!
//! Every substitution field has a type that turns the user's input string
//! (plus the values of the fields it depends on) into the literal text that
//! ends up in the generated source. The set of types is closed.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use coin_core::tx::{COMPRESSED_PUBKEY_LEN, PUBKEY_LEN};
use coin_core::{
    difficulty_to_bits, Block, GenesisBuilder, GenesisError, Hash, HashError, TargetError, COIN,
    COIN_PRECISION, DIFF1_BITS, HASH_SIZE,
};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use rand::Rng;
use thiserror::Error;

/// Longest accepted `str` value in bytes.
pub const MAX_STR_LEN: usize = 256;
/// Block version used when hashing a genesis header.
const GENESIS_HEADER_VERSION: u32 = 1;
/// Supply multiplier of a halving schedule (1 + 1/2 + 1/4 + ...).
const GEO_FACTOR: i64 = 2;

/// Errors producing a field value.
#[derive(Debug, Error)]
pub enum ProduceError {
    #[error("wrong arity for type {type_name}: expected {expected} inputs, got {got}")]
    WrongArity {
        type_name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("value {0:?} overflows its type")]
    Overflow(String),
    #[error("illegal characters in string")]
    IllegalCharacter,
    #[error("string too long: {0} bytes (max {MAX_STR_LEN})")]
    TooLong(usize),
    #[error("bad length for public key: {0} bytes")]
    BadPubkeyLength(usize),
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error(transparent)]
    Target(#[from] TargetError),
    #[error(transparent)]
    Genesis(#[from] GenesisError),
}

/// A field type: converts input strings into a source code literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Accepts any input unchanged.
    Literal,
    Byte,
    /// Unsigned values below 0x80.
    SevenBit,
    Uint16,
    Uint32,
    Uint64,
    Int32,
    Int64,
    Double,
    /// Printable ASCII without quotes or backslashes.
    Str,
    /// Unaccented latin letters only.
    StrAlpha,
    StrAlphaLower,
    StrAlphaUpper,
    RandomUint32,
    /// Floating coin amount to integer value units.
    Coins,
    /// Floating difficulty to compact target.
    Difficulty,
    /// Hex-encoded compressed or uncompressed public key.
    Pubkey,
    RandomPubkey,
    RandomHash,
    UnixtimeCurrent,
    /// Genesis merkle root from coin value, message and public key.
    GenesisMerkleRoot,
    /// Genesis block hash from timestamp, bits, nonce and merkle root.
    GenesisBlockHash,
    /// Total supply from initial reward and halving interval.
    CoinsMax,
    /// Value units to a decimal coin amount.
    DoubleCoins,
}

impl ValueType {
    /// Every type, in table order.
    pub const ALL: [ValueType; 24] = [
        ValueType::Literal,
        ValueType::Byte,
        ValueType::SevenBit,
        ValueType::Uint16,
        ValueType::Uint32,
        ValueType::Uint64,
        ValueType::Int32,
        ValueType::Int64,
        ValueType::Double,
        ValueType::Str,
        ValueType::StrAlpha,
        ValueType::StrAlphaLower,
        ValueType::StrAlphaUpper,
        ValueType::RandomUint32,
        ValueType::Coins,
        ValueType::Difficulty,
        ValueType::Pubkey,
        ValueType::RandomPubkey,
        ValueType::RandomHash,
        ValueType::UnixtimeCurrent,
        ValueType::GenesisMerkleRoot,
        ValueType::GenesisBlockHash,
        ValueType::CoinsMax,
        ValueType::DoubleCoins,
    ];

    /// Look up a type by its metadata name. The empty name means `literal`.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.is_empty() {
            return Some(ValueType::Literal);
        }
        Self::ALL.into_iter().find(|ty| ty.name() == name)
    }

    /// Metadata name of the type.
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Literal => "literal",
            ValueType::Byte => "byte",
            ValueType::SevenBit => "7bit",
            ValueType::Uint16 => "uint16",
            ValueType::Uint32 => "uint32",
            ValueType::Uint64 => "uint64",
            ValueType::Int32 => "int32",
            ValueType::Int64 => "int64",
            ValueType::Double => "double",
            ValueType::Str => "str",
            ValueType::StrAlpha => "str-alpha",
            ValueType::StrAlphaLower => "str-alpha-lower",
            ValueType::StrAlphaUpper => "str-alpha-upper",
            ValueType::RandomUint32 => "random-uint32",
            ValueType::Coins => "coins",
            ValueType::Difficulty => "difficulty",
            ValueType::Pubkey => "pubkey",
            ValueType::RandomPubkey => "random-pubkey",
            ValueType::RandomHash => "random-hash",
            ValueType::UnixtimeCurrent => "unixtime-current",
            ValueType::GenesisMerkleRoot => "genesis-merkle-root",
            ValueType::GenesisBlockHash => "genesis-block-hash",
            ValueType::CoinsMax => "coins-max",
            ValueType::DoubleCoins => "double-coins",
        }
    }

    /// Number of inputs the type takes, or `None` if it ignores them.
    pub fn arity(&self) -> Option<usize> {
        match self {
            ValueType::RandomUint32
            | ValueType::RandomPubkey
            | ValueType::RandomHash
            | ValueType::UnixtimeCurrent => None,
            ValueType::GenesisMerkleRoot => Some(4),
            ValueType::GenesisBlockHash => Some(5),
            ValueType::CoinsMax => Some(3),
            ValueType::DoubleCoins => Some(2),
            _ => Some(1),
        }
    }

    /// Produce the field value.
    ///
    /// `inputs[0]` is the field's own input; the rest are the values of its
    /// dependencies in declaration order.
    pub fn produce(&self, inputs: &[String]) -> Result<String, ProduceError> {
        if let Some(expected) = self.arity() {
            if inputs.len() != expected {
                return Err(ProduceError::WrongArity {
                    type_name: self.name(),
                    expected,
                    got: inputs.len(),
                });
            }
        }

        match self {
            ValueType::Literal => Ok(inputs[0].clone()),
            ValueType::Byte => Ok(parse_uint(&inputs[0], 8)?.to_string()),
            ValueType::SevenBit => Ok(parse_uint(&inputs[0], 7)?.to_string()),
            ValueType::Uint16 => Ok(parse_uint(&inputs[0], 16)?.to_string()),
            ValueType::Uint32 => Ok(parse_uint(&inputs[0], 32)?.to_string()),
            ValueType::Uint64 => Ok(parse_uint(&inputs[0], 64)?.to_string()),
            ValueType::Int32 => Ok(parse_int(&inputs[0], 32)?.to_string()),
            ValueType::Int64 => Ok(parse_int(&inputs[0], 64)?.to_string()),
            ValueType::Double => Ok(parse_float(&inputs[0])?.to_string()),
            ValueType::Str => check_str(&inputs[0]).map(str::to_owned),
            ValueType::StrAlpha => check_str_alpha(&inputs[0]).map(str::to_owned),
            ValueType::StrAlphaLower => Ok(check_str_alpha(&inputs[0])?.to_ascii_lowercase()),
            ValueType::StrAlphaUpper => Ok(check_str_alpha(&inputs[0])?.to_ascii_uppercase()),
            ValueType::RandomUint32 => Ok(rand::random::<u32>().to_string()),
            ValueType::Coins => coins(&inputs[0]),
            ValueType::Difficulty => Ok(difficulty_to_bits(parse_float(&inputs[0])?)?.to_string()),
            ValueType::Pubkey => pubkey(&inputs[0]),
            ValueType::RandomPubkey => Ok(random_hex(PUBKEY_LEN)),
            ValueType::RandomHash => Ok(random_hex(HASH_SIZE)),
            ValueType::UnixtimeCurrent => Ok(unix_now().to_string()),
            ValueType::GenesisMerkleRoot => genesis_merkle_root(&inputs[1], &inputs[2], &inputs[3]),
            ValueType::GenesisBlockHash => {
                genesis_block_hash(&inputs[1], &inputs[2], &inputs[3], &inputs[4])
            }
            ValueType::CoinsMax => coins_max(&inputs[1], &inputs[2]),
            ValueType::DoubleCoins => double_coins(&inputs[1]),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Split a radix prefix off an unsigned literal: `0x`, `0b`, `0o` or a bare
/// leading `0` for octal.
fn split_radix(literal: &str) -> (u32, &str) {
    let lower = literal.get(..2).map(str::to_ascii_lowercase);
    match lower.as_deref() {
        Some("0x") => (16, &literal[2..]),
        Some("0b") => (2, &literal[2..]),
        Some("0o") => (8, &literal[2..]),
        _ if literal.len() > 1 && literal.starts_with('0') => (8, &literal[1..]),
        _ => (10, literal),
    }
}

fn parse_magnitude(input: &str) -> Result<u64, ProduceError> {
    let (radix, digits) = split_radix(input);
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(ProduceError::InvalidNumber(input.to_owned()));
    }
    u64::from_str_radix(digits, radix).map_err(|_| ProduceError::Overflow(input.to_owned()))
}

fn parse_uint(input: &str, bits: u32) -> Result<u64, ProduceError> {
    let value = parse_magnitude(input)?;
    if bits < 64 && value >> bits != 0 {
        return Err(ProduceError::Overflow(input.to_owned()));
    }
    Ok(value)
}

fn parse_int(input: &str, bits: u32) -> Result<i64, ProduceError> {
    let (negative, unsigned) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };
    let magnitude = i128::from(parse_magnitude(unsigned)?);
    let value = if negative { -magnitude } else { magnitude };

    let limit = 1i128 << (bits - 1);
    if value < -limit || value >= limit {
        return Err(ProduceError::Overflow(input.to_owned()));
    }
    Ok(value as i64)
}

fn parse_float(input: &str) -> Result<f64, ProduceError> {
    match input.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ProduceError::InvalidNumber(input.to_owned())),
    }
}

fn check_str(input: &str) -> Result<&str, ProduceError> {
    if input.len() > MAX_STR_LEN {
        return Err(ProduceError::TooLong(input.len()));
    }
    let legal = |b: &u8| (0x20..=0x7e).contains(b) && !matches!(*b, b'"' | b'\\' | b'\'');
    if !input.as_bytes().iter().all(legal) {
        return Err(ProduceError::IllegalCharacter);
    }
    Ok(input)
}

fn check_str_alpha(input: &str) -> Result<&str, ProduceError> {
    check_str(input)?;
    if !input.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(ProduceError::IllegalCharacter);
    }
    Ok(input)
}

fn coins(input: &str) -> Result<String, ProduceError> {
    let value = parse_float(input)?;
    let max_coins = (i64::MAX as u64 / COIN) as f64;
    if !(0.0..=max_coins).contains(&value) {
        return Err(ProduceError::Overflow(input.to_owned()));
    }
    let units = (COIN as f64 * value) as i64;
    Ok(units.to_string())
}

fn pubkey(input: &str) -> Result<String, ProduceError> {
    let raw = hex::decode(input.strip_prefix("0x").unwrap_or(input))?;
    if raw.len() != PUBKEY_LEN && raw.len() != COMPRESSED_PUBKEY_LEN {
        return Err(ProduceError::BadPubkeyLength(raw.len()));
    }
    Ok(hex::encode(raw))
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

fn parse_decimal<T: std::str::FromStr>(input: &str) -> Result<T, ProduceError> {
    input.parse().map_err(|_| ProduceError::InvalidNumber(input.to_owned()))
}

/// Merkle root (display hex) of a difficulty-1 genesis block.
fn genesis_merkle_root(value: &str, message: &str, pubkey: &str) -> Result<String, ProduceError> {
    let value: u64 = parse_decimal(value)?;
    let pubkey = hex::decode(pubkey)?;

    let block = GenesisBuilder::new(value, message, pubkey).with_bits(DIFF1_BITS).build()?;
    Ok(block.merkle_root().to_string())
}

/// Genesis header hash (display hex) with a pinned merkle root.
fn genesis_block_hash(timestamp: &str, bits: &str, nonce: &str, merkle: &str) -> Result<String, ProduceError> {
    let timestamp: u32 = parse_decimal(timestamp)?;
    let bits: u32 = parse_decimal(bits)?;
    let nonce: u32 = parse_decimal(nonce)?;
    let merkle = Hash::from_hex(merkle)?;

    let block = Block::new(GENESIS_HEADER_VERSION, bits, nonce, Hash::ZERO, timestamp).with_merkle_root(merkle);
    Ok(block.hash().to_string())
}

fn coins_max(reward: &str, interval: &str) -> Result<String, ProduceError> {
    let reward: i64 = parse_decimal(reward)?;
    let interval: i32 = parse_decimal(interval)?;

    reward
        .checked_mul(i64::from(interval))
        .and_then(|total| total.checked_mul(GEO_FACTOR))
        .map(|total| total.to_string())
        .ok_or_else(|| ProduceError::Overflow(format!("{reward} * {interval}")))
}

/// Parse an exact rational: `a/b`, a decimal fraction, or an integer.
fn parse_rational(input: &str) -> Result<BigRational, ProduceError> {
    let invalid = || ProduceError::InvalidNumber(input.to_owned());
    let int = |s: &str| s.parse::<BigInt>().map_err(|_| invalid());

    if let Some((numer, denom)) = input.split_once('/') {
        let denom = int(denom)?;
        if denom.is_zero() {
            return Err(invalid());
        }
        return Ok(BigRational::new(int(numer)?, denom));
    }

    let (whole, frac) = input.split_once('.').unwrap_or((input, ""));
    if !frac.bytes().all(|b| b.is_ascii_digit()) || (whole.is_empty() && frac.is_empty()) {
        return Err(invalid());
    }
    let (negative, whole) = match whole.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, whole.strip_prefix('+').unwrap_or(whole)),
    };
    if !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let digits = format!("{}{}", if whole.is_empty() { "0" } else { whole }, frac);
    let mut value = BigRational::new(int(&digits)?, BigInt::from(10u32).pow(frac.len() as u32));
    if negative {
        value = -value;
    }
    Ok(value)
}

/// Render a rational with a fixed number of decimals, halves away from zero.
fn format_fixed(value: &BigRational, places: usize) -> String {
    let scale = BigInt::from(10u32).pow(places as u32);
    let scaled = (value * BigRational::from_integer(scale)).round().to_integer();

    let digits = format!("{:0>width$}", scaled.abs().to_string(), width = places + 1);
    let (whole, frac) = digits.split_at(digits.len() - places);
    let sign = if scaled.is_negative() { "-" } else { "" };
    format!("{sign}{whole}.{frac}")
}

fn double_coins(units: &str) -> Result<String, ProduceError> {
    let units = parse_rational(units)?;
    let coins = units / BigRational::from_integer(BigInt::from(COIN));
    Ok(format_fixed(&coins, COIN_PRECISION))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn produce(ty: ValueType, inputs: &[&str]) -> Result<String, ProduceError> {
        let inputs: Vec<String> = inputs.iter().map(|s| s.to_string()).collect();
        ty.produce(&inputs)
    }

    const BITCOIN_MESSAGE: &str =
        "The Times 03/Jan/2009 Chancellor on brink of second bailout for banks";
    const BITCOIN_PUBKEY: &str = "04678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb6\
                                  49f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5f";

    #[test]
    fn test_name_table() {
        for ty in ValueType::ALL {
            assert_eq!(ValueType::from_name(ty.name()), Some(ty));
        }
        assert_eq!(ValueType::from_name(""), Some(ValueType::Literal));
        assert_eq!(ValueType::from_name("str-alpha-upper"), Some(ValueType::StrAlphaUpper));
        assert_eq!(ValueType::from_name("uint128"), None);
    }

    #[test]
    fn test_arity_is_checked() {
        let err = produce(ValueType::Uint32, &["1", "2"]).unwrap_err();
        assert!(matches!(err, ProduceError::WrongArity { expected: 1, got: 2, .. }));
        assert!(produce(ValueType::GenesisMerkleRoot, &["", "1", "m"]).is_err());
        assert!(produce(ValueType::GenesisBlockHash, &["", "1", "2", "3"]).is_err());

        // random producers ignore their inputs
        assert!(produce(ValueType::RandomUint32, &[]).is_ok());
        assert!(produce(ValueType::UnixtimeCurrent, &["a", "b"]).is_ok());
    }

    #[test]
    fn test_unsigned_integers() {
        assert_eq!(produce(ValueType::Byte, &["255"]).unwrap(), "255");
        assert_eq!(produce(ValueType::Byte, &["0xff"]).unwrap(), "255");
        assert_eq!(produce(ValueType::Uint16, &["0b101"]).unwrap(), "5");
        assert_eq!(produce(ValueType::Uint32, &["017"]).unwrap(), "15");
        assert_eq!(produce(ValueType::Uint32, &["0o17"]).unwrap(), "15");
        assert_eq!(produce(ValueType::Uint32, &["0"]).unwrap(), "0");
        assert_eq!(produce(ValueType::Uint64, &["18446744073709551615"]).unwrap(), "18446744073709551615");

        assert!(matches!(produce(ValueType::Byte, &["256"]), Err(ProduceError::Overflow(_))));
        assert!(matches!(produce(ValueType::SevenBit, &["0x80"]), Err(ProduceError::Overflow(_))));
        assert_eq!(produce(ValueType::SevenBit, &["0x7f"]).unwrap(), "127");
        assert!(matches!(produce(ValueType::Uint32, &["-1"]), Err(ProduceError::InvalidNumber(_))));
        assert!(matches!(produce(ValueType::Uint32, &["09"]), Err(ProduceError::InvalidNumber(_))));
        assert!(matches!(produce(ValueType::Uint32, &[""]), Err(ProduceError::InvalidNumber(_))));
    }

    #[test]
    fn test_signed_integers() {
        assert_eq!(produce(ValueType::Int32, &["-2147483648"]).unwrap(), "-2147483648");
        assert_eq!(produce(ValueType::Int32, &["-0x10"]).unwrap(), "-16");
        assert_eq!(produce(ValueType::Int64, &["+42"]).unwrap(), "42");
        assert!(matches!(produce(ValueType::Int32, &["2147483648"]), Err(ProduceError::Overflow(_))));
        assert_eq!(produce(ValueType::Int64, &["-9223372036854775808"]).unwrap(), "-9223372036854775808");
    }

    #[test]
    fn test_double() {
        assert_eq!(produce(ValueType::Double, &["1.50"]).unwrap(), "1.5");
        assert_eq!(produce(ValueType::Double, &["2"]).unwrap(), "2");
        assert!(produce(ValueType::Double, &["inf"]).is_err());
        assert!(produce(ValueType::Double, &["one"]).is_err());
    }

    #[test]
    fn test_strings() {
        assert_eq!(produce(ValueType::Str, &["Hello, world!"]).unwrap(), "Hello, world!");
        assert!(matches!(produce(ValueType::Str, &["say \"hi\""]), Err(ProduceError::IllegalCharacter)));
        assert!(matches!(produce(ValueType::Str, &["tab\there"]), Err(ProduceError::IllegalCharacter)));
        let long = "a".repeat(MAX_STR_LEN + 1);
        assert!(matches!(produce(ValueType::Str, &[long.as_str()]), Err(ProduceError::TooLong(257))));

        assert_eq!(produce(ValueType::StrAlpha, &["MixedCase"]).unwrap(), "MixedCase");
        assert!(produce(ValueType::StrAlpha, &["coin2"]).is_err());
        assert_eq!(produce(ValueType::StrAlphaLower, &["MixedCase"]).unwrap(), "mixedcase");
        assert_eq!(produce(ValueType::StrAlphaUpper, &["MixedCase"]).unwrap(), "MIXEDCASE");
    }

    #[test]
    fn test_coins() {
        assert_eq!(produce(ValueType::Coins, &["50"]).unwrap(), "5000000000");
        assert_eq!(produce(ValueType::Coins, &["0.5"]).unwrap(), "50000000");
        assert!(matches!(produce(ValueType::Coins, &["-1"]), Err(ProduceError::Overflow(_))));
        assert!(matches!(produce(ValueType::Coins, &["1e12"]), Err(ProduceError::Overflow(_))));
    }

    #[test]
    fn test_difficulty() {
        assert_eq!(produce(ValueType::Difficulty, &["1"]).unwrap(), DIFF1_BITS.to_string());
        assert_eq!(produce(ValueType::Difficulty, &["112628548.666347"]).unwrap(), 0x19262222u32.to_string());
        assert!(matches!(produce(ValueType::Difficulty, &["0"]), Err(ProduceError::Target(_))));
    }

    #[test]
    fn test_pubkey() {
        let compressed = format!("0x02{}", "AB".repeat(32));
        assert_eq!(produce(ValueType::Pubkey, &[compressed.as_str()]).unwrap(), format!("02{}", "ab".repeat(32)));
        assert_eq!(produce(ValueType::Pubkey, &[BITCOIN_PUBKEY]).unwrap(), BITCOIN_PUBKEY);
        assert!(matches!(produce(ValueType::Pubkey, &["0402"]), Err(ProduceError::BadPubkeyLength(2))));
        assert!(matches!(produce(ValueType::Pubkey, &["zz"]), Err(ProduceError::Hex(_))));
    }

    #[test]
    fn test_random_values() {
        let key = produce(ValueType::RandomPubkey, &[]).unwrap();
        assert_eq!(key.len(), 2 * PUBKEY_LEN);
        let hash = produce(ValueType::RandomHash, &[]).unwrap();
        assert_eq!(hash.len(), 2 * HASH_SIZE);
        assert!(hex::decode(hash).is_ok());
        assert!(produce(ValueType::RandomUint32, &[]).unwrap().parse::<u32>().is_ok());
        assert!(produce(ValueType::UnixtimeCurrent, &[]).unwrap().parse::<u64>().unwrap() > 1_500_000_000);
    }

    #[test]
    fn test_genesis_merkle_root() {
        let root = produce(
            ValueType::GenesisMerkleRoot,
            &["", "5000000000", BITCOIN_MESSAGE, BITCOIN_PUBKEY],
        )
        .unwrap();
        assert_eq!(root, "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b");
    }

    #[test]
    fn test_genesis_block_hash() {
        let hash = produce(
            ValueType::GenesisBlockHash,
            &[
                "",
                "1231006505",
                "486604799",
                "2083236893",
                "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b",
            ],
        )
        .unwrap();
        assert_eq!(hash, "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f");

        let err = produce(ValueType::GenesisBlockHash, &["", "1", "2", "3", "abcd"]).unwrap_err();
        assert!(matches!(err, ProduceError::Hash(HashError::Length(_))));
    }

    #[test]
    fn test_coins_max() {
        assert_eq!(produce(ValueType::CoinsMax, &["", "5000000000", "210000"]).unwrap(), "2100000000000000");
        assert!(matches!(
            produce(ValueType::CoinsMax, &["", "9223372036854775807", "2"]),
            Err(ProduceError::Overflow(_))
        ));
    }

    #[test]
    fn test_double_coins() {
        assert_eq!(produce(ValueType::DoubleCoins, &["", "5000000000"]).unwrap(), "50.00000000");
        assert_eq!(produce(ValueType::DoubleCoins, &["", "1"]).unwrap(), "0.00000001");
        assert_eq!(produce(ValueType::DoubleCoins, &["", "1/2"]).unwrap(), "0.00000001");
        assert_eq!(produce(ValueType::DoubleCoins, &["", "-1/2"]).unwrap(), "-0.00000001");
        assert_eq!(produce(ValueType::DoubleCoins, &["", "123456789.4"]).unwrap(), "1.23456789");
        assert!(produce(ValueType::DoubleCoins, &["", "1/0"]).is_err());
        assert!(produce(ValueType::DoubleCoins, &["", "coins"]).is_err());
    }

    #[test]
    fn test_double_coins_sign() {
        assert_eq!(produce(ValueType::DoubleCoins, &["", "-5"]).unwrap(), "-0.00000005");
        assert_eq!(produce(ValueType::DoubleCoins, &["", "+5"]).unwrap(), "0.00000005");
        for doubled in ["--5", "+-5", "-+5", "++5", "--5.0"] {
            assert!(
                matches!(produce(ValueType::DoubleCoins, &["", doubled]), Err(ProduceError::InvalidNumber(_))),
                "{doubled} accepted"
            );
        }
    }
}
