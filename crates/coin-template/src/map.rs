//! Persisted substitution maps.
//!
//! A resolved [`FilterMap`] is stored as a JSON object of decimal index keys
//! to hex-encoded values, so a generation can be replayed later without
//! resolving its fields again.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::filter::FilterMap;

/// Errors encoding or decoding a persisted map.
#[derive(Debug, Error)]
pub enum MapCodecError {
    #[error("malformed filter map: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad hex value for substitution {index}: {source}")]
    Hex {
        index: u32,
        #[source]
        source: hex::FromHexError,
    },
}

/// Serialize a filter map to bytes.
pub fn encode_filter_map(map: &FilterMap) -> Result<Vec<u8>, MapCodecError> {
    let encoded: BTreeMap<u32, String> = map.iter().map(|(index, value)| (*index, hex::encode(value))).collect();
    Ok(serde_json::to_vec(&encoded)?)
}

/// Deserialize a filter map written by [`encode_filter_map`].
pub fn decode_filter_map(raw: &[u8]) -> Result<FilterMap, MapCodecError> {
    let encoded: BTreeMap<u32, String> = serde_json::from_slice(raw)?;
    encoded
        .into_iter()
        .map(|(index, value)| {
            hex::decode(value)
                .map(|bytes| (index, bytes))
                .map_err(|source| MapCodecError::Hex { index, source })
        })
        .collect()
}
