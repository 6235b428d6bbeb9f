//! Hex payload normalization for contract arguments.
//!
//! Proof material arrives from the DA layer and from browsers as hex
//! strings, sometimes with a `0x` prefix and sometimes without.

/// Errors raised while decoding hex contract arguments.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HexError {
    #[error("invalid hex in {field}: {reason}")]
    InvalidHex { field: &'static str, reason: String },

    #[error("{field} is {len} bytes, exceeds bytes32")]
    TooLong { field: &'static str, len: usize },
}

/// Removes a single leading `0x`/`0X` if present.
pub fn strip_0x(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// Decodes a hex string (with or without `0x`) into raw bytes.
pub fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>, HexError> {
    hex::decode(strip_0x(value.trim())).map_err(|e| HexError::InvalidHex {
        field,
        reason: e.to_string(),
    })
}

/// Decodes a hex string into a `bytes32` word.
///
/// Shorter values are right-padded with zeros, matching how EVM tooling
/// encodes `bytesN`. Longer values are rejected.
pub fn to_bytes32(field: &'static str, value: &str) -> Result<[u8; 32], HexError> {
    let bytes = decode_hex(field, value)?;
    if bytes.len() > 32 {
        return Err(HexError::TooLong {
            field,
            len: bytes.len(),
        });
    }

    let mut word = [0u8; 32];
    word[..bytes.len()].copy_from_slice(&bytes);
    Ok(word)
}
