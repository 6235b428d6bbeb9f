// SHA-256 and Keccak-256 hashing utilities

use alloy_primitives::keccak256;
use sha2::{Digest, Sha256};

/// Computes the SHA-256 hash of the input bytes and returns it as a lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Computes the Keccak-256 hash of the input bytes as a `0x`-prefixed lowercase hex string.
///
/// This is the EVM-native digest, so values produced here can be passed
/// straight into `bytes32` contract arguments.
pub fn keccak256_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(keccak256(bytes)))
}
