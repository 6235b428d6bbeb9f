//! Client-side correlation identifiers.
//!
//! `generate_request_id` hashes a data request so a browser and the
//! backend can refer to the same purchase before anything reaches the
//! chain. It is NOT the `requestId` assigned by the hub contract when an
//! attestation is requested; the two are never reconciled.

use anyhow::Result;
use serde::Serialize;

use crate::hash::{keccak256_hex, sha256_hex};
use crate::jcs::jcs_canonical_bytes;

/// Deterministic Keccak-256 of the canonical (key-sorted) JSON form of `payload`.
///
/// Identical maps produce identical ids regardless of key insertion order.
/// The hashed form is compact RFC 8785 JSON (no spaces after `:` or `,`),
/// so ids are not byte-compatible with ids hashed from sorted-key JSON
/// that separates items with `", "` and `": "`.
pub fn generate_request_id<T: Serialize>(payload: &T) -> Result<String> {
    let canonical = jcs_canonical_bytes(payload)?;
    Ok(keccak256_hex(&canonical))
}

/// SHA-256 of the canonical JSON form of scene metadata.
///
/// Used as the `parameters` string of an attestation request so the
/// attestation commits to exactly the metadata the buyer saw.
pub fn metadata_digest<T: Serialize>(metadata: &T) -> Result<String> {
    let canonical = jcs_canonical_bytes(metadata)?;
    Ok(sha256_hex(&canonical))
}
