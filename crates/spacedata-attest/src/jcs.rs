// JCS (JSON Canonicalization Scheme) - RFC 8785

use anyhow::Result;
use serde::Serialize;

/// Canonicalizes a serializable value according to RFC 8785 (JCS) and returns the UTF-8 bytes.
///
/// Object keys are sorted lexicographically at every depth and no
/// whitespace is emitted, so two payloads with the same content hash
/// identically no matter how their maps were built.
pub fn jcs_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let canonical = serde_jcs::to_string(value)?;
    Ok(canonical.into_bytes())
}
