//! Wire types for the attestation endpoints.
//!
//! Request bodies keep the snake_case field names browsers already send;
//! responses are camelCase. Request fields are optional so a handler can
//! report exactly which one is missing.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/blockchain/request-attestation`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestAttestationBody {
    /// Attestation type, e.g. "satellite.observation".
    pub attestation_type: Option<String>,
    /// Opaque parameters string, typically a metadata digest.
    pub parameters: Option<String>,
}

/// Body shared by the verify and deliver endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProofBody {
    pub request_id: Option<String>,
    pub attestation_response: Option<String>,
    pub proof: Option<String>,
}

/// Body of `POST /api/blockchain/generate-request-id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequestIdBody {
    pub data_info: Option<serde_json::Value>,
}

/// Result of submitting an attestation request on-chain.
///
/// `request_id` is `None` when the transaction succeeded but no
/// `AttestationRequested` event was found in the receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationSubmission {
    pub success: bool,
    pub transaction_hash: String,
    pub request_id: Option<String>,
}

/// Proof material returned by the data-availability layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationProof {
    /// Hex-encoded attestation response.
    pub attestation_response: String,
    /// Hex-encoded Merkle proof.
    pub proof: String,
}

/// Successful fetch of a proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedProof {
    pub success: bool,
    #[serde(flatten)]
    pub proof: AttestationProof,
}

/// The DA layer has no result for this request yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAttestation {
    pub success: bool,
    /// Always "pending".
    pub status: String,
    pub request_id: String,
}

impl PendingAttestation {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            success: false,
            status: "pending".to_string(),
            request_id: request_id.into(),
        }
    }
}

/// Result of the read-only verification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub success: bool,
    pub verified: bool,
}

/// Result of delivering proven data on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    pub success: bool,
    pub transaction_hash: String,
}

/// Response of the request-id generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRequestId {
    pub success: bool,
    pub request_id: String,
}

/// Chain configuration exposed to browsers and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfigView {
    pub rpc_url: String,
    pub data_purchase_contract_address: Option<String>,
    pub fdc_hub_address: Option<String>,
    pub fdc_verification_address: Option<String>,
    pub da_layer_api: String,
}

/// Error payload returned by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub details: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_uses_snake_case() {
        let body: RequestAttestationBody = serde_json::from_str(
            r#"{"attestation_type": "satellite.observation", "parameters": "Copernicus-L2A-Hash"}"#,
        )
        .unwrap();
        assert_eq!(body.attestation_type.as_deref(), Some("satellite.observation"));
        assert_eq!(body.parameters.as_deref(), Some("Copernicus-L2A-Hash"));
    }

    #[test]
    fn test_missing_fields_deserialize_as_none() {
        let body: ProofBody = serde_json::from_str(r#"{"request_id": "0x01"}"#).unwrap();
        assert!(body.attestation_response.is_none());
        assert!(body.proof.is_none());
    }

    #[test]
    fn test_submission_serializes_null_request_id() {
        let submission = AttestationSubmission {
            success: true,
            transaction_hash: "0xabc".to_string(),
            request_id: None,
        };
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["transactionHash"], "0xabc");
        assert!(json["requestId"].is_null());
    }

    #[test]
    fn test_fetched_proof_is_flat() {
        let fetched = FetchedProof {
            success: true,
            proof: AttestationProof {
                attestation_response: "0x01".to_string(),
                proof: "0x02".to_string(),
            },
        };
        let json = serde_json::to_value(&fetched).unwrap();
        assert_eq!(json["attestationResponse"], "0x01");
        assert_eq!(json["proof"], "0x02");
        assert_eq!(json["success"], true);
    }

    #[test]
    fn test_pending_shape() {
        let json = serde_json::to_value(PendingAttestation::new("abc")).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["requestId"], "abc");
        assert_eq!(json["success"], false);
    }
}
