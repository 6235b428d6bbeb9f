//! Attestation orchestration: on-chain request, off-chain proof fetch,
//! on-chain verification and data delivery.

pub mod contracts;
pub mod da;
pub mod evm;

use std::sync::Arc;

use alloy::primitives::{Bytes, B256};
use async_trait::async_trait;
use spacedata_attest::{decode_hex, to_bytes32, AttestationSubmission, ChainConfigView, HexError};

use crate::config::ChainConfig;

pub use da::{DataAvailabilityClient, FetchOutcome};
pub use evm::EvmLedger;

#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    #[error("{0}")]
    NotConfigured(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Transaction reverted: {0}")]
    Reverted(String),
}

impl From<HexError> for AttestationError {
    fn from(err: HexError) -> Self {
        AttestationError::InvalidInput(err.to_string())
    }
}

/// Decoded arguments shared by `verifyAttestation` and `deliverData`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofArgs {
    pub request_id: B256,
    pub attestation_response: B256,
    pub proof: Bytes,
}

impl ProofArgs {
    /// Decodes hex inputs, each with or without a `0x` prefix.
    pub fn decode(request_id: &str, attestation_response: &str, proof: &str) -> Result<Self, AttestationError> {
        Ok(Self {
            request_id: B256::from(to_bytes32("request_id", request_id)?),
            attestation_response: B256::from(to_bytes32(
                "attestation_response",
                attestation_response,
            )?),
            proof: Bytes::from(decode_hex("proof", proof)?),
        })
    }
}

/// The on-chain half of the attestation workflow.
#[async_trait]
pub trait AttestationLedger: Send + Sync {
    /// Submits `requestAttestation` and waits for the receipt.
    async fn request_attestation(
        &self,
        attestation_type: &str,
        parameters: &str,
    ) -> Result<AttestationSubmission, AttestationError>;

    /// Read-only `verifyAttestation` call.
    async fn verify_attestation(&self, args: &ProofArgs) -> Result<bool, AttestationError>;

    /// Submits `deliverData` and returns the transaction hash.
    async fn deliver_data(&self, args: &ProofArgs) -> Result<String, AttestationError>;
}

/// Entry point for the blockchain endpoints.
#[derive(Clone)]
pub struct AttestationService {
    ledger: Arc<dyn AttestationLedger>,
    da: DataAvailabilityClient,
    view: ChainConfigView,
}

impl AttestationService {
    pub fn new(ledger: Arc<dyn AttestationLedger>, da: DataAvailabilityClient, config: &ChainConfig) -> Self {
        Self {
            ledger,
            da,
            view: chain_config_view(config),
        }
    }

    pub fn config_view(&self) -> &ChainConfigView {
        &self.view
    }

    pub async fn request_attestation(
        &self,
        attestation_type: &str,
        parameters: &str,
    ) -> Result<AttestationSubmission, AttestationError> {
        tracing::info!("Requesting attestation of type {}", attestation_type);
        self.ledger.request_attestation(attestation_type, parameters).await
    }

    pub async fn fetch_attestation_result(&self, request_id: &str) -> Result<FetchOutcome, AttestationError> {
        self.da.fetch(request_id).await
    }

    pub async fn verify_attestation(
        &self,
        request_id: &str,
        attestation_response: &str,
        proof: &str,
    ) -> Result<bool, AttestationError> {
        let args = ProofArgs::decode(request_id, attestation_response, proof)?;
        self.ledger.verify_attestation(&args).await
    }

    pub async fn deliver_data(
        &self,
        request_id: &str,
        attestation_response: &str,
        proof: &str,
    ) -> Result<String, AttestationError> {
        let args = ProofArgs::decode(request_id, attestation_response, proof)?;
        self.ledger.deliver_data(&args).await
    }
}

fn chain_config_view(config: &ChainConfig) -> ChainConfigView {
    ChainConfigView {
        rpc_url: config.rpc_url.to_string(),
        data_purchase_contract_address: config.data_purchase_address.map(|a| a.to_checksum(None)),
        fdc_hub_address: config.fdc_hub_address.map(|a| a.to_checksum(None)),
        fdc_verification_address: config.fdc_verification_address.map(|a| a.to_checksum(None)),
        da_layer_api: config.da_layer_api.as_str().trim_end_matches('/').to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::sync::Mutex;

    /// Records the decoded arguments it receives.
    #[derive(Default)]
    struct RecordingLedger {
        seen: Mutex<Vec<ProofArgs>>,
    }

    #[async_trait]
    impl AttestationLedger for RecordingLedger {
        async fn request_attestation(
            &self,
            _attestation_type: &str,
            _parameters: &str,
        ) -> Result<AttestationSubmission, AttestationError> {
            Ok(AttestationSubmission {
                success: true,
                transaction_hash: "0xfeed".to_string(),
                request_id: None,
            })
        }

        async fn verify_attestation(&self, args: &ProofArgs) -> Result<bool, AttestationError> {
            self.seen.lock().unwrap().push(args.clone());
            Ok(args.proof.len() > 1)
        }

        async fn deliver_data(&self, args: &ProofArgs) -> Result<String, AttestationError> {
            self.seen.lock().unwrap().push(args.clone());
            Ok("0xbeef".to_string())
        }
    }

    fn service(ledger: Arc<RecordingLedger>) -> AttestationService {
        let config = Config::from_lookup(|key| {
            (key == "FDC_HUB_ADDRESS").then(|| "0x2330d0cc23fd6764b7c67023c8fb85ae7287bfc9".to_string())
        });
        let da = DataAvailabilityClient::new(reqwest::Client::new(), config.chain.da_layer_api.clone());
        AttestationService::new(ledger, da, &config.chain)
    }

    #[test]
    fn test_proof_args_accept_both_prefix_styles() {
        let id = "11".repeat(32);
        let with = ProofArgs::decode(&format!("0x{id}"), "0xab", "0x0102").unwrap();
        let without = ProofArgs::decode(&id, "ab", "0102").unwrap();
        assert_eq!(with, without);
        assert_eq!(with.proof.as_ref(), &[1u8, 2]);
    }

    #[test]
    fn test_proof_args_reject_bad_hex() {
        let err = ProofArgs::decode("0xzz", "0x01", "0x01").unwrap_err();
        assert!(matches!(err, AttestationError::InvalidInput(msg) if msg.contains("request_id")));
        let err = ProofArgs::decode(&"ff".repeat(33), "0x01", "0x01").unwrap_err();
        assert!(matches!(err, AttestationError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_verification_result_passes_through() {
        let ledger = Arc::new(RecordingLedger::default());
        let service = service(ledger.clone());

        assert!(!service.verify_attestation("0x01", "0x02", "0x03").await.unwrap());
        assert!(service.verify_attestation("0x01", "0x02", "0x0304").await.unwrap());
        assert_eq!(service.deliver_data("0x01", "0x02", "0x03").await.unwrap(), "0xbeef");
        assert_eq!(ledger.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_hex_never_reaches_ledger() {
        let ledger = Arc::new(RecordingLedger::default());
        let service = service(ledger.clone());
        assert!(service.deliver_data("0x01", "nothex", "0x03").await.is_err());
        assert!(ledger.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_config_view() {
        let service = service(Arc::new(RecordingLedger::default()));
        let view = service.config_view();
        assert_eq!(view.rpc_url, "https://coston2-api.flare.network/ext/C/rpc");
        assert_eq!(view.da_layer_api, "https://api.da.coston2.flare.network");
        assert_eq!(
            view.fdc_hub_address.as_deref(),
            Some("0x2330D0Cc23FD6764b7C67023C8fB85ae7287BFc9")
        );
        assert!(view.data_purchase_contract_address.is_none());
    }
}
