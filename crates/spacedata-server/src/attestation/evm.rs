//! [`AttestationLedger`] backed by an EVM JSON-RPC endpoint.

use std::time::Duration;

use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, B256};
use alloy::providers::{PendingTransactionBuilder, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use spacedata_attest::AttestationSubmission;
use tokio::sync::Mutex;
use tracing::info;
use url::Url;

use super::contracts::{request_id_from_logs, IDataPurchase, IFdcHub, IFdcVerification};
use super::{AttestationError, AttestationLedger, ProofArgs};
use crate::config::ChainConfig;

/// Gas limit for every state-changing call.
pub const GAS_LIMIT: u64 = 2_000_000;

pub struct EvmLedger {
    rpc_url: Url,
    signer: Option<PrivateKeySigner>,
    fdc_hub: Option<Address>,
    fdc_verification: Option<Address>,
    data_purchase: Option<Address>,
    receipt_timeout: Option<Duration>,
    /// Serializes submissions so two requests never fill the same nonce.
    submission: Mutex<()>,
}

impl EvmLedger {
    pub fn new(config: &ChainConfig) -> Self {
        Self {
            rpc_url: config.rpc_url.clone(),
            signer: config.signer.clone(),
            fdc_hub: config.fdc_hub_address,
            fdc_verification: config.fdc_verification_address,
            data_purchase: config.data_purchase_address,
            receipt_timeout: config.receipt_timeout,
            submission: Mutex::new(()),
        }
    }

    fn signing_target(
        &self,
        contract: Option<Address>,
        what: &'static str,
    ) -> Result<(PrivateKeySigner, Address), AttestationError> {
        match (&self.signer, contract) {
            (Some(signer), Some(address)) => Ok((signer.clone(), address)),
            _ => {
                tracing::error!("{} contract or account not initialized", what);
                Err(AttestationError::NotConfigured(format!(
                    "{what} contract or account not initialized"
                )))
            }
        }
    }

    async fn confirm(
        &self,
        pending: PendingTransactionBuilder<Http<Client>, alloy::network::Ethereum>,
    ) -> Result<(B256, TransactionReceipt), AttestationError> {
        let tx_hash = *pending.tx_hash();
        info!("Transaction sent: {}", tx_hash);

        let receipt = pending
            .with_timeout(self.receipt_timeout)
            .get_receipt()
            .await
            .map_err(|e| AttestationError::Transport(format!("Failed to get receipt: {e}")))?;

        if !receipt.status() {
            tracing::error!("Transaction {} reverted", tx_hash);
            return Err(AttestationError::Reverted(tx_hash.to_string()));
        }
        Ok((tx_hash, receipt))
    }
}

#[async_trait]
impl AttestationLedger for EvmLedger {
    async fn request_attestation(
        &self,
        attestation_type: &str,
        parameters: &str,
    ) -> Result<AttestationSubmission, AttestationError> {
        let (signer, hub) = self.signing_target(self.fdc_hub, "FDC Hub")?;

        let _guard = self.submission.lock().await;
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_http(self.rpc_url.clone());
        let contract = IFdcHub::new(hub, &provider);

        let pending = contract
            .requestAttestation(attestation_type.to_string(), parameters.to_string())
            .gas(GAS_LIMIT)
            .send()
            .await
            .map_err(|e| AttestationError::Contract(format!("Failed to send transaction: {e}")))?;

        let (tx_hash, receipt) = self.confirm(pending).await?;

        let request_id = request_id_from_logs(hub, receipt.inner.logs()).map(|id| id.to_string());

        match &request_id {
            Some(id) => info!("Successfully requested attestation: {} (request {})", tx_hash, id),
            None => tracing::warn!(
                "Attestation transaction {} has no AttestationRequested event",
                tx_hash
            ),
        }

        Ok(AttestationSubmission {
            success: true,
            transaction_hash: tx_hash.to_string(),
            request_id,
        })
    }

    async fn verify_attestation(&self, args: &ProofArgs) -> Result<bool, AttestationError> {
        let Some(verifier) = self.fdc_verification else {
            tracing::error!("FDC Verification contract not initialized");
            return Err(AttestationError::NotConfigured(
                "FDC Verification contract not initialized".to_string(),
            ));
        };

        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let contract = IFdcVerification::new(verifier, &provider);
        let result = contract
            .verifyAttestation(args.request_id, args.attestation_response, args.proof.clone())
            .call()
            .await
            .map_err(|e| AttestationError::Contract(format!("Contract call failed: {e}")))?;

        info!(
            "Attestation verification result for request ID {}: {}",
            args.request_id, result._0
        );
        Ok(result._0)
    }

    async fn deliver_data(&self, args: &ProofArgs) -> Result<String, AttestationError> {
        let (signer, purchase) = self.signing_target(self.data_purchase, "DataPurchase")?;

        let _guard = self.submission.lock().await;
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_http(self.rpc_url.clone());
        let contract = IDataPurchase::new(purchase, &provider);

        let pending = contract
            .deliverData(args.request_id, args.attestation_response, args.proof.clone())
            .gas(GAS_LIMIT)
            .send()
            .await
            .map_err(|e| AttestationError::Contract(format!("Failed to send transaction: {e}")))?;

        let (tx_hash, _receipt) = self.confirm(pending).await?;
        info!("Successfully delivered data: {}", tx_hash);
        Ok(tx_hash.to_string())
    }
}
