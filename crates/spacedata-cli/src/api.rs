//! Blocking client for the server's `/api/blockchain` endpoints.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::json;
use spacedata_attest::{
    AttestationProof, AttestationSubmission, ChainConfigView, DeliveryReceipt, ErrorBody,
    VerificationOutcome,
};

/// Transactions wait for a receipt server-side, so calls can be slow.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// What the DA layer had for a request id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Ready(AttestationProof),
    Pending,
}

/// The attestation calls the pipeline needs.
pub trait AttestationApi {
    fn request_attestation(&self, attestation_type: &str, parameters: &str) -> Result<AttestationSubmission>;
    fn fetch_attestation(&self, request_id: &str) -> Result<FetchStatus>;
    fn verify_attestation(&self, request_id: &str, attestation_response: &str, proof: &str) -> Result<bool>;
    fn deliver_data(&self, request_id: &str, attestation_response: &str, proof: &str) -> Result<String>;
}

pub struct ServerClient {
    agent: ureq::Agent,
    base_url: String,
}

impl ServerClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/blockchain/{}", self.base_url, path)
    }

    pub fn chain_config(&self) -> Result<ChainConfigView> {
        decode(self.agent.get(&self.url("config")).call())
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        decode(self.agent.post(&self.url(path)).send_json(body))
    }
}

impl AttestationApi for ServerClient {
    fn request_attestation(&self, attestation_type: &str, parameters: &str) -> Result<AttestationSubmission> {
        self.post(
            "request-attestation",
            json!({"attestation_type": attestation_type, "parameters": parameters}),
        )
    }

    fn fetch_attestation(&self, request_id: &str) -> Result<FetchStatus> {
        let path = format!("fetch-attestation/{}", request_id.trim());
        fetch_status(self.agent.get(&self.url(&path)).call())
    }

    fn verify_attestation(&self, request_id: &str, attestation_response: &str, proof: &str) -> Result<bool> {
        let outcome: VerificationOutcome = self.post(
            "verify-attestation",
            json!({"request_id": request_id, "attestation_response": attestation_response, "proof": proof}),
        )?;
        Ok(outcome.verified)
    }

    fn deliver_data(&self, request_id: &str, attestation_response: &str, proof: &str) -> Result<String> {
        let receipt: DeliveryReceipt = self.post(
            "deliver-data",
            json!({"request_id": request_id, "attestation_response": attestation_response, "proof": proof}),
        )?;
        Ok(receipt.transaction_hash)
    }
}

/// 200 carries a proof, 202 means the DA layer has nothing yet.
fn fetch_status(result: Result<ureq::Response, ureq::Error>) -> Result<FetchStatus> {
    match result {
        Ok(response) if response.status() == 202 => Ok(FetchStatus::Pending),
        other => decode(other).map(FetchStatus::Ready),
    }
}

/// Decodes a success body, or turns the server's error body into a message.
fn decode<T: DeserializeOwned>(result: Result<ureq::Response, ureq::Error>) -> Result<T> {
    match result {
        Ok(response) => response.into_json().context("Malformed server response"),
        Err(ureq::Error::Status(status, response)) => {
            let text = response.into_string().unwrap_or_default();
            match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => Err(anyhow!("{} ({}): {}", body.error, status, body.details)),
                Err(_) => Err(anyhow!("Server returned {}: {}", status, text)),
            }
        }
        Err(ureq::Error::Transport(transport)) => Err(anyhow!("Cannot reach server: {}", transport)),
    }
}
