//! Client for the off-chain data-availability layer that serves attestation proofs.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use spacedata_attest::{strip_0x, AttestationProof};
use url::Url;

use super::AttestationError;

/// Outcome of polling the DA layer for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Ready(AttestationProof),
    /// No result yet; the request may still be in a voting round.
    NotReady,
}

#[derive(Clone)]
pub struct DataAvailabilityClient {
    client: Client,
    base_url: Url,
}

impl DataAvailabilityClient {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// `GET {base}/attestations/{id}` with any `0x` prefix removed.
    ///
    /// A 404, or a 200 that lacks either field, is [`FetchOutcome::NotReady`].
    pub async fn fetch(&self, request_id: &str) -> Result<FetchOutcome, AttestationError> {
        let clean_id = strip_0x(request_id.trim());
        if clean_id.is_empty() {
            return Err(AttestationError::InvalidInput("request_id is empty".to_string()));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AttestationError::InvalidInput("DA layer URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["attestations", clean_id]);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AttestationError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::info!("Attestation result for {} not available yet", request_id);
            return Ok(FetchOutcome::NotReady);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Error fetching attestation result: {}", status);
            return Err(AttestationError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AttestationError::Malformed(e.to_string()))?;

        let field = |name: &str| body.get(name).and_then(Value::as_str).map(str::to_string);
        match (field("attestationResponse"), field("proof")) {
            (Some(attestation_response), Some(proof)) => {
                tracing::info!("Successfully fetched attestation result for request ID: {}", request_id);
                Ok(FetchOutcome::Ready(AttestationProof {
                    attestation_response,
                    proof,
                }))
            }
            _ => {
                tracing::info!("Attestation result for {} is incomplete, treating as pending", request_id);
                Ok(FetchOutcome::NotReady)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> DataAvailabilityClient {
        DataAvailabilityClient::new(Client::new(), server.uri().parse().unwrap())
    }

    #[tokio::test]
    async fn test_ready_strips_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/attestations/abcd"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "attestationResponse": "0x01",
                "proof": "0x0203"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server).fetch("0xabcd").await.unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Ready(AttestationProof {
                attestation_response: "0x01".to_string(),
                proof: "0x0203".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_not_found_and_partial_are_not_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/attestations/partial"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"proof": "0x02"})))
            .mount(&server)
            .await;

        let da = client(&server);
        assert_eq!(da.fetch("missing").await.unwrap(), FetchOutcome::NotReady);
        assert_eq!(da.fetch("partial").await.unwrap(), FetchOutcome::NotReady);
    }

    #[tokio::test]
    async fn test_server_error_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;

        let err = client(&server).fetch("0x01").await.unwrap_err();
        assert!(matches!(err, AttestationError::Upstream { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_empty_id_is_invalid() {
        let server = MockServer::start().await;
        let err = client(&server).fetch("0x").await.unwrap_err();
        assert!(matches!(err, AttestationError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_base_path_is_preserved() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/attestations/ff"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "attestationResponse": "0xaa",
                "proof": "0xbb"
            })))
            .mount(&server)
            .await;

        let da = DataAvailabilityClient::new(
            Client::new(),
            format!("{}/api/v1/", server.uri()).parse().unwrap(),
        );
        assert!(matches!(da.fetch("ff").await.unwrap(), FetchOutcome::Ready(_)));
    }
}
