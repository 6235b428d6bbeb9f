//! Shared application state, built once at startup.

use std::sync::Arc;

use reqwest::Client;

use crate::attestation::{AttestationLedger, AttestationService, DataAvailabilityClient, EvmLedger};
use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::geocoding::Geocoder;
use crate::narrative::{ChatCompletionClient, NarrativeGenerator};

#[derive(Clone)]
pub struct AppState {
    pub geocoder: Geocoder,
    pub catalog: Arc<CatalogClient>,
    pub narrative: NarrativeGenerator,
    pub attestation: AttestationService,
}

impl AppState {
    /// Wires every service against the real chain.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let ledger = Arc::new(EvmLedger::new(&config.chain));
        Self::with_ledger(config, ledger)
    }

    /// Wires every service with the given ledger.
    pub fn with_ledger(config: &Config, ledger: Arc<dyn AttestationLedger>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        let geocoder = Geocoder::new(client.clone(), config.geocoder.base_url.clone());
        let narrative = NarrativeGenerator::new(
            ChatCompletionClient::new(client.clone(), &config.ai),
            geocoder.clone(),
        );
        let da = DataAvailabilityClient::new(client.clone(), config.chain.da_layer_api.clone());

        Ok(Self {
            catalog: Arc::new(CatalogClient::new(client, &config.catalog)),
            attestation: AttestationService::new(ledger, da, &config.chain),
            geocoder,
            narrative,
        })
    }
}
