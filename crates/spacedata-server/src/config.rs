//! Server configuration loaded from environment variables.
//!
//! Every external integration is optional. A missing or malformed value
//! disables (or degrades) the matching feature and is logged; startup
//! never fails because of it.

use std::net::SocketAddr;
use std::time::Duration;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use tracing::{info, warn};
use url::Url;

const DEFAULT_RPC_URL: &str = "https://coston2-api.flare.network/ext/C/rpc";
const DEFAULT_DA_LAYER_API: &str = "https://api.da.coston2.flare.network";
const DEFAULT_TOKEN_URL: &str =
    "https://identity.dataspace.copernicus.eu/auth/realms/CDSE/protocol/openid-connect/token";
const DEFAULT_STAC_URL: &str = "https://stac.dataspace.copernicus.eu/v1";
const DEFAULT_ODATA_URL: &str = "https://catalogue.dataspace.copernicus.eu/odata/v1/Products";
const DEFAULT_AI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

/// Top-level server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server listen address.
    pub listen_addr: SocketAddr,
    pub chain: ChainConfig,
    pub catalog: CatalogConfig,
    pub ai: AiConfig,
    pub geocoder: GeocoderConfig,
}

/// EVM endpoint, signer and contract addresses.
#[derive(Clone)]
pub struct ChainConfig {
    pub rpc_url: Url,
    /// Signing account; `None` disables every state-changing call.
    pub signer: Option<PrivateKeySigner>,
    pub data_purchase_address: Option<Address>,
    pub fdc_hub_address: Option<Address>,
    pub fdc_verification_address: Option<Address>,
    /// Base URL of the off-chain data-availability (proof) service.
    pub da_layer_api: Url,
    /// Upper bound on waiting for a receipt; `None` waits indefinitely.
    pub receipt_timeout: Option<Duration>,
}

/// Imagery catalog endpoints and client credentials.
#[derive(Clone)]
pub struct CatalogConfig {
    pub stac_url: Url,
    pub odata_url: Url,
    pub token_url: Url,
    pub credentials: Option<ClientCredentials>,
}

#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Chat-completion endpoint.
#[derive(Clone)]
pub struct AiConfig {
    pub api_url: Url,
    /// `None` disables the assistant; callers get fallback text.
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub base_url: Url,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port: u16 = get("PORT").and_then(|p| p.parse().ok()).unwrap_or(5000);
        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let listen_addr = format!("{host}:{port}").parse().unwrap_or_else(|e| {
            warn!("Invalid listen address {}:{} ({}), using 0.0.0.0:{}", host, port, e, port);
            SocketAddr::from(([0, 0, 0, 0], port))
        });

        let signer = get("PRIVATE_KEY").and_then(|key| match key.parse::<PrivateKeySigner>() {
            Ok(signer) => {
                info!("Initialized account: {}", signer.address());
                Some(signer)
            }
            Err(e) => {
                warn!("Error initializing account from private key: {}", e);
                None
            }
        });

        let chain = ChainConfig {
            rpc_url: url_or_default(get("RPC_URL"), "RPC_URL", DEFAULT_RPC_URL),
            signer,
            data_purchase_address: address(get("DATAPURCHASE_CONTRACT_ADDRESS"), "DATAPURCHASE_CONTRACT_ADDRESS"),
            fdc_hub_address: address(get("FDC_HUB_ADDRESS"), "FDC_HUB_ADDRESS"),
            fdc_verification_address: address(get("FDC_VERIFICATION_ADDRESS"), "FDC_VERIFICATION_ADDRESS"),
            da_layer_api: url_or_default(get("DA_LAYER_API"), "DA_LAYER_API", DEFAULT_DA_LAYER_API),
            receipt_timeout: get("CHAIN_RECEIPT_TIMEOUT_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        };

        let credentials = match (get("CDSE_CLIENT_ID"), get("CDSE_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(ClientCredentials {
                client_id,
                client_secret,
            }),
            _ => {
                info!("No CDSE credentials provided; catalog calls will be unauthenticated");
                None
            }
        };

        let catalog = CatalogConfig {
            stac_url: url_or_default(get("STAC_URL"), "STAC_URL", DEFAULT_STAC_URL),
            odata_url: url_or_default(get("ODATA_URL"), "ODATA_URL", DEFAULT_ODATA_URL),
            token_url: url_or_default(get("CDSE_TOKEN_URL"), "CDSE_TOKEN_URL", DEFAULT_TOKEN_URL),
            credentials,
        };

        let ai = AiConfig {
            api_url: url_or_default(get("AI_API_URL"), "AI_API_URL", DEFAULT_AI_API_URL),
            api_key: get("AI_API_KEY"),
            model: get("AI_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
        };
        if ai.api_key.is_none() {
            warn!("AI_API_KEY not set; assistant replies will use fallback text");
        }

        let geocoder = GeocoderConfig {
            base_url: url_or_default(get("GEOCODER_URL"), "GEOCODER_URL", DEFAULT_GEOCODER_URL),
        };

        Self {
            listen_addr,
            chain,
            catalog,
            ai,
            geocoder,
        }
    }

    /// Logs the non-secret parts of the configuration.
    pub fn log_summary(&self) {
        info!("Listen address: {}", self.listen_addr);
        info!("RPC_URL: {}", self.chain.rpc_url);
        info!("DA_LAYER_API: {}", self.chain.da_layer_api);
        info!("DATAPURCHASE_CONTRACT_ADDRESS: {:?}", self.chain.data_purchase_address);
        info!("FDC_HUB_ADDRESS: {:?}", self.chain.fdc_hub_address);
        info!("FDC_VERIFICATION_ADDRESS: {:?}", self.chain.fdc_verification_address);
        info!("Signer configured: {}", self.chain.signer.is_some());
        info!("STAC_URL: {}", self.catalog.stac_url);
        info!("Catalog credentials configured: {}", self.catalog.credentials.is_some());
        info!("AI model: {} (enabled: {})", self.ai.model, self.ai.api_key.is_some());
    }
}

impl std::fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainConfig")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("signer", &self.signer.as_ref().map(|s| s.address()))
            .field("data_purchase_address", &self.data_purchase_address)
            .field("fdc_hub_address", &self.fdc_hub_address)
            .field("fdc_verification_address", &self.fdc_verification_address)
            .field("da_layer_api", &self.da_layer_api.as_str())
            .field("receipt_timeout", &self.receipt_timeout)
            .finish()
    }
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("stac_url", &self.stac_url.as_str())
            .field("odata_url", &self.odata_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field(
                "client_id",
                &self.credentials.as_ref().map(|c| c.client_id.as_str()),
            )
            .finish()
    }
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

fn url_or_default(value: Option<String>, key: &str, default: &str) -> Url {
    value
        .and_then(|raw| match Url::parse(&raw) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Invalid {} '{}': {}; using default", key, raw, e);
                None
            }
        })
        .unwrap_or_else(|| Url::parse(default).expect("default URLs are valid"))
}

fn address(value: Option<String>, key: &str) -> Option<Address> {
    let raw = value?;
    match raw.parse::<Address>() {
        Ok(address) => Some(address),
        Err(e) => {
            warn!("Invalid {} '{}': {}", key, raw, e);
            None
        }
    }
}
