//! Client-credentials token exchange for the imagery catalog.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use crate::config::ClientCredentials;

/// Tokens are refreshed this long before the provider's expiry.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the provider's `expires_in` does not fit an `Instant`.
const FALLBACK_LIFETIME: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Caches one bearer token for all catalog calls.
///
/// Any exchange failure is logged and yields `None`; callers proceed
/// unauthenticated.
pub struct TokenCache {
    client: Client,
    token_url: Url,
    credentials: Option<ClientCredentials>,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(client: Client, token_url: Url, credentials: Option<ClientCredentials>) -> Self {
        Self {
            client,
            token_url,
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// Current bearer token, exchanging credentials when the cache is
    /// empty or within the refresh margin.
    pub async fn bearer(&self) -> Option<String> {
        let credentials = self.credentials.as_ref()?;

        // Held across the exchange so concurrent callers share one refresh.
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + REFRESH_MARGIN < token.expires_at {
                return Some(token.value.clone());
            }
        }

        tracing::info!("Getting new CDSE access token...");
        match self.exchange(credentials).await {
            Ok(response) => {
                tracing::info!("Successfully obtained CDSE access token");
                let token = CachedToken {
                    value: response.access_token,
                    expires_at: expiry(Instant::now(), response.expires_in),
                };
                let value = token.value.clone();
                *cached = Some(token);
                Some(value)
            }
            Err(e) => {
                tracing::error!("Error getting CDSE access token: {}", e);
                tracing::info!("Proceeding without authentication (some features may be limited)");
                None
            }
        }
    }

    async fn exchange(&self, credentials: &ClientCredentials) -> Result<TokenResponse, reqwest::Error> {
        self.client
            .post(self.token_url.clone())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

fn expiry(now: Instant, expires_in: u64) -> Instant {
    now.checked_add(Duration::from_secs(expires_in))
        .unwrap_or(now + FALLBACK_LIFETIME)
}
