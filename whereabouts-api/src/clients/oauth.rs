//! Service-to-service token via the OAuth2 client-credentials grant
//!
//! Calls that run under the service's own identity (offender number
//! lookups and schedule counts) use this token; the token is cached until shortly
//! before it expires. Without OAuth configuration the caller's token is used.

use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};
use whereabouts_common::config::OAuthConfig;

use super::{ensure_success, trim_base_url, UpstreamError};
use crate::auth::AuthContext;

/// Refresh this long before the token's stated expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    300
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Source of bearer tokens for service-level upstream calls
#[derive(Debug)]
pub struct ServiceTokenProvider {
    http: Client,
    oauth: Option<OAuthConfig>,
    cached: RwLock<Option<CachedToken>>,
}

impl ServiceTokenProvider {
    pub fn new(http: Client, oauth: Option<OAuthConfig>) -> Self {
        Self {
            http,
            oauth,
            cached: RwLock::new(None),
        }
    }

    /// Provider that always forwards the caller's own token
    pub fn passthrough() -> Self {
        Self::new(Client::new(), None)
    }

    /// Token to use for a service-level call made on behalf of `ctx`
    pub async fn service_token(&self, ctx: &AuthContext) -> Result<String, UpstreamError> {
        let Some(oauth) = &self.oauth else {
            return Ok(ctx.token().to_string());
        };

        if let Some(cached) = self.cached.read().await.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.access_token.clone());
            }
        }

        let mut cached = self.cached.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(existing) = cached.as_ref() {
            if Instant::now() < existing.refresh_at {
                return Ok(existing.access_token.clone());
            }
        }

        debug!(client_id = %oauth.client_id, "Requesting client-credentials token");
        let response = self
            .http
            .post(format!("{}/oauth/token", trim_base_url(oauth.url.as_str())))
            .query(&[("grant_type", "client_credentials")])
            .basic_auth(&oauth.client_id, Some(&oauth.client_secret))
            .send()
            .await?;
        let token: TokenResponse = ensure_success(response).await?.json().await?;

        let lifetime = Duration::from_secs(token.expires_in);
        let refresh_at = Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN);
        info!(expires_in = token.expires_in, "Obtained service token");

        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            refresh_at,
        });
        Ok(token.access_token)
    }
}
