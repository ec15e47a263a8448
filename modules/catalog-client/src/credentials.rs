use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{CatalogError, Result};
use crate::types::TokenResponse;

/// A bearer token and the instant it stops being accepted upstream.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub expires_at: Instant,
}

impl Credential {
    /// True while the token has more than `margin` left before expiry.
    pub fn is_fresh(&self, now: Instant, margin: Duration) -> bool {
        now + margin < self.expires_at
    }
}

/// Exchanges client credentials for a bearer token and caches it.
///
/// The cache lock is held for the duration of an exchange, so concurrent
/// callers that find the token stale queue behind a single in-flight
/// refresh and then read its result.
pub struct CredentialCache {
    http: reqwest::Client,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    margin: Duration,
    cached: Mutex<Option<Credential>>,
}

impl CredentialCache {
    pub fn new(
        http: reqwest::Client,
        token_url: &str,
        client_id: Option<String>,
        client_secret: Option<String>,
        margin: Duration,
    ) -> Self {
        Self {
            http,
            token_url: token_url.to_string(),
            client_id: client_id.filter(|s| !s.is_empty()),
            client_secret: client_secret.filter(|s| !s.is_empty()),
            margin,
            cached: Mutex::new(None),
        }
    }

    /// Return a token with at least the safety margin left, refreshing if needed.
    pub async fn token(&self) -> Result<Credential> {
        let mut cached = self.cached.lock().await;
        if let Some(credential) = cached.as_ref() {
            if credential.is_fresh(Instant::now(), self.margin) {
                return Ok(credential.clone());
            }
            debug!("Cached credential inside expiry margin, refreshing");
        }

        let credential = self.exchange().await?;
        *cached = Some(credential.clone());
        Ok(credential)
    }

    /// Drop the cached token so the next call performs a fresh exchange.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.lock().await;
        if cached.take().is_some() {
            warn!("Cached credential invalidated");
        }
    }

    async fn exchange(&self) -> Result<Credential> {
        let (Some(id), Some(secret)) = (&self.client_id, &self.client_secret) else {
            return Err(CatalogError::Auth(
                "client id and secret are required".to_string(),
            ));
        };

        let resp = self
            .http
            .post(&self.token_url)
            .basic_auth(id, Some(secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| CatalogError::Network(format!("token exchange failed: {e}")))?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(CatalogError::Network(format!(
                "token endpoint unavailable (status {})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CatalogError::Auth(format!(
                "token endpoint rejected credentials (status {}): {body}",
                status.as_u16()
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| CatalogError::Auth(format!("malformed token response: {e}")))?;

        info!(expires_in = token.expires_in, "Obtained catalog access token");

        Ok(Credential {
            token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_is_stale_inside_margin() {
        let now = Instant::now();
        let credential = Credential {
            token: "t".to_string(),
            expires_at: now + Duration::from_secs(30),
        };
        assert!(!credential.is_fresh(now, Duration::from_secs(60)));
        assert!(credential.is_fresh(now, Duration::from_secs(10)));
    }

    #[test]
    fn credential_exactly_at_margin_is_stale() {
        let now = Instant::now();
        let credential = Credential {
            token: "t".to_string(),
            expires_at: now + Duration::from_secs(60),
        };
        assert!(!credential.is_fresh(now, Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn missing_client_credentials_is_auth_error() {
        let cache = CredentialCache::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/token",
            None,
            Some("secret".to_string()),
            Duration::from_secs(60),
        );
        let err = cache.token().await.unwrap_err();
        assert!(matches!(err, CatalogError::Auth(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn unreachable_token_endpoint_is_not_fatal() {
        let cache = CredentialCache::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/token",
            Some("id".to_string()),
            Some("secret".to_string()),
            Duration::from_secs(60),
        );
        let err = cache.token().await.unwrap_err();
        assert!(matches!(err, CatalogError::Network(_)), "{err:?}");
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn empty_secret_counts_as_missing() {
        let cache = CredentialCache::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/token",
            Some("id".to_string()),
            Some(String::new()),
            Duration::from_secs(60),
        );
        assert!(matches!(cache.token().await, Err(CatalogError::Auth(_))));
    }
}
