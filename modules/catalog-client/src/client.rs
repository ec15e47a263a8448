use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::credentials::CredentialCache;
use crate::error::{CatalogError, Result};
use crate::throttle::RequestThrottle;
use crate::types::{
    CreatorsResponse, Paging, SearchPage, SearchQuery, SearchResponse, WorkSummary, WorksResponse,
};
use crate::{Creator, Work};

pub const DEFAULT_BASE_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Upstream cap on ids per bulk work lookup.
pub const MAX_WORKS_PER_REQUEST: usize = 20;
/// Upstream cap on ids per bulk creator lookup.
pub const MAX_CREATORS_PER_REQUEST: usize = 50;
/// Upstream cap on `offset + limit` for search paging.
pub const MAX_SEARCH_WINDOW: u32 = 1000;

/// Retry behaviour shared by every call the client makes.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Fixed pause before retrying a transport failure.
    pub transport_delay: Duration,
    /// Wait used when a 429 carries no usable Retry-After header.
    pub default_retry_after: Duration,
    /// Upper bound on any single Retry-After wait.
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            transport_delay: Duration::from_millis(500),
            default_retry_after: Duration::from_secs(2),
            max_retry_after: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// How long to wait after a 429, from the Retry-After header (seconds).
    pub fn rate_limit_wait(&self, headers: &HeaderMap) -> Duration {
        headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.default_retry_after)
            .min(self.max_retry_after)
    }
}

#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    pub base_url: String,
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub timeout: Duration,
    pub min_request_interval: Duration,
    pub credential_margin: Duration,
    pub retry: RetryPolicy,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: None,
            client_secret: None,
            timeout: Duration::from_secs(10),
            min_request_interval: Duration::from_millis(200),
            credential_margin: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

/// Catalog API client. Every request passes through the shared credential
/// cache and request throttle, so a single instance (or clones of it) can be
/// used from many concurrent tasks.
#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<CredentialCache>,
    throttle: Arc<RequestThrottle>,
    retry: RetryPolicy,
}

impl CatalogClient {
    pub fn new(config: CatalogClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(16)
            .build()?;

        let credentials = CredentialCache::new(
            http.clone(),
            &config.token_url,
            config.client_id,
            config.client_secret,
            config.credential_margin,
        );

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: Arc::new(credentials),
            throttle: Arc::new(RequestThrottle::new(config.min_request_interval)),
            retry: config.retry,
        })
    }

    pub fn credentials(&self) -> &CredentialCache {
        &self.credentials
    }

    /// Authenticated, throttled GET returning the decoded JSON body.
    ///
    /// 429s are retried after the Retry-After hint, and transport failures
    /// (token exchange included) after a fixed delay, both up to
    /// `max_attempts`. Any other non-2xx
    /// fails immediately.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let credential = match self.credentials.token().await {
                Ok(credential) => credential,
                Err(e) if !e.is_fatal() && attempt < max_attempts => {
                    warn!(
                        url,
                        attempt,
                        error = %e,
                        "Token exchange failed, retrying after delay"
                    );
                    tokio::time::sleep(self.retry.transport_delay).await;
                    continue;
                }
                Err(e) => return Err(e),
            };
            self.throttle.acquire().await;

            let sent = self
                .http
                .get(&url)
                .bearer_auth(&credential.token)
                .query(params)
                .send()
                .await;

            let resp = match sent {
                Ok(resp) => resp,
                Err(e) if attempt < max_attempts => {
                    warn!(
                        url,
                        attempt,
                        error = %e,
                        "Catalog request failed, retrying after delay"
                    );
                    tokio::time::sleep(self.retry.transport_delay).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = resp.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= max_attempts {
                    return Err(CatalogError::RateLimited { attempts: attempt });
                }
                let wait = self.retry.rate_limit_wait(resp.headers());
                warn!(
                    url,
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "Catalog rate limited, backing off"
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            if status == StatusCode::UNAUTHORIZED {
                self.credentials.invalidate().await;
                return Err(CatalogError::Unauthorized {
                    status: status.as_u16(),
                });
            }

            if !status.is_success() {
                let message = resp.text().await.unwrap_or_default();
                return Err(CatalogError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            debug!(url, attempt, "Catalog request ok");
            let body = resp.bytes().await?;
            return Ok(serde_json::from_slice(&body)?);
        }
    }

    /// Search releases. The upstream rejects windows past
    /// `MAX_SEARCH_WINDOW`, so the limit is trimmed to fit.
    pub async fn search_works(&self, query: &SearchQuery) -> Result<SearchPage> {
        let limit = query
            .limit
            .min(MAX_SEARCH_WINDOW.saturating_sub(query.offset))
            .max(1);
        let params = [
            ("q", query.q.clone()),
            ("type", "album".to_string()),
            ("limit", limit.to_string()),
            ("offset", query.offset.to_string()),
            ("market", query.market.clone()),
        ];
        let resp: SearchResponse = self.get_json("search", &params).await?;
        Ok(SearchPage {
            items: resp.albums.items,
            total: resp.albums.total,
        })
    }

    /// Bulk release lookup for at most `MAX_WORKS_PER_REQUEST` ids.
    pub async fn works(&self, ids: &[String]) -> Result<Vec<Work>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let params = [("ids", ids.join(","))];
        let resp: WorksResponse = self.get_json("albums", &params).await?;
        Ok(resp.works.into_iter().flatten().collect())
    }

    /// Bulk creator lookup for at most `MAX_CREATORS_PER_REQUEST` ids.
    pub async fn creators(&self, ids: &[String]) -> Result<Vec<Creator>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let params = [("ids", ids.join(","))];
        let resp: CreatorsResponse = self.get_json("artists", &params).await?;
        Ok(resp.creators.into_iter().flatten().collect())
    }

    /// A creator's own releases (albums and singles), newest first as
    /// returned upstream.
    pub async fn creator_works(&self, creator_id: &str, limit: u32) -> Result<Vec<WorkSummary>> {
        let params = [
            ("include_groups", "album,single".to_string()),
            ("limit", limit.clamp(1, 50).to_string()),
        ];
        let resp: Paging<WorkSummary> = self
            .get_json(&format!("artists/{creator_id}/albums"), &params)
            .await?;
        Ok(resp.items)
    }
}
