use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Scanner tunables loaded from a TOML file.
/// Secrets (client id/secret) stay as env vars; see [`Secrets`].
///
/// Every section and field has a default, so a missing or partial file
/// yields a working configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub upstream: UpstreamConfig,
    pub scan: ScanLimits,
    pub matching: MatchingConfig,
    pub filters: FilterConfig,
    pub verification: VerificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub token_url: String,
    pub timeout_secs: u64,
    /// Minimum spacing between any two outbound requests.
    pub min_request_interval_ms: u64,
    /// Attempts per request, including the first.
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub default_retry_after_secs: u64,
    pub max_retry_after_secs: u64,
    /// Tokens are refreshed once they are this close to expiry.
    pub credential_margin_secs: u64,
    /// Per-call id limits for the bulk endpoints.
    pub works_per_request: usize,
    pub creators_per_request: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.spotify.com/v1".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            timeout_secs: 10,
            min_request_interval_ms: 200,
            max_attempts: 4,
            retry_delay_ms: 500,
            default_retry_after_secs: 2,
            max_retry_after_secs: 30,
            credential_margin_secs: 60,
            works_per_request: 20,
            creators_per_request: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanLimits {
    /// Search attempts per scan before giving up with whatever was found.
    pub max_attempts: u32,
    /// Cap on results returned by one scan.
    pub max_results: usize,
    pub search_limit: u32,
    /// Highest search offset the planner will draw.
    pub max_offset: u32,
    pub markets: Vec<String>,
    /// Year filter covers the current year and this many before it.
    pub recent_years: i32,
    /// Fixed queries mixed in with random prefixes (year filter is appended).
    pub curated_queries: Vec<String>,
    /// Probability of choosing a curated query over a random prefix.
    pub curated_query_share: f64,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_attempts: 12,
            max_results: 8,
            search_limit: 50,
            max_offset: 950,
            markets: vec!["US".to_string()],
            recent_years: 0,
            curated_queries: vec!["tag:new".to_string(), "label:\"Records DK\"".to_string()],
            curated_query_share: 0.3,
        }
    }
}

/// How strongly a creator's own name in the ownership text counts as
/// evidence of a self-release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameMatchMode {
    /// Only distributor markers count.
    Off,
    /// Normalized ownership text must equal the normalized name.
    Exact,
    /// Exact, or the name followed only by allowed suffix words.
    Suffix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub name_match: NameMatchMode,
    /// Case-insensitive regex recognizing self-service distributor naming.
    pub distributor_pattern: String,
    /// Major-label names, matched as substrings. Any hit vetoes the work.
    pub major_labels: Vec<String>,
    /// Words allowed after the creator's name in the ownership text.
    pub allowed_suffixes: Vec<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            name_match: NameMatchMode::Suffix,
            distributor_pattern: DEFAULT_DISTRIBUTOR_PATTERN.to_string(),
            major_labels: to_strings(DEFAULT_MAJOR_LABELS),
            allowed_suffixes: to_strings(DEFAULT_ALLOWED_SUFFIXES),
        }
    }
}

pub const DEFAULT_DISTRIBUTOR_PATTERN: &str = r"(?i)\b(?:records\s+dk|distrokid|tunecore|cd\s?baby|amuseio|unitedmasters|routenote|ditto\s+music|soundrop)\b";

/// Matched as case-insensitive substrings with whitespace ignored, so bare
/// abbreviations that occur inside ordinary words ("emi", "rca") are listed
/// with a qualifier.
pub const DEFAULT_MAJOR_LABELS: &[&str] = &[
    "sony",
    "universal",
    "umg recordings",
    "warner",
    "emi records",
    "emi music",
    "columbia",
    "atlantic",
    "interscope",
    "capitol",
    "def jam",
    "rca records",
    "republic records",
    "island records",
    "parlophone",
    "virgin records",
    "virgin music",
    "epic records",
    "elektra",
    "the orchard",
    "awal recordings",
];

pub const DEFAULT_ALLOWED_SUFFIXES: &[&str] = &[
    "records",
    "recordings",
    "music",
    "musicgroup",
    "entertainment",
    "productions",
    "publishing",
    "llc",
    "inc",
    "ltd",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Creators must have strictly fewer followers than this.
    pub follower_ceiling: u64,
    pub popularity_floor: u32,
    pub require_image: bool,
    /// Case-insensitive substrings that mark a name as playlist filler.
    pub blocked_keywords: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            follower_ceiling: 5_000,
            popularity_floor: 0,
            require_image: true,
            blocked_keywords: to_strings(DEFAULT_BLOCKED_KEYWORDS),
        }
    }
}

pub const DEFAULT_BLOCKED_KEYWORDS: &[&str] = &[
    "lofi",
    "lo-fi",
    "sleep",
    "relax",
    "meditation",
    "white noise",
    "rain sounds",
    "nature sounds",
    "asmr",
    "lullaby",
    "baby",
    "study",
    "spa ",
    "yoga",
    "binaural",
    "frequency",
    "karaoke",
    "tribute",
    "cover band",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Candidates verified concurrently.
    pub workers: usize,
    /// How many of a creator's releases to look at.
    pub lookback: u32,
    /// Reject creators whose latest release is older than this. `None` disables.
    pub recency_window_days: Option<u32>,
    /// Minimum number of releases a creator must have.
    pub min_catalog_depth: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            workers: 12,
            lookback: 10,
            recency_window_days: Some(365),
            min_catalog_depth: 1,
        }
    }
}

impl ScanConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.upstream.max_attempts == 0 {
            return invalid("upstream.max_attempts must be at least 1");
        }
        if self.upstream.works_per_request == 0 || self.upstream.creators_per_request == 0 {
            return invalid("upstream per-request id limits must be at least 1");
        }
        if self.scan.max_attempts == 0 {
            return invalid("scan.max_attempts must be at least 1");
        }
        if self.scan.max_results == 0 {
            return invalid("scan.max_results must be at least 1");
        }
        if self.scan.markets.iter().all(|m| m.trim().is_empty()) {
            return invalid("scan.markets must name at least one market");
        }
        if self.scan.search_limit == 0 || self.scan.search_limit > 50 {
            return invalid("scan.search_limit must be between 1 and 50");
        }
        if !(0.0..=1.0).contains(&self.scan.curated_query_share) {
            return invalid("scan.curated_query_share must be between 0 and 1");
        }
        if self.scan.recent_years < 0 {
            return invalid("scan.recent_years must not be negative");
        }
        if self.verification.workers == 0 {
            return invalid("verification.workers must be at least 1");
        }
        if self.verification.lookback == 0 {
            return invalid("verification.lookback must be at least 1");
        }
        if self.verification.min_catalog_depth > self.verification.lookback as usize {
            return invalid("verification.min_catalog_depth must not exceed verification.lookback");
        }
        regex::Regex::new(&self.matching.distributor_pattern)
            .map_err(|e| ConfigError::Invalid(format!("matching.distributor_pattern: {e}")))?;
        Ok(())
    }
}

/// Client credentials for the upstream catalog, read from the environment.
/// Absence is not an error here; the first token exchange reports it.
#[derive(Clone, Default)]
pub struct Secrets {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            client_id: env::var("CATALOG_CLIENT_ID").ok(),
            client_secret: env::var("CATALOG_CLIENT_SECRET").ok(),
        }
    }

    pub fn log_redacted(&self) {
        fn preview(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => {
                    let head: String = v.chars().take(4).collect();
                    format!("{head}...({} chars)", v.chars().count())
                }
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Secrets loaded:");
        tracing::info!("  CATALOG_CLIENT_ID: {}", preview(&self.client_id));
        tracing::info!("  CATALOG_CLIENT_SECRET: {}", preview(&self.client_secret));
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("client_id", &self.client_id.as_ref().map(|_| "<redacted>"))
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
