use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Rate limited: gave up after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Unauthorized (status {status})")]
    Unauthorized { status: u16 },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl CatalogError {
    /// Credential failures end the whole scan; everything else only voids
    /// the request that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CatalogError::Auth(_) | CatalogError::Unauthorized { .. })
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        CatalogError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(err.to_string())
    }
}
