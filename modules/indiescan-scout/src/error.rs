use thiserror::Error;

use catalog_client::CatalogError;
use indiescan_common::ConfigError;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Only fatal catalog failures reach the caller; the rest are absorbed
    /// by the scan.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl From<regex::Error> for ScanError {
    fn from(err: regex::Error) -> Self {
        ScanError::Config(ConfigError::Invalid(err.to_string()))
    }
}
