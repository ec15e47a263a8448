pub mod config;
pub mod error;
pub mod types;

pub use config::{
    FilterConfig, MatchingConfig, NameMatchMode, ScanConfig, ScanLimits, Secrets, UpstreamConfig,
    VerificationConfig,
};
pub use error::ConfigError;
pub use types::*;
