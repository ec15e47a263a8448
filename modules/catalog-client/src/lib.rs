pub mod client;
pub mod credentials;
pub mod error;
pub mod throttle;
pub mod types;

pub use client::{
    CatalogClient, CatalogClientConfig, RetryPolicy, MAX_CREATORS_PER_REQUEST, MAX_SEARCH_WINDOW,
    MAX_WORKS_PER_REQUEST,
};
pub use credentials::{Credential, CredentialCache};
pub use error::{CatalogError, Result};
pub use throttle::RequestThrottle;
pub use types::{
    Creator, CreatorRef, ExternalUrls, Followers, Image, OwnershipKind, OwnershipLine,
    SearchPage, SearchQuery, Work, WorkSummary,
};
