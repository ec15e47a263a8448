pub mod batcher;
pub mod error;
pub mod filter;
pub mod ownership;
pub mod planner;
pub mod report;
pub mod scan;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod verify;

pub use error::ScanError;
pub use scan::{client_config, Scanner};
pub use traits::CatalogApi;
