// Trait seam between the scan pipeline and the upstream catalog.
//
// CatalogClient is the production implementation; MockCatalog in
// `testing` replaces it in tests (no network, deterministic data).

use async_trait::async_trait;

use catalog_client::{CatalogClient, Creator, Result, SearchPage, SearchQuery, Work, WorkSummary};

#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// One page of release search results.
    async fn search_works(&self, query: &SearchQuery) -> Result<SearchPage>;

    /// Full release records. Callers keep `ids` within the upstream's per-call limit.
    async fn works(&self, ids: &[String]) -> Result<Vec<Work>>;

    /// Enriched creator records. Callers keep `ids` within the upstream's per-call limit.
    async fn creators(&self, ids: &[String]) -> Result<Vec<Creator>>;

    /// A creator's own releases, up to `limit`.
    async fn creator_works(&self, creator_id: &str, limit: u32) -> Result<Vec<WorkSummary>>;
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn search_works(&self, query: &SearchQuery) -> Result<SearchPage> {
        self.search_works(query).await
    }

    async fn works(&self, ids: &[String]) -> Result<Vec<Work>> {
        self.works(ids).await
    }

    async fn creators(&self, ids: &[String]) -> Result<Vec<Creator>> {
        self.creators(ids).await
    }

    async fn creator_works(&self, creator_id: &str, limit: u32) -> Result<Vec<WorkSummary>> {
        self.creator_works(creator_id, limit).await
    }
}
