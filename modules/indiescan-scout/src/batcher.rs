use std::collections::HashSet;

use tracing::{debug, warn};

use catalog_client::{
    CatalogError, Creator, Work, MAX_CREATORS_PER_REQUEST, MAX_WORKS_PER_REQUEST,
};
use indiescan_common::UpstreamConfig;

use crate::traits::CatalogApi;

/// Results of a chunked lookup. Failed chunks are counted, not fatal.
#[derive(Debug)]
pub struct Batched<T> {
    pub items: Vec<T>,
    pub chunks_skipped: usize,
}

/// Splits id lists into upstream-sized chunks for the bulk detail endpoints.
pub struct DetailBatcher<'a> {
    catalog: &'a dyn CatalogApi,
    works_per_request: usize,
    creators_per_request: usize,
}

impl<'a> DetailBatcher<'a> {
    pub fn new(catalog: &'a dyn CatalogApi, upstream: &UpstreamConfig) -> Self {
        Self {
            catalog,
            works_per_request: upstream.works_per_request.clamp(1, MAX_WORKS_PER_REQUEST),
            creators_per_request: upstream
                .creators_per_request
                .clamp(1, MAX_CREATORS_PER_REQUEST),
        }
    }

    /// Full work records for `ids`. One request per chunk; a chunk that
    /// fails is logged and skipped unless the failure is fatal.
    pub async fn fetch_work_details(&self, ids: &[String]) -> Result<Batched<Work>, CatalogError> {
        let ids = unique_ids(ids);
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(ids.len());
        let mut chunks_skipped = 0;

        for (index, chunk) in ids.chunks(self.works_per_request).enumerate() {
            match self.catalog.works(chunk).await {
                Ok(works) => {
                    items.extend(works.into_iter().filter(|w| seen.insert(w.id.clone())));
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(chunk = index, size = chunk.len(), error = %e, "Work detail chunk failed, skipping");
                    chunks_skipped += 1;
                }
            }
        }

        debug!(requested = ids.len(), fetched = items.len(), chunks_skipped, "Fetched work details");
        Ok(Batched {
            items,
            chunks_skipped,
        })
    }

    /// Enriched creator records for `ids`, chunked like
    /// [`fetch_work_details`](Self::fetch_work_details).
    pub async fn fetch_creator_details(
        &self,
        ids: &[String],
    ) -> Result<Batched<Creator>, CatalogError> {
        let ids = unique_ids(ids);
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(ids.len());
        let mut chunks_skipped = 0;

        for (index, chunk) in ids.chunks(self.creators_per_request).enumerate() {
            match self.catalog.creators(chunk).await {
                Ok(creators) => {
                    items.extend(creators.into_iter().filter(|c| seen.insert(c.id.clone())));
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(chunk = index, size = chunk.len(), error = %e, "Creator detail chunk failed, skipping");
                    chunks_skipped += 1;
                }
            }
        }

        debug!(requested = ids.len(), fetched = items.len(), chunks_skipped, "Fetched creator details");
        Ok(Batched {
            items,
            chunks_skipped,
        })
    }
}

/// Drop repeats, keeping first-seen order.
fn unique_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
