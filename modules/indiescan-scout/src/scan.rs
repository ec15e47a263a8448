use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use catalog_client::{CatalogClientConfig, CatalogError, RetryPolicy, SearchPage, SearchQuery};
use indiescan_common::{
    Candidate, ScanConfig, ScanPhase, ScanRequest, ScanResponse, ScanStats, Secrets,
    UpstreamConfig, VerifiedResult,
};

use crate::batcher::DetailBatcher;
use crate::error::ScanError;
use crate::filter::CandidateFilter;
use crate::ownership::OwnershipMatcher;
use crate::planner::{clamp_offset, QueryPlanner};
use crate::traits::CatalogApi;
use crate::verify::Verifier;

/// Build the HTTP client settings from the `[upstream]` section and secrets.
pub fn client_config(upstream: &UpstreamConfig, secrets: &Secrets) -> CatalogClientConfig {
    CatalogClientConfig {
        base_url: upstream.base_url.clone(),
        token_url: upstream.token_url.clone(),
        client_id: secrets.client_id.clone(),
        client_secret: secrets.client_secret.clone(),
        timeout: Duration::from_secs(upstream.timeout_secs),
        min_request_interval: Duration::from_millis(upstream.min_request_interval_ms),
        credential_margin: Duration::from_secs(upstream.credential_margin_secs),
        retry: RetryPolicy {
            max_attempts: upstream.max_attempts,
            transport_delay: Duration::from_millis(upstream.retry_delay_ms),
            default_retry_after: Duration::from_secs(upstream.default_retry_after_secs),
            max_retry_after: Duration::from_secs(upstream.max_retry_after_secs),
        },
    }
}

/// Runs one page of discovery: plan a query, search, fetch details, match,
/// filter, verify. Retries with a fresh query until an attempt yields a
/// result or the attempt budget runs out.
pub struct Scanner<R = StdRng> {
    catalog: Arc<dyn CatalogApi>,
    config: ScanConfig,
    matcher: OwnershipMatcher,
    filter: CandidateFilter,
    planner: QueryPlanner<R>,
    today: NaiveDate,
}

impl Scanner<StdRng> {
    pub fn new(catalog: Arc<dyn CatalogApi>, config: ScanConfig) -> Result<Self, ScanError> {
        let today = Utc::now().date_naive();
        Self::with_rng(catalog, config, StdRng::from_os_rng(), today)
    }
}

impl<R: Rng> Scanner<R> {
    /// Scanner with a caller-supplied RNG and calendar date, for
    /// reproducible runs.
    pub fn with_rng(
        catalog: Arc<dyn CatalogApi>,
        config: ScanConfig,
        rng: R,
        today: NaiveDate,
    ) -> Result<Self, ScanError> {
        config.validate()?;
        let matcher = OwnershipMatcher::new(&config.matching)?;
        let filter = CandidateFilter::new(&config.filters);
        let planner = QueryPlanner::new(&config.scan, today.year(), rng);

        Ok(Self {
            catalog,
            config,
            matcher,
            filter,
            planner,
            today,
        })
    }

    /// One scan invocation. Never returns a creator listed in
    /// `request.already_found_ids`, and never the same creator twice.
    /// Finding nothing is `Ok` with an empty list; only credential failures
    /// are errors.
    pub async fn scan(&mut self, request: &ScanRequest) -> Result<ScanResponse, ScanError> {
        let max_attempts = self.config.scan.max_attempts;
        let max_results = self.config.scan.max_results;

        info!(
            page = ?request.page_index,
            already_found = request.already_found_ids.len(),
            max_attempts,
            "Starting scan"
        );

        let mut seen = request.already_found_ids.clone();
        let mut rejected = HashSet::new();
        let mut results = Vec::new();
        let mut stats = ScanStats::default();

        for attempt in 1..=max_attempts {
            stats.attempts = attempt;
            let added = self
                .run_attempt(attempt, &mut seen, &mut rejected, &mut results, &mut stats)
                .await?;

            if added > 0 || results.len() >= max_results {
                break;
            }
            debug!(attempt, "Attempt yielded nothing, retrying with a fresh query");
        }

        stats.verified = results.len();
        info!(
            page = ?request.page_index,
            attempts = stats.attempts,
            works = stats.works_inspected,
            matched = stats.candidates_matched,
            filtered = stats.filtered_out,
            rejected = stats.verification_rejected,
            verified = stats.verified,
            phase = %ScanPhase::Done,
            "Scan complete"
        );

        Ok(ScanResponse { results, stats })
    }

    /// Returns how many results this attempt added.
    async fn run_attempt(
        &mut self,
        attempt: u32,
        seen: &mut HashSet<String>,
        rejected: &mut HashSet<String>,
        results: &mut Vec<VerifiedResult>,
        stats: &mut ScanStats,
    ) -> Result<usize, ScanError> {
        // Querying
        let query = self.planner.next_query(attempt);
        let page = match self.search(query).await {
            Ok(page) => page,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(attempt, phase = %ScanPhase::Querying, error = %e, "Search failed");
                return Ok(0);
            }
        };

        let known = |id: &str| seen.contains(id) || rejected.contains(id);
        let work_ids: Vec<String> = page
            .items
            .iter()
            .filter(|w| w.creators.first().is_some_and(|c| !known(c.id.as_str())))
            .map(|w| w.id.clone())
            .collect();
        if work_ids.is_empty() {
            debug!(attempt, hits = page.items.len(), "No unseen creators on page");
            return Ok(0);
        }

        // Batching
        let batcher = DetailBatcher::new(self.catalog.as_ref(), &self.config.upstream);
        let works = batcher.fetch_work_details(&work_ids).await?;
        stats.works_inspected += works.items.len();
        stats.chunks_skipped += works.chunks_skipped;
        debug!(attempt, phase = %ScanPhase::Batching, works = works.items.len(), "Fetched work details");

        // Matching
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut queued = HashSet::new();
        for work in &works.items {
            let Some(owner) = work.primary_creator() else {
                continue;
            };
            if known(owner.id.as_str()) || queued.contains(&owner.id) {
                continue;
            }
            if let Some(kind) = self.matcher.matches(work, &owner.name) {
                queued.insert(owner.id.clone());
                candidates.push(Candidate {
                    creator_id: owner.id.clone(),
                    display_name: owner.name.clone(),
                    profile_url: owner.profile_url(),
                    initial_match: kind,
                    matched_work_id: work.id.clone(),
                });
            }
        }
        stats.candidates_matched += candidates.len();
        debug!(attempt, phase = %ScanPhase::Matching, candidates = candidates.len(), "Matched ownership");
        if candidates.is_empty() {
            return Ok(0);
        }

        // Filtering
        let ids: Vec<String> = candidates.iter().map(|c| c.creator_id.clone()).collect();
        let creators = batcher.fetch_creator_details(&ids).await?;
        stats.chunks_skipped += creators.chunks_skipped;
        let mut by_id: HashMap<String, _> = creators
            .items
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        let mut plausible = Vec::new();
        for candidate in candidates {
            let Some(creator) = by_id.remove(&candidate.creator_id) else {
                debug!(creator_id = candidate.creator_id.as_str(), "No creator record");
                rejected.insert(candidate.creator_id);
                stats.filtered_out += 1;
                continue;
            };
            if let Some(reason) = self.filter.rejection(&creator) {
                debug!(creator_id = creator.id.as_str(), name = creator.name.as_str(), %reason, "Filtered out");
                rejected.insert(candidate.creator_id);
                stats.filtered_out += 1;
                continue;
            }
            plausible.push((candidate, creator));
        }
        debug!(attempt, phase = %ScanPhase::Filtering, plausible = plausible.len(), "Filtered candidates");
        if plausible.is_empty() {
            return Ok(0);
        }

        // Verifying
        let verifier = Verifier::new(
            self.catalog.as_ref(),
            &self.matcher,
            &self.config.verification,
            self.today,
        );
        let outcomes = verifier.verify_all(plausible).await;

        let mut added = 0;
        for (creator_id, outcome) in outcomes {
            match outcome {
                Some(result) => {
                    if results.len() >= self.config.scan.max_results {
                        continue;
                    }
                    if seen.insert(creator_id) {
                        info!(creator_id = result.id.as_str(), name = result.name.as_str(), followers = result.follower_count, "Verified creator");
                        results.push(result);
                        added += 1;
                    }
                }
                None => {
                    rejected.insert(creator_id);
                    stats.verification_rejected += 1;
                }
            }
        }
        debug!(attempt, phase = %ScanPhase::Verifying, added, "Verification complete");

        Ok(added)
    }

    /// Search once; if the offset landed past the end of a non-empty result
    /// set, retry once at the last valid page.
    async fn search(&mut self, query: SearchQuery) -> Result<SearchPage, CatalogError> {
        let page = self.catalog.search_works(&query).await?;
        self.planner.observe_total(&query.q, page.total);

        if page.items.is_empty() {
            if let Some(clamped) = clamp_offset(&query, page.total) {
                debug!(q = query.q.as_str(), from = query.offset, to = clamped.offset, total = page.total, "Offset past end, clamping");
                return self.catalog.search_works(&clamped).await;
            }
        }

        debug!(q = query.q.as_str(), hits = page.items.len(), total = page.total, phase = %ScanPhase::Querying, "Search returned");
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_maps_upstream_section() {
        let upstream = UpstreamConfig {
            timeout_secs: 7,
            min_request_interval_ms: 250,
            max_attempts: 3,
            ..UpstreamConfig::default()
        };
        let secrets = Secrets {
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
        };

        let config = client_config(&upstream, &secrets);

        assert_eq!(config.timeout, Duration::from_secs(7));
        assert_eq!(config.min_request_interval, Duration::from_millis(250));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.client_id.as_deref(), Some("id"));
    }
}
