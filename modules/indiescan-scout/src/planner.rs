//! Randomized search planning.
//!
//! Top-ranked pagination only ever surfaces established creators. Each call
//! here draws a fresh slice of recent releases instead: a random one or two
//! letter prefix wildcard (or, some of the time, a curated query), a year
//! filter, a random market and a random offset.

use std::collections::HashMap;

use rand::Rng;
use tracing::debug;

use catalog_client::{SearchQuery, MAX_SEARCH_WINDOW};
use indiescan_common::ScanLimits;

pub struct QueryPlanner<R> {
    rng: R,
    limits: ScanLimits,
    year: i32,
    /// Total hits last reported for each query string.
    known_totals: HashMap<String, u64>,
}

impl<R: Rng> QueryPlanner<R> {
    pub fn new(limits: &ScanLimits, year: i32, rng: R) -> Self {
        Self {
            rng,
            limits: limits.clone(),
            year,
            known_totals: HashMap::new(),
        }
    }

    pub fn next_query(&mut self, attempt: u32) -> SearchQuery {
        let curated = &self.limits.curated_queries;
        let base = if !curated.is_empty() && self.rng.random_bool(self.limits.curated_query_share)
        {
            curated[self.rng.random_range(0..curated.len())].clone()
        } else {
            self.random_prefix()
        };

        let q = format!("{base} {}", self.year_filter());
        let offset = self.random_offset(&q);
        let market = self.random_market();

        debug!(attempt, q = q.as_str(), offset, market = market.as_str(), "Planned search");

        SearchQuery {
            q,
            offset,
            limit: self.limits.search_limit,
            market,
        }
    }

    /// Remember how many hits a query has so later offsets stay inside it.
    pub fn observe_total(&mut self, q: &str, total: u64) {
        self.known_totals.insert(q.to_string(), total);
    }

    fn year_filter(&self) -> String {
        if self.limits.recent_years > 0 {
            format!("year:{}-{}", self.year - self.limits.recent_years, self.year)
        } else {
            format!("year:{}", self.year)
        }
    }

    fn random_prefix(&mut self) -> String {
        let len = if self.rng.random_bool(0.5) { 1 } else { 2 };
        let mut prefix: String = (0..len)
            .map(|_| char::from(b'a' + self.rng.random_range(0..26u8)))
            .collect();
        prefix.push('*');
        prefix
    }

    fn random_market(&mut self) -> String {
        let markets = &self.limits.markets;
        if markets.is_empty() {
            return "US".to_string();
        }
        markets[self.rng.random_range(0..markets.len())].clone()
    }

    /// Highest offset worth drawing for `q`: the configured ceiling, the
    /// upstream paging window, and the last reported total, whichever is
    /// smallest.
    fn max_offset(&self, q: &str) -> u32 {
        let limit = self.limits.search_limit;
        let mut max = self
            .limits
            .max_offset
            .min(MAX_SEARCH_WINDOW.saturating_sub(limit));
        if let Some(&total) = self.known_totals.get(q) {
            let last_page = total.saturating_sub(u64::from(limit));
            max = max.min(u32::try_from(last_page).unwrap_or(u32::MAX));
        }
        max
    }

    fn random_offset(&mut self, q: &str) -> u32 {
        let max = self.max_offset(q);
        self.rng.random_range(0..=max)
    }
}

/// If `query` starts past the reported total, move it to the last full page.
/// Returns `None` when the query is already in range or has no hits at all.
pub fn clamp_offset(query: &SearchQuery, total: u64) -> Option<SearchQuery> {
    if total == 0 || u64::from(query.offset) < total {
        return None;
    }
    let offset = total.saturating_sub(u64::from(query.limit));
    Some(SearchQuery {
        offset: u32::try_from(offset).unwrap_or(0),
        ..query.clone()
    })
}
