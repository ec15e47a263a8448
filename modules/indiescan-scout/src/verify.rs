//! Verification stage.
//!
//! A candidate matched on *some* release. Before it is reported, its latest
//! release has to carry the same ownership signal; creators who have since
//! signed to a major drop out here. Candidates are verified concurrently on a
//! bounded pool; any fetch failure counts as a non-match.

use chrono::{Datelike, NaiveDate};
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use catalog_client::{CatalogError, Creator};
use indiescan_common::{Candidate, VerificationConfig, VerifiedResult};

use crate::ownership::OwnershipMatcher;
use crate::traits::CatalogApi;

pub struct Verifier<'a> {
    catalog: &'a dyn CatalogApi,
    matcher: &'a OwnershipMatcher,
    config: &'a VerificationConfig,
    today: NaiveDate,
}

impl<'a> Verifier<'a> {
    pub fn new(
        catalog: &'a dyn CatalogApi,
        matcher: &'a OwnershipMatcher,
        config: &'a VerificationConfig,
        today: NaiveDate,
    ) -> Self {
        Self {
            catalog,
            matcher,
            config,
            today,
        }
    }

    /// Verify every candidate with at most `workers` in flight. Returns one
    /// entry per input, keyed by creator id, in completion order.
    pub async fn verify_all(
        &self,
        candidates: Vec<(Candidate, Creator)>,
    ) -> Vec<(String, Option<VerifiedResult>)> {
        let workers = self.config.workers.max(1);

        stream::iter(candidates.into_iter().map(|(candidate, creator)| async move {
            let outcome = match self.verify(&candidate, &creator).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(creator_id = candidate.creator_id.as_str(), error = %e, "Verification failed");
                    None
                }
            };
            (candidate.creator_id, outcome)
        }))
        .buffer_unordered(workers)
        .collect()
        .await
    }

    /// Re-check the ownership signal on the creator's most recent release.
    pub async fn verify(
        &self,
        candidate: &Candidate,
        creator: &Creator,
    ) -> Result<Option<VerifiedResult>, CatalogError> {
        let creator_id = candidate.creator_id.as_str();
        let releases = self
            .catalog
            .creator_works(creator_id, self.config.lookback)
            .await?;

        if releases.len() < self.config.min_catalog_depth {
            debug!(creator_id, releases = releases.len(), "Catalog too shallow");
            return Ok(None);
        }

        // ISO dates of mixed precision still order correctly as strings.
        let Some(latest) = releases
            .iter()
            .reduce(|best, w| if w.release_date > best.release_date { w } else { best })
        else {
            debug!(creator_id, "No releases");
            return Ok(None);
        };

        if let Some(window) = self.config.recency_window_days {
            if !is_recent(&latest.release_date, self.today, window) {
                debug!(creator_id, release_date = latest.release_date.as_str(), window, "Latest release is stale");
                return Ok(None);
            }
        }

        let details = self.catalog.works(std::slice::from_ref(&latest.id)).await?;
        let Some(detail) = details.into_iter().next() else {
            debug!(creator_id, work_id = latest.id.as_str(), "Latest release has no detail record");
            return Ok(None);
        };

        if self.matcher.matches(&detail, &creator.name).is_none() {
            debug!(creator_id, work_id = detail.id.as_str(), "Latest release lost the ownership signal");
            return Ok(None);
        }

        Ok(Some(VerifiedResult {
            id: creator.id.clone(),
            name: creator.name.clone(),
            url: creator.profile_url(),
            follower_count: creator.follower_count(),
            popularity_score: creator.popularity,
            initial_match: candidate.initial_match,
            latest_release: detail.release_date,
        }))
    }
}

/// Last calendar day a release date can stand for: "2025" is 2025-12-31,
/// "2025-02" is 2025-02-28. `None` for anything unparseable.
pub fn release_end_date(date: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = date.trim().split('-').collect();
    match parts.as_slice() {
        [y, m, d] => NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?),
        [y, m] => last_day_of_month(y.parse().ok()?, m.parse().ok()?),
        [y] => NaiveDate::from_ymd_opt(y.parse().ok()?, 12, 31),
        _ => None,
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    next.pred_opt()
}

/// True if the release falls within `window_days` of `today`. Future dates
/// count as recent; unparseable dates do not.
pub fn is_recent(release_date: &str, today: NaiveDate, window_days: u32) -> bool {
    match release_end_date(release_date) {
        Some(end) => today.signed_duration_since(end).num_days() <= i64::from(window_days),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use indiescan_common::{MatchKind, MatchingConfig};

    use super::*;
    use crate::testing::{creator, work, MockCatalog};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn candidate(id: &str, name: &str) -> Candidate {
        Candidate {
            creator_id: id.to_string(),
            display_name: name.to_string(),
            profile_url: format!("https://open.spotify.com/artist/{id}"),
            initial_match: MatchKind::NameMatch,
            matched_work_id: "old".to_string(),
        }
    }

    fn matcher() -> OwnershipMatcher {
        OwnershipMatcher::new(&MatchingConfig::default()).unwrap()
    }

    #[test]
    fn end_date_pads_partial_dates() {
        assert_eq!(release_end_date("2025-03-14"), Some(day(2025, 3, 14)));
        assert_eq!(release_end_date("2024-02"), Some(day(2024, 2, 29)));
        assert_eq!(release_end_date("2025-12"), Some(day(2025, 12, 31)));
        assert_eq!(release_end_date("2025"), Some(day(2025, 12, 31)));
        assert_eq!(release_end_date(""), None);
        assert_eq!(release_end_date("soon"), None);
        assert_eq!(release_end_date("2025-13-01"), None);
    }

    #[test]
    fn recency_window_is_inclusive() {
        let today = day(2026, 10, 16);
        assert!(is_recent("2026-10-16", today, 0));
        assert!(is_recent("2025-10-16", today, 365));
        assert!(!is_recent("2025-10-15", today, 365));
        assert!(is_recent("2025", today, 365));
        assert!(is_recent("2027-01-01", today, 30));
        assert!(!is_recent("unknown", today, 10_000));
    }

    #[tokio::test]
    async fn latest_release_still_self_released_is_verified() {
        let mock = MockCatalog::new().with_discography(
            "a1",
            vec![
                work("old", "2024-01-01", &["2024 Jane Doe"], ("a1", "Jane Doe")),
                work("new", "2026-09-01", &["2026 Jane Doe Music"], ("a1", "Jane Doe")),
            ],
        );
        let m = matcher();
        let config = VerificationConfig::default();
        let verifier = Verifier::new(&mock, &m, &config, day(2026, 10, 16));

        let result = verifier
            .verify(&candidate("a1", "Jane Doe"), &creator("a1", "Jane Doe", 120, 7))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.latest_release, "2026-09-01");
        assert_eq!(result.follower_count, 120);
        assert_eq!(result.popularity_score, 7);
        assert_eq!(result.initial_match, MatchKind::NameMatch);
        assert_eq!(mock.work_batches(), vec![vec!["new"]]);
    }

    #[tokio::test]
    async fn signing_to_major_fails_verification() {
        let mock = MockCatalog::new().with_discography(
            "a1",
            vec![
                work("old", "2024-01-01", &["2024 Jane Doe"], ("a1", "Jane Doe")),
                work("new", "2025-06-01", &["2025 Universal"], ("a1", "Jane Doe")),
            ],
        );
        let m = matcher();
        let config = VerificationConfig {
            recency_window_days: None,
            ..VerificationConfig::default()
        };
        let verifier = Verifier::new(&mock, &m, &config, day(2026, 10, 16));

        let result = verifier
            .verify(&candidate("a1", "Jane Doe"), &creator("a1", "Jane Doe", 120, 7))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn stale_latest_release_is_rejected_without_detail_fetch() {
        let mock = MockCatalog::new().with_discography(
            "a1",
            vec![work("w", "2023-05-01", &["2023 Records DK"], ("a1", "Jane Doe"))],
        );
        let m = matcher();
        let config = VerificationConfig {
            recency_window_days: Some(90),
            ..VerificationConfig::default()
        };
        let verifier = Verifier::new(&mock, &m, &config, day(2026, 10, 16));

        let result = verifier
            .verify(&candidate("a1", "Jane Doe"), &creator("a1", "Jane Doe", 1, 0))
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(mock.work_batches().is_empty());
    }

    #[tokio::test]
    async fn shallow_catalog_is_rejected() {
        let mock = MockCatalog::new().with_discography(
            "a1",
            vec![work("w", "2026-05-01", &["2026 Records DK"], ("a1", "Jane Doe"))],
        );
        let m = matcher();
        let config = VerificationConfig {
            min_catalog_depth: 2,
            ..VerificationConfig::default()
        };
        let verifier = Verifier::new(&mock, &m, &config, day(2026, 10, 16));

        let result = verifier
            .verify(&candidate("a1", "Jane Doe"), &creator("a1", "Jane Doe", 1, 0))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn worker_failure_becomes_non_match() {
        let mock = MockCatalog::new()
            .with_discography(
                "a1",
                vec![work("w1", "2026-05-01", &["2026 Records DK"], ("a1", "Jane Doe"))],
            )
            .failing_discography("a2");
        let m = matcher();
        let config = VerificationConfig::default();
        let verifier = Verifier::new(&mock, &m, &config, day(2026, 10, 16));

        let mut outcomes = verifier
            .verify_all(vec![
                (candidate("a1", "Jane Doe"), creator("a1", "Jane Doe", 1, 0)),
                (candidate("a2", "John Roe"), creator("a2", "John Roe", 1, 0)),
            ])
            .await;
        outcomes.sort_by(|a, b| a.0.cmp(&b.0));

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].1.is_some());
        assert_eq!(outcomes[1], ("a2".to_string(), None));
    }
}
