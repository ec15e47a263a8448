//! End-to-end scan scenarios against the in-memory catalog.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;

use catalog_client::CatalogError;
use indiescan_common::{MatchKind, ScanConfig, ScanRequest};
use indiescan_scout::testing::{creator, work, MockCatalog};
use indiescan_scout::{ScanError, Scanner};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

/// Defaults, except every search starts at offset 0 and three attempts max.
fn config() -> ScanConfig {
    let mut config = ScanConfig::default();
    config.scan.max_offset = 0;
    config.scan.max_attempts = 3;
    config
}

fn scanner(mock: MockCatalog, config: ScanConfig) -> (Arc<MockCatalog>, Scanner<StdRng>) {
    let mock = Arc::new(mock);
    let scanner = Scanner::with_rng(mock.clone(), config, StdRng::seed_from_u64(7), today())
        .expect("valid config");
    (mock, scanner)
}

/// A searchable release plus the creator record and a one-item discography.
fn indie(mock: MockCatalog, creator_id: &str, name: &str, work_id: &str, line: &str) -> MockCatalog {
    let w = work(work_id, "2026-05-01", &[line], (creator_id, name));
    mock.with_search_hit(w.clone())
        .with_creator(creator(creator_id, name, 120, 3))
        .with_discography(creator_id, vec![w])
}

/// Works A, B and C: a distributor marker, a major label and a name match.
fn abc_catalog() -> MockCatalog {
    let mock = indie(MockCatalog::new(), "a1", "Alpha Lane", "wa", "2024 Records DK");
    let mock = indie(mock, "a2", "Beta Band", "wb", "2024 Sony Music");
    indie(mock, "a3", "Jane Doe", "wc", "2024 Jane Doe")
}

fn ids(response: &indiescan_common::ScanResponse) -> HashSet<String> {
    response.results.iter().map(|r| r.id.clone()).collect()
}

#[tokio::test]
async fn distributor_and_name_matches_found_major_label_skipped() {
    let (mock, mut scanner) = scanner(abc_catalog(), config());

    let response = scanner.scan(&ScanRequest::default()).await.unwrap();

    assert_eq!(ids(&response), HashSet::from(["a1".to_string(), "a3".to_string()]));
    assert_eq!(response.stats.candidates_matched, 2);
    assert_eq!(response.stats.works_inspected, 3);
    assert_eq!(response.stats.attempts, 1);

    let by_id = |id: &str| response.results.iter().find(|r| r.id == id).unwrap();
    assert_eq!(by_id("a1").initial_match, MatchKind::DistributorMarker);
    assert_eq!(by_id("a3").initial_match, MatchKind::NameMatch);
    assert_eq!(by_id("a3").url, "https://open.spotify.com/artist/a3");

    // B never reaches the creator lookup.
    let looked_up: Vec<String> = mock.creator_batches().concat();
    assert!(!looked_up.contains(&"a2".to_string()));
}

#[tokio::test]
async fn creator_whose_latest_release_is_on_a_major_is_excluded() {
    let old = work("old", "2026-01-10", &["2024 Jane Doe"], ("a3", "Jane Doe"));
    let new = work("new", "2026-06-01", &["2025 Universal"], ("a3", "Jane Doe"));
    let mock = MockCatalog::new()
        .with_search_hit(old.clone())
        .with_creator(creator("a3", "Jane Doe", 120, 3))
        .with_discography("a3", vec![old, new]);
    let (mock, mut scanner) = scanner(mock, config());

    let response = scanner.scan(&ScanRequest::default()).await.unwrap();

    assert!(response.results.is_empty());
    assert_eq!(response.stats.candidates_matched, 1);
    assert_eq!(response.stats.verification_rejected, 1);
    assert_eq!(response.stats.attempts, 3);
    // Later attempts remember the rejection instead of verifying again.
    assert_eq!(mock.discography_requests(), vec!["a3".to_string()]);
}

#[tokio::test]
async fn already_found_creators_are_never_returned() {
    let (_, mut scanner) = scanner(abc_catalog(), config());
    let request = ScanRequest {
        page_index: Some(2),
        already_found_ids: HashSet::from(["a3".to_string()]),
    };

    let response = scanner.scan(&request).await.unwrap();

    assert_eq!(ids(&response), HashSet::from(["a1".to_string()]));
}

#[tokio::test]
async fn rescan_with_everything_found_returns_nothing() {
    let (_, mut scanner) = scanner(abc_catalog(), config());

    let first = scanner.scan(&ScanRequest::default()).await.unwrap();
    assert!(!first.results.is_empty());

    let second = scanner
        .scan(&ScanRequest {
            page_index: Some(1),
            already_found_ids: ids(&first),
        })
        .await
        .unwrap();

    assert!(second.results.is_empty());
    assert_eq!(second.stats.attempts, 3);
}

#[tokio::test]
async fn auth_failure_aborts_the_scan() {
    let (_, mut scanner) = scanner(abc_catalog().with_auth_failure(), config());

    let err = scanner.scan(&ScanRequest::default()).await.unwrap_err();

    assert!(matches!(err, ScanError::Catalog(CatalogError::Auth(_))));
}

#[tokio::test]
async fn failed_detail_chunk_does_not_void_the_scan() {
    let mut mock = MockCatalog::new();
    for i in 0..25 {
        mock = indie(
            mock,
            &format!("a{i}"),
            &format!("Creator {i}"),
            &format!("w{i}"),
            "2026 DistroKid",
        );
    }
    let mut config = config();
    config.scan.max_results = 10;
    let (_, mut scanner) = scanner(mock.failing_work("w0"), config);

    let response = scanner.scan(&ScanRequest::default()).await.unwrap();

    assert_eq!(response.stats.chunks_skipped, 1);
    assert_eq!(response.stats.works_inspected, 5);
    let expected: HashSet<String> = (20..25).map(|i| format!("a{i}")).collect();
    assert_eq!(ids(&response), expected);
}

#[tokio::test]
async fn failed_verification_is_a_non_match() {
    let (_, mut scanner) = scanner(abc_catalog().failing_discography("a1"), config());

    let response = scanner.scan(&ScanRequest::default()).await.unwrap();

    assert_eq!(ids(&response), HashSet::from(["a3".to_string()]));
    assert_eq!(response.stats.verification_rejected, 1);
}

#[tokio::test]
async fn results_are_capped_at_max_results() {
    let mut mock = MockCatalog::new();
    for i in 0..12 {
        mock = indie(
            mock,
            &format!("a{i}"),
            &format!("Creator {i}"),
            &format!("w{i}"),
            "2026 Records DK",
        );
    }
    let mut config = config();
    config.scan.max_results = 5;
    let (_, mut scanner) = scanner(mock, config);

    let response = scanner.scan(&ScanRequest::default()).await.unwrap();

    assert_eq!(response.results.len(), 5);
    assert_eq!(ids(&response).len(), 5);
    assert_eq!(response.stats.verified, 5);
}

#[tokio::test]
async fn creator_with_two_matching_works_is_reported_once() {
    let first = work("w1", "2026-02-01", &["2026 Records DK"], ("a1", "Alpha Lane"));
    let second = work("w2", "2026-04-01", &["2026 Alpha Lane Records"], ("a1", "Alpha Lane"));
    let mock = MockCatalog::new()
        .with_search_hit(first.clone())
        .with_search_hit(second.clone())
        .with_creator(creator("a1", "Alpha Lane", 40, 1))
        .with_discography("a1", vec![first, second]);
    let (mock, mut scanner) = scanner(mock, config());

    let response = scanner.scan(&ScanRequest::default()).await.unwrap();

    assert_eq!(response.results.len(), 1);
    assert_eq!(response.stats.candidates_matched, 1);
    assert_eq!(response.results[0].latest_release, "2026-04-01");
    assert_eq!(mock.creator_batches(), vec![vec!["a1".to_string()]]);
}

#[tokio::test]
async fn popular_creators_are_filtered_before_verification() {
    let w = work("wp", "2026-05-01", &["2026 Famous Person"], ("ap", "Famous Person"));
    let mock = indie(MockCatalog::new(), "a1", "Alpha Lane", "wa", "2024 Records DK")
        .with_search_hit(w.clone())
        .with_creator(creator("ap", "Famous Person", 2_000_000, 80))
        .with_discography("ap", vec![w]);
    let (mock, mut scanner) = scanner(mock, config());

    let response = scanner.scan(&ScanRequest::default()).await.unwrap();

    assert_eq!(ids(&response), HashSet::from(["a1".to_string()]));
    assert_eq!(response.stats.filtered_out, 1);
    assert!(!mock.discography_requests().contains(&"ap".to_string()));
}

#[tokio::test]
async fn empty_catalog_exhausts_attempts_without_error() {
    let (mock, mut scanner) = scanner(MockCatalog::new(), config());

    let response = scanner.scan(&ScanRequest::default()).await.unwrap();

    assert!(response.results.is_empty());
    assert_eq!(response.stats.attempts, 3);
    assert_eq!(mock.searches().len(), 3);
    assert!(mock.work_batches().is_empty());
}

#[tokio::test]
async fn same_seed_issues_same_queries() {
    let (first, mut a) = scanner(MockCatalog::new(), config());
    let (second, mut b) = scanner(MockCatalog::new(), config());

    a.scan(&ScanRequest::default()).await.unwrap();
    b.scan(&ScanRequest::default()).await.unwrap();

    assert_eq!(first.searches(), second.searches());
    assert!(first
        .searches()
        .iter()
        .all(|q| q.q.ends_with("year:2026") && q.offset == 0));
}
