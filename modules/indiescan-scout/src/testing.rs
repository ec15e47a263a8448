// Test doubles for the scan pipeline.
//
// MockCatalog (CatalogApi) is an in-memory catalog: search hits, work
// details, creator records and discographies, plus injectable failures.
// Every call is recorded so tests can assert on request shape.
//
// Plus helpers for building Work / Creator fixtures.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use catalog_client::{
    CatalogError, Creator, CreatorRef, ExternalUrls, Followers, Image, OwnershipKind,
    OwnershipLine, Result, SearchPage, SearchQuery, Work, WorkSummary,
};

use crate::traits::CatalogApi;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A work with one ℗ line per entry in `lines`, owned by `creator` (id, name).
pub fn work(id: &str, release_date: &str, lines: &[&str], creator: (&str, &str)) -> Work {
    Work {
        id: id.to_string(),
        title: format!("Title {id}"),
        release_date: release_date.to_string(),
        ownership_lines: lines
            .iter()
            .map(|text| OwnershipLine {
                text: text.to_string(),
                kind: OwnershipKind::Performance,
            })
            .collect(),
        creators: vec![CreatorRef {
            id: creator.0.to_string(),
            name: creator.1.to_string(),
            external_urls: ExternalUrls {
                spotify: Some(format!("https://open.spotify.com/artist/{}", creator.0)),
            },
        }],
    }
}

/// A creator with one profile image.
pub fn creator(id: &str, name: &str, followers: u64, popularity: u32) -> Creator {
    Creator {
        id: id.to_string(),
        name: name.to_string(),
        followers: Followers { total: followers },
        popularity,
        images: vec![Image {
            url: format!("https://img.example/{id}.jpg"),
            width: Some(640),
            height: Some(640),
        }],
        genres: vec![],
        external_urls: ExternalUrls {
            spotify: Some(format!("https://open.spotify.com/artist/{id}")),
        },
    }
}

/// The search-result view of a work.
pub fn summary(work: &Work) -> WorkSummary {
    WorkSummary {
        id: work.id.clone(),
        title: work.title.clone(),
        release_date: work.release_date.clone(),
        creators: work.creators.clone(),
    }
}

// ---------------------------------------------------------------------------
// MockCatalog
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Calls {
    searches: Vec<SearchQuery>,
    work_batches: Vec<Vec<String>>,
    creator_batches: Vec<Vec<String>>,
    creator_works: Vec<String>,
}

/// In-memory catalog. Search pages over the registered hits honouring
/// offset and limit; unknown ids in bulk lookups are skipped like the
/// upstream's null entries.
/// Builder pattern: `.with_search_hit()`, `.with_creator()`, `.with_discography()`.
#[derive(Default)]
pub struct MockCatalog {
    search_hits: Vec<WorkSummary>,
    works: HashMap<String, Work>,
    creators: HashMap<String, Creator>,
    discographies: HashMap<String, Vec<WorkSummary>>,
    failing_works: HashSet<String>,
    failing_discographies: HashSet<String>,
    auth_failure: bool,
    calls: Mutex<Calls>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a work as both a search hit and a detail record.
    pub fn with_search_hit(mut self, work: Work) -> Self {
        self.search_hits.push(summary(&work));
        self.works.insert(work.id.clone(), work);
        self
    }

    /// Register a detail record that search never returns.
    pub fn with_work(mut self, work: Work) -> Self {
        self.works.insert(work.id.clone(), work);
        self
    }

    pub fn with_creator(mut self, creator: Creator) -> Self {
        self.creators.insert(creator.id.clone(), creator);
        self
    }

    /// The creator's own releases. Each is also registered as a detail record.
    pub fn with_discography(mut self, creator_id: &str, works: Vec<Work>) -> Self {
        let summaries = works.iter().map(summary).collect();
        for w in works {
            self.works.insert(w.id.clone(), w);
        }
        self.discographies.insert(creator_id.to_string(), summaries);
        self
    }

    /// Any detail chunk containing `id` fails with a 500.
    pub fn failing_work(mut self, id: &str) -> Self {
        self.failing_works.insert(id.to_string());
        self
    }

    /// The creator's discography lookup fails with a 500.
    pub fn failing_discography(mut self, creator_id: &str) -> Self {
        self.failing_discographies.insert(creator_id.to_string());
        self
    }

    /// Every call fails as if the credential exchange were rejected.
    pub fn with_auth_failure(mut self) -> Self {
        self.auth_failure = true;
        self
    }

    pub fn searches(&self) -> Vec<SearchQuery> {
        self.calls.lock().unwrap().searches.clone()
    }

    pub fn work_batches(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().work_batches.clone()
    }

    pub fn creator_batches(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().creator_batches.clone()
    }

    /// Creator ids whose discography was requested, in call order.
    pub fn discography_requests(&self) -> Vec<String> {
        self.calls.lock().unwrap().creator_works.clone()
    }

    fn check_auth(&self) -> Result<()> {
        if self.auth_failure {
            return Err(CatalogError::Auth("client credentials rejected".to_string()));
        }
        Ok(())
    }
}

fn server_error() -> CatalogError {
    CatalogError::Api {
        status: 500,
        message: "MockCatalog: injected failure".to_string(),
    }
}

#[async_trait]
impl CatalogApi for MockCatalog {
    async fn search_works(&self, query: &SearchQuery) -> Result<SearchPage> {
        self.calls.lock().unwrap().searches.push(query.clone());
        self.check_auth()?;

        let items = self
            .search_hits
            .iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok(SearchPage {
            items,
            total: self.search_hits.len() as u64,
        })
    }

    async fn works(&self, ids: &[String]) -> Result<Vec<Work>> {
        self.calls.lock().unwrap().work_batches.push(ids.to_vec());
        self.check_auth()?;

        if ids.iter().any(|id| self.failing_works.contains(id)) {
            return Err(server_error());
        }
        Ok(ids.iter().filter_map(|id| self.works.get(id).cloned()).collect())
    }

    async fn creators(&self, ids: &[String]) -> Result<Vec<Creator>> {
        self.calls.lock().unwrap().creator_batches.push(ids.to_vec());
        self.check_auth()?;

        Ok(ids
            .iter()
            .filter_map(|id| self.creators.get(id).cloned())
            .collect())
    }

    async fn creator_works(&self, creator_id: &str, limit: u32) -> Result<Vec<WorkSummary>> {
        self.calls
            .lock()
            .unwrap()
            .creator_works
            .push(creator_id.to_string());
        self.check_auth()?;

        if self.failing_discographies.contains(creator_id) {
            return Err(server_error());
        }
        Ok(self
            .discographies
            .get(creator_id)
            .map(|works| works.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }
}
