use serde::{Deserialize, Serialize};

// --- Search ---

/// A single search call: query string plus paging window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub q: String,
    pub offset: u32,
    pub limit: u32,
    pub market: String,
}

/// One page of search results plus the upstream's total hit count.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub items: Vec<WorkSummary>,
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub albums: Paging<WorkSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

// --- Works ---

/// A release as it appears in search results and discography listings.
/// Carries no ownership lines; those require a detail lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSummary {
    pub id: String,
    #[serde(rename = "name")]
    pub title: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(rename = "artists", default)]
    pub creators: Vec<CreatorRef>,
}

/// Full release record from the bulk detail endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    pub id: String,
    #[serde(rename = "name")]
    pub title: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(rename = "copyrights", default)]
    pub ownership_lines: Vec<OwnershipLine>,
    #[serde(rename = "artists", default)]
    pub creators: Vec<CreatorRef>,
}

impl Work {
    /// The first-listed creator, which the catalog treats as the release owner.
    pub fn primary_creator(&self) -> Option<&CreatorRef> {
        self.creators.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipLine {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: OwnershipKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnershipKind {
    /// Sound recording rights (the ℗ line).
    #[serde(rename = "P")]
    Performance,
    /// Composition rights (the © line).
    #[serde(rename = "C")]
    Composition,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorksResponse {
    #[serde(rename = "albums")]
    pub works: Vec<Option<Work>>,
}

// --- Creators ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

/// Lightweight creator reference embedded in a work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

impl CreatorRef {
    pub fn profile_url(&self) -> String {
        profile_url(&self.id, &self.external_urls)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Followers {
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Enriched creator record from the bulk creator endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub followers: Followers,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

impl Creator {
    pub fn follower_count(&self) -> u64 {
        self.followers.total
    }

    pub fn has_image(&self) -> bool {
        !self.images.is_empty()
    }

    pub fn profile_url(&self) -> String {
        profile_url(&self.id, &self.external_urls)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatorsResponse {
    #[serde(rename = "artists")]
    pub creators: Vec<Option<Creator>>,
}

fn profile_url(id: &str, urls: &ExternalUrls) -> String {
    urls.spotify
        .clone()
        .unwrap_or_else(|| format!("https://open.spotify.com/artist/{id}"))
}

// --- Credentials ---

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_deserializes_ownership_lines() {
        let json = r#"{
            "id": "w1",
            "name": "First Light",
            "release_date": "2025-03-14",
            "copyrights": [
                {"text": "2025 Jane Doe", "type": "C"},
                {"text": "2025 Jane Doe Records", "type": "P"}
            ],
            "artists": [{"id": "a1", "name": "Jane Doe"}]
        }"#;

        let work: Work = serde_json::from_str(json).unwrap();
        assert_eq!(work.title, "First Light");
        assert_eq!(work.ownership_lines.len(), 2);
        assert_eq!(work.ownership_lines[0].kind, OwnershipKind::Composition);
        assert_eq!(work.ownership_lines[1].kind, OwnershipKind::Performance);
        assert_eq!(work.primary_creator().unwrap().id, "a1");
    }

    #[test]
    fn creator_missing_optional_fields_uses_defaults() {
        let creator: Creator = serde_json::from_str(r#"{"id": "a1", "name": "Jane"}"#).unwrap();
        assert_eq!(creator.follower_count(), 0);
        assert!(!creator.has_image());
        assert_eq!(creator.profile_url(), "https://open.spotify.com/artist/a1");
    }

    #[test]
    fn null_entries_in_bulk_response_are_tolerated() {
        let json = r#"{"artists": [null, {"id": "a2", "name": "B", "followers": {"total": 12}}]}"#;
        let resp: CreatorsResponse = serde_json::from_str(json).unwrap();
        let creators: Vec<Creator> = resp.creators.into_iter().flatten().collect();
        assert_eq!(creators.len(), 1);
        assert_eq!(creators[0].follower_count(), 12);
    }
}
