use std::fmt;

use catalog_client::Creator;
use indiescan_common::FilterConfig;

/// Why a matched creator was dropped before verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    BlockedKeyword(String),
    NoImage,
    TooManyFollowers(u64),
    BelowPopularityFloor(u32),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::BlockedKeyword(k) => write!(f, "name contains blocked keyword '{k}'"),
            Rejection::NoImage => write!(f, "no profile image"),
            Rejection::TooManyFollowers(n) => write!(f, "{n} followers is over the ceiling"),
            Rejection::BelowPopularityFloor(p) => write!(f, "popularity {p} is under the floor"),
        }
    }
}

/// Quality gates that narrow ownership matches down to plausible
/// independent creators.
pub struct CandidateFilter {
    follower_ceiling: u64,
    popularity_floor: u32,
    require_image: bool,
    /// Lowercased.
    blocked_keywords: Vec<String>,
}

impl CandidateFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            follower_ceiling: config.follower_ceiling,
            popularity_floor: config.popularity_floor,
            require_image: config.require_image,
            blocked_keywords: config
                .blocked_keywords
                .iter()
                .filter(|k| !k.trim().is_empty())
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }

    pub fn is_plausible(&self, creator: &Creator) -> bool {
        self.rejection(creator).is_none()
    }

    /// First failing gate, checked in order: keywords, image, followers, popularity.
    pub fn rejection(&self, creator: &Creator) -> Option<Rejection> {
        let name = creator.name.to_lowercase();
        if let Some(keyword) = self
            .blocked_keywords
            .iter()
            .find(|k| name.contains(k.as_str()))
        {
            return Some(Rejection::BlockedKeyword(keyword.clone()));
        }

        if self.require_image && !creator.has_image() {
            return Some(Rejection::NoImage);
        }

        if creator.follower_count() >= self.follower_ceiling {
            return Some(Rejection::TooManyFollowers(creator.follower_count()));
        }

        if creator.popularity < self.popularity_floor {
            return Some(Rejection::BelowPopularityFloor(creator.popularity));
        }

        None
    }
}
