//! Ownership matcher. Decides whether a work's copyright lines point at a
//! self-release: either a self-service distributor marker, or the creator's
//! own name standing in as the rights holder.
//!
//! Major-label markers veto a work outright, whatever else its lines say.
//! Everything here is pure and synchronous.

use std::sync::LazyLock;

use regex::Regex;

use catalog_client::Work;
use indiescan_common::{MatchKind, MatchingConfig, NameMatchMode};

static RE_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{4}\b").unwrap());

/// Canonical form for comparing creator names: lowercase, leading "the "
/// dropped, everything but letters and digits removed.
pub fn normalize_name(raw: &str) -> String {
    fold(raw, true)
}

/// Canonical form for an ownership line: year tokens removed, then
/// normalized like a name.
pub fn normalize_ownership(raw: &str) -> String {
    normalize_name(&RE_YEAR.replace_all(raw, " "))
}

fn fold(raw: &str, strip_article: bool) -> String {
    let lower = raw.trim().to_lowercase();
    let lower = lower.trim_start_matches(|c: char| !c.is_alphanumeric());
    let body = if strip_article {
        lower.strip_prefix("the ").unwrap_or(lower)
    } else {
        lower
    };
    body.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Lowercase with all whitespace removed, so "Def  Jam" and "DefJam" compare
/// equal.
fn compact(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

pub struct OwnershipMatcher {
    mode: NameMatchMode,
    distributor: Regex,
    /// Compacted label names, matched as substrings.
    major_labels: Vec<String>,
    /// Normalized, longest first.
    suffixes: Vec<String>,
}

impl OwnershipMatcher {
    pub fn new(config: &MatchingConfig) -> Result<Self, regex::Error> {
        let distributor = Regex::new(&config.distributor_pattern)?;

        let mut major_labels: Vec<String> = config
            .major_labels
            .iter()
            .map(|label| compact(label))
            .filter(|label| !label.is_empty())
            .collect();
        major_labels.sort();
        major_labels.dedup();

        let mut suffixes: Vec<String> = config
            .allowed_suffixes
            .iter()
            .map(|s| normalize_name(s))
            .filter(|s| !s.is_empty())
            .collect();
        suffixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        suffixes.dedup();

        Ok(Self {
            mode: config.name_match,
            distributor,
            major_labels,
            suffixes,
        })
    }

    /// True if the text contains a major label anywhere, including inside
    /// a longer word ("SonyMusic").
    pub fn is_vetoed(&self, text: &str) -> bool {
        if self.major_labels.is_empty() {
            return false;
        }
        let text = compact(text);
        self.major_labels
            .iter()
            .any(|label| text.contains(label.as_str()))
    }

    pub fn has_distributor_marker(&self, text: &str) -> bool {
        self.distributor.is_match(text)
    }

    /// Classify a work's ownership lines against the given creator name.
    /// Distributor markers win over name matches; a major-label line anywhere
    /// on the work returns `None`.
    pub fn matches(&self, work: &Work, creator_name: &str) -> Option<MatchKind> {
        let lines = &work.ownership_lines;

        if lines.iter().any(|line| self.is_vetoed(&line.text)) {
            return None;
        }

        if lines
            .iter()
            .any(|line| self.has_distributor_marker(&line.text))
        {
            return Some(MatchKind::DistributorMarker);
        }

        if self.mode == NameMatchMode::Off {
            return None;
        }

        let name = normalize_name(creator_name);
        if name.is_empty() {
            return None;
        }

        // A leading "The" on the line may belong to the name itself ("The"
        // releasing as "The Records"), so try the line with and without it.
        lines
            .iter()
            .any(|line| {
                let text = RE_YEAR.replace_all(&line.text, " ");
                self.name_matches(&name, &fold(&text, true))
                    || self.name_matches(&name, &fold(&text, false))
            })
            .then_some(MatchKind::NameMatch)
    }

    fn name_matches(&self, name: &str, line: &str) -> bool {
        if line == name {
            return true;
        }
        if self.mode != NameMatchMode::Suffix {
            return false;
        }
        match line.strip_prefix(name) {
            Some(rest) => self.only_suffixes(rest),
            None => false,
        }
    }

    /// True if `rest` is one or more allowed suffixes run together
    /// ("musicllc" for "Music LLC").
    fn only_suffixes(&self, mut rest: &str) -> bool {
        while !rest.is_empty() {
            match self.suffixes.iter().find(|s| rest.starts_with(s.as_str())) {
                Some(suffix) => rest = &rest[suffix.len()..],
                None => return false,
            }
        }
        true
    }
}
