use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a work's ownership text points at a self-release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// A known self-service distributor marker appears in the text.
    DistributorMarker,
    /// The creator's own name (optionally with a label-ish suffix) is the rights holder.
    NameMatch,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::DistributorMarker => write!(f, "distributor_marker"),
            MatchKind::NameMatch => write!(f, "name_match"),
        }
    }
}

/// A creator whose work matched the ownership signal, before quality and
/// verification gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub creator_id: String,
    pub display_name: String,
    pub profile_url: String,
    pub initial_match: MatchKind,
    /// The work that produced the match.
    pub matched_work_id: String,
}

/// A creator that passed every gate. This is what a scan returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedResult {
    pub id: String,
    pub name: String,
    pub url: String,
    pub follower_count: u64,
    pub popularity_score: u32,
    pub initial_match: MatchKind,
    /// Release date of the latest work that re-confirmed the signal.
    pub latest_release: String,
}

/// Input to one scan invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    /// Caller's page counter; only used for logging.
    #[serde(default, alias = "page_index")]
    pub page_index: Option<u32>,
    /// Creator ids the caller has already reported.
    #[serde(default, alias = "artists_already_found")]
    pub already_found_ids: HashSet<String>,
}

/// Output of one scan invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResponse {
    pub results: Vec<VerifiedResult>,
    #[serde(default)]
    pub stats: ScanStats,
}

/// Counters for one scan, logged at the end and returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub attempts: u32,
    pub works_inspected: usize,
    pub candidates_matched: usize,
    pub filtered_out: usize,
    pub verification_rejected: usize,
    pub verified: usize,
    pub chunks_skipped: usize,
}

impl fmt::Display for ScanStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Scan Complete ===")?;
        writeln!(f, "Attempts:              {}", self.attempts)?;
        writeln!(f, "Works inspected:       {}", self.works_inspected)?;
        writeln!(f, "Candidates matched:    {}", self.candidates_matched)?;
        writeln!(f, "Filtered out:          {}", self.filtered_out)?;
        writeln!(f, "Failed verification:   {}", self.verification_rejected)?;
        writeln!(f, "Verified:              {}", self.verified)?;
        write!(f, "Chunks skipped:        {}", self.chunks_skipped)
    }
}

/// Stages of a single scan attempt, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Querying,
    Batching,
    Matching,
    Filtering,
    Verifying,
    Done,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanPhase::Querying => "querying",
            ScanPhase::Batching => "batching",
            ScanPhase::Matching => "matching",
            ScanPhase::Filtering => "filtering",
            ScanPhase::Verifying => "verifying",
            ScanPhase::Done => "done",
        };
        f.write_str(name)
    }
}
