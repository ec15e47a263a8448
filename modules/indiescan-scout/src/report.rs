use std::io::{self, Write};

use indiescan_common::VerifiedResult;

pub const REPORT_HEADER: &str = "Artist Name\tFollowers\tPopularity\tProfile URL";

/// Tab-separated report, one row per result after the header.
pub fn write_report<W: Write>(out: &mut W, results: &[VerifiedResult]) -> io::Result<()> {
    writeln!(out, "{REPORT_HEADER}")?;
    for r in results {
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            clean_field(&r.name),
            r.follower_count,
            r.popularity_score,
            clean_field(&r.url)
        )?;
    }
    out.flush()
}

/// Tabs and line breaks would shift columns; replace them with spaces.
fn clean_field(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}
