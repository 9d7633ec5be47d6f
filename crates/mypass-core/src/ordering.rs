//! Ordering and filtering of the presented record list.

use crate::models::CredentialRecord;

/// Sort by title, ascending and case-sensitive. Equal titles keep their
/// relative order. Spacer records are dropped.
pub fn sort_by_title(records: Vec<CredentialRecord>) -> Vec<CredentialRecord> {
    let mut records: Vec<_> = records.into_iter().filter(|r| !r.is_spacer()).collect();
    records.sort_by(|a, b| a.title.cmp(&b.title));
    records
}

/// Records whose lower-cased title contains the lower-cased query.
///
/// A blank query matches everything. The result is always sorted.
pub fn search(records: &[CredentialRecord], query: &str) -> Vec<CredentialRecord> {
    let needle = query.to_lowercase();
    let matches = records
        .iter()
        .filter(|r| needle.is_empty() || r.title.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    sort_by_title(matches)
}
