//! Cross-catalog matching by homologation code.
//!
//! Pure functions: given a scraped table and a reference code set, keep only
//! the rows whose code also appears in the reference. Codes are compared
//! case-insensitively because persisted rows are lowercased on insert while
//! freshly scraped codes keep the seller's casing.

use std::collections::HashSet;

use crate::models::ProductRecord;

/// Normalized set of codes present in a table.
pub fn code_set(records: &[ProductRecord]) -> HashSet<String> {
    records.iter().map(|r| r.code.to_lowercase()).collect()
}

/// Keep only the rows whose code appears in `reference`. Row order is
/// preserved; the reference set is untouched.
pub fn retain_matching(
    records: Vec<ProductRecord>,
    reference: &HashSet<String>,
) -> Vec<ProductRecord> {
    let reference: HashSet<String> = reference.iter().map(|c| c.to_lowercase()).collect();
    records
        .into_iter()
        .filter(|r| reference.contains(&r.code.to_lowercase()))
        .collect()
}

/// Filter `primary` down to codes also present in `reference`.
pub fn match_tables(
    primary: Vec<ProductRecord>,
    reference: &[ProductRecord],
) -> Vec<ProductRecord> {
    retain_matching(primary, &code_set(reference))
}
