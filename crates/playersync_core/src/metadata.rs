//! Storage-layer metadata keys.
//!
//! Table rows returned by the backend carry bookkeeping columns next to the
//! player's data. They are kept in the store like any other entry but hidden
//! from user-facing listings.

const EXACT: [&str; 4] = ["PartitionKey", "RowKey", "Timestamp", "ETag"];
const PREFIXES: [&str; 2] = ["odata.", "@odata."];

/// Returns true if `key` names a backend bookkeeping field.
///
/// Matching is case-insensitive.
pub fn is_metadata_key(key: &str) -> bool {
    EXACT.iter().any(|m| key.eq_ignore_ascii_case(m))
        || PREFIXES.iter().any(|p| {
            key.len() >= p.len()
                && key.is_char_boundary(p.len())
                && key[..p.len()].eq_ignore_ascii_case(p)
        })
}
