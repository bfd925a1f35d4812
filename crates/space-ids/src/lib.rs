//! Id generation and short-id resolution shared across every store crate.
//!
//! Every primary key in the workspace is a UUIDv7 string: time-sortable,
//! so `ORDER BY id` and `ORDER BY created_at` agree without a separate
//! column. Content hashes (constitutions) use SHA-256 hex instead, since
//! they're addressed by their bytes, not by creation order.

use sha2::{Digest, Sha256};
use space_core::types::ShortIdResolution;

/// Length of the short id suffix shown to humans and accepted on the CLI
/// (`memory/db.py`'s `full_id[-8:]`).
pub const SHORT_ID_LEN: usize = 8;

/// A new time-sortable primary key.
pub fn uuid7() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// SHA-256 hex digest of `content`, used to content-address constitutions.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// The human-facing short form of a full id: its last `SHORT_ID_LEN`
/// characters, or the whole id if shorter.
pub fn short_id(full_id: &str) -> &str {
    if full_id.len() <= SHORT_ID_LEN {
        full_id
    } else {
        &full_id[full_id.len() - SHORT_ID_LEN..]
    }
}

/// Turn the set of full ids whose suffix matched `suffix` into a resolution
/// outcome. Callers run the `LIKE '%' || ?1` query themselves (it's a
/// store-specific column) and hand the matching full ids here.
pub fn resolve_short_id(matches: Vec<String>) -> ShortIdResolution {
    match matches.len() {
        0 => ShortIdResolution::NotFound,
        1 => ShortIdResolution::Resolved(matches.into_iter().next().unwrap()),
        _ => ShortIdResolution::Ambiguous(matches),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid7_values_are_distinct_and_time_sortable() {
        let a = uuid7();
        let b = uuid7();
        assert_ne!(a, b);
        assert!(a <= b, "uuidv7 strings should sort lexically by creation order");
    }

    #[test]
    fn hash_content_is_deterministic() {
        assert_eq!(hash_content("hello"), hash_content("hello"));
        assert_ne!(hash_content("hello"), hash_content("world"));
    }

    #[test]
    fn short_id_takes_last_eight_chars() {
        assert_eq!(short_id("0123456789abcdef"), "89abcdef");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn resolve_short_id_branches_on_match_count() {
        assert_eq!(resolve_short_id(vec![]), ShortIdResolution::NotFound);
        assert_eq!(
            resolve_short_id(vec!["full-1".to_string()]),
            ShortIdResolution::Resolved("full-1".to_string())
        );
        assert_eq!(
            resolve_short_id(vec!["full-1".to_string(), "full-2".to_string()]),
            ShortIdResolution::Ambiguous(vec!["full-1".to_string(), "full-2".to_string()])
        );
    }
}
