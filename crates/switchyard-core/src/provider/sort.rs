//! Sort-order planning for provider lists
//!
//! Planning is pure: these functions compute the batch of index changes and
//! unique keys, and the store applies a batch inside one transaction.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::Provider;

/// New sort index for one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortUpdate {
    pub id: String,
    pub sort_index: i64,
}

/// Find an unused key for a copy of `source`.
///
/// Tries `{source}-copy`, then `{source}-copy-2`, `{source}-copy-3`, ...
/// The source part is cut short when needed so no key exceeds `max_len`.
#[must_use]
pub fn next_copy_key<'a, I>(source: &str, existing: I, max_len: usize) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: HashSet<&str> = existing.into_iter().collect();
    let mut n = 1;
    loop {
        let suffix = if n == 1 {
            "-copy".to_string()
        } else {
            format!("-copy-{n}")
        };
        let stem = truncate_chars(source, max_len.saturating_sub(suffix.len()));
        let candidate = format!("{stem}{suffix}");
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}

/// Longest prefix of `s` that fits in `max_bytes` without splitting a char
fn truncate_chars(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let end = s
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= max_bytes)
        .last()
        .unwrap_or(0);
    &s[..end]
}

/// Plan the shift that opens `slot` for a new provider.
///
/// Every provider other than `source_id` whose index is `>= slot` moves down
/// by one. Providers without an index are left alone.
#[must_use]
pub fn plan_insert_after(providers: &[Provider], source_id: &str, slot: i64) -> Vec<SortUpdate> {
    providers
        .iter()
        .filter(|p| p.id != source_id)
        .filter_map(|p| match p.sort_index {
            Some(index) if index >= slot => Some(SortUpdate {
                id: p.id.clone(),
                sort_index: index + 1,
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider(id: &str, index: Option<i64>) -> Provider {
        let mut p = Provider::new(id, id, json!({}));
        p.sort_index = index;
        p
    }

    #[test]
    fn test_copy_key_numbering() {
        assert_eq!(next_copy_key("foo", Vec::<&str>::new(), 64), "foo-copy");
        assert_eq!(next_copy_key("foo", ["foo-copy"], 64), "foo-copy-2");
        assert_eq!(
            next_copy_key("foo", ["foo-copy", "foo-copy-2"], 64),
            "foo-copy-3"
        );
        // Gaps are reused
        assert_eq!(
            next_copy_key("foo", ["foo-copy", "foo-copy-3"], 64),
            "foo-copy-2"
        );
    }

    #[test]
    fn test_copy_key_fits_max_len() {
        let source = "a".repeat(64);
        let first = next_copy_key(&source, [source.as_str()], 64);
        assert_eq!(first.len(), 64);
        assert!(first.ends_with("-copy"));

        let second = next_copy_key(&source, [source.as_str(), first.as_str()], 64);
        assert_eq!(second.len(), 64);
        assert!(second.ends_with("-copy-2"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("aé", 2), "a");
    }

    #[test]
    fn test_plan_shifts_only_indices_at_or_after_slot() {
        let providers = vec![
            provider("a", Some(0)),
            provider("b", Some(1)),
            provider("c", Some(2)),
            provider("loose", None),
        ];
        let plan = plan_insert_after(&providers, "a", 1);
        assert_eq!(
            plan,
            vec![
                SortUpdate { id: "b".into(), sort_index: 2 },
                SortUpdate { id: "c".into(), sort_index: 3 },
            ]
        );
    }

    #[test]
    fn test_plan_never_moves_source() {
        // Source shares the slot value through a pre-existing collision
        let providers = vec![provider("a", Some(1)), provider("b", Some(1))];
        let plan = plan_insert_after(&providers, "a", 1);
        assert_eq!(plan, vec![SortUpdate { id: "b".into(), sort_index: 2 }]);
    }

    #[test]
    fn test_plan_empty_when_slot_is_last() {
        let providers = vec![provider("a", Some(0)), provider("b", Some(1))];
        assert!(plan_insert_after(&providers, "b", 2).is_empty());
    }
}
