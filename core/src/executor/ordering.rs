//! Deduplication and input-order restoration.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Drop repeated items, keeping the first occurrence and the original order.
pub fn dedup_items<I: Clone + Eq + Hash>(items: &[I]) -> Vec<I> {
    dedup_by_key(items, |item| item.clone())
}

/// Like [`dedup_items`] but compares a derived key (e.g. a normalised URL).
pub fn dedup_by_key<T, K, F>(items: &[T], mut key: F) -> Vec<T>
where
    T: Clone,
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::with_capacity(items.len());
    items
        .iter()
        .filter(|item| seen.insert(key(*item)))
        .cloned()
        .collect()
}

/// Stable re-sort of `results` into the order their source items appear in `inputs`.
///
/// Results whose key is not among the inputs go last, keeping their relative order.
pub fn sort_by_input_order<T, I, F>(results: &mut [T], inputs: &[I], key: F)
where
    I: Eq + Hash,
    F: Fn(&T) -> &I,
{
    let mut rank: HashMap<&I, usize> = HashMap::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        rank.entry(input).or_insert(index);
    }
    results.sort_by_key(|r| rank.get(key(r)).copied().unwrap_or(usize::MAX));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn dedup_keeps_first_occurrence() {
        let items = ["b", "a", "b", "c", "a"];
        assert_eq!(dedup_items(&items), vec!["b", "a", "c"]);
        assert_eq!(dedup_items(&dedup_items(&items)), dedup_items(&items));
    }

    #[test]
    fn dedup_by_key_uses_derived_identity() {
        let urls = ["https://A.com", "https://a.com", "https://b.com"];
        let unique = dedup_by_key(&urls, |u| u.to_ascii_lowercase());
        assert_eq!(unique, vec!["https://A.com", "https://b.com"]);
    }

    #[test]
    fn results_follow_input_order() {
        let inputs = vec!["u1".to_string(), "u2".to_string(), "u3".to_string()];
        let mut results = vec![
            ("u3".to_string(), 3),
            ("zz".to_string(), 0),
            ("u1".to_string(), 1),
            ("u2".to_string(), 2),
            ("u1".to_string(), 11),
        ];

        sort_by_input_order(&mut results, &inputs, |r| &r.0);

        let order: Vec<i32> = results.iter().map(|r| r.1).collect();
        assert_eq!(order, vec![1, 11, 2, 3, 0]);
    }
}
