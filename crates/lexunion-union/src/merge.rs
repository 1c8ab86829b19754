//! First-seen-wins merge of ranked result lists.

use std::collections::HashSet;

use lexunion_core::{Document, Result};

/// Concatenate `batches` in order, keeping only the first document seen for
/// each key, and stop once `k` documents have been emitted.
///
/// Positions are never re-ranked: the earliest batch that surfaces a key
/// decides where that key lands.
pub fn merge_first_seen<I>(key: &str, batches: I, k: Option<usize>) -> Result<Vec<Document>>
where
    I: IntoIterator<Item = Vec<Document>>,
{
    let cap = k.unwrap_or(usize::MAX);
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    'batches: for batch in batches {
        for doc in batch {
            if merged.len() >= cap {
                break 'batches;
            }
            if seen.insert(doc.key(key)?) {
                merged.push(doc);
            }
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(id: i64, src: &str) -> Document { Document::new().with("id", id).with("src", src) }

    fn ids(docs: &[Document]) -> Vec<(i64, String)> {
        docs.iter().map(|x| (x.get("id").and_then(|v| v.as_i64()).unwrap(), x.text("src"))).collect()
    }

    #[test]
    fn earlier_batch_wins_duplicates() {
        let merged = merge_first_seen("id", vec![vec![d(2, "a"), d(1, "a")], vec![d(1, "b"), d(3, "b")]], None).unwrap();
        assert_eq!(ids(&merged), vec![(2, "a".into()), (1, "a".into()), (3, "b".into())]);
    }

    #[test]
    fn duplicates_within_one_batch_collapse() {
        let merged = merge_first_seen("id", vec![vec![d(1, "a"), d(1, "a2")]], None).unwrap();
        assert_eq!(ids(&merged), vec![(1, "a".into())]);
    }

    #[test]
    fn truncates_after_dedup() {
        let batches = vec![vec![d(1, "a"), d(2, "a")], vec![d(1, "b"), d(2, "b"), d(3, "b")]];
        let merged = merge_first_seen("id", batches, Some(3)).unwrap();
        assert_eq!(ids(&merged), vec![(1, "a".into()), (2, "a".into()), (3, "b".into())]);
    }

    #[test]
    fn empty_batches_merge_to_empty() {
        assert!(merge_first_seen("id", vec![vec![], vec![]], Some(2)).unwrap().is_empty());
        assert!(merge_first_seen("id", Vec::<Vec<Document>>::new(), None).unwrap().is_empty());
    }

    #[test]
    fn missing_key_is_an_error() {
        let batches = vec![vec![Document::new().with("title", "no key")]];
        assert!(merge_first_seen("id", batches, None).is_err());
    }
}
