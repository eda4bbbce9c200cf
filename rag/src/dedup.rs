//! Content deduplication using xxhash.

use std::collections::HashMap;
use xxhash_rust::xxh3::{xxh3_64, xxh3_128};

use crate::types::SearchResult;

/// Computes a content hash over the whole text.
#[must_use]
pub fn content_hash(text: &str) -> u64 {
    xxh3_64(text.as_bytes())
}

/// Fingerprints the first `prefix_chars` characters of `text`.
///
/// Two texts sharing that prefix always collide, texts that differ inside it collide only with
/// 128-bit hash probability.
#[must_use]
pub fn prefix_fingerprint(text: &str, prefix_chars: usize) -> u128 {
    xxh3_128(char_prefix(text, prefix_chars).as_bytes())
}

/// Returns the longest prefix of `text` holding at most `max_chars` characters.
#[must_use]
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(end, _)| &text[..end])
}

/// Collapses results sharing a content fingerprint.
///
/// The survivor of each group is the highest-scoring member (the first seen on ties), placed at
/// the position where the group first appeared.
#[must_use]
pub fn collapse_duplicates(results: Vec<SearchResult>, prefix_chars: usize) -> Vec<SearchResult> {
    let mut slots: HashMap<u128, usize> = HashMap::with_capacity(results.len());
    let mut kept: Vec<SearchResult> = Vec::with_capacity(results.len());

    for result in results {
        let fingerprint = prefix_fingerprint(&result.content, prefix_chars);
        match slots.get(&fingerprint) {
            Some(&slot) => {
                if result.score > kept[slot].score {
                    kept[slot] = result;
                }
            }
            None => {
                slots.insert(fingerprint, kept.len());
                kept.push(result);
            }
        }
    }

    kept
}
