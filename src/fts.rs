/*!
 * Full-text search engine (`d*` commands)
 *
 * Per key, an ordered document table (title → body) plus an inverted index
 * from normalized token to the set of titles containing it. The index is a
 * `BTreeMap<String, BTreeSet<Vec<u8>>>` rather than a hash map: `dsearch`
 * matches a query word against every indexed token that has it as a
 * *prefix* (so a query for "battle" finds documents indexed under
 * "battles"), and an ordered map turns that into the same O(log n) range
 * scan `trie.rs` already uses for `rpget`, instead of a linear scan over
 * every token. Titles are kept as raw `Vec<u8>` throughout (matching
 * `Trie`'s byte-keyed fields) rather than lossily converted to `String`, so
 * `dset`/`dget`/`ddel` always look a title up by the exact bytes the caller
 * sent. Posting lists are `BTreeSet<Vec<u8>>` so title order falls out of
 * the union for free. Every mutation updates the table and the index
 * together so a reader never observes one without the other.
 */

use crate::trie::prefix_upper_bound;
use hashbrown::HashMap;
use std::collections::{BTreeMap, BTreeSet};

/// Lowercase, split on any non-alphanumeric-ASCII byte, drop empty tokens.
/// Punctuation (apostrophes, periods, commas, ...) is just another
/// separator, so `"enemy's"` yields the single token `"enemy"`.
pub fn tokenize(text: &[u8]) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for &b in text {
        if b.is_ascii_alphanumeric() {
            current.push(b.to_ascii_lowercase() as char);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[derive(Debug, Default)]
pub struct Fts {
    docs: HashMap<Vec<u8>, Vec<u8>>,
    index: BTreeMap<String, BTreeSet<Vec<u8>>>,
}

impl Fts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// `dset`: insert or overwrite a document, updating the index so only
    /// tokens that actually changed move between posting lists.
    pub fn set(&mut self, title: Vec<u8>, body: Vec<u8>) {
        let new_tokens: BTreeSet<String> = tokenize(&body).into_iter().collect();
        let old_tokens: BTreeSet<String> = match self.docs.get(&title) {
            Some(old_body) => tokenize(old_body).into_iter().collect(),
            None => BTreeSet::new(),
        };

        for removed in old_tokens.difference(&new_tokens) {
            if let Some(postings) = self.index.get_mut(removed) {
                postings.remove(&title);
                if postings.is_empty() {
                    self.index.remove(removed);
                }
            }
        }
        for added in new_tokens.difference(&old_tokens) {
            self.index
                .entry(added.clone())
                .or_default()
                .insert(title.clone());
        }

        self.docs.insert(title, body);
    }

    /// `dget`
    pub fn get(&self, title: &[u8]) -> Option<&[u8]> {
        self.docs.get(title).map(|v| v.as_slice())
    }

    /// `ddel`: true if the title existed.
    pub fn del(&mut self, title: &[u8]) -> bool {
        let Some(body) = self.docs.remove(title) else {
            return false;
        };
        for token in tokenize(&body) {
            if let Some(postings) = self.index.get_mut(&token) {
                postings.remove(title);
                if postings.is_empty() {
                    self.index.remove(&token);
                }
            }
        }
        true
    }

    /// `dsearch`: documents indexed under a token that has the first token
    /// of the (tokenized) `word` as a prefix, as `(title, body)` pairs in
    /// ascending title order. Multi-token queries are not specified by the
    /// source tests; only the first token of the normalized query is used,
    /// and a query that normalizes to no tokens returns no matches.
    pub fn search(&self, word: &[u8]) -> Vec<(&[u8], &[u8])> {
        let tokens = tokenize(word);
        let Some(first) = tokens.first() else {
            return Vec::new();
        };

        use std::ops::Bound::{Excluded, Included, Unbounded};
        let lower = Included(first.clone());
        let upper = match prefix_upper_bound(first.as_bytes()) {
            Some(u) => Excluded(String::from_utf8(u).expect("ascii-derived upper bound is valid utf8")),
            None => Unbounded,
        };

        let mut titles: BTreeSet<&[u8]> = BTreeSet::new();
        for (_, postings) in self.index.range((lower, upper)) {
            titles.extend(postings.iter().map(|t| t.as_slice()));
        }

        titles
            .into_iter()
            .filter_map(|title| self.docs.get(title).map(|body| (title, body.as_slice())))
            .collect()
    }
}
