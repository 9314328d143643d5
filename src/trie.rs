/*!
 * Trie engine (`r*` commands)
 *
 * An ordered field → value map over byte strings, addressed strictly by
 * lexicographic byte order. The spec sanctions "any radix tree, compressed
 * trie, or ordered map that supports O(p) prefix seek", and `Vec<u8>`'s
 * derived `Ord` is already byte-lexicographic, so a `BTreeMap` gives ordered
 * iteration and prefix range-scans for free without a hand-rolled tree.
 */

use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct Trie {
    inner: BTreeMap<Vec<u8>, Vec<u8>>,
}

/// The smallest byte string that is strictly greater than every string with
/// `prefix` as a prefix, used as the exclusive upper bound of a prefix range
/// scan. `None` means "no upper bound" (the prefix is all-0xff bytes, or
/// empty and the map should be scanned fully — callers special-case empty
/// prefixes separately).
pub(crate) fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(&last) = upper.last() {
        if last == 0xff {
            upper.pop();
        } else {
            *upper.last_mut().unwrap() += 1;
            return Some(upper);
        }
    }
    None
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// `rset`: insert or overwrite.
    pub fn set(&mut self, field: Vec<u8>, value: Vec<u8>) {
        self.inner.insert(field, value);
    }

    /// `rget`
    pub fn get(&self, field: &[u8]) -> Option<&[u8]> {
        self.inner.get(field).map(|v| v.as_slice())
    }

    /// `rdel`: true if the field existed.
    pub fn del(&mut self, field: &[u8]) -> bool {
        self.inner.remove(field).is_some()
    }

    /// `rexists`
    pub fn exists(&self, field: &[u8]) -> bool {
        self.inner.contains_key(field)
    }

    /// `rkeys`: ascending lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.inner.keys().map(|k| k.as_slice())
    }

    /// `rvalues`: same order as `keys`.
    pub fn values(&self) -> impl Iterator<Item = &[u8]> {
        self.inner.values().map(|v| v.as_slice())
    }

    /// `rgetall`: `(field, value)` pairs in ascending field order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.inner.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// `rpget`: `(field, value)` pairs whose field has `prefix` as a byte
    /// prefix, in ascending field order.
    pub fn prefix_iter<'a>(&'a self, prefix: &[u8]) -> impl Iterator<Item = (&'a [u8], &'a [u8])> {
        use std::ops::Bound::{Excluded, Included, Unbounded};
        let lower = Included(prefix.to_vec());
        let upper = match prefix_upper_bound(prefix) {
            Some(u) => Excluded(u),
            None => Unbounded,
        };
        self.inner
            .range((lower, upper))
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}
