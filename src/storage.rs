/*!
 * Keyspace
 *
 * The top-level map from binary key to tagged value. A key maps to exactly
 * one value of exactly one tag (string, trie, heap, or FTS); commands that
 * create-or-use a container instantiate it lazily on first write, and a
 * container that drains to empty removes its key entirely so `exists`/`len`
 * observe it as gone.
 *
 * Owned exclusively by the single command-execution path (see shard.rs and
 * net.rs), so a plain `hashbrown::HashMap` is enough — the same map type the
 * teacher uses for its connection table in net.rs, rather than a concurrent
 * map whose sharded-locking guarantees would go unused here.
 */

use crate::fts::Fts;
use crate::heap::Heap;
use crate::trie::Trie;
use hashbrown::HashMap;

/// A value stored under a keyspace key, tagged by container kind.
#[derive(Debug)]
pub enum Value {
    Str(Vec<u8>),
    Trie(Trie),
    Heap(Heap),
    Fts(Fts),
}

impl Value {
    /// The `type` command's reply for this value.
    pub fn tag(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Trie(_) => "trie",
            Value::Heap(_) => "heap",
            Value::Fts(_) => "fts",
        }
    }
}

/// The process-wide map from key to tagged value.
#[derive(Default)]
pub struct Keyspace {
    inner: HashMap<Vec<u8>, Value>,
}

impl Keyspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of top-level keys currently present.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains(&self, k: &[u8]) -> bool {
        self.inner.contains_key(k)
    }

    pub fn get(&self, k: &[u8]) -> Option<&Value> {
        self.inner.get(k)
    }

    pub fn get_mut(&mut self, k: &[u8]) -> Option<&mut Value> {
        self.inner.get_mut(k)
    }

    pub fn insert(&mut self, k: Vec<u8>, v: Value) {
        self.inner.insert(k, v);
    }

    /// Remove a key unconditionally. Returns true if it was present.
    pub fn remove(&mut self, k: &[u8]) -> bool {
        self.inner.remove(k).is_some()
    }

    /// Remove the key if its container is now empty. Called after every
    /// mutating operation on a trie/heap/FTS value so drain-to-empty always
    /// removes the key, per the data model invariant.
    pub fn remove_if_empty(&mut self, k: &[u8]) {
        let empty = match self.inner.get(k) {
            Some(Value::Trie(t)) => t.len() == 0,
            Some(Value::Heap(h)) => h.len() == 0,
            Some(Value::Fts(f)) => f.len() == 0,
            _ => false,
        };
        if empty {
            self.inner.remove(k);
        }
    }

    /// Get the trie at `k`, creating an empty one lazily if `k` is absent.
    /// Errors with `WrongType` if `k` holds a different tag.
    pub fn trie_mut(&mut self, k: &[u8]) -> Result<&mut Trie, crate::protocol::CommandError> {
        if !self.inner.contains_key(k) {
            self.inner.insert(k.to_vec(), Value::Trie(Trie::new()));
        }
        match self.inner.get_mut(k) {
            Some(Value::Trie(t)) => Ok(t),
            _ => Err(crate::protocol::CommandError::WrongType),
        }
    }

    pub fn heap_mut(&mut self, k: &[u8]) -> Result<&mut Heap, crate::protocol::CommandError> {
        if !self.inner.contains_key(k) {
            self.inner.insert(k.to_vec(), Value::Heap(Heap::new()));
        }
        match self.inner.get_mut(k) {
            Some(Value::Heap(h)) => Ok(h),
            _ => Err(crate::protocol::CommandError::WrongType),
        }
    }

    pub fn fts_mut(&mut self, k: &[u8]) -> Result<&mut Fts, crate::protocol::CommandError> {
        if !self.inner.contains_key(k) {
            self.inner.insert(k.to_vec(), Value::Fts(Fts::new()));
        }
        match self.inner.get_mut(k) {
            Some(Value::Fts(f)) => Ok(f),
            _ => Err(crate::protocol::CommandError::WrongType),
        }
    }

    /// Read-only trie view; `None` if absent, `WrongType` if a different tag.
    pub fn trie(&self, k: &[u8]) -> Result<Option<&Trie>, crate::protocol::CommandError> {
        match self.inner.get(k) {
            None => Ok(None),
            Some(Value::Trie(t)) => Ok(Some(t)),
            Some(_) => Err(crate::protocol::CommandError::WrongType),
        }
    }

    pub fn heap(&self, k: &[u8]) -> Result<Option<&Heap>, crate::protocol::CommandError> {
        match self.inner.get(k) {
            None => Ok(None),
            Some(Value::Heap(h)) => Ok(Some(h)),
            Some(_) => Err(crate::protocol::CommandError::WrongType),
        }
    }

    pub fn fts(&self, k: &[u8]) -> Result<Option<&Fts>, crate::protocol::CommandError> {
        match self.inner.get(k) {
            None => Ok(None),
            Some(Value::Fts(f)) => Ok(Some(f)),
            Some(_) => Err(crate::protocol::CommandError::WrongType),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_remove_round_trip() {
        let mut ks = Keyspace::new();
        ks.insert(b"a".to_vec(), Value::Str(b"1".to_vec()));
        assert!(ks.contains(b"a"));
        assert_eq!(ks.len(), 1);
        assert!(ks.remove(b"a"));
        assert!(!ks.contains(b"a"));
        assert_eq!(ks.len(), 0);
    }

    #[test]
    fn lazy_container_creation_tags_correctly() {
        let mut ks = Keyspace::new();
        ks.trie_mut(b"t").unwrap().set(b"f".to_vec(), b"v".to_vec());
        assert_eq!(ks.get(b"t").unwrap().tag(), "trie");
    }

    #[test]
    fn type_mismatch_is_wrong_type() {
        let mut ks = Keyspace::new();
        ks.insert(b"k".to_vec(), Value::Str(b"1".to_vec()));
        assert!(ks.trie_mut(b"k").is_err());
    }
}
