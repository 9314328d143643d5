/*!
 * Heap engine (`q*` commands)
 *
 * A keyed min-priority queue. Ties on priority resolve in insertion order
 * (stable FIFO), via the `(Priority, sequence, payload)` tie-break scheme:
 * a per-key monotone counter is carried alongside each element so two
 * elements pushed with the same priority always compare by arrival order.
 */

use std::cmp::Reverse;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Wraps `f64` so priorities can be stored in a `BinaryHeap`, which requires
/// `Ord`. `total_cmp` gives a total order over all finite floats; priorities
/// are parsed by `protocol::parse_decimal_f64`, which already rejects
/// `NaN`/`inf`, so this is total in practice for every value that reaches
/// here.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Priority(f64);

impl Eq for Priority {}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug)]
struct Entry {
    priority: Priority,
    seq: u64,
    payload: Vec<u8>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ties broken by insertion sequence so FIFO holds among equal
        // priorities; `BinaryHeap` is a max-heap, so the queue itself is
        // stored wrapped in `Reverse` to make it min-priority.
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

#[derive(Debug, Default)]
pub struct Heap {
    inner: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// `qpush`
    pub fn push(&mut self, priority: f64, payload: Vec<u8>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.inner.push(Reverse(Entry {
            priority: Priority(priority),
            seq,
            payload,
        }));
    }

    /// `qpop`: remove and return the smallest-priority payload.
    pub fn pop(&mut self) -> Option<Vec<u8>> {
        self.inner.pop().map(|Reverse(e)| e.payload)
    }

    /// `qpopn`: remove up to `n` elements in ascending-priority order.
    pub fn pop_n(&mut self, n: usize) -> Vec<Vec<u8>> {
        let mut out = Vec::with_capacity(n.min(self.inner.len()));
        for _ in 0..n {
            match self.pop() {
                Some(v) => out.push(v),
                None => break,
            }
        }
        out
    }

    /// `qpeek`: smallest-priority payload without removing it.
    pub fn peek(&self) -> Option<&[u8]> {
        self.inner.peek().map(|Reverse(e)| e.payload.as_slice())
    }
}
