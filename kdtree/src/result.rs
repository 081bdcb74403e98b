use std::{cmp::Ordering, collections::BinaryHeap};

/// A search candidate, ordered by distance and then by index.
#[derive(Debug, Copy, Clone)]
struct Candidate<K, V> {
    key: K,
    value: V,
}

impl<K: PartialOrd, V: PartialOrd> Candidate<K, V> {
    fn compare(&self, other: &Self) -> Ordering {
        { self.key.partial_cmp(&other.key) }
            .filter(|ord| ord.is_ne())
            .or_else(|| self.value.partial_cmp(&other.value))
            .unwrap_or(Ordering::Equal)
    }

    fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K: PartialOrd, V: PartialOrd> PartialEq for Candidate<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other).is_eq()
    }
}

impl<K: PartialOrd, V: PartialOrd> Eq for Candidate<K, V> {}

impl<K: PartialOrd, V: PartialOrd> PartialOrd for Candidate<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl<K: PartialOrd, V: PartialOrd> Ord for Candidate<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

/// Collects search candidates keyed by their distance to the pivot.
pub trait ResultSet {
    type Key;
    type Value;

    fn push(&mut self, key: Self::Key, value: Self::Value);

    fn is_full(&self) -> bool;

    /// The distance beyond which no candidate is accepted any more.
    fn max_key(&self) -> Option<&Self::Key>;

    /// Consumes the set, nearest first.
    fn into_sorted_vec(self) -> Vec<(Self::Key, Self::Value)>;
}

/// The `num` nearest candidates, kept in a max-heap on distance.
pub struct KnnResultSet<K, V> {
    heap: BinaryHeap<Candidate<K, V>>,
    num: usize,
}

impl<K: PartialOrd, V: PartialOrd> KnnResultSet<K, V> {
    pub fn new(num: usize) -> Self {
        KnnResultSet {
            heap: BinaryHeap::with_capacity(num.min(128) + 1),
            num,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<K: PartialOrd, V: PartialOrd> ResultSet for KnnResultSet<K, V> {
    type Key = K;
    type Value = V;

    fn push(&mut self, key: K, value: V) {
        if self.num == 0 {
            return;
        }
        if self.is_full() {
            if self.max_key().map_or(false, |max| *max <= key) {
                return;
            }
            self.heap.pop();
        }
        self.heap.push(Candidate { key, value });
    }

    fn is_full(&self) -> bool {
        self.heap.len() >= self.num
    }

    fn max_key(&self) -> Option<&K> {
        self.heap.peek().map(|worst| &worst.key)
    }

    fn into_sorted_vec(self) -> Vec<(K, V)> {
        { self.heap.into_sorted_vec().into_iter() }
            .map(Candidate::into_pair)
            .collect()
    }
}

/// Every candidate strictly closer than `radius`.
pub struct RadiusResultSet<K, V> {
    found: Vec<Candidate<K, V>>,
    radius: K,
}

impl<K: PartialOrd, V: PartialOrd> RadiusResultSet<K, V> {
    pub fn new(radius: K) -> Self {
        RadiusResultSet {
            found: Vec::new(),
            radius,
        }
    }

    pub fn len(&self) -> usize {
        self.found.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }
}

impl<K: PartialOrd, V: PartialOrd> ResultSet for RadiusResultSet<K, V> {
    type Key = K;
    type Value = V;

    fn push(&mut self, key: K, value: V) {
        if key < self.radius {
            self.found.push(Candidate { key, value });
        }
    }

    fn is_full(&self) -> bool {
        true
    }

    fn max_key(&self) -> Option<&K> {
        Some(&self.radius)
    }

    fn into_sorted_vec(mut self) -> Vec<(K, V)> {
        self.found.sort_unstable();
        self.found.into_iter().map(Candidate::into_pair).collect()
    }
}
