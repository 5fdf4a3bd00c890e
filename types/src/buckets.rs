//! Stable-ordered, predicate-keyed bucket maps.
//!
//! An [`OrderedBucketMap`] is a small sequence of `(key, value)` entries. Key
//! equality is an injected predicate and the sequence order an injected
//! comparator that can be swapped at any time; ties keep insertion order.
//! The maps here hold a handful of entries, so every lookup is a linear scan.

use std::cmp::Ordering;
use std::fmt;
use std::mem;

use crate::order::Comparator;
use crate::{ClaimOrder, ClaimStatus, ParseError};

pub struct OrderedBucketMap<K, V> {
    entries: Vec<(K, V)>,
    order: Comparator<K>,
    key_eq: fn(&K, &K) -> bool,
}

/// Claim partition of one item type in one holder: `status -> units`.
pub type ClaimBuckets = OrderedBucketMap<ClaimStatus, u32>;

impl<K, V> OrderedBucketMap<K, V> {
    #[must_use]
    pub fn new(order: Comparator<K>, key_eq: fn(&K, &K) -> bool) -> Self {
        Self {
            entries: Vec::new(),
            order,
            key_eq,
        }
    }

    /// Empty map with the same ordering and equality as `self`.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        Self::new(self.order.clone(), self.key_eq)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[(K, V)] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    #[must_use]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.entries.first().map(|(k, v)| (k, v))
    }

    fn position(&self, key: &K) -> Option<usize> {
        self.entries.iter().position(|(k, _)| (self.key_eq)(k, key))
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.position(key).map(|i| &mut self.entries[i].1)
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.position(key).is_some()
    }

    /// Insert or replace. A new key lands before the first strictly greater
    /// entry; a replaced key keeps its position.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(i) = self.position(&key) {
            return Some(mem::replace(&mut self.entries[i].1, value));
        }
        let at = self
            .entries
            .iter()
            .position(|(k, _)| (self.order)(k, &key) == Ordering::Greater)
            .unwrap_or(self.entries.len());
        self.entries.insert(at, (key, value));
        None
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    /// Combine `delta` into the existing value for `key`, or insert it.
    pub fn merge(&mut self, key: K, delta: V, combine: impl FnOnce(V, V) -> V)
    where
        V: Default,
    {
        match self.position(&key) {
            Some(i) => {
                let slot = &mut self.entries[i].1;
                let current = mem::take(slot);
                *slot = combine(current, delta);
            }
            None => {
                self.insert(key, delta);
            }
        }
    }

    /// Install a new comparator and stably re-sort.
    pub fn set_order(&mut self, order: Comparator<K>) {
        self.entries.sort_by(|(a, _), (b, _)| order(a, b));
        self.order = order;
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&K, &mut V) -> bool) {
        self.entries.retain_mut(|(k, v)| keep(k, v));
    }
}

impl<K: Clone> OrderedBucketMap<K, u32> {
    /// Add `amount` units under `key`. Zero is ignored.
    pub fn add(&mut self, key: K, amount: u32) {
        if amount > 0 {
            self.merge(key, amount, u32::saturating_add);
        }
    }

    /// Add every entry of `other` in its current order.
    pub fn add_all(&mut self, other: &Self) {
        for (key, amount) in other.iter() {
            self.add(key.clone(), *amount);
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.entries
            .iter()
            .fold(0u32, |sum, (_, v)| sum.saturating_add(*v))
    }

    /// Remove up to `amount` units front to back, dropping depleted entries.
    ///
    /// Returns the removed partition under the same ordering.
    pub fn drain_front(&mut self, amount: u32) -> Self {
        let mut removed = self.empty_like();
        let mut left = amount;
        for (key, value) in &mut self.entries {
            if left == 0 {
                break;
            }
            let taken = left.min(*value);
            *value -= taken;
            left -= taken;
            removed.add(key.clone(), taken);
        }
        self.entries.retain(|(_, v)| *v > 0);
        removed
    }
}

impl<K: Clone, V: Clone> Clone for OrderedBucketMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            order: self.order.clone(),
            key_eq: self.key_eq,
        }
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for OrderedBucketMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for OrderedBucketMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

fn status_eq(a: &ClaimStatus, b: &ClaimStatus) -> bool {
    a == b
}

/// Empty claim partition sorted by `order`.
#[must_use]
pub fn claim_buckets(order: ClaimOrder) -> ClaimBuckets {
    OrderedBucketMap::new(order.comparator(), status_eq)
}

impl ClaimBuckets {
    #[must_use]
    pub fn with_order(order: ClaimOrder) -> Self {
        claim_buckets(order)
    }

    #[must_use]
    pub fn single(order: ClaimOrder, status: ClaimStatus, amount: u32) -> Self {
        let mut buckets = claim_buckets(order);
        buckets.add(status, amount);
        buckets
    }

    pub fn apply_order(&mut self, order: ClaimOrder) {
        self.set_order(order.comparator());
    }

    /// Units whose status satisfies `pred`.
    #[must_use]
    pub fn count_where(&self, pred: impl Fn(&ClaimStatus) -> bool) -> u32 {
        self.iter()
            .filter(|&(status, _)| pred(status))
            .fold(0u32, |sum, (_, v)| sum.saturating_add(*v))
    }

    /// `;`-joined `status=units` pairs in current order.
    #[must_use]
    pub fn encode(&self) -> String {
        self.iter()
            .map(|(status, amount)| format!("{status}={amount}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Inverse of [`encode`](Self::encode). The result is in neutral order.
    pub fn decode(raw: &str) -> Result<Self, ParseError> {
        let mut buckets = claim_buckets(ClaimOrder::Neutral);
        if raw.is_empty() {
            return Ok(buckets);
        }
        for entry in raw.split(';') {
            let (status, amount) = entry.split_once('=').ok_or_else(|| ParseError::BucketEntry {
                entry: entry.to_owned(),
            })?;
            let status: ClaimStatus = status.parse()?;
            let amount: u32 = amount.parse().map_err(|_| ParseError::Integer {
                input: amount.to_owned(),
            })?;
            buckets.add(status, amount);
        }
        Ok(buckets)
    }
}

impl Default for ClaimBuckets {
    fn default() -> Self {
        claim_buckets(ClaimOrder::Neutral)
    }
}
