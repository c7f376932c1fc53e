/**
 * CoRate
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fnv::FnvHashMap;

use crate::mean::MeanRatingTable;
use crate::store::RatingStore;

const NUM_SHARDS: usize = 64;

/// Whether correlations are memoized per user pair or recomputed on every request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    Memoize,
    Recompute,
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy::Memoize
    }
}

/// An unordered pair of users, stored with the smaller index first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PairKey {
    low: u32,
    high: u32,
}

impl PairKey {

    pub fn new(a: u32, b: u32) -> Self {
        if a <= b {
            PairKey { low: a, high: b }
        } else {
            PairKey { low: b, high: a }
        }
    }

    fn packed(&self) -> u64 {
        ((self.low as u64) << 32) | self.high as u64
    }

    fn unpacked(packed: u64) -> Self {
        PairKey { low: (packed >> 32) as u32, high: packed as u32 }
    }

    fn involves(&self, user: u32) -> bool {
        self.low == user || self.high == user
    }

    fn shard(&self, num_shards: usize) -> usize {
        (self.packed().wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 32) as usize % num_shards
    }
}

type Slot = Arc<Mutex<Option<f64>>>;

/// A pair is `Pending` while its correlation is computed and `Ready` once it is known.
#[derive(Debug)]
enum Entry {
    Pending(Slot),
    Ready(f64),
}

/// Memoized correlations per unordered user pair.
///
/// The first caller for a pair registers a pending slot and computes the correlation under the
/// slot lock. A second caller asking for the same pair finds the slot, waits for the first one
/// and reuses its result, so each pair is computed at most once no matter how many workers ask
/// for it. Finished correlations replace their slot with the plain value.
#[derive(Debug)]
pub struct CorrelationCache {
    shards: Vec<Mutex<FnvHashMap<u64, Entry>>>,
    computations: AtomicUsize,
    hits: AtomicUsize,
}

impl Default for CorrelationCache {
    fn default() -> Self {
        CorrelationCache::new(NUM_SHARDS)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Slots only ever hold finished values
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CorrelationCache {

    pub fn new(num_shards: usize) -> Self {
        let num_shards = num_shards.max(1);
        let shards = (0..num_shards)
            .map(|_| Mutex::new(FnvHashMap::default()))
            .collect();

        CorrelationCache {
            shards,
            computations: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
        }
    }

    fn shard_of(&self, key: PairKey) -> &Mutex<FnvHashMap<u64, Entry>> {
        &self.shards[key.shard(self.shards.len())]
    }

    pub fn get_or_compute<F>(&self, key: PairKey, compute: F) -> f64
        where F: FnOnce() -> f64 {

        let packed = key.packed();

        let slot: Slot = {
            let mut shard = lock(self.shard_of(key));
            let entry = shard.entry(packed)
                .or_insert_with(|| Entry::Pending(Arc::new(Mutex::new(None))));

            match entry {
                Entry::Ready(correlation) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return *correlation;
                },
                Entry::Pending(slot) => slot.clone(),
            }
        };

        let mut value = lock(&slot);

        if let Some(correlation) = *value {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return correlation;
        }

        let correlation = compute();
        self.computations.fetch_add(1, Ordering::Relaxed);
        *value = Some(correlation);

        // Waiting callers already hold the slot, later ones read the plain value. Nobody takes
        // a slot lock while holding a shard lock, so taking the shard lock here cannot deadlock.
        let mut shard = lock(self.shard_of(key));
        let still_pending = match shard.get(&packed) {
            Some(Entry::Pending(pending)) => Arc::ptr_eq(pending, &slot),
            _ => false,
        };
        if still_pending {
            shard.insert(packed, Entry::Ready(correlation));
        }

        correlation
    }

    pub fn get(&self, key: PairKey) -> Option<f64> {
        let slot = match lock(self.shard_of(key)).get(&key.packed()) {
            Some(Entry::Ready(correlation)) => return Some(*correlation),
            Some(Entry::Pending(slot)) => slot.clone(),
            None => return None,
        };

        let value = *lock(&slot);
        value
    }

    /// Number of pairs whose correlation is still being computed.
    pub fn pending(&self) -> usize {
        self.shards.iter()
            .map(|shard| {
                lock(shard).values()
                    .filter(|entry| match entry {
                        Entry::Pending(_) => true,
                        Entry::Ready(_) => false,
                    })
                    .count()
            })
            .sum()
    }

    /// Drops all entries involving the user, needed once the ratings of that user change.
    pub fn forget_user(&self, user: u32) {
        for shard in self.shards.iter() {
            lock(shard).retain(|packed, _| !PairKey::unpacked(*packed).involves(user));
        }
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| lock(shard).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of correlations actually computed through this cache.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }
}

/// Pearson correlation between users over their co-rated items, centered on the users' mean
/// ratings. Owns the correlation cache, the store and mean table are only borrowed.
pub struct SimilarityEngine<'a> {
    store: &'a RatingStore,
    means: &'a MeanRatingTable,
    cache: CorrelationCache,
    policy: CachePolicy,
}

impl<'a> SimilarityEngine<'a> {

    pub fn new(store: &'a RatingStore, means: &'a MeanRatingTable, policy: CachePolicy) -> Self {
        SimilarityEngine::with_cache(store, means, CorrelationCache::default(), policy)
    }

    /// Continues with the correlations memoized by an earlier engine over the same users.
    pub fn with_cache(
        store: &'a RatingStore,
        means: &'a MeanRatingTable,
        cache: CorrelationCache,
        policy: CachePolicy,
    ) -> Self {
        SimilarityEngine { store, means, cache, policy }
    }

    pub fn into_cache(self) -> CorrelationCache {
        self.cache
    }

    pub fn cache(&self) -> &CorrelationCache {
        &self.cache
    }

    pub fn correlation(&self, user_a: &str, user_i: &str) -> f64 {
        match (self.store.user_index(user_a), self.store.user_index(user_i)) {
            (Some(a), Some(i)) => self.correlation_by_index(a, i),
            // Cold users share no items with anybody
            _ => 0.0,
        }
    }

    pub fn correlation_by_index(&self, a: u32, i: u32) -> f64 {
        let key = PairKey::new(a, i);

        match self.policy {
            CachePolicy::Memoize => self.cache.get_or_compute(key, || self.pearson(key)),
            CachePolicy::Recompute => self.pearson(key),
        }
    }

    /// Always evaluated for the canonical ordering of the pair, which makes the result
    /// bit-identical for both argument orders.
    fn pearson(&self, key: PairKey) -> f64 {

        let (a, i) = (key.low, key.high);

        let mean_a = self.means.get(a).unwrap_or(0.0);
        let mean_i = self.means.get(i).unwrap_or(0.0);

        let mut numerator = 0.0;
        let mut sum_of_squares_a = 0.0;
        let mut sum_of_squares_i = 0.0;

        for (_, value_a, value_i) in self.store.co_rated(a, i) {
            let centered_a = value_a as f64 - mean_a;
            let centered_i = value_i as f64 - mean_i;

            numerator += centered_a * centered_i;
            sum_of_squares_a += centered_a * centered_a;
            sum_of_squares_i += centered_i * centered_i;
        }

        let denominator = (sum_of_squares_a * sum_of_squares_i).sqrt();

        if denominator == 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }
}
