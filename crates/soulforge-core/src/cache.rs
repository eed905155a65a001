//! Time-to-live memoization of derived results.
//!
//! Entries expire lazily: a read past the TTL drops the entry and reports a
//! miss. Nothing runs in the background.
//!
//! The engine keeps two caches, one for composed [`HeroStats`] and one for
//! hero loadouts, and invalidates them synchronously from every mutation.
//!
//! A reader that misses computes from a store snapshot and then inserts. If a
//! mutation invalidated in between, the insert is dropped: readers capture
//! [`ComputationCache::generation`] before reading the store and insert with
//! [`ComputationCache::insert_stats`], which compares it under the lock.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::equipment::EquipmentItem;
use crate::ids::HeroId;
use crate::stats::{ComputeOptions, HeroStats};

// =============================================================================
// TtlCache
// =============================================================================

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    inserted: Instant,
}

/// Mutex-guarded map whose entries expire `ttl` after insertion.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Configured time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // A panic while holding the lock leaves the map consistent; keep using it.
    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Live value for `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Live value for `key` as seen at `now`.
    pub fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let mut entries = self.lock();
        let expired = {
            let entry = entries.get(key)?;
            now.saturating_duration_since(entry.inserted) >= self.ttl
        };
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|e| e.value.clone())
    }

    /// Stores `value` under `key`.
    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    /// Stores `value` under `key` as if inserted at `now`.
    pub fn insert_at(&self, key: K, value: V, now: Instant) {
        self.lock().insert(key, Entry { value, inserted: now });
    }

    /// Stores `value` under `key` only if `guard` holds while the lock is
    /// held. Returns whether it was stored.
    pub fn insert_if(&self, key: K, value: V, guard: impl FnOnce() -> bool) -> bool {
        let mut entries = self.lock();
        if !guard() {
            return false;
        }
        entries.insert(
            key,
            Entry {
                value,
                inserted: Instant::now(),
            },
        );
        true
    }

    /// Drops `key`.
    pub fn invalidate(&self, key: &K) {
        self.lock().remove(key);
    }

    /// Drops every entry whose key matches `predicate`. Returns how many.
    pub fn invalidate_where(&self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|k, _| !predicate(k));
        before - entries.len()
    }

    /// Drops everything.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Stored entries, expired ones included until they are next read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// No stored entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

// =============================================================================
// ComputationCache
// =============================================================================

/// Key of a composed stat block.
pub type StatsKey = (HeroId, ComputeOptions);

/// The engine's memoized results.
#[derive(Debug)]
pub struct ComputationCache {
    stats: TtlCache<StatsKey, HeroStats>,
    loadouts: TtlCache<HeroId, Vec<EquipmentItem>>,
    generation: AtomicU64,
}

impl ComputationCache {
    /// Creates empty caches with the given TTLs.
    #[must_use]
    pub fn new(stats_ttl: Duration, equipment_ttl: Duration) -> Self {
        Self {
            stats: TtlCache::new(stats_ttl),
            loadouts: TtlCache::new(equipment_ttl),
            generation: AtomicU64::new(0),
        }
    }

    /// Counter bumped by every invalidation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Caches `stats` unless an invalidation happened since `generation` was
    /// read.
    pub fn insert_stats(&self, key: StatsKey, stats: HeroStats, generation: u64) -> bool {
        self.stats.insert_if(key, stats, || self.generation() == generation)
    }

    /// Caches a loadout unless an invalidation happened since `generation`
    /// was read.
    pub fn insert_loadout(&self, hero: HeroId, items: Vec<EquipmentItem>, generation: u64) -> bool {
        self.loadouts.insert_if(hero, items, || self.generation() == generation)
    }

    /// Composed stats.
    #[must_use]
    pub fn stats(&self) -> &TtlCache<StatsKey, HeroStats> {
        &self.stats
    }

    /// Equipped items per hero.
    #[must_use]
    pub fn loadouts(&self) -> &TtlCache<HeroId, Vec<EquipmentItem>> {
        &self.loadouts
    }

    /// Drops everything derived from `hero` alone.
    pub fn invalidate_hero(&self, hero: HeroId) {
        self.bump();
        let dropped = self.stats.invalidate_where(|(id, _)| *id == hero);
        self.loadouts.invalidate(&hero);
        debug!(%hero, dropped, "invalidated hero cache");
    }

    /// Drops every stat block that folded in formation synergy.
    pub fn invalidate_formation(&self) {
        self.bump();
        let dropped = self
            .stats
            .invalidate_where(|(_, options)| options.include_formation_synergy);
        debug!(dropped, "invalidated formation-dependent stats");
    }

    /// Drops everything.
    pub fn clear(&self) {
        self.bump();
        self.stats.clear();
        self.loadouts.clear();
    }
}
