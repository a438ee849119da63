//! The time-bounded result cache.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use scholar_types::{Clock, EntityKey, SystemClock};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::CacheConfig;

/// One cached read result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub key: EntityKey,
    pub value: T,
    pub fetched_at: DateTime<Utc>,
}

/// Snapshot of cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from a live entry.
    pub hits: u64,
    /// Lookups that found nothing live (includes expired hits).
    pub misses: u64,
    /// Entries removed lazily by a lookup that found them expired.
    pub expired: u64,
    /// Successful `put` calls.
    pub inserts: u64,
    /// Entries removed by sweeps.
    pub swept: u64,
    /// Fetched values dropped because their entity was invalidated while
    /// the fetch was in flight.
    pub discarded: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    inserts: AtomicU64,
    swept: AtomicU64,
    discarded: AtomicU64,
}

/// Time-bounded cache keyed by normalized entity identifier.
///
/// Safe to share across tasks (`Arc<ResultCache<T>>`). Entries live in a
/// sharded map, so lookups and inserts on distinct keys do not contend.
/// Same-key races resolve last-write-wins on `fetched_at`.
pub struct ResultCache<T> {
    entries: DashMap<EntityKey, CacheEntry<T>>,
    /// Per-entity invalidation counters, bumped before entries are removed.
    generations: DashMap<EntityKey, u64>,
    /// Bumped by `clear`.
    epoch: AtomicU64,
    ttl: chrono::Duration,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl<T> ResultCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cache reading wall-clock time.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache reading time from an explicit clock.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let ttl = chrono::Duration::from_std(config.ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            entries: DashMap::new(),
            generations: DashMap::new(),
            epoch: AtomicU64::new(0),
            ttl,
            config,
            clock,
            counters: Counters::default(),
        }
    }

    /// Configuration accessor.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a live value.
    ///
    /// An entry found expired is removed as a side effect and reported as a
    /// miss.
    pub fn get(&self, key: impl Into<EntityKey>) -> Option<T> {
        let key = key.into();
        let now = self.clock.now();

        let stale_since = match self.entries.get(&key) {
            Some(entry) if !self.is_expired(&entry, now) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "cache hit");
                return Some(entry.value.clone());
            }
            Some(entry) => entry.fetched_at,
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "cache miss");
                return None;
            }
        };

        // Re-check under the shard write lock: a fresh put may have landed
        // between the read above and this removal.
        if self
            .entries
            .remove_if(&key, |_, entry| self.is_expired(entry, now))
            .is_some()
        {
            self.counters.expired.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, fetched_at = %stale_since, "expired cache entry removed");
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert or overwrite the value for `key`, stamped with the current time.
    pub fn put(&self, key: impl Into<EntityKey>, value: T) {
        self.insert(key.into(), value);
    }

    /// Returns the stamp of the stored entry, or `None` when a newer entry
    /// was kept instead.
    fn insert(&self, key: EntityKey, value: T) -> Option<DateTime<Utc>> {
        let now = self.clock.now();

        if self.config.sweep_on_insert {
            self.sweep(now);
        }

        let entry = CacheEntry {
            key: key.clone(),
            value,
            fetched_at: now,
        };

        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().fetched_at <= now {
                    occupied.insert(entry);
                } else {
                    // A write stamped later than ours already landed.
                    trace!(key = %occupied.key(), "newer cache entry kept");
                    return None;
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
            }
        }
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);
        Some(now)
    }

    /// Remove every entry with `now - fetched_at >= ttl`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0usize;
        self.entries.retain(|_, entry| {
            let keep = !self.is_expired(entry, now);
            if !keep {
                removed += 1;
            }
            keep
        });

        if removed > 0 {
            self.counters
                .swept
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "cache sweep removed expired entries");
        }
        removed
    }

    /// Serve `key` from the cache, or await `fetch` and cache its result.
    ///
    /// A failed fetch leaves no entry behind; its error is returned as is.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: impl Into<EntityKey>, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = key.into();
        if let Some(value) = self.get(key.clone()) {
            return Ok(value);
        }

        let before = self.generation(&key);
        let value = fetch().await?;
        if let Some(stamp) = self.insert(key.clone(), value.clone()) {
            // Invalidators bump the generation before removing entries, so
            // either they remove this entry or this check sees the bump.
            if self.generation(&key) != before
                && self
                    .entries
                    .remove_if(&key, |_, entry| entry.fetched_at == stamp)
                    .is_some()
            {
                self.counters.discarded.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "value fetched across an invalidation discarded");
            }
        }
        Ok(value)
    }

    fn generation(&self, key: &EntityKey) -> (u64, u64) {
        let entity = EntityKey::new(key.entity());
        let generation = self.generations.get(&entity).map_or(0, |g| *g);
        (self.epoch.load(Ordering::SeqCst), generation)
    }

    fn bump_generation(&self, entity: &str) {
        *self.generations.entry(EntityKey::new(entity)).or_insert(0) += 1;
    }

    /// Drop one entry regardless of age. Returns whether an entry existed.
    pub fn invalidate(&self, key: impl Into<EntityKey>) -> bool {
        let key = key.into();
        self.bump_generation(key.entity());
        self.entries.remove(&key).is_some()
    }

    /// Drop the entity entry and every field entry of one entity.
    pub fn invalidate_entity(&self, entity: &str) -> usize {
        self.bump_generation(entity);
        let entity = EntityKey::new(entity);
        let mut removed = 0usize;
        self.entries.retain(|key, _| {
            let keep = !key.belongs_to(&entity);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.entries.clear();
    }

    /// Number of stored entries, live or not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expired: self.counters.expired.load(Ordering::Relaxed),
            inserts: self.counters.inserts.load(Ordering::Relaxed),
            swept: self.counters.swept.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
        }
    }

    fn is_expired(&self, entry: &CacheEntry<T>, now: DateTime<Utc>) -> bool {
        now - entry.fetched_at >= self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholar_types::ManualClock;
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq)]
    struct Points {
        points: u32,
    }

    fn cache_with_clock(ttl_secs: u64) -> (ResultCache<Points>, ManualClock) {
        let clock = ManualClock::at_epoch();
        let cache = ResultCache::with_clock(
            CacheConfig::with_ttl(Duration::from_secs(ttl_secs)),
            Arc::new(clock.clone()),
        );
        (cache, clock)
    }

    #[test]
    fn five_minute_ttl_scenario() {
        let (cache, clock) = cache_with_clock(300);
        cache.put("alice", Points { points: 10 });

        clock.advance_secs(299);
        assert_eq!(cache.get("alice"), Some(Points { points: 10 }));

        clock.advance_secs(2);
        assert_eq!(cache.get("alice"), None);
    }

    #[test]
    fn entry_expires_exactly_at_ttl() {
        let (cache, clock) = cache_with_clock(60);
        cache.put("bob", Points { points: 1 });

        clock.advance(chrono::Duration::milliseconds(59_999));
        assert!(cache.get("bob").is_some());

        clock.advance(chrono::Duration::milliseconds(1));
        assert!(cache.get("bob").is_none());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let (cache, _) = cache_with_clock(300);
        cache.put("0xABC", Points { points: 7 });
        assert_eq!(cache.get("0xabc"), Some(Points { points: 7 }));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expired_lookup_removes_entry() {
        let (cache, clock) = cache_with_clock(10);
        cache.put("carol", Points { points: 3 });
        clock.advance_secs(10);

        assert!(cache.get("carol").is_none());
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn put_overwrites_and_restamps() {
        let (cache, clock) = cache_with_clock(100);
        cache.put("dave", Points { points: 1 });
        clock.advance_secs(90);
        cache.put("DAVE", Points { points: 2 });
        clock.advance_secs(90);

        // 180s after the first put, 90s after the overwrite.
        assert_eq!(cache.get("dave"), Some(Points { points: 2 }));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn put_sweeps_expired_entries() {
        let (cache, clock) = cache_with_clock(10);
        cache.put("a", Points { points: 1 });
        cache.put("b", Points { points: 2 });
        clock.advance_secs(11);

        cache.put("c", Points { points: 3 });
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().swept, 2);
    }

    #[test]
    fn sweep_can_be_disabled_on_insert() {
        let clock = ManualClock::at_epoch();
        let cache: ResultCache<u32> = ResultCache::with_clock(
            CacheConfig {
                ttl: Duration::from_secs(10),
                sweep_on_insert: false,
            },
            Arc::new(clock.clone()),
        );
        cache.put("a", 1);
        clock.advance_secs(11);
        cache.put("b", 2);
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.sweep(clock.now()), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn older_write_does_not_clobber_newer_one() {
        let clock = ManualClock::at_epoch();
        let cache: ResultCache<u32> = ResultCache::with_clock(
            CacheConfig::with_ttl(Duration::from_secs(300)),
            Arc::new(clock.clone()),
        );
        clock.advance_secs(50);
        cache.put("k", 2);

        // A writer whose clock reading lags behind the stored entry.
        clock.set(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(40));
        cache.put("k", 1);

        clock.advance_secs(10);
        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn invalidate_entity_drops_all_fields() {
        let (cache, _) = cache_with_clock(300);
        cache.put(EntityKey::field("0xAbc", "points"), Points { points: 1 });
        cache.put(EntityKey::field("0xabc", "enrolled"), Points { points: 0 });
        cache.put(EntityKey::field("0xdef", "points"), Points { points: 9 });

        assert_eq!(cache.invalidate_entity("0xABC"), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(EntityKey::field("0xdef", "points")).is_some());
    }

    #[test]
    fn identifiers_with_separators_stay_apart() {
        let (cache, _) = cache_with_clock(300);
        cache.put(EntityKey::field("a#b", "c"), Points { points: 1 });
        cache.put(EntityKey::field("a", "b#c"), Points { points: 2 });
        cache.put(EntityKey::field("class#7", "points"), Points { points: 3 });
        cache.put(EntityKey::field("class", "points"), Points { points: 4 });

        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get(EntityKey::field("a#b", "c")), Some(Points { points: 1 }));
        assert_eq!(cache.get(EntityKey::field("a", "b#c")), Some(Points { points: 2 }));

        assert_eq!(cache.invalidate_entity("Class#7"), 1);
        assert!(cache.get(EntityKey::field("class#7", "points")).is_none());
        assert_eq!(cache.get(EntityKey::field("class", "points")), Some(Points { points: 4 }));
    }

    #[test]
    fn invalidate_reports_presence() {
        let (cache, _) = cache_with_clock(300);
        cache.put("erin", Points { points: 4 });
        assert!(cache.invalidate("ERIN"));
        assert!(!cache.invalidate("erin"));
        assert!(cache.get("erin").is_none());
    }

    #[tokio::test]
    async fn get_or_fetch_caches_success_only() {
        let (cache, _) = cache_with_clock(300);

        let failed: Result<Points, &str> = cache
            .get_or_fetch("frank", || async { Err::<Points, &str>("ledger down") })
            .await;
        assert_eq!(failed, Err("ledger down"));
        assert!(cache.is_empty());

        let fetched: Result<Points, &str> = cache
            .get_or_fetch("frank", || async { Ok::<_, &str>(Points { points: 12 }) })
            .await;
        assert_eq!(fetched, Ok(Points { points: 12 }));

        let cached: Result<Points, &str> = cache
            .get_or_fetch("FRANK", || async { Ok::<_, &str>(Points { points: 99 }) })
            .await;
        assert_eq!(cached, Ok(Points { points: 12 }));
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn fetch_spanning_an_invalidation_is_not_cached() {
        let (cache, _) = cache_with_clock(300);
        let key = EntityKey::field("gina", "points");

        let fetched: Result<Points, &str> = cache
            .get_or_fetch(key.clone(), || async {
                // A confirmed write lands while the old value is on the wire.
                cache.invalidate_entity("GINA");
                Ok::<_, &str>(Points { points: 1 })
            })
            .await;

        assert_eq!(fetched, Ok(Points { points: 1 }));
        assert!(cache.get(key.clone()).is_none());
        assert_eq!(cache.stats().discarded, 1);

        let refetched: Result<Points, &str> = cache
            .get_or_fetch(key.clone(), || async { Ok::<_, &str>(Points { points: 2 }) })
            .await;
        assert_eq!(refetched, Ok(Points { points: 2 }));
        assert_eq!(cache.get(key), Some(Points { points: 2 }));
    }

    #[tokio::test]
    async fn invalidating_another_entity_keeps_the_fetch() {
        let (cache, _) = cache_with_clock(300);
        let fetched: Result<Points, &str> = cache
            .get_or_fetch(EntityKey::field("hank", "points"), || async {
                cache.invalidate_entity("ivy");
                Ok::<_, &str>(Points { points: 3 })
            })
            .await;

        assert!(fetched.is_ok());
        assert_eq!(
            cache.get(EntityKey::field("hank", "points")),
            Some(Points { points: 3 })
        );
        assert_eq!(cache.stats().discarded, 0);
    }

    #[tokio::test]
    async fn concurrent_puts_on_distinct_keys() {
        let cache: Arc<ResultCache<u32>> = Arc::new(ResultCache::new(CacheConfig::default()));
        let mut tasks = Vec::new();
        for i in 0..32u32 {
            let cache = Arc::clone(&cache);
            tasks.push(tokio::spawn(async move {
                cache.put(format!("Student-{i}"), i);
                cache.get(format!("student-{i}"))
            }));
        }
        for (i, task) in tasks.into_iter().enumerate() {
            assert_eq!(task.await.unwrap(), Some(i as u32));
        }
        assert_eq!(cache.len(), 32);
    }
}
