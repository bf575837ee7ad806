//! Verdict deduplication cache.
//!
//! Maps an input fingerprint to a previously computed verdict so identical
//! payloads do not re-run the pipeline. Two independent bounds must both
//! hold for a hit: the entry's TTL and the cache capacity (least-recently-
//! accessed entries are evicted first). Expiry is lazy, on read; there is no
//! background sweep.

use crate::application::ports::Clock;
use crate::domain::fingerprint::InputFingerprint;
use crate::domain::verdict::Verdict;
use crate::error::ConfigError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Configuration for the dedup cache.
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// Maximum number of cached verdicts
    pub max_entries: usize,
    /// How long a cached verdict stays valid
    pub ttl: Duration,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            max_entries: 4096,
            ttl: Duration::from_secs(60),
        }
    }
}

impl DedupConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::ZeroDedupCapacity);
        }
        if self.ttl.is_zero() {
            return Err(ConfigError::ZeroWindow("dedup ttl"));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Entry {
    verdict: Verdict,
    inserted_at: Instant,
    last_access: u64,
}

#[derive(Debug, Default)]
struct DedupInner {
    map: HashMap<InputFingerprint, Entry, ahash::RandomState>,
    // Monotonic access sequence; recency is tracked per access, not per
    // insertion, so a read refreshes an entry's position.
    seq: u64,
}

/// LRU + TTL cache of verdicts keyed by input fingerprint.
///
/// A single coarse lock guards the map; operations are short and never call
/// external code while holding it. Concurrent inspections of the same
/// fingerprint may both proceed to the pipeline; the second writer simply
/// overwrites ("last write wins").
#[derive(Debug)]
pub struct DedupCache {
    inner: Mutex<DedupInner>,
    clock: Arc<dyn Clock>,
    config: DedupConfig,
}

impl DedupCache {
    /// Create a cache with the given configuration.
    pub fn new(config: DedupConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(DedupInner::default()),
            clock,
            config,
        }
    }

    /// Look up a cached verdict.
    ///
    /// Returns `None` if the fingerprint was never stored, was evicted, or
    /// its TTL elapsed (the expired entry is removed on observation). A hit
    /// refreshes the entry's recency.
    pub fn get(&self, fingerprint: InputFingerprint) -> Option<Verdict> {
        let now = self.clock.now();
        let mut inner = self.lock();
        let expired = match inner.map.get(&fingerprint) {
            Some(entry) => now.saturating_duration_since(entry.inserted_at) >= self.config.ttl,
            None => return None,
        };
        if expired {
            inner.map.remove(&fingerprint);
            return None;
        }
        inner.seq += 1;
        let seq = inner.seq;
        let entry = inner.map.get_mut(&fingerprint)?;
        entry.last_access = seq;
        Some(entry.verdict.clone())
    }

    /// Store a verdict.
    ///
    /// If the cache is at capacity and the fingerprint is new, the least-
    /// recently-accessed entry is evicted first.
    pub fn put(&self, fingerprint: InputFingerprint, verdict: Verdict) {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.seq += 1;
        let seq = inner.seq;

        if !inner.map.contains_key(&fingerprint) && inner.map.len() >= self.config.max_entries {
            if let Some(victim) = inner
                .map
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(fp, _)| *fp)
            {
                inner.map.remove(&victim);
            }
        }

        inner.map.insert(
            fingerprint,
            Entry {
                verdict,
                inserted_at: now,
                last_access: seq,
            },
        );
    }

    /// Number of cached entries, including any not yet lazily expired.
    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.lock().map.is_empty()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.lock().map.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DedupInner> {
        // A poisoned lock means another thread panicked mid-update; the map
        // holds only owned values, so the state is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::verdict::ThreatLevel;
    use crate::infrastructure::mocks::MockClock;

    fn fp(n: u64) -> InputFingerprint {
        InputFingerprint::from_hash(n)
    }

    fn threat(guard: &str) -> Verdict {
        Verdict::threat(guard, ThreatLevel::High, "detected")
    }

    fn cache(max_entries: usize, ttl_secs: u64) -> (DedupCache, Arc<MockClock>) {
        let clock = Arc::new(MockClock::new(Instant::now()));
        let cache = DedupCache::new(
            DedupConfig {
                max_entries,
                ttl: Duration::from_secs(ttl_secs),
            },
            clock.clone(),
        );
        (cache, clock)
    }

    #[test]
    fn test_get_absent() {
        let (cache, _clock) = cache(4, 60);
        assert!(cache.get(fp(1)).is_none());
    }

    #[test]
    fn test_put_get_roundtrip() {
        let (cache, _clock) = cache(4, 60);
        cache.put(fp(1), threat("sqli"));
        let hit = cache.get(fp(1)).unwrap();
        assert_eq!(hit.guard, "sqli");
    }

    #[test]
    fn test_lru_eviction_by_access_not_insertion() {
        let (cache, _clock) = cache(2, 60);
        cache.put(fp(1), threat("a"));
        cache.put(fp(2), threat("b"));

        // Touch A so B becomes least-recently-accessed.
        assert!(cache.get(fp(1)).is_some());

        cache.put(fp(3), threat("c"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(fp(2)).is_none(), "B was LRU and must be evicted");
        assert!(cache.get(fp(1)).is_some());
        assert!(cache.get(fp(3)).is_some());
    }

    #[test]
    fn test_capacity_evicts_least_recently_accessed() {
        // With max_entries=2, inserting A, B then C evicts A.
        let (cache, _clock) = cache(2, 60);
        cache.put(fp(1), threat("a"));
        cache.put(fp(2), threat("b"));
        cache.put(fp(3), threat("c"));

        assert!(cache.get(fp(1)).is_none(), "A evicted before TTL expiry");
        assert!(cache.get(fp(2)).is_some());
        assert!(cache.get(fp(3)).is_some());
    }

    #[test]
    fn test_ttl_expiry_is_lazy() {
        let (cache, clock) = cache(4, 60);
        cache.put(fp(1), threat("a"));

        clock.advance(Duration::from_secs(59));
        assert!(cache.get(fp(1)).is_some());

        clock.advance(Duration::from_secs(2));
        assert!(cache.get(fp(1)).is_none(), "TTL elapsed");
        assert_eq!(cache.len(), 0, "expired entry removed on observation");
    }

    #[test]
    fn test_ttl_applies_regardless_of_capacity() {
        let (cache, clock) = cache(100, 10);
        for i in 0..5 {
            cache.put(fp(i), threat("g"));
        }
        clock.advance(Duration::from_secs(11));
        for i in 0..5 {
            assert!(cache.get(fp(i)).is_none());
        }
    }

    #[test]
    fn test_overwrite_refreshes_ttl() {
        let (cache, clock) = cache(4, 10);
        cache.put(fp(1), threat("old"));
        clock.advance(Duration::from_secs(8));
        cache.put(fp(1), threat("new"));
        clock.advance(Duration::from_secs(8));

        // 16s since first insert, 8s since overwrite.
        let hit = cache.get(fp(1)).unwrap();
        assert_eq!(hit.guard, "new");
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = DedupConfig {
            max_entries: 0,
            ttl: Duration::from_secs(1),
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroDedupCapacity));
    }

    #[test]
    fn test_clear() {
        let (cache, _clock) = cache(4, 60);
        cache.put(fp(1), threat("a"));
        cache.put(fp(2), threat("b"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
