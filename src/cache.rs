//! Per-source metadata caches.
//!
//! Each source parser owns one bounded cache keyed by absolute path with
//! strict least-recently-used eviction. Negative results (a parse that
//! found nothing, or failed outright) are cached like positive ones, so a
//! transient failure stays empty for the life of the process; callers that
//! do not want failure memoization can opt out per cache.
//!
//! The lock is held only around map access, never around a parse, so
//! concurrent misses on the same path may duplicate work but never race on
//! the map.

use parking_lot::Mutex;
use reelmeta_common::{Record, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default per-source capacity.
pub const DEFAULT_CAPACITY: usize = 50;

struct Slot {
    record: Record,
    stamp: u64,
}

struct Inner {
    map: HashMap<PathBuf, Slot>,
    tick: u64,
}

/// A bounded, strict-LRU record cache for one source kind.
pub struct SourceCache {
    capacity: usize,
    cache_failures: bool,
    inner: Mutex<Inner>,
}

impl SourceCache {
    /// Create a cache with the given capacity. Failed parses are cached as
    /// empty records, matching the upstream behavior.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            cache_failures: true,
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                tick: 0,
            }),
        }
    }

    /// Do not memoize failed parses; the next lookup retries them.
    pub fn without_negative_caching(mut self) -> Self {
        self.cache_failures = false;
        self
    }

    /// Look up a cached record, refreshing its recency.
    pub fn get(&self, path: &Path) -> Option<Record> {
        let mut inner = self.inner.lock();
        inner.tick += 1;
        let tick = inner.tick;
        let slot = inner.map.get_mut(path)?;
        slot.stamp = tick;
        Some(slot.record.clone())
    }

    /// Insert a record, evicting the least-recently-touched entry when the
    /// capacity bound is exceeded.
    pub fn insert(&self, path: &Path, record: Record) {
        let mut inner = self.inner.lock();
        inner.tick += 1;
        let stamp = inner.tick;
        inner.map.insert(path.to_path_buf(), Slot { record, stamp });
        while inner.map.len() > self.capacity {
            let victim = inner
                .map
                .iter()
                .min_by_key(|(_, slot)| slot.stamp)
                .map(|(path, _)| path.clone());
            match victim {
                Some(path) => {
                    inner.map.remove(&path);
                }
                None => break,
            }
        }
    }

    /// Return the cached record for a path, computing and storing it on a
    /// miss. The parse runs without the lock held; a concurrent miss on the
    /// same path may compute twice, last insert wins.
    pub fn get_or_compute<F>(&self, path: &Path, compute: F) -> Result<Record>
    where
        F: FnOnce(&Path) -> Result<Record>,
    {
        if let Some(hit) = self.get(path) {
            return Ok(hit);
        }
        match compute(path) {
            Ok(record) => {
                self.insert(path, record.clone());
                Ok(record)
            }
            Err(err) => {
                if self.cache_failures {
                    self.insert(path, Record::new());
                }
                Err(err)
            }
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelmeta_common::Error;

    fn record_with_title(title: &str) -> Record {
        let mut record = Record::new();
        record.set("title", title);
        record
    }

    #[test]
    fn test_hit_skips_recompute() {
        let cache = SourceCache::new(10);
        let path = Path::new("/media/a.mp4");
        cache.insert(path, record_with_title("cached"));

        let record = cache
            .get_or_compute(path, |_| panic!("must not recompute"))
            .unwrap();
        assert_eq!(record.text("title"), Some("cached"));
    }

    #[test]
    fn test_negative_results_cached_by_default() {
        let cache = SourceCache::new(10);
        let path = Path::new("/media/broken.mp4");

        let err = cache.get_or_compute(path, |_| {
            Err(Error::malformed("bad file"))
        });
        assert!(err.is_err());

        // Second lookup hits the cached empty record and must not rerun.
        let record = cache
            .get_or_compute(path, |_| panic!("failure was memoized"))
            .unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_negative_caching_can_be_disabled() {
        let cache = SourceCache::new(10).without_negative_caching();
        let path = Path::new("/media/locked.mp4");

        let _ = cache.get_or_compute(path, |_| Err(Error::malformed("locked")));
        let record = cache
            .get_or_compute(path, |_| Ok(record_with_title("retried")))
            .unwrap();
        assert_eq!(record.text("title"), Some("retried"));
    }

    #[test]
    fn test_concurrent_lookups_share_one_cache() {
        let cache = std::sync::Arc::new(SourceCache::new(8));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = std::sync::Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    let path = format!("/media/{}.mp4", i % 12);
                    let record = cache
                        .get_or_compute(Path::new(&path), |_| Ok(record_with_title("shared")))
                        .unwrap();
                    assert_eq!(record.text("title"), Some("shared"));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 8);
    }

    #[test]
    fn test_eviction_is_strict_lru() {
        let cache = SourceCache::new(50);
        for i in 0..50 {
            cache.insert(Path::new(&format!("/media/{i}.mp4")), Record::new());
        }

        // Touch the oldest entry so the second-oldest becomes the victim.
        assert!(cache.get(Path::new("/media/0.mp4")).is_some());
        cache.insert(Path::new("/media/50.mp4"), Record::new());

        assert_eq!(cache.len(), 50);
        assert!(cache.get(Path::new("/media/0.mp4")).is_some());
        assert!(cache.get(Path::new("/media/1.mp4")).is_none());
        assert!(cache.get(Path::new("/media/50.mp4")).is_some());
    }
}
