// Bounded memoization in front of the procedural generators.
//
// Entries are keyed by generator name plus numeric parameters. Eviction is
// FIFO over insertion order: a hit does not refresh an entry's position.
// Every read and write copies the pattern, so callers never share storage
// with the cache or with each other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::generators;
use crate::types::{CacheConfig, Pattern};

/// Cache key: generator name and its parameters.
///
/// Parameters are stored as raw `f64` bits so keys hash exactly; `3.0` and
/// `3` map to the same entry, `-0.0` and `0.0` do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    generator: String,
    params: Vec<u64>,
}

impl CacheKey {
    pub fn new(generator: impl Into<String>, params: &[f64]) -> Self {
        CacheKey {
            generator: generator.into(),
            params: params.iter().map(|p| p.to_bits()).collect(),
        }
    }

    pub fn generator(&self) -> &str {
        &self.generator
    }
}

/// Hit/miss counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 { 0.0 } else { self.hits() as f64 / total as f64 }
    }

    fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// FIFO-bounded pattern cache. `&PatternCache` is `Sync`; share it behind an
/// `Arc` or a plain reference.
#[derive(Debug)]
pub struct PatternCache {
    entries: Mutex<IndexMap<CacheKey, Pattern>>,
    capacity: usize,
    stats: CacheStats,
}

impl PatternCache {
    pub fn new(capacity: usize) -> Self {
        debug!("PatternCache created: capacity={}", capacity);
        PatternCache {
            entries: Mutex::new(IndexMap::with_capacity(capacity)),
            capacity,
            stats: CacheStats::default(),
        }
    }

    pub fn from_config(config: CacheConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Returns a copy of the cached pattern for `key`, or runs `generate`,
    /// stores a copy and returns another.
    ///
    /// The generator runs without the lock held, so it may itself use the
    /// cache.
    pub fn get_or_generate<F>(&self, key: CacheKey, generate: F) -> Pattern
    where
        F: FnOnce() -> Pattern,
    {
        if let Some(hit) = self.lock().get(&key) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            trace!("PatternCache hit: {}", key.generator);
            return hit.clone();
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        let generated = generate();
        if self.capacity == 0 {
            return generated;
        }

        let mut entries = self.lock();
        if !entries.contains_key(&key) {
            while entries.len() >= self.capacity {
                if let Some((evicted, _)) = entries.shift_remove_index(0) {
                    debug!("PatternCache evicted oldest entry: {}", evicted.generator);
                }
            }
        }
        entries.insert(key, generated.clone());
        generated
    }

    /// Copy of the entry for `key`, if present. Does not count as a hit.
    pub fn peek(&self, key: &CacheKey) -> Option<Pattern> {
        self.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().contains_key(key)
    }

    pub fn clear(&self) {
        self.lock().clear();
        self.stats.reset();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IndexMap<CacheKey, Pattern>> {
        // Patterns are plain data; a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::from_config(CacheConfig::default())
    }
}

pub fn cached_circle(cache: &PatternCache, size: usize, radius: f64) -> Pattern {
    cache.get_or_generate(CacheKey::new("circle", &[size as f64, radius]), || {
        generators::circle(size, radius)
    })
}

pub fn cached_ring(cache: &PatternCache, size: usize, outer_radius: f64, inner_radius: f64) -> Pattern {
    cache.get_or_generate(
        CacheKey::new("ring", &[size as f64, outer_radius, inner_radius]),
        || generators::ring(size, outer_radius, inner_radius),
    )
}

pub fn cached_cross(cache: &PatternCache, size: usize) -> Pattern {
    cache.get_or_generate(CacheKey::new("cross", &[size as f64]), || generators::cross(size))
}

pub fn cached_diagonal(cache: &PatternCache, size: usize) -> Pattern {
    cache.get_or_generate(CacheKey::new("diagonal", &[size as f64]), || {
        generators::diagonal(size)
    })
}

pub fn cached_checkerboard(cache: &PatternCache, size: usize) -> Pattern {
    cache.get_or_generate(CacheKey::new("checkerboard", &[size as f64]), || {
        generators::checkerboard(size)
    })
}

pub fn cached_wave(cache: &PatternCache, size: usize, amplitude: f64, frequency: f64) -> Pattern {
    cache.get_or_generate(
        CacheKey::new("wave", &[size as f64, amplitude, frequency]),
        || generators::wave(size, amplitude, frequency),
    )
}
