//! Regex cache for filter evaluation.
//!
//! Group creation evaluates every filter against every registered session, so
//! the same pattern is compiled many times in a row. The cache keeps compiled
//! regexes keyed by pattern text and evicts the oldest insertion when full.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use regex::Regex;

/// Default maximum cache size.
pub const DEFAULT_CACHE_SIZE: usize = 100;

/// A bounded cache of compiled regular expressions.
pub struct RegexCache {
    cache: RwLock<Entries>,
    max_size: usize,
    total_hits: AtomicUsize,
    total_misses: AtomicUsize,
}

#[derive(Default)]
struct Entries {
    by_pattern: HashMap<String, Arc<Regex>>,
    order: VecDeque<String>,
}

impl RegexCache {
    /// Create a new regex cache with the specified maximum size.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            cache: RwLock::new(Entries {
                by_pattern: HashMap::with_capacity(max_size),
                order: VecDeque::with_capacity(max_size),
            }),
            max_size,
            total_hits: AtomicUsize::new(0),
            total_misses: AtomicUsize::new(0),
        }
    }

    /// Get or compile a regex pattern.
    ///
    /// Invalid patterns are not cached; every lookup of one recompiles and
    /// returns the error again.
    pub fn get_or_compile(&self, pattern: &str) -> Result<Arc<Regex>, regex::Error> {
        // The cache is only an optimisation, so a poisoned lock is recovered.
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(regex) = cache.by_pattern.get(pattern) {
                self.total_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(regex));
            }
        }

        self.total_misses.fetch_add(1, Ordering::Relaxed);
        let regex = Arc::new(Regex::new(pattern)?);

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);

        // Another thread may have inserted while we compiled.
        if let Some(existing) = cache.by_pattern.get(pattern) {
            return Ok(Arc::clone(existing));
        }

        if cache.by_pattern.len() >= self.max_size {
            if let Some(oldest) = cache.order.pop_front() {
                cache.by_pattern.remove(&oldest);
            }
        }

        cache
            .by_pattern
            .insert(pattern.to_string(), Arc::clone(&regex));
        cache.order.push_back(pattern.to_string());

        Ok(regex)
    }

    /// Check if a pattern is cached.
    #[must_use]
    pub fn contains(&self, pattern: &str) -> bool {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        cache.by_pattern.contains_key(pattern)
    }

    /// Get the current number of cached patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        cache.by_pattern.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear the cache.
    pub fn clear(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.by_pattern.clear();
        cache.order.clear();
    }

    /// Get cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            max_size: self.max_size,
            total_hits: self.total_hits.load(Ordering::Relaxed),
            total_misses: self.total_misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl std::fmt::Debug for RegexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexCache")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of cached patterns.
    pub size: usize,
    /// Maximum cache size.
    pub max_size: usize,
    /// Lookups answered from the cache.
    pub total_hits: usize,
    /// Lookups that had to compile.
    pub total_misses: usize,
}

impl CacheStats {
    /// Get the hit rate (0.0 to 1.0). Returns 1.0 before any lookup.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_hits + self.total_misses;
        if total == 0 {
            1.0
        } else {
            self.total_hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_hit_after_compile() {
        let cache = RegexCache::new(4);
        let first = cache.get_or_compile(r"^web-\d+$").unwrap();
        let second = cache.get_or_compile(r"^web-\d+$").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!(stats.total_hits, 1);
        assert_eq!(stats.total_misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_pattern_not_cached() {
        let cache = RegexCache::new(4);
        assert!(cache.get_or_compile("(unclosed").is_err());
        assert!(!cache.contains("(unclosed"));
        assert!(cache.is_empty());
    }

    #[test]
    fn evicts_oldest_when_full() {
        let cache = RegexCache::new(2);
        cache.get_or_compile("a").unwrap();
        cache.get_or_compile("b").unwrap();
        cache.get_or_compile("c").unwrap();

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn clear_empties() {
        let cache = RegexCache::default();
        cache.get_or_compile("x").unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
