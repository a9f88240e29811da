//! In-memory cache of recently trained phrases.
//!
//! The training selector avoids asking the same phrase again too soon by
//! remembering the last few phrase ids per (user, source language). Entries
//! expire after a TTL so an idle user starts over with an empty buffer.
//!
//! ```rust
//! use dictrainer::cache::RecentPhrasesCache;
//! use std::time::Duration;
//!
//! let cache = RecentPhrasesCache::new(3, Duration::from_secs(60));
//! cache.push(1, 10, 100);
//! cache.push(1, 10, 101);
//! assert_eq!(cache.recent(1, 10), vec![101, 100]);
//! ```

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Generic cache entry with expiration time
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached value
    pub value: T,
    /// When this entry expires
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    /// Create a new cache entry
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    /// Check if this entry has expired
    pub fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }

    /// Push the expiration out by `ttl` from now
    pub fn touch(&mut self, ttl: Duration) {
        self.expires_at = Instant::now() + ttl;
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Number of live buffers
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Share of lookups that found a live buffer, 0 before any lookup
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Key of a recent buffer: (user_id, source language id)
pub type RecentKey = (i64, i64);

#[derive(Default)]
struct RecentInner {
    buffers: HashMap<RecentKey, CacheEntry<VecDeque<i64>>>,
    hits: u64,
    misses: u64,
}

/// Thread-safe per-user, per-language buffer of recently trained phrase ids
pub struct RecentPhrasesCache {
    capacity: usize,
    ttl: Duration,
    inner: Mutex<RecentInner>,
}

impl RecentPhrasesCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            inner: Mutex::new(RecentInner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Recent phrase ids, newest first; empty when missing or expired
    pub fn recent(&self, user_id: i64, lang_id: i64) -> Vec<i64> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let key = (user_id, lang_id);

        let live = inner
            .buffers
            .get(&key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.iter().copied().collect::<Vec<_>>());

        match live {
            Some(ids) => {
                inner.hits += 1;
                ids
            }
            None => {
                inner.buffers.remove(&key);
                inner.misses += 1;
                Vec::new()
            }
        }
    }

    /// Move `phrase_id` to the front, dropping any earlier occurrence and
    /// anything beyond capacity
    pub fn push(&self, user_id: i64, lang_id: i64, phrase_id: i64) {
        if self.capacity == 0 {
            return;
        }

        let mut inner = self.inner.lock();
        let entry = inner
            .buffers
            .entry((user_id, lang_id))
            .or_insert_with(|| CacheEntry::new(VecDeque::with_capacity(self.capacity), self.ttl));

        if entry.is_expired() {
            entry.value.clear();
        }
        entry.touch(self.ttl);

        entry.value.retain(|id| *id != phrase_id);
        entry.value.push_front(phrase_id);
        entry.value.truncate(self.capacity);
    }

    /// Forget the buffer of one user and language
    pub fn clear(&self, user_id: i64, lang_id: i64) {
        self.inner.lock().buffers.remove(&(user_id, lang_id));
    }

    /// Drop expired buffers
    pub fn cleanup(&self) {
        self.inner.lock().buffers.retain(|_, entry| !entry.is_expired());
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.buffers.len(),
            hits: inner.hits,
            misses: inner.misses,
        }
    }
}
