//! In-memory LRU translation cache with TTL.
//! Key: blake3 hash of (mode | target language | member content). Archives
//! often repeat identical subtitle files across folders; the cache keeps a
//! repeated member from paying for a second gateway round trip. Process
//! memory only, gone on restart.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

struct CacheEntry {
    translated_text: String,
    inserted_at: Instant,
}

pub struct TranslationCache {
    inner: Mutex<LruCache<[u8; 32], CacheEntry>>,
    ttl: Duration,
}

impl TranslationCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("cache capacity must be > 0"),
            )),
            ttl,
        }
    }

    /// Compute the cache key from translation parameters.
    pub fn compute_key(mode: &str, target_code: &str, content: &str) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(mode.as_bytes());
        hasher.update(b"|");
        hasher.update(target_code.as_bytes());
        hasher.update(b"|");
        hasher.update(content.as_bytes());
        *hasher.finalize().as_bytes()
    }

    /// Look up a cached translation. Returns None if absent or expired.
    pub fn get(&self, key: &[u8; 32]) -> Option<String> {
        let mut cache = self.inner.lock();
        if let Some(entry) = cache.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.translated_text.clone());
            }
            cache.pop(key);
        }
        None
    }

    /// Insert a translation result into the cache.
    pub fn insert(&self, key: [u8; 32], translated_text: String) {
        let mut cache = self.inner.lock();
        cache.put(
            key,
            CacheEntry {
                translated_text,
                inserted_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_after_insert() {
        let cache = TranslationCache::new(8, Duration::from_secs(60));
        let key = TranslationCache::compute_key("normal", "ja", "hello");
        assert!(cache.get(&key).is_none());

        cache.insert(key, "konnichiwa".to_string());
        assert_eq!(cache.get(&key).as_deref(), Some("konnichiwa"));
    }

    #[test]
    fn keys_separate_mode_and_target() {
        let a = TranslationCache::compute_key("normal", "ja", "hello");
        let b = TranslationCache::compute_key("adult", "ja", "hello");
        let c = TranslationCache::compute_key("normal", "ko", "hello");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = TranslationCache::new(8, Duration::from_millis(0));
        let key = TranslationCache::compute_key("normal", "en", "x");
        cache.insert(key, "y".to_string());
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn capacity_evicts_least_recent() {
        let cache = TranslationCache::new(1, Duration::from_secs(60));
        let first = TranslationCache::compute_key("normal", "en", "first");
        let second = TranslationCache::compute_key("normal", "en", "second");

        cache.insert(first, "1".to_string());
        cache.insert(second, "2".to_string());
        assert!(cache.get(&first).is_none());
        assert_eq!(cache.get(&second).as_deref(), Some("2"));
    }
}
