//! TTL-bounded in-memory cache, guarded by a synchronous mutex since its
//! critical sections are short and hold no `.await` point (matching how the
//! corpus guards short-lived in-memory state elsewhere, e.g. a checkpoint
//! store backed by `Arc<parking_lot::Mutex<_>>`).

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::domain::{Source, Topic};
use crate::error::TopicsError;
use crate::Result;

/// Injectable wall clock, so cache expiry is deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock, used by every non-test construction path.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct Entry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

/// A generic key-value cache where each entry expires `ttl` after it was
/// last written. Reads return an owned clone of the stored value: since
/// every `V` this crate caches (`Vec<Topic>`) owns its data outright with no
/// shared/aliased state, `Clone` already is the deep copy the spec requires
/// — mutating a cloned `Vec` can never reach back into the cache.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        if ttl <= Duration::zero() {
            return Err(TopicsError::invalid_argument("cache TTL must be positive"));
        }
        Ok(Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        })
    }

    /// Absent or expired (evicting on expiry) both read as `None`.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if now > entry.stored_at + self.ttl => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    pub fn set(&self, key: K, value: V) {
        let stored_at = self.clock.now();
        self.entries.lock().insert(key, Entry { value, stored_at });
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.lock().remove(key);
    }

    pub fn clear_expired(&self) {
        let now = self.clock.now();
        let ttl = self.ttl;
        self.entries.lock().retain(|_, entry| now <= entry.stored_at + ttl);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The two caches the aggregator keeps: one for hot-list reads, one for
/// search results, each keyed the way §4.2 specifies.
pub struct HotTopicsCache {
    pub hot: TtlCache<String, Vec<Topic>>,
    pub search: TtlCache<String, Vec<Topic>>,
}

impl HotTopicsCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            hot: TtlCache::new(ttl, clock.clone())?,
            search: TtlCache::new(ttl, clock)?,
        })
    }

    pub fn hot_key(source: Option<Source>) -> String {
        match source {
            None => "hot:all".to_string(),
            Some(source) => format!("hot:{source}"),
        }
    }

    pub fn search_key(source: Option<Source>, normalized_query: &str) -> String {
        match source {
            None => format!("search:all:{normalized_query}"),
            Some(source) => format!("search:{source}:{normalized_query}"),
        }
    }

    /// Invalidate the hot-list key for one source, or every source when
    /// `None`, then wipe the entire search cache — matching `Refresh`'s
    /// "clear the entire search cache" rule regardless of scope.
    pub fn invalidate_for_refresh(&self, source: Option<Source>) {
        match source {
            None => {
                self.hot.invalidate(&Self::hot_key(None));
                for s in crate::domain::ALL_SOURCES {
                    self.hot.invalidate(&Self::hot_key(Some(s)));
                }
            }
            Some(source) => self.hot.invalidate(&Self::hot_key(Some(source))),
        }
        self.search.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct FixedClock(AtomicI64);

    impl FixedClock {
        fn new(ms: i64) -> Self {
            Self(AtomicI64::new(ms))
        }
        fn advance(&self, ms: i64) {
            self.0.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::<Utc>::from_timestamp_millis(self.0.load(Ordering::SeqCst)).unwrap()
        }
    }

    #[test]
    fn rejects_non_positive_ttl() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        assert!(TtlCache::<String, Vec<u8>>::new(Duration::zero(), clock).is_err());
    }

    #[test]
    fn read_before_expiry_returns_value_read_after_expiry_evicts() {
        let clock = Arc::new(FixedClock::new(0));
        let cache: TtlCache<String, Vec<u8>> =
            TtlCache::new(Duration::milliseconds(100), clock.clone()).unwrap();
        cache.set("k".into(), vec![1, 2, 3]);

        clock.advance(99);
        assert_eq!(cache.get(&"k".to_string()), Some(vec![1, 2, 3]));

        clock.advance(2);
        assert_eq!(cache.get(&"k".to_string()), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn mutating_a_returned_clone_does_not_affect_the_cache() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache: TtlCache<String, Vec<u8>> =
            TtlCache::new(Duration::seconds(60), clock).unwrap();
        cache.set("k".into(), vec![1, 2, 3]);

        let mut read = cache.get(&"k".to_string()).unwrap();
        read.push(4);

        assert_eq!(cache.get(&"k".to_string()).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn hot_key_and_search_key_shape() {
        assert_eq!(HotTopicsCache::hot_key(None), "hot:all");
        assert_eq!(HotTopicsCache::hot_key(Some(Source::Weibo)), "hot:weibo");
        assert_eq!(
            HotTopicsCache::search_key(Some(Source::Zhihu), "rust"),
            "search:zhihu:rust"
        );
        assert_eq!(HotTopicsCache::search_key(None, "rust"), "search:all:rust");
    }
}
