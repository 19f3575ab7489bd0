use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use dashmap::DashMap;
use tokio::{task::JoinHandle, time::Instant};

use crate::{CacheConfig, CachePolicy, CourseWebsiteId, Subject};

#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    /// None 表示永不过期
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Thread-safe key/value store where every entry carries its own expiry.
///
/// Expiry is checked on every read; the optional background sweeper only
/// reclaims memory.
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
    sweep_interval: Option<Duration>,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    pub fn new(default_ttl: Duration, sweep_interval: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            sweep_interval,
        }
    }

    pub fn from_policy(policy: CachePolicy) -> Self {
        Self::new(policy.ttl, policy.sweep_interval)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the value if present and not expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        if !entry.is_expired(now) {
            return Some(entry.value.clone());
        }

        drop(entry);
        // 只删除仍然过期的条目，避免误删刚写入的新值
        self.entries.remove_if(key, |_, e| e.is_expired(now));
        None
    }

    /// Creates or replaces the entry; a TTL that overflows never expires.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let expires_at = Instant::now().checked_add(ttl);
        self.entries
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Inserts with the cache's default TTL.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|(_, e)| e.value)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Starts the periodic sweep on the current runtime.
    ///
    /// The task only holds a weak handle and exits once the cache is dropped.
    /// Returns None when the cache has no sweep interval.
    pub fn spawn_sweeper(self: &Arc<Self>, name: &'static str) -> Option<JoinHandle<()>> {
        let interval = self.sweep_interval?;
        let cache: Weak<Self> = Arc::downgrade(self);

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 第一次 tick 立即完成
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(strong) = cache.upgrade() else {
                    break;
                };
                let removed = strong.sweep_expired();
                if removed > 0 {
                    tracing::debug!(cache = name, removed, "swept expired cache entries");
                }
            }
        }))
    }
}

/// The three cache instances shared by every request.
#[derive(Clone)]
pub struct Caches {
    /// course code -> website id
    pub website_ids: Arc<TtlCache<CourseWebsiteId>>,
    /// "{course}-{year}-{curriculum}" -> subjects
    pub subjects: Arc<TtlCache<Vec<Subject>>>,
    /// request fingerprint -> serialized calendar
    pub calendars: Arc<TtlCache<Arc<[u8]>>>,
}

impl Caches {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            website_ids: Arc::new(TtlCache::from_policy(config.website)),
            subjects: Arc::new(TtlCache::from_policy(config.subjects)),
            calendars: Arc::new(TtlCache::from_policy(config.calendars)),
        }
    }

    /// Spawns the sweepers of every cache that has a sweep interval.
    pub fn spawn_sweepers(&self) -> Vec<JoinHandle<()>> {
        [
            self.website_ids.spawn_sweeper("website_ids"),
            self.subjects.spawn_sweeper("subjects"),
            self.calendars.spawn_sweeper("calendars"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn clear(&self) {
        self.website_ids.clear();
        self.subjects.clear();
        self.calendars.clear();
    }
}

impl Default for Caches {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
