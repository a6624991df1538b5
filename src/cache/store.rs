use crate::models::response::GatewayResponse;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    #[default]
    Lru,
    Lfu,
    TimeBased,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_size_bytes: u64,
    #[serde(default)]
    pub eviction_policy: EvictionPolicy,
    #[serde(default)]
    pub cacheable_methods: Vec<String>,
    #[serde(default)]
    pub cacheable_statuses: Vec<u16>,
    pub default_ttl_ms: u64,
}

struct CacheEntry {
    response: GatewayResponse,
    size: u64,
    created: Instant,
    expiry: Instant,
    hit_count: AtomicU64,
    last_access: std::sync::Mutex<Instant>,
}

/// Keyed by fingerprint (see `fingerprint::fingerprint`). Every lookup
/// updates recency and hit count for whichever policy is configured;
/// eviction runs at insert time until the entry fits or the cache empties.
pub struct ResponseCache {
    config: CacheConfig,
    entries: DashMap<String, CacheEntry>,
    current_size: AtomicU64,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        ResponseCache {
            config,
            entries: DashMap::new(),
            current_size: AtomicU64::new(0),
        }
    }

    pub fn is_cacheable(&self, method: &str, status: u16) -> bool {
        let method_ok = self.config.cacheable_methods.is_empty()
            || self
                .config
                .cacheable_methods
                .iter()
                .any(|m| m.eq_ignore_ascii_case(method));
        let status_ok = self.config.cacheable_statuses.is_empty()
            || self.config.cacheable_statuses.contains(&status);
        method_ok && status_ok
    }

    pub fn get(&self, key: &str) -> Option<GatewayResponse> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        if now >= entry.expiry {
            drop(entry);
            self.remove(key);
            return None;
        }
        entry.hit_count.fetch_add(1, Ordering::Relaxed);
        *entry.last_access.lock().unwrap() = now;
        let mut response = entry.response.clone();
        response.cached = true;
        Some(response)
    }

    pub fn set(&self, key: &str, response: GatewayResponse, ttl: Option<Duration>) {
        let now = Instant::now();
        let size = response.body.len() as u64;
        let ttl = ttl.unwrap_or(Duration::from_millis(self.config.default_ttl_ms));

        self.remove(key);
        while self.current_size.load(Ordering::Relaxed) + size > self.config.max_size_bytes
            && !self.entries.is_empty()
        {
            if !self.evict_one() {
                break;
            }
        }

        self.entries.insert(
            key.to_string(),
            CacheEntry {
                response,
                size,
                created: now,
                expiry: now + ttl,
                hit_count: AtomicU64::new(0),
                last_access: std::sync::Mutex::new(now),
            },
        );
        self.current_size.fetch_add(size, Ordering::Relaxed);
    }

    pub fn invalidate(&self, key: &str) {
        self.remove(key);
    }

    pub fn clear_expired(&self) {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|e| now >= e.expiry)
            .map(|e| e.key().clone())
            .collect();
        for key in expired {
            self.remove(&key);
        }
    }

    pub fn total_size(&self) -> u64 {
        self.current_size.load(Ordering::Relaxed)
    }

    fn remove(&self, key: &str) {
        if let Some((_, entry)) = self.entries.remove(key) {
            self.current_size.fetch_sub(entry.size, Ordering::Relaxed);
        }
    }

    fn evict_one(&self) -> bool {
        let victim = match self.config.eviction_policy {
            EvictionPolicy::Lru => self
                .entries
                .iter()
                .min_by_key(|e| *e.last_access.lock().unwrap())
                .map(|e| e.key().clone()),
            EvictionPolicy::Lfu => self
                .entries
                .iter()
                .min_by_key(|e| e.hit_count.load(Ordering::Relaxed))
                .map(|e| e.key().clone()),
            EvictionPolicy::TimeBased => self
                .entries
                .iter()
                .min_by_key(|e| e.created)
                .map(|e| e.key().clone()),
        };
        match victim {
            Some(key) => {
                self.remove(&key);
                true
            }
            None => false,
        }
    }
}
