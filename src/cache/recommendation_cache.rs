/// TTL + LRU cache for computed recommendations
///
/// Entries live for 30 minutes; when the cache is full the
/// least-recently-used entry is evicted. Hit counters feed the stats
/// command.

use crate::config::CacheConfig;
use crate::context::ProjectContext;
use crate::engine::Recommendation;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct Entry {
    recommendation: Recommendation,
    inserted_at: Instant,
    last_used: Instant,
}

/// Running cache counters
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CacheMetrics {
    pub requests: u64,
    pub hits: u64,
    pub quick_responses: u64,
    pub enhanced_responses: u64,
}

/// Build the cache key for a request
///
/// Context features and the project type are part of the key so the same
/// text in a different project does not collide.
pub fn cache_key(command: &str, description: &str, context: &ProjectContext) -> String {
    format!(
        "{}|{}|{}|{}",
        command,
        description,
        context.project_type.as_deref().unwrap_or(""),
        context.feature_keys().join(",")
    )
}

pub struct RecommendationCache {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    capacity: usize,
    requests: AtomicU64,
    hits: AtomicU64,
    quick_responses: AtomicU64,
    enhanced_responses: AtomicU64,
}

impl RecommendationCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::from_secs(config.ttl_secs.max(0) as u64),
            capacity: config.capacity,
            requests: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            quick_responses: AtomicU64::new(0),
            enhanced_responses: AtomicU64::new(0),
        }
    }

    /// Look up a live entry, refreshing its LRU timestamp
    pub async fn get(&self, key: &str) -> Option<Recommendation> {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let mut entries = self.entries.lock().await;
        let entry = entries.get_mut(key)?;
        if entry.inserted_at.elapsed() > self.ttl {
            entries.remove(key);
            return None;
        }

        entry.last_used = Instant::now();
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry.recommendation.clone())
    }

    /// Insert or replace an entry, evicting the least-recently-used one
    /// when full
    pub async fn insert(&self, key: String, recommendation: Recommendation) {
        let mut entries = self.entries.lock().await;

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        let now = Instant::now();
        entries.insert(
            key,
            Entry {
                recommendation,
                inserted_at: now,
                last_used: now,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub fn count_quick(&self) {
        self.quick_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count_enhanced(&self) {
        self.enhanced_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            quick_responses: self.quick_responses.load(Ordering::Relaxed),
            enhanced_responses: self.enhanced_responses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pattern: &str, confidence: i64) -> Recommendation {
        Recommendation {
            pattern_id: pattern.to_string(),
            flags: vec!["--think".to_string()],
            confidence,
            reasoning: vec![],
            mcp_servers: vec![],
            personas: vec![],
        }
    }

    fn small_cache(capacity: usize) -> RecommendationCache {
        RecommendationCache::new(&CacheConfig {
            ttl_secs: 1800,
            capacity,
            queue_cap: 8,
        })
    }

    #[tokio::test]
    async fn test_hit_returns_identical_entry() {
        let cache = small_cache(10);
        let stored = rec("analyze_security", 87);

        cache.insert("k".to_string(), stored.clone()).await;
        let got = cache.get("k").await.unwrap();

        assert_eq!(got, stored);
        let m = cache.metrics();
        assert_eq!(m.requests, 1);
        assert_eq!(m.hits, 1);
    }

    #[tokio::test]
    async fn test_miss_counts_request_only() {
        let cache = small_cache(10);
        assert!(cache.get("missing").await.is_none());

        let m = cache.metrics();
        assert_eq!(m.requests, 1);
        assert_eq!(m.hits, 0);
    }

    #[tokio::test]
    async fn test_expired_entry_dropped() {
        let cache = RecommendationCache::new(&CacheConfig {
            ttl_secs: 0,
            capacity: 10,
            queue_cap: 8,
        });
        cache.insert("k".to_string(), rec("x", 70)).await;

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.get("k").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = small_cache(2);
        cache.insert("a".to_string(), rec("a", 70)).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.insert("b".to_string(), rec("b", 70)).await;

        // touch "a" so "b" becomes least recently used
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.get("a").await.unwrap();

        cache.insert("c".to_string(), rec("c", 70)).await;
        assert_eq!(cache.len().await, 2);
        assert!(cache.get("a").await.is_some());
        assert!(cache.get("b").await.is_none());
        assert!(cache.get("c").await.is_some());
    }

    #[tokio::test]
    async fn test_replace_in_place_keeps_capacity() {
        let cache = small_cache(2);
        cache.insert("a".to_string(), rec("a", 70)).await;
        cache.insert("b".to_string(), rec("b", 70)).await;

        // replacing an existing key must not evict anything
        cache.insert("a".to_string(), rec("a", 90)).await;
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("a").await.unwrap().confidence, 90);
        assert!(cache.get("b").await.is_some());
    }

    #[test]
    fn test_cache_key_includes_context() {
        let plain = ProjectContext::default();
        let python = ProjectContext {
            languages: vec!["python".to_string()],
            ..Default::default()
        };
        let backend = ProjectContext {
            project_type: Some("python_backend".to_string()),
            ..Default::default()
        };
        assert_ne!(
            cache_key("analyze", "x", &plain),
            cache_key("analyze", "x", &python)
        );
        assert_ne!(
            cache_key("analyze", "x", &plain),
            cache_key("analyze", "x", &backend)
        );
    }
}
