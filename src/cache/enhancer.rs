/// Background enhancement worker
///
/// On a cache miss the caller gets a quick catalog answer immediately; a
/// task is queued here to recompute the full store-backed result and
/// replace the cache entry in place. One worker drains a capped FIFO;
/// enqueue never blocks and drops the oldest task under pressure.

use crate::cache::recommendation_cache::{cache_key, RecommendationCache};
use crate::config::CacheConfig;
use crate::context::ProjectContext;
use crate::engine::{Recommendation, Recommender};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

struct EnhancementTask {
    key: String,
    command: String,
    description: String,
    context: ProjectContext,
    user_id: String,
    project_hash: String,
}

struct Shared {
    queue: Mutex<VecDeque<EnhancementTask>>,
    notify: Notify,
}

/// Handle to the single enhancement worker
pub struct Enhancer {
    shared: Arc<Shared>,
    queue_cap: usize,
    _worker: tokio::task::JoinHandle<()>,
}

impl Enhancer {
    /// Spawn the worker task
    pub fn start(
        recommender: Recommender,
        cache: Arc<RecommendationCache>,
        queue_cap: usize,
    ) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        });

        let worker_shared = shared.clone();
        let worker = tokio::spawn(async move {
            loop {
                let task = worker_shared.queue.lock().await.pop_front();
                match task {
                    Some(task) => {
                        let enhanced = recommender
                            .recommend(
                                &task.command,
                                &task.description,
                                &task.context,
                                &task.user_id,
                                &task.project_hash,
                            )
                            .await;
                        debug!(key = %task.key, confidence = enhanced.confidence,
                               "enhanced recommendation ready");
                        cache.insert(task.key, enhanced).await;
                        cache.count_enhanced();
                    }
                    None => worker_shared.notify.notified().await,
                }
            }
        });

        Self {
            shared,
            queue_cap,
            _worker: worker,
        }
    }

    /// Queue a recomputation; never blocks the caller
    pub async fn enqueue(
        &self,
        key: String,
        command: &str,
        description: &str,
        context: &ProjectContext,
        user_id: &str,
        project_hash: &str,
    ) {
        let mut queue = self.shared.queue.lock().await;
        if queue.len() >= self.queue_cap {
            // drop the oldest pending task under pressure
            queue.pop_front();
        }
        queue.push_back(EnhancementTask {
            key,
            command: command.to_string(),
            description: description.to_string(),
            context: context.clone(),
            user_id: user_id.to_string(),
            project_hash: project_hash.to_string(),
        });
        drop(queue);
        self.shared.notify.notify_one();
    }

    pub async fn pending(&self) -> usize {
        self.shared.queue.lock().await.len()
    }
}

/// Cache-fronted recommender
///
/// Hits return the stored result; misses answer with the quick catalog
/// match and queue the full recomputation in the background.
pub struct CachedRecommender {
    recommender: Recommender,
    cache: Arc<RecommendationCache>,
    enhancer: Enhancer,
}

impl CachedRecommender {
    pub fn new(recommender: Recommender, config: &CacheConfig) -> Self {
        let cache = Arc::new(RecommendationCache::new(config));
        let enhancer = Enhancer::start(recommender.clone(), cache.clone(), config.queue_cap);
        Self {
            recommender,
            cache,
            enhancer,
        }
    }

    pub fn cache(&self) -> &RecommendationCache {
        &self.cache
    }

    /// Serve from cache or answer quickly and enhance in the background
    pub async fn get_or_compute(
        &self,
        command: &str,
        description: &str,
        context: &ProjectContext,
        user_id: &str,
        project_hash: &str,
    ) -> Recommendation {
        let key = cache_key(command, description, context);

        if let Some(hit) = self.cache.get(&key).await {
            return hit;
        }

        let quick = self.recommender.quick(command, description, context);
        self.cache.insert(key.clone(), quick.clone()).await;
        self.cache.count_quick();

        self.enhancer
            .enqueue(key, command, description, context, user_id, project_hash)
            .await;

        quick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, PreferenceStore};
    use std::time::Duration;

    async fn seeded_recommender() -> Recommender {
        let db = Database::new_test().await.unwrap();
        for _ in 0..20 {
            db.update_pattern_stats("analyze_security", true).await.unwrap();
        }
        Recommender::new(PreferenceStore::from_database(db))
    }

    #[tokio::test]
    async fn test_miss_answers_quickly_then_enhances() {
        let recommender = seeded_recommender().await;
        let cached = CachedRecommender::new(recommender, &CacheConfig::default());
        let ctx = ProjectContext::default();

        let quick = cached
            .get_or_compute("analyze", "find security vulnerabilities", &ctx, "u", "p")
            .await;
        assert_eq!(quick.pattern_id, "analyze_security");

        // wait for the worker to replace the entry with the full result
        let key = cache_key("analyze", "find security vulnerabilities", &ctx);
        let mut enhanced = None;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if cached.cache().metrics().enhanced_responses > 0 {
                enhanced = cached.cache().get(&key).await;
                break;
            }
        }

        let enhanced = enhanced.expect("enhancement never completed");
        // full history: 40 + 10 + 10 + 10 + 10
        assert_eq!(enhanced.confidence, 80);
        assert_ne!(enhanced.confidence, quick.confidence);
    }

    #[tokio::test]
    async fn test_hit_skips_enhancement() {
        let recommender = Recommender::new(PreferenceStore::disabled());
        let cached = CachedRecommender::new(recommender, &CacheConfig::default());
        let ctx = ProjectContext::default();

        let first = cached
            .get_or_compute("analyze", "review this", &ctx, "u", "p")
            .await;
        let second = cached
            .get_or_compute("analyze", "review this", &ctx, "u", "p")
            .await;

        // hits within the TTL return the stored flags and confidence
        assert_eq!(first.flags, second.flags);
        assert_eq!(first.confidence, second.confidence);
        let m = cached.cache().metrics();
        assert_eq!(m.hits, 1);
        assert_eq!(m.quick_responses, 1);
    }

    #[tokio::test]
    async fn test_queue_drops_oldest_under_pressure() {
        let recommender = Recommender::new(PreferenceStore::disabled());
        let cache = Arc::new(RecommendationCache::new(&CacheConfig::default()));
        // worker kept starved by not yielding between enqueues
        let enhancer = Enhancer::start(recommender, cache, 3);

        let ctx = ProjectContext::default();
        for i in 0..10 {
            enhancer
                .enqueue(format!("k{}", i), "analyze", "x", &ctx, "u", "p")
                .await;
        }

        assert!(enhancer.pending().await <= 3);
    }
}
