/// Cache module
///
/// Short-TTL recommendation memoization and the asynchronous enhancement
/// worker behind it.

pub mod enhancer;
pub mod recommendation_cache;

pub use enhancer::{CachedRecommender, Enhancer};
pub use recommendation_cache::{cache_key, CacheMetrics, RecommendationCache};
