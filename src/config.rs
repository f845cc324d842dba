// Tunable weight tables for scoring, feedback and caching.
//
// Every factor that shapes a recommendation lives here as data, not as an
// inline literal, so the weighting can be unit-tested and tuned without
// touching control flow.

use serde::{Deserialize, Serialize};

/// Factor weights for the adaptive score.
///
/// The total score is the sum of five terms, each a normalized factor in
/// [0, 1] (preference weight in [0.1, 2.0]) multiplied by its weight below.
/// With the defaults the maximum total is 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Multiplier on the pattern's historical success rate
    pub success_rate: f64,
    /// Multiplier on the per-(user, project) preference weight
    pub preference: f64,
    /// Multiplier on context similarity against recorded co-occurrence
    pub context_similarity: f64,
    /// Multiplier on pattern confidence (success rate dampened by usage)
    pub pattern_confidence: f64,
    /// Multiplier on the recency decay factor
    pub recency: f64,
    /// Confidence is capped here even when the raw total is higher
    pub confidence_cap: i64,
    /// Usage count at which pattern confidence stops being dampened
    pub usage_saturation: i64,
    /// Updates newer than this many days score full recency
    pub recency_grace_days: i64,
    /// Half-life in days of the recency decay beyond the grace window
    pub recency_half_life_days: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            success_rate: 40.0,
            preference: 10.0,
            context_similarity: 20.0,
            pattern_confidence: 10.0,
            recency: 10.0,
            confidence_cap: 95,
            usage_saturation: 20,
            recency_grace_days: 30,
            recency_half_life_days: 60.0,
        }
    }
}

/// Component weights inside the context-similarity term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityWeights {
    pub project_size: f64,
    pub language: f64,
    pub framework: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            project_size: 0.3,
            language: 0.4,
            framework: 0.3,
        }
    }
}

/// Base learning weights per feedback class, plus the multipliers and
/// thresholds used to derive the final learning weight and confidence delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackWeights {
    pub implicit_success: f64,
    pub implicit_failure: f64,
    pub explicit_rating: f64,
    pub user_correction: f64,
    pub performance: f64,
    /// Completion under this many seconds counts as an implicit success
    pub implicit_threshold_secs: f64,
    /// Multiplier applied when the outcome was a failure
    pub failure_multiplier: f64,
    /// Bonus multiplier for executions under `fast_secs`
    pub fast_multiplier: f64,
    pub fast_secs: f64,
    /// Penalty multiplier for executions over `slow_secs`
    pub slow_multiplier: f64,
    pub slow_secs: f64,
    /// Scale of the signed confidence adjustment (±)
    pub confidence_adjustment: f64,
}

impl Default for FeedbackWeights {
    fn default() -> Self {
        Self {
            implicit_success: 0.3,
            implicit_failure: 0.4,
            explicit_rating: 1.0,
            user_correction: 1.2,
            performance: 0.6,
            implicit_threshold_secs: 2.0,
            failure_multiplier: 0.7,
            fast_multiplier: 1.2,
            fast_secs: 5.0,
            slow_multiplier: 0.8,
            slow_secs: 60.0,
            confidence_adjustment: 0.05,
        }
    }
}

/// Cache sizing and the enhancement queue cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: i64,
    pub capacity: usize,
    /// Pending enhancement tasks beyond this are dropped oldest-first
    pub queue_cap: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 1800,
            capacity: 1000,
            queue_cap: 256,
        }
    }
}

/// Preference weights stay inside this band, decaying toward neutral 1.0.
pub const WEIGHT_MIN: f64 = 0.1;
pub const WEIGHT_MAX: f64 = 2.0;

/// Interactions and feedback older than this are purged by `cleanup`.
pub const RETENTION_DAYS: i64 = 90;
