/// Scoring algorithms for flag patterns
///
/// Calculates the multi-factor adaptive score and the final confidence.

use crate::config::{ScoringWeights, SimilarityWeights};
use crate::context::ProjectContext;
use crate::db::models::PatternContextRow;
use chrono::{DateTime, Utc};

/// Scorer for the adaptive recommendation score
pub struct Scorer;

impl Scorer {
    /// Combine the five factors into the raw adaptive score
    ///
    /// # Arguments
    /// * `success_rate` - Historical success rate of the pattern (0.0-1.0)
    /// * `preference` - Per-user/project preference weight (0.1-2.0)
    /// * `context_similarity` - Match against recorded contexts (0.0-1.0)
    /// * `pattern_confidence` - Success rate dampened by usage (0.0-1.0)
    /// * `recency` - Freshness of the pattern's stats (0.0-1.0)
    pub fn adaptive_score(
        weights: &ScoringWeights,
        success_rate: f64,
        preference: f64,
        context_similarity: f64,
        pattern_confidence: f64,
        recency: f64,
    ) -> f64 {
        success_rate * weights.success_rate
            + preference.min(2.0) * weights.preference
            + context_similarity * weights.context_similarity
            + pattern_confidence * weights.pattern_confidence
            + recency * weights.recency
    }

    /// Convert a raw score to the user-facing confidence percentage
    pub fn confidence(weights: &ScoringWeights, score: f64) -> i64 {
        (score.round() as i64).clamp(0, weights.confidence_cap)
    }

    /// Freshness of a pattern's last update
    ///
    /// Full score inside the grace window, then exponential decay with the
    /// configured half-life.
    pub fn recency_factor(weights: &ScoringWeights, last_updated: DateTime<Utc>) -> f64 {
        let days = (Utc::now() - last_updated).num_seconds() as f64 / 86_400.0;
        if days <= weights.recency_grace_days as f64 {
            1.0
        } else {
            2.0_f64.powf(-days / weights.recency_half_life_days)
        }
    }

    /// How closely the current context matches the contexts a pattern has
    /// historically been used in
    ///
    /// Each dimension scores the fraction of the pattern's recorded weight
    /// that the current context covers; dimensions with no history score
    /// the neutral 0.5, as does a context with no features at all.
    pub fn context_similarity(
        sim: &SimilarityWeights,
        context: &ProjectContext,
        history: &[PatternContextRow],
    ) -> f64 {
        let keys = context.feature_keys();
        if keys.is_empty() || history.is_empty() {
            return 0.5;
        }

        let size_score = Self::dimension_score(&keys, history, "size:");
        let lang_score = Self::dimension_score(&keys, history, "lang:");
        let fw_score = Self::dimension_score(&keys, history, "framework:");

        size_score * sim.project_size + lang_score * sim.language + fw_score * sim.framework
    }

    /// Fraction of the recorded weight in one dimension covered by the
    /// current context's keys, 0.5 when the dimension has no history
    fn dimension_score(keys: &[String], history: &[PatternContextRow], prefix: &str) -> f64 {
        let total: f64 = history
            .iter()
            .filter(|r| r.context_key.starts_with(prefix))
            .map(|r| r.weight)
            .sum();
        if total <= 0.0 {
            return 0.5;
        }

        let matched: f64 = history
            .iter()
            .filter(|r| r.context_key.starts_with(prefix) && keys.contains(&r.context_key))
            .map(|r| r.weight)
            .sum();

        (matched / total).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ctx_row(key: &str, weight: f64) -> PatternContextRow {
        PatternContextRow {
            pattern_name: "security_audit".to_string(),
            context_key: key.to_string(),
            weight,
        }
    }

    #[test]
    fn test_adaptive_score_defaults() {
        let w = ScoringWeights::default();
        // perfect pattern, neutral preference
        let score = Scorer::adaptive_score(&w, 1.0, 1.0, 1.0, 1.0, 1.0);
        assert!((score - 90.0).abs() < 1e-9);

        // maxed preference overshoots, confidence clamps at the cap
        let score = Scorer::adaptive_score(&w, 1.0, 2.0, 1.0, 1.0, 1.0);
        assert!((score - 100.0).abs() < 1e-9);
        assert_eq!(Scorer::confidence(&w, score), 95);
    }

    #[test]
    fn test_confidence_never_negative() {
        let w = ScoringWeights::default();
        assert_eq!(Scorer::confidence(&w, -5.0), 0);
        assert_eq!(Scorer::confidence(&w, 42.4), 42);
    }

    #[test]
    fn test_recency_grace_window() {
        let w = ScoringWeights::default();
        let fresh = Utc::now() - Duration::days(10);
        assert_eq!(Scorer::recency_factor(&w, fresh), 1.0);

        let edge = Utc::now() - Duration::days(29);
        assert_eq!(Scorer::recency_factor(&w, edge), 1.0);
    }

    #[test]
    fn test_recency_decay_beyond_grace() {
        let w = ScoringWeights::default();
        let stale = Utc::now() - Duration::days(60);
        let factor = Scorer::recency_factor(&w, stale);
        // one half-life elapsed
        assert!((factor - 0.5).abs() < 0.01);

        let older = Utc::now() - Duration::days(120);
        assert!(Scorer::recency_factor(&w, older) < factor);
    }

    #[test]
    fn test_context_similarity_neutral_without_history() {
        let sim = SimilarityWeights::default();
        let ctx = ProjectContext {
            languages: vec!["python".to_string()],
            ..Default::default()
        };
        assert_eq!(Scorer::context_similarity(&sim, &ctx, &[]), 0.5);
        assert_eq!(
            Scorer::context_similarity(&sim, &ProjectContext::default(), &[ctx_row("lang:python", 1.0)]),
            0.5
        );
    }

    #[test]
    fn test_context_similarity_full_match() {
        let sim = SimilarityWeights::default();
        let ctx = ProjectContext {
            file_count: Some(150),
            languages: vec!["python".to_string()],
            frameworks: vec!["django".to_string()],
            ..Default::default()
        };
        let history = vec![
            ctx_row("size:large", 3.0),
            ctx_row("lang:python", 5.0),
            ctx_row("framework:django", 2.0),
        ];
        let score = Scorer::context_similarity(&sim, &ctx, &history);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_context_similarity_partial_match() {
        let sim = SimilarityWeights::default();
        let ctx = ProjectContext {
            languages: vec!["rust".to_string()],
            ..Default::default()
        };
        // all language history is python, no size/framework history
        let history = vec![ctx_row("lang:python", 4.0)];
        let score = Scorer::context_similarity(&sim, &ctx, &history);
        // language dimension scores 0, the other two stay neutral
        let expected = 0.5 * sim.project_size + 0.0 * sim.language + 0.5 * sim.framework;
        assert!((score - expected).abs() < 1e-9);
    }
}
