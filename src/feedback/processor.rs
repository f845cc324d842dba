/// Feedback classification and weight adjustment
///
/// Turns observed outcomes and explicit ratings into bounded adjustments
/// of pattern statistics and preference weights.

use crate::config::FeedbackWeights;
use crate::db::models::{FeedbackKind, Outcome};
use crate::db::PreferenceStore;
use crate::error::{FlagwiseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// What one piece of feedback turned into
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedFeedback {
    pub interaction_id: i64,
    pub pattern_id: String,
    pub kind: FeedbackKind,
    pub learning_weight: f64,
    pub confidence_delta: f64,
    /// Corrected flag set, when the user supplied one
    pub correction: Vec<String>,
}

/// Processes feedback against the learning store
#[derive(Clone)]
pub struct FeedbackProcessor {
    store: PreferenceStore,
    weights: FeedbackWeights,
}

impl FeedbackProcessor {
    pub fn new(store: PreferenceStore) -> Self {
        Self {
            store,
            weights: FeedbackWeights::default(),
        }
    }

    /// Process an observed outcome for an interaction
    ///
    /// Classifies the outcome, closes the interaction, updates the
    /// pattern's stats and the caller's preference weight.
    pub async fn process_immediate(
        &self,
        interaction_id: i64,
        success: bool,
        execution_time_ms: i64,
    ) -> Result<ProcessedFeedback> {
        let interaction = self
            .store
            .get_interaction(interaction_id)
            .await
            .ok_or(FlagwiseError::UnknownInteraction(interaction_id))?;

        let secs = execution_time_ms as f64 / 1000.0;
        let kind = self.classify(success, secs);
        let learning_weight = self.learning_weight(kind, success, secs);
        let confidence_delta = self.confidence_delta(kind, secs);

        let outcome = if success {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        self.store
            .close_interaction(interaction_id, outcome, Some(execution_time_ms))
            .await;

        // the adjustment is applied right here, so the row is recorded
        // already-processed and the batch pass skips it
        let _ = self
            .store
            .record_feedback(
                interaction_id,
                kind,
                None,
                success,
                None,
                true,
                &interaction.user_id,
                &interaction.project_hash,
            )
            .await;

        self.apply(&interaction, success, learning_weight, confidence_delta)
            .await;

        Ok(ProcessedFeedback {
            interaction_id,
            pattern_id: interaction.pattern_id,
            kind,
            learning_weight,
            confidence_delta,
            correction: Vec::new(),
        })
    }

    /// Process an explicit 1-5 rating, optionally with corrected flags
    pub async fn process_explicit(
        &self,
        interaction_id: i64,
        rating: i64,
        correction: Option<Vec<String>>,
    ) -> Result<ProcessedFeedback> {
        if !(1..=5).contains(&rating) {
            return Err(FlagwiseError::InvalidInput(format!(
                "rating must be 1-5, got {}",
                rating
            )));
        }

        let interaction = self
            .store
            .get_interaction(interaction_id)
            .await
            .ok_or(FlagwiseError::UnknownInteraction(interaction_id))?;

        let kind = if correction.is_some() {
            FeedbackKind::UserCorrection
        } else {
            FeedbackKind::ExplicitRating
        };
        let learning_weight = self.base_weight(kind) * (rating as f64 / 5.0);
        let correction_penalty = if correction.is_some() { -0.15 } else { 0.0 };
        let confidence_delta = (rating - 3) as f64 * 0.1 + correction_penalty;

        let _ = self
            .store
            .record_feedback(
                interaction_id,
                kind,
                Some(rating),
                rating >= 4,
                correction.as_deref(),
                true,
                &interaction.user_id,
                &interaction.project_hash,
            )
            .await;

        // ratings adjust the preference weight only; usage stats stay tied
        // to observed outcomes
        self.store
            .adjust_preference_weight(
                &interaction.user_id,
                &interaction.project_hash,
                &interaction.pattern_id,
                confidence_delta * learning_weight,
            )
            .await;

        Ok(ProcessedFeedback {
            interaction_id,
            pattern_id: interaction.pattern_id,
            kind,
            learning_weight,
            confidence_delta,
            correction: correction.unwrap_or_default(),
        })
    }

    /// Re-process the window's unprocessed feedback as one averaged
    /// adjustment per (user, project, pattern)
    ///
    /// Rows are marked processed, so repeated runs over the same window
    /// change nothing.
    pub async fn process_batch(&self, days: i64) -> Result<Vec<ProcessedFeedback>> {
        let Some(db) = self.store.database() else {
            return Ok(Vec::new());
        };

        let rows = db.unprocessed_feedback(days).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut processed = Vec::new();
        let mut grouped: HashMap<(String, String, String), Vec<f64>> = HashMap::new();
        let mut row_ids = Vec::new();

        for row in &rows {
            row_ids.push(row.id);
            let Some(kind) = row.kind() else {
                continue;
            };
            let Some(interaction) = self.store.get_interaction(row.interaction_id).await else {
                continue;
            };
            if interaction.pattern_id.is_empty() {
                continue;
            }

            let secs = interaction.execution_time_ms.unwrap_or(0) as f64 / 1000.0;
            let (learning_weight, confidence_delta) = match kind {
                FeedbackKind::ExplicitRating | FeedbackKind::UserCorrection => {
                    let rating = row.rating.unwrap_or(3);
                    let penalty = if kind == FeedbackKind::UserCorrection {
                        -0.15
                    } else {
                        0.0
                    };
                    (
                        self.base_weight(kind) * (rating as f64 / 5.0),
                        (rating - 3) as f64 * 0.1 + penalty,
                    )
                }
                _ => (
                    self.learning_weight(kind, row.success_indicator, secs),
                    self.confidence_delta(kind, secs),
                ),
            };

            grouped
                .entry((
                    row.user_id.clone(),
                    row.project_hash.clone(),
                    interaction.pattern_id.clone(),
                ))
                .or_default()
                .push(confidence_delta * learning_weight);

            processed.push(ProcessedFeedback {
                interaction_id: row.interaction_id,
                pattern_id: interaction.pattern_id,
                kind,
                learning_weight,
                confidence_delta,
                correction: row.get_correction(),
            });
        }

        for ((user_id, project_hash, pattern_id), deltas) in grouped {
            let avg = deltas.iter().sum::<f64>() / deltas.len() as f64;
            debug!(pattern = %pattern_id, avg, "batch weight adjustment");
            self.store
                .adjust_preference_weight(&user_id, &project_hash, &pattern_id, avg)
                .await;
        }

        db.mark_feedback_processed(&row_ids).await?;

        Ok(processed)
    }

    fn classify(&self, success: bool, secs: f64) -> FeedbackKind {
        if success {
            if secs < self.weights.implicit_threshold_secs {
                FeedbackKind::ImplicitSuccess
            } else {
                FeedbackKind::Performance
            }
        } else {
            FeedbackKind::ImplicitFailure
        }
    }

    fn base_weight(&self, kind: FeedbackKind) -> f64 {
        match kind {
            FeedbackKind::ImplicitSuccess => self.weights.implicit_success,
            FeedbackKind::ImplicitFailure => self.weights.implicit_failure,
            FeedbackKind::ExplicitRating => self.weights.explicit_rating,
            FeedbackKind::UserCorrection => self.weights.user_correction,
            FeedbackKind::Performance => self.weights.performance,
        }
    }

    fn learning_weight(&self, kind: FeedbackKind, success: bool, secs: f64) -> f64 {
        let success_multiplier = if success {
            1.0
        } else {
            self.weights.failure_multiplier
        };
        let time_multiplier = if secs < self.weights.fast_secs {
            self.weights.fast_multiplier
        } else if secs > self.weights.slow_secs {
            self.weights.slow_multiplier
        } else {
            1.0
        };
        self.base_weight(kind) * success_multiplier * time_multiplier
    }

    fn confidence_delta(&self, kind: FeedbackKind, secs: f64) -> f64 {
        let base = self.weights.confidence_adjustment;
        match kind {
            FeedbackKind::ImplicitSuccess => base * 0.5,
            FeedbackKind::ImplicitFailure => -base * 0.8,
            FeedbackKind::Performance => {
                if secs > 30.0 {
                    -base * 0.3
                } else {
                    base * 0.2
                }
            }
            _ => 0.0,
        }
    }

    async fn apply(
        &self,
        interaction: &crate::db::models::Interaction,
        success: bool,
        learning_weight: f64,
        confidence_delta: f64,
    ) {
        if interaction.pattern_id.is_empty() {
            return;
        }

        self.store
            .update_pattern_stats(&interaction.pattern_id, success)
            .await;

        // successful use reinforces the pattern's context co-occurrence
        if success {
            for key in interaction.get_context().feature_keys() {
                self.store
                    .bump_pattern_context(&interaction.pattern_id, &key)
                    .await;
            }
        }

        self.store
            .adjust_preference_weight(
                &interaction.user_id,
                &interaction.project_hash,
                &interaction.pattern_id,
                confidence_delta * learning_weight,
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ProjectContext;
    use crate::db::models::InteractionInput;
    use crate::db::Database;

    async fn setup() -> (FeedbackProcessor, PreferenceStore) {
        let db = Database::new_test().await.unwrap();
        let store = PreferenceStore::from_database(db);
        (FeedbackProcessor::new(store.clone()), store)
    }

    async fn record(store: &PreferenceStore) -> i64 {
        store
            .record_interaction(InteractionInput {
                user_input: "analyze find security vulnerabilities".to_string(),
                command: "analyze".to_string(),
                description: "find security vulnerabilities".to_string(),
                pattern_id: "analyze_security".to_string(),
                recommended_flags: vec!["--persona-security".to_string()],
                project_context: Some(ProjectContext {
                    languages: vec!["python".to_string()],
                    ..Default::default()
                }),
                confidence: 87,
                reasoning: None,
                user_id: "u".to_string(),
                project_hash: "p".to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_fast_success_is_implicit_success() {
        let (processor, store) = setup().await;
        let id = record(&store).await;

        let result = processor.process_immediate(id, true, 1500).await.unwrap();

        assert_eq!(result.kind, FeedbackKind::ImplicitSuccess);
        // base 0.3, success 1.0, fast 1.2
        assert!((result.learning_weight - 0.36).abs() < 1e-9);
        assert!((result.confidence_delta - 0.025).abs() < 1e-9);

        let stats = store.get_pattern_stats("analyze_security").await.unwrap();
        assert_eq!(stats.total_uses, 1);
        assert_eq!(stats.successful_uses, 1);

        // successful use counted the context
        let ctx = store.get_pattern_context("analyze_security").await;
        assert!(ctx.iter().any(|r| r.context_key == "lang:python"));
    }

    #[tokio::test]
    async fn test_slow_success_is_performance() {
        let (processor, store) = setup().await;
        let id = record(&store).await;

        let result = processor.process_immediate(id, true, 45_000).await.unwrap();

        assert_eq!(result.kind, FeedbackKind::Performance);
        // base 0.6, success 1.0, neutral time band
        assert!((result.learning_weight - 0.6).abs() < 1e-9);
        // over 30 s counts against the pattern
        assert!((result.confidence_delta - (-0.015)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failure_is_implicit_failure() {
        let (processor, store) = setup().await;
        let id = record(&store).await;

        let result = processor.process_immediate(id, false, 3000).await.unwrap();

        assert_eq!(result.kind, FeedbackKind::ImplicitFailure);
        // base 0.4, failure 0.7, fast 1.2
        assert!((result.learning_weight - 0.4 * 0.7 * 1.2).abs() < 1e-9);
        assert!(result.confidence_delta < 0.0);

        let stats = store.get_pattern_stats("analyze_security").await.unwrap();
        assert_eq!(stats.successful_uses, 0);
        // failed use leaves context counts alone
        assert!(store.get_pattern_context("analyze_security").await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_interaction_errors() {
        let (processor, _store) = setup().await;

        let result = processor.process_immediate(999, true, 1000).await;
        assert!(matches!(
            result,
            Err(FlagwiseError::UnknownInteraction(999))
        ));
    }

    #[tokio::test]
    async fn test_explicit_rating_bounds_checked() {
        let (processor, store) = setup().await;
        let id = record(&store).await;

        assert!(processor.process_explicit(id, 0, None).await.is_err());
        assert!(processor.process_explicit(id, 6, None).await.is_err());
        assert!(processor.process_explicit(id, 5, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_correction_penalized() {
        let (processor, store) = setup().await;
        let id = record(&store).await;

        let plain = processor.process_explicit(id, 4, None).await.unwrap();
        assert_eq!(plain.kind, FeedbackKind::ExplicitRating);
        assert!((plain.confidence_delta - 0.1).abs() < 1e-9);

        let id2 = record(&store).await;
        let corrected = processor
            .process_explicit(id2, 4, Some(vec!["--think-hard".to_string()]))
            .await
            .unwrap();
        assert_eq!(corrected.kind, FeedbackKind::UserCorrection);
        assert!((corrected.confidence_delta - (0.1 - 0.15)).abs() < 1e-9);
        assert_eq!(corrected.correction, vec!["--think-hard"]);
    }

    #[tokio::test]
    async fn test_repeated_success_drives_rate_up_weight_bounded() {
        let (processor, store) = setup().await;

        let mut last_rate = 0.0;
        for _ in 0..10 {
            let id = record(&store).await;
            processor.process_immediate(id, true, 1000).await.unwrap();

            let stats = store.get_pattern_stats("analyze_security").await.unwrap();
            assert!(stats.success_rate >= last_rate);
            assert!(stats.success_rate <= 1.0);
            last_rate = stats.success_rate;

            let w = store.get_preference_weight("u", "p", "analyze_security").await;
            assert!((0.1..=2.0).contains(&w));
        }
        assert!((last_rate - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_batch_idempotent() {
        let (processor, store) = setup().await;

        for _ in 0..3 {
            let id = record(&store).await;
            // leave feedback unprocessed but recorded
            let _ = store
                .record_feedback(id, FeedbackKind::ImplicitSuccess, None, true, None, false, "u", "p")
                .await;
        }

        let first = processor.process_batch(7).await.unwrap();
        assert_eq!(first.len(), 3);

        let weight_after_first = store.get_preference_weight("u", "p", "analyze_security").await;

        let second = processor.process_batch(7).await.unwrap();
        assert!(second.is_empty());

        let weight_after_second = store.get_preference_weight("u", "p", "analyze_security").await;
        assert!((weight_after_first - weight_after_second).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_batch_surfaces_corrections() {
        let (processor, store) = setup().await;
        let id = record(&store).await;
        let flags = vec!["--think-hard".to_string()];
        let _ = store
            .record_feedback(
                id,
                FeedbackKind::UserCorrection,
                Some(4),
                true,
                Some(&flags),
                false,
                "u",
                "p",
            )
            .await;

        let batch = processor.process_batch(7).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].correction, vec!["--think-hard"]);
    }

    #[tokio::test]
    async fn test_immediate_adjustment_not_reapplied_by_batch() {
        let (processor, store) = setup().await;
        let id = record(&store).await;
        processor.process_immediate(id, true, 1000).await.unwrap();

        let weight_before = store.get_preference_weight("u", "p", "analyze_security").await;

        // the immediate path already applied its delta, so the batch must
        // see nothing and the weight must not move again
        assert!(processor.process_batch(7).await.unwrap().is_empty());
        let weight_after = store.get_preference_weight("u", "p", "analyze_security").await;
        assert!((weight_before - weight_after).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_explicit_rating_not_reapplied_by_batch() {
        let (processor, store) = setup().await;
        let id = record(&store).await;
        processor.process_explicit(id, 5, None).await.unwrap();

        let weight_before = store.get_preference_weight("u", "p", "analyze_security").await;
        assert!(processor.process_batch(7).await.unwrap().is_empty());
        let weight_after = store.get_preference_weight("u", "p", "analyze_security").await;
        assert!((weight_before - weight_after).abs() < 1e-12);
    }
}
