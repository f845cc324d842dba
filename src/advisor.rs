/// The advisor boundary
///
/// One orchestrator object constructed at process start wires the store,
/// provider, cache and feedback processor together. Nothing behind this
/// boundary raises: a broken store means lower-fidelity recommendations,
/// never an error for the caller.

use crate::cache::CachedRecommender;
use crate::config::CacheConfig;
use crate::context::ProjectContext;
use crate::db::models::InteractionInput;
use crate::db::PreferenceStore;
use crate::engine::{Provide, Provider, Recommendation};
use crate::error::Result;
use crate::feedback::{FeedbackProcessor, ProcessedFeedback, TrendAnalyzer};
use crate::identity;
use std::path::Path;
use tracing::{info, warn};

/// A recommendation plus the interaction opened for it
#[derive(Debug, Clone)]
pub struct AdvisorResponse {
    pub recommendation: Recommendation,
    /// Present when the store recorded the interaction; pass back to
    /// `outcome` or `rate`
    pub interaction_id: Option<i64>,
}

/// Split raw input into (command, description)
///
/// Accepts `/sc:analyze find bugs`, `/analyze find bugs` and plain
/// `analyze find bugs`.
pub fn parse_input(input: &str) -> (String, String) {
    let trimmed = input.trim();
    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (trimmed, ""),
    };
    let command = head
        .strip_prefix("/sc:")
        .or_else(|| head.strip_prefix('/'))
        .unwrap_or(head)
        .to_lowercase();
    (command, rest.to_string())
}

pub struct Advisor {
    store: PreferenceStore,
    provider: Provider,
    cached: CachedRecommender,
    feedback: FeedbackProcessor,
    trends: TrendAnalyzer,
    user_id: String,
    project_hash: String,
}

impl Advisor {
    /// Wire everything up against a database path and project directory
    ///
    /// A store that cannot open selects the static provider; construction
    /// itself cannot fail.
    pub async fn open(db_path: &Path, project_dir: &Path) -> Self {
        let data_dir = db_path.parent().unwrap_or(Path::new("."));
        let user_id = identity::user_id(data_dir);
        let project_hash = identity::project_hash(project_dir);

        let store = PreferenceStore::open(db_path).await;
        Self::with_store(store, user_id, project_hash)
    }

    pub fn with_store(store: PreferenceStore, user_id: String, project_hash: String) -> Self {
        let provider = Provider::select(store.clone());
        if !provider.is_adaptive() {
            info!("running with static patterns only");
        }
        let cached = CachedRecommender::new(
            provider.recommender().clone(),
            &CacheConfig::default(),
        );

        Self {
            feedback: FeedbackProcessor::new(store.clone()),
            trends: TrendAnalyzer::new(store.clone()),
            store,
            provider,
            cached,
            user_id,
            project_hash,
        }
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }

    pub fn cached(&self) -> &CachedRecommender {
        &self.cached
    }

    /// Recommend flags for raw user input; never fails
    pub async fn recommend(&self, input: &str, context: &ProjectContext) -> AdvisorResponse {
        let (command, description) = parse_input(input);

        let recommendation = if self.provider.is_adaptive() {
            self.cached
                .get_or_compute(
                    &command,
                    &description,
                    context,
                    &self.user_id,
                    &self.project_hash,
                )
                .await
        } else {
            self.provider
                .recommend(
                    &command,
                    &description,
                    context,
                    &self.user_id,
                    &self.project_hash,
                )
                .await
        };

        let interaction_id = self
            .store
            .record_interaction(InteractionInput {
                user_input: input.to_string(),
                command,
                description,
                pattern_id: recommendation.pattern_id.clone(),
                recommended_flags: recommendation.flags.clone(),
                project_context: Some(context.clone()),
                confidence: recommendation.confidence,
                reasoning: Some(recommendation.reasoning.join("; ")),
                user_id: self.user_id.clone(),
                project_hash: self.project_hash.clone(),
            })
            .await;

        AdvisorResponse {
            recommendation,
            interaction_id,
        }
    }

    /// Report an observed outcome; unknown ids are a logged no-op
    pub async fn outcome(&self, interaction_id: i64, success: bool, execution_time_ms: i64) {
        if let Err(e) = self
            .feedback
            .process_immediate(interaction_id, success, execution_time_ms)
            .await
        {
            warn!(error = %e, interaction_id, "outcome not recorded");
        }
    }

    /// Record an explicit rating; unknown ids are a logged no-op
    pub async fn rate(&self, interaction_id: i64, rating: i64, correction: Option<Vec<String>>) {
        if let Err(e) = self
            .feedback
            .process_explicit(interaction_id, rating, correction)
            .await
        {
            warn!(error = %e, interaction_id, "rating not recorded");
        }
    }

    /// Batch-learn from the window's unprocessed feedback
    pub async fn learn(&self, days: i64) -> Result<Vec<ProcessedFeedback>> {
        self.feedback.process_batch(days).await
    }

    pub async fn report(&self, days: i64) -> serde_json::Value {
        self.trends
            .report(&self.user_id, &self.project_hash, days)
            .await
    }

    /// Purge interactions and feedback past the retention window
    pub async fn cleanup(&self) -> Result<(u64, u64)> {
        match self.store.database() {
            Some(db) => db.cleanup_old_data().await,
            None => Ok((0, 0)),
        }
    }

    pub async fn export(&self) -> Result<serde_json::Value> {
        match self.store.database() {
            Some(db) => db.export_learning_data(&self.user_id, &self.project_hash).await,
            None => Ok(serde_json::json!({
                "patterns": [],
                "preferences": [],
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Complexity;
    use crate::db::Database;

    async fn advisor() -> Advisor {
        let db = Database::new_test().await.unwrap();
        Advisor::with_store(
            PreferenceStore::from_database(db),
            "u".to_string(),
            "p".to_string(),
        )
    }

    #[test]
    fn test_parse_input_variants() {
        assert_eq!(
            parse_input("/sc:analyze find bugs"),
            ("analyze".to_string(), "find bugs".to_string())
        );
        assert_eq!(
            parse_input("/improve  tidy the parser "),
            ("improve".to_string(), "tidy the parser".to_string())
        );
        assert_eq!(
            parse_input("Analyze"),
            ("analyze".to_string(), String::new())
        );
    }

    #[tokio::test]
    async fn test_recommend_opens_interaction() {
        let advisor = advisor().await;
        let ctx = ProjectContext {
            project_type: Some("python_backend".to_string()),
            complexity: Some(Complexity::Complex),
            ..Default::default()
        };

        let response = advisor
            .recommend("/sc:analyze find security vulnerabilities", &ctx)
            .await;

        assert!(response.recommendation.confidence >= 85);
        assert!(response
            .recommendation
            .personas
            .contains(&"security".to_string()));

        let id = response.interaction_id.expect("interaction should be recorded");
        let stored = advisor.store().get_interaction(id).await.unwrap();
        assert_eq!(stored.pattern_id, "analyze_security");
        assert_eq!(stored.confidence, response.recommendation.confidence);
    }

    #[tokio::test]
    async fn test_outcome_feeds_learning() {
        let advisor = advisor().await;
        let ctx = ProjectContext::default();

        let response = advisor.recommend("analyze review the module", &ctx).await;
        let id = response.interaction_id.unwrap();

        advisor.outcome(id, true, 1200).await;

        let stats = advisor
            .store()
            .get_pattern_stats(&response.recommendation.pattern_id)
            .await
            .unwrap();
        assert_eq!(stats.total_uses, 1);
        assert_eq!(stats.successful_uses, 1);
    }

    #[tokio::test]
    async fn test_unknown_outcome_is_noop() {
        let advisor = advisor().await;
        // must not panic or error
        advisor.outcome(424242, true, 100).await;
        advisor.rate(424242, 5, None).await;
    }

    #[tokio::test]
    async fn test_degraded_advisor_still_recommends() {
        let advisor = Advisor::with_store(
            PreferenceStore::disabled(),
            "u".to_string(),
            "p".to_string(),
        );

        let response = advisor
            .recommend("analyze review everything", &ProjectContext::default())
            .await;

        assert!(!response.recommendation.flags.is_empty());
        assert!(response.interaction_id.is_none());
        assert!(advisor.learn(7).await.unwrap().is_empty());
        assert_eq!(advisor.cleanup().await.unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn test_round_trip_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("learning.db");

        {
            let advisor = Advisor::open(&db_path, dir.path()).await;
            let r = advisor
                .recommend("analyze find security vulnerabilities", &ProjectContext::default())
                .await;
            advisor.outcome(r.interaction_id.unwrap(), true, 900).await;
        }

        // reopen the same file; aggregates must survive
        let advisor = Advisor::open(&db_path, dir.path()).await;
        let stats = advisor
            .store()
            .get_pattern_stats("analyze_security")
            .await
            .unwrap();
        assert_eq!(stats.total_uses, 1);
        assert_eq!(stats.successful_uses, 1);
    }
}
