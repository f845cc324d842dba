/// Failure-tolerant facade over the learning database
///
/// Recommendations must never fail because the store is broken. Every read
/// degrades to a neutral value (no history, weight 1.0) and every write
/// degrades to a logged no-op when the database is unavailable or errors.

use crate::db::models::*;
use crate::db::Database;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Learning store that swallows storage failures
///
/// Holds `None` when the database could not be opened at all; individual
/// query failures are logged and mapped to neutral results.
#[derive(Clone)]
pub struct PreferenceStore {
    db: Option<Arc<Database>>,
}

impl PreferenceStore {
    /// Open the store, degrading to a memoryless store on failure
    pub async fn open<P: AsRef<Path>>(db_path: P) -> Self {
        match Database::new(db_path.as_ref()).await {
            Ok(db) => Self {
                db: Some(Arc::new(db)),
            },
            Err(e) => {
                warn!(error = %e, path = %db_path.as_ref().display(),
                      "learning store unavailable, running without history");
                Self { db: None }
            }
        }
    }

    /// Wrap an already-open database
    pub fn from_database(db: Database) -> Self {
        Self {
            db: Some(Arc::new(db)),
        }
    }

    /// A store with no backing database; all reads are neutral
    pub fn disabled() -> Self {
        Self { db: None }
    }

    pub fn is_available(&self) -> bool {
        self.db.is_some()
    }

    /// Borrow the database for operations that must surface errors,
    /// e.g. batch learning and exports driven from the CLI.
    pub fn database(&self) -> Option<&Database> {
        self.db.as_deref()
    }

    pub async fn record_interaction(&self, input: InteractionInput) -> Option<i64> {
        let db = self.db.as_ref()?;
        match db.record_interaction(input).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "failed to record interaction");
                None
            }
        }
    }

    pub async fn close_interaction(
        &self,
        interaction_id: i64,
        outcome: Outcome,
        execution_time_ms: Option<i64>,
    ) -> bool {
        let Some(db) = self.db.as_ref() else {
            return false;
        };
        match db
            .close_interaction(interaction_id, outcome, execution_time_ms)
            .await
        {
            Ok(closed) => closed,
            Err(e) => {
                warn!(error = %e, interaction_id, "failed to close interaction");
                false
            }
        }
    }

    pub async fn get_interaction(&self, interaction_id: i64) -> Option<Interaction> {
        let db = self.db.as_ref()?;
        match db.get_interaction(interaction_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, interaction_id, "failed to load interaction");
                None
            }
        }
    }

    pub async fn record_feedback(
        &self,
        interaction_id: i64,
        kind: FeedbackKind,
        rating: Option<i64>,
        success_indicator: bool,
        correction: Option<&[String]>,
        processed: bool,
        user_id: &str,
        project_hash: &str,
    ) -> Option<i64> {
        let db = self.db.as_ref()?;
        match db
            .record_feedback(
                interaction_id,
                kind,
                rating,
                success_indicator,
                correction,
                processed,
                user_id,
                project_hash,
            )
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, interaction_id, "failed to record feedback");
                None
            }
        }
    }

    pub async fn update_pattern_stats(&self, pattern_name: &str, success: bool) {
        let Some(db) = self.db.as_ref() else { return };
        if let Err(e) = db.update_pattern_stats(pattern_name, success).await {
            warn!(error = %e, pattern_name, "failed to update pattern stats");
        }
    }

    pub async fn bump_pattern_context(&self, pattern_name: &str, context_key: &str) {
        let Some(db) = self.db.as_ref() else { return };
        if let Err(e) = db.bump_pattern_context(pattern_name, context_key).await {
            warn!(error = %e, pattern_name, "failed to update pattern context");
        }
    }

    /// Pattern stats, or None when unknown or unavailable
    pub async fn get_pattern_stats(&self, pattern_name: &str) -> Option<PatternStats> {
        let db = self.db.as_ref()?;
        match db.get_pattern_stats(pattern_name).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, pattern_name, "failed to load pattern stats");
                None
            }
        }
    }

    pub async fn get_all_pattern_stats(&self) -> Vec<PatternStats> {
        let Some(db) = self.db.as_ref() else {
            return Vec::new();
        };
        match db.get_all_pattern_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "failed to load pattern stats");
                Vec::new()
            }
        }
    }

    pub async fn get_pattern_context(&self, pattern_name: &str) -> Vec<PatternContextRow> {
        let Some(db) = self.db.as_ref() else {
            return Vec::new();
        };
        match db.get_pattern_context(pattern_name).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, pattern_name, "failed to load pattern context");
                Vec::new()
            }
        }
    }

    /// Preference weight, neutral 1.0 when unknown or unavailable
    pub async fn get_preference_weight(
        &self,
        user_id: &str,
        project_hash: &str,
        pattern_name: &str,
    ) -> f64 {
        let Some(db) = self.db.as_ref() else {
            return 1.0;
        };
        match db
            .get_preference_weight(user_id, project_hash, pattern_name)
            .await
        {
            Ok(w) => w,
            Err(e) => {
                warn!(error = %e, pattern_name, "failed to load preference weight");
                1.0
            }
        }
    }

    pub async fn adjust_preference_weight(
        &self,
        user_id: &str,
        project_hash: &str,
        pattern_name: &str,
        delta: f64,
    ) -> f64 {
        let Some(db) = self.db.as_ref() else {
            return 1.0;
        };
        match db
            .adjust_preference_weight(user_id, project_hash, pattern_name, delta)
            .await
        {
            Ok(w) => w,
            Err(e) => {
                warn!(error = %e, pattern_name, "failed to adjust preference weight");
                1.0
            }
        }
    }

    pub async fn get_user_interactions(
        &self,
        user_id: &str,
        project_hash: &str,
        days: i64,
    ) -> Vec<Interaction> {
        let Some(db) = self.db.as_ref() else {
            return Vec::new();
        };
        match db.get_user_interactions(user_id, project_hash, days).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "failed to load interactions");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_store_reads_neutral() {
        let store = PreferenceStore::disabled();

        assert!(!store.is_available());
        assert!((store.get_preference_weight("u", "p", "x").await - 1.0).abs() < 1e-9);
        assert!(store.get_pattern_stats("x").await.is_none());
        assert!(store.get_all_pattern_stats().await.is_empty());
        assert!(store.get_user_interactions("u", "p", 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_store_writes_are_noops() {
        let store = PreferenceStore::disabled();

        store.update_pattern_stats("x", true).await;
        assert!(store
            .record_feedback(1, FeedbackKind::ImplicitSuccess, None, true, None, false, "u", "p")
            .await
            .is_none());
        assert!(!store.close_interaction(1, Outcome::Success, None).await);
    }

    #[tokio::test]
    async fn test_unopenable_path_degrades() {
        // A path whose parent cannot be created forces the degraded mode
        let store = PreferenceStore::open("/dev/null/learning.db").await;
        assert!(!store.is_available());
        assert!((store.get_preference_weight("u", "p", "x").await - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_backed_store_round_trip() {
        let db = Database::new_test().await.unwrap();
        let store = PreferenceStore::from_database(db);

        store.update_pattern_stats("security_audit", true).await;
        let stats = store.get_pattern_stats("security_audit").await.unwrap();
        assert_eq!(stats.total_uses, 1);

        let w = store
            .adjust_preference_weight("u", "p", "security_audit", 0.2)
            .await;
        assert!((w - 1.2).abs() < 1e-9);
    }
}
