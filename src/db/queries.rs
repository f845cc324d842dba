/// SQL query functions for database operations
///
/// All queries use sqlx with bound parameters. Counter updates are single
/// upsert statements so concurrent writers never lose increments.

use crate::config::{RETENTION_DAYS, WEIGHT_MAX, WEIGHT_MIN};
use crate::db::models::*;
use crate::db::Database;
use crate::error::Result;
use sqlx::Row;

impl Database {
    /// Record a new interaction with outcome 'open'
    ///
    /// # Returns
    /// * `Ok(i64)` - The interaction ID, used later to attach an outcome
    pub async fn record_interaction(&self, input: InteractionInput) -> Result<i64> {
        let flags_json = serde_json::to_string(&input.recommended_flags)?;
        let context_json = match &input.project_context {
            Some(ctx) => Some(serde_json::to_string(ctx)?),
            None => None,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO interactions
                (user_input, command, description, pattern_id, recommended_flags,
                 project_context, confidence, reasoning, user_id, project_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&input.user_input)
        .bind(&input.command)
        .bind(&input.description)
        .bind(&input.pattern_id)
        .bind(&flags_json)
        .bind(&context_json)
        .bind(input.confidence)
        .bind(&input.reasoning)
        .bind(&input.user_id)
        .bind(&input.project_hash)
        .fetch_one(self.pool())
        .await?;

        Ok(result.get(0))
    }

    /// Close an open interaction with its outcome and execution time
    ///
    /// Only transitions interactions still in the 'open' state; closing an
    /// already-closed interaction is a no-op and returns false.
    pub async fn close_interaction(
        &self,
        interaction_id: i64,
        outcome: Outcome,
        execution_time_ms: Option<i64>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE interactions
            SET outcome = ?, execution_time_ms = ?
            WHERE id = ? AND outcome = 'open'
            "#,
        )
        .bind(outcome.to_string())
        .bind(execution_time_ms)
        .bind(interaction_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetch a single interaction by id
    pub async fn get_interaction(&self, interaction_id: i64) -> Result<Option<Interaction>> {
        let interaction = sqlx::query_as::<_, Interaction>(
            "SELECT * FROM interactions WHERE id = ?",
        )
        .bind(interaction_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(interaction)
    }

    /// Get a user/project pair's interactions from the last `days` days,
    /// newest first
    pub async fn get_user_interactions(
        &self,
        user_id: &str,
        project_hash: &str,
        days: i64,
    ) -> Result<Vec<Interaction>> {
        let window = format!("-{} days", days);
        let interactions = sqlx::query_as::<_, Interaction>(
            r#"
            SELECT * FROM interactions
            WHERE user_id = ? AND project_hash = ?
              AND timestamp >= datetime('now', ?)
            ORDER BY timestamp DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(project_hash)
        .bind(&window)
        .fetch_all(self.pool())
        .await?;

        Ok(interactions)
    }

    /// Record a feedback event against an interaction
    ///
    /// `processed` is set when the caller has already applied the
    /// adjustment, so the batch pass will not apply it a second time.
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
    ) -> Result<i64> {
        let correction_json = match correction {
            Some(flags) => Some(serde_json::to_string(flags)?),
            None => None,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO feedback
                (interaction_id, kind, rating, success_indicator, correction,
                 processed, user_id, project_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(interaction_id)
        .bind(kind.to_string())
        .bind(rating)
        .bind(success_indicator)
        .bind(&correction_json)
        .bind(processed)
        .bind(user_id)
        .bind(project_hash)
        .fetch_one(self.pool())
        .await?;

        Ok(result.get(0))
    }

    /// Fetch the window's feedback not yet consumed by a batch learning
    /// pass, oldest first
    pub async fn unprocessed_feedback(&self, days: i64) -> Result<Vec<FeedbackRow>> {
        let window = format!("-{} days", days);
        let rows = sqlx::query_as::<_, FeedbackRow>(
            r#"
            SELECT * FROM feedback
            WHERE processed = 0 AND timestamp >= datetime('now', ?)
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(&window)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Mark feedback rows as consumed so a re-run of the batch is a no-op
    pub async fn mark_feedback_processed(&self, ids: &[i64]) -> Result<()> {
        for id in ids {
            sqlx::query("UPDATE feedback SET processed = 1 WHERE id = ?")
                .bind(id)
                .execute(self.pool())
                .await?;
        }
        Ok(())
    }

    /// Record one use of a pattern, updating its aggregate success stats
    ///
    /// The increment is a single upsert statement. In the DO UPDATE branch
    /// unqualified column names refer to the row's values before this
    /// statement, so concurrent callers each add exactly their own use.
    pub async fn update_pattern_stats(&self, pattern_name: &str, success: bool) -> Result<()> {
        let success_inc: i64 = if success { 1 } else { 0 };

        sqlx::query(
            r#"
            INSERT INTO pattern_success (pattern_name, total_uses, successful_uses, success_rate, last_updated)
            VALUES (?, 1, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(pattern_name) DO UPDATE SET
                total_uses = total_uses + 1,
                successful_uses = successful_uses + excluded.successful_uses,
                success_rate = CAST(successful_uses + excluded.successful_uses AS REAL)
                               / (total_uses + 1),
                last_updated = CURRENT_TIMESTAMP
            "#,
        )
        .bind(pattern_name)
        .bind(success_inc)
        .bind(success_inc as f64)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Count one co-occurrence between a pattern and a context feature
    pub async fn bump_pattern_context(&self, pattern_name: &str, context_key: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pattern_context (pattern_name, context_key, weight)
            VALUES (?, ?, 1.0)
            ON CONFLICT(pattern_name, context_key) DO UPDATE SET
                weight = weight + 1.0
            "#,
        )
        .bind(pattern_name)
        .bind(context_key)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Get stats for one pattern, if it has ever been used
    pub async fn get_pattern_stats(&self, pattern_name: &str) -> Result<Option<PatternStats>> {
        let stats = sqlx::query_as::<_, PatternStats>(
            "SELECT pattern_name, total_uses, successful_uses, success_rate, last_updated
             FROM pattern_success WHERE pattern_name = ?",
        )
        .bind(pattern_name)
        .fetch_optional(self.pool())
        .await?;

        Ok(stats)
    }

    /// Get stats for every pattern that has been used at least once
    pub async fn get_all_pattern_stats(&self) -> Result<Vec<PatternStats>> {
        let stats = sqlx::query_as::<_, PatternStats>(
            "SELECT pattern_name, total_uses, successful_uses, success_rate, last_updated
             FROM pattern_success ORDER BY pattern_name",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(stats)
    }

    /// Get the co-occurrence counts recorded for a pattern
    pub async fn get_pattern_context(&self, pattern_name: &str) -> Result<Vec<PatternContextRow>> {
        let rows = sqlx::query_as::<_, PatternContextRow>(
            "SELECT pattern_name, context_key, weight FROM pattern_context WHERE pattern_name = ?",
        )
        .bind(pattern_name)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Get the preference weight for a pattern, defaulting to neutral 1.0
    pub async fn get_preference_weight(
        &self,
        user_id: &str,
        project_hash: &str,
        pattern_name: &str,
    ) -> Result<f64> {
        let row: Option<(f64,)> = sqlx::query_as(
            r#"
            SELECT preference_weight FROM user_preferences
            WHERE user_id = ? AND project_hash = ? AND pattern_name = ?
            "#,
        )
        .bind(user_id)
        .bind(project_hash)
        .bind(pattern_name)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|(w,)| w).unwrap_or(1.0))
    }

    /// Get all preference weights for a user/project pair
    pub async fn get_preference_weights(
        &self,
        user_id: &str,
        project_hash: &str,
    ) -> Result<Vec<PreferenceWeight>> {
        let weights = sqlx::query_as::<_, PreferenceWeight>(
            "SELECT * FROM user_preferences WHERE user_id = ? AND project_hash = ?",
        )
        .bind(user_id)
        .bind(project_hash)
        .fetch_all(self.pool())
        .await?;

        Ok(weights)
    }

    /// Nudge a preference weight by a signed delta, clamped to [0.1, 2.0]
    ///
    /// Returns the weight after the adjustment.
    pub async fn adjust_preference_weight(
        &self,
        user_id: &str,
        project_hash: &str,
        pattern_name: &str,
        delta: f64,
    ) -> Result<f64> {
        let row = sqlx::query(
            r#"
            INSERT INTO user_preferences (user_id, project_hash, pattern_name, preference_weight, last_updated)
            VALUES (?, ?, ?, MAX(?, MIN(?, 1.0 + ?)), CURRENT_TIMESTAMP)
            ON CONFLICT(user_id, project_hash, pattern_name) DO UPDATE SET
                preference_weight = MAX(?, MIN(?, preference_weight + ?)),
                last_updated = CURRENT_TIMESTAMP
            RETURNING preference_weight
            "#,
        )
        .bind(user_id)
        .bind(project_hash)
        .bind(pattern_name)
        .bind(WEIGHT_MIN)
        .bind(WEIGHT_MAX)
        .bind(delta)
        .bind(WEIGHT_MIN)
        .bind(WEIGHT_MAX)
        .bind(delta)
        .fetch_one(self.pool())
        .await?;

        Ok(row.get(0))
    }

    /// Delete interactions and feedback older than the retention window
    ///
    /// Returns (interactions deleted, feedback rows deleted). Aggregated
    /// pattern stats and preference weights are kept.
    pub async fn cleanup_old_data(&self) -> Result<(u64, u64)> {
        let cutoff = format!("-{} days", RETENTION_DAYS);

        let feedback = sqlx::query(
            "DELETE FROM feedback WHERE timestamp < datetime('now', ?)",
        )
        .bind(&cutoff)
        .execute(self.pool())
        .await?;

        let interactions = sqlx::query(
            "DELETE FROM interactions WHERE timestamp < datetime('now', ?)",
        )
        .bind(&cutoff)
        .execute(self.pool())
        .await?;

        Ok((interactions.rows_affected(), feedback.rows_affected()))
    }

    /// Export the learning state as a single JSON document
    ///
    /// Includes pattern stats and preference weights but never raw user
    /// input, so the export is safe to share.
    pub async fn export_learning_data(
        &self,
        user_id: &str,
        project_hash: &str,
    ) -> Result<serde_json::Value> {
        let patterns = self.get_all_pattern_stats().await?;
        let preferences = self.get_preference_weights(user_id, project_hash).await?;
        let stats = self.stats().await?;

        let command_usage: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT command, COUNT(*) FROM interactions
            WHERE user_id = ? AND project_hash = ?
            GROUP BY command ORDER BY COUNT(*) DESC
            "#,
        )
        .bind(user_id)
        .bind(project_hash)
        .fetch_all(self.pool())
        .await?;
        let command_usage: serde_json::Map<String, serde_json::Value> = command_usage
            .into_iter()
            .map(|(command, count)| (command, serde_json::Value::from(count)))
            .collect();

        Ok(serde_json::json!({
            "exported_at": chrono::Utc::now().to_rfc3339(),
            "user_id": user_id,
            "project_hash": project_hash,
            "patterns": patterns,
            "preferences": preferences,
            "command_usage": command_usage,
            "totals": {
                "interactions": stats.total_interactions,
                "feedback": stats.total_feedback,
            },
        }))
    }
}
