/// Trend analysis over recorded interactions
///
/// Summarizes a window of interactions into success ratios, satisfaction
/// and recommendation-accuracy scores for the report command.

use crate::db::models::{Interaction, Outcome};
use crate::db::PreferenceStore;
use serde::{Deserialize, Serialize};

/// Aggregate view of a window of interactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub total_interactions: usize,
    pub success_ratio: f64,
    pub average_execution_ms: f64,
    /// Weighted blend of success, speed and confidence accuracy in [0, 1]
    pub satisfaction_score: f64,
    /// Share of interactions whose confidence matched their outcome
    pub recommendation_accuracy: f64,
    /// Success-rate change between the window's first and second half,
    /// None with fewer than 10 interactions
    pub success_improvement: Option<f64>,
    pub confidence_improvement: Option<f64>,
}

impl TrendAnalysis {
    fn empty() -> Self {
        Self {
            total_interactions: 0,
            success_ratio: 0.0,
            average_execution_ms: 0.0,
            satisfaction_score: 0.0,
            recommendation_accuracy: 0.0,
            success_improvement: None,
            confidence_improvement: None,
        }
    }
}

/// Analyzer over the learning store
#[derive(Clone)]
pub struct TrendAnalyzer {
    store: PreferenceStore,
}

impl TrendAnalyzer {
    pub fn new(store: PreferenceStore) -> Self {
        Self { store }
    }

    /// Analyze the last `days` days of a user/project pair's interactions
    pub async fn analyze_trends(
        &self,
        user_id: &str,
        project_hash: &str,
        days: i64,
    ) -> TrendAnalysis {
        let interactions = self
            .store
            .get_user_interactions(user_id, project_hash, days)
            .await;
        analyze(&interactions)
    }

    /// Full report for the CLI: trends plus per-pattern performance
    pub async fn report(
        &self,
        user_id: &str,
        project_hash: &str,
        days: i64,
    ) -> serde_json::Value {
        let analysis = self.analyze_trends(user_id, project_hash, days).await;
        let patterns = self.store.get_all_pattern_stats().await;

        serde_json::json!({
            "report_period_days": days,
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "overall": analysis,
            "patterns": patterns,
        })
    }
}

fn analyze(interactions: &[Interaction]) -> TrendAnalysis {
    if interactions.is_empty() {
        return TrendAnalysis::empty();
    }

    let total = interactions.len();
    let successes = interactions
        .iter()
        .filter(|i| i.outcome() == Outcome::Success)
        .count();
    let success_ratio = successes as f64 / total as f64;

    let times: Vec<f64> = interactions
        .iter()
        .filter_map(|i| i.execution_time_ms)
        .map(|t| t as f64)
        .collect();
    let average_execution_ms = if times.is_empty() {
        0.0
    } else {
        times.iter().sum::<f64>() / times.len() as f64
    };

    // speed satisfaction relative to a 60 s budget
    let avg_secs = average_execution_ms / 1000.0;
    let time_satisfaction = ((60.0 - avg_secs) / 60.0).clamp(0.0, 1.0);

    let accuracy_hits = interactions
        .iter()
        .filter(|i| confidence_matched(i))
        .count();
    let accuracy_satisfaction = accuracy_hits as f64 / total as f64;

    let satisfaction_score = (success_ratio * 0.5
        + time_satisfaction * 0.3
        + accuracy_satisfaction * 0.2)
        .clamp(0.0, 1.0);

    let accurate = interactions.iter().filter(|i| accurate(i)).count();
    let recommendation_accuracy = accurate as f64 / total as f64;

    let (success_improvement, confidence_improvement) = improvement(interactions);

    TrendAnalysis {
        total_interactions: total,
        success_ratio,
        average_execution_ms,
        satisfaction_score,
        recommendation_accuracy,
        success_improvement,
        confidence_improvement,
    }
}

/// High confidence should succeed, low confidence failing is still honest
fn confidence_matched(i: &Interaction) -> bool {
    let success = i.outcome() == Outcome::Success;
    (i.confidence >= 80 && success) || (i.confidence <= 60 && !success)
}

/// Accuracy grading: high confidence must succeed, low confidence always
/// counts as cautious, mid confidence counts when it succeeds
fn accurate(i: &Interaction) -> bool {
    let success = i.outcome() == Outcome::Success;
    if i.confidence >= 80 {
        success
    } else if i.confidence <= 60 {
        true
    } else {
        success
    }
}

/// First-half vs second-half comparison, chronological order
fn improvement(interactions: &[Interaction]) -> (Option<f64>, Option<f64>) {
    if interactions.len() < 10 {
        return (None, None);
    }

    // stored newest-first; compare oldest half against newest half
    let mut ordered: Vec<&Interaction> = interactions.iter().collect();
    ordered.reverse();
    let mid = ordered.len() / 2;
    let (first, second) = ordered.split_at(mid);

    let rate = |half: &[&Interaction]| {
        half.iter()
            .filter(|i| i.outcome() == Outcome::Success)
            .count() as f64
            / half.len() as f64
    };
    let avg_confidence = |half: &[&Interaction]| {
        half.iter().map(|i| i.confidence as f64).sum::<f64>() / half.len() as f64
    };

    (
        Some(rate(second) - rate(first)),
        Some(avg_confidence(second) - avg_confidence(first)),
    )
}
