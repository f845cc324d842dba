/// Data models for database entities
///
/// All models map to database tables and use sqlx for type-safe queries.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::context::ProjectContext;

/// Outcome of a recorded interaction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Open,
    Success,
    Failure,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Outcome::Open => "open",
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Outcome {
    type Err = crate::error::FlagwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Outcome::Open),
            "success" => Ok(Outcome::Success),
            "failure" => Ok(Outcome::Failure),
            other => Err(crate::error::FlagwiseError::InvalidInput(format!(
                "unknown outcome '{}'",
                other
            ))),
        }
    }
}

/// A recorded recommendation request and its eventual outcome
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Interaction {
    pub id: i64,
    pub timestamp: String, // ISO 8601 format from SQLite
    pub user_input: String,
    pub command: String,
    pub description: String,
    pub pattern_id: String,
    pub recommended_flags: String, // JSON array
    pub project_context: Option<String>, // JSON object
    pub outcome: String, // 'open', 'success' or 'failure'
    pub execution_time_ms: Option<i64>,
    pub confidence: i64,
    pub reasoning: Option<String>,
    pub user_id: String,
    pub project_hash: String,
}

impl Interaction {
    /// Parse recommended flags from JSON string
    pub fn get_flags(&self) -> Vec<String> {
        serde_json::from_str(&self.recommended_flags).unwrap_or_default()
    }

    /// Parse the stored project context from JSON
    pub fn get_context(&self) -> ProjectContext {
        self.project_context
            .as_ref()
            .and_then(|c| serde_json::from_str(c).ok())
            .unwrap_or_default()
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome.parse().unwrap_or(Outcome::Open)
    }
}

/// Input for recording a new interaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionInput {
    pub user_input: String,
    pub command: String,
    pub description: String,
    pub pattern_id: String,
    pub recommended_flags: Vec<String>,
    pub project_context: Option<ProjectContext>,
    pub confidence: i64,
    pub reasoning: Option<String>,
    pub user_id: String,
    pub project_hash: String,
}

/// Feedback classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    ImplicitSuccess,
    ImplicitFailure,
    ExplicitRating,
    UserCorrection,
    Performance,
}

impl std::fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FeedbackKind::ImplicitSuccess => "implicit_success",
            FeedbackKind::ImplicitFailure => "implicit_failure",
            FeedbackKind::ExplicitRating => "explicit_rating",
            FeedbackKind::UserCorrection => "user_correction",
            FeedbackKind::Performance => "performance",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for FeedbackKind {
    type Err = crate::error::FlagwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "implicit_success" => Ok(FeedbackKind::ImplicitSuccess),
            "implicit_failure" => Ok(FeedbackKind::ImplicitFailure),
            "explicit_rating" => Ok(FeedbackKind::ExplicitRating),
            "user_correction" => Ok(FeedbackKind::UserCorrection),
            "performance" => Ok(FeedbackKind::Performance),
            other => Err(crate::error::FlagwiseError::Feedback(format!(
                "unknown feedback kind '{}'",
                other
            ))),
        }
    }
}

/// A feedback event tied to an interaction
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedbackRow {
    pub id: i64,
    pub interaction_id: i64,
    pub timestamp: String, // ISO 8601 format from SQLite
    pub kind: String,
    pub rating: Option<i64>, // 1-5 when explicit
    pub success_indicator: bool,
    pub correction: Option<String>, // JSON array of corrected flags
    pub processed: bool,
    pub user_id: String,
    pub project_hash: String,
}

impl FeedbackRow {
    pub fn kind(&self) -> Option<FeedbackKind> {
        self.kind.parse().ok()
    }

    /// Parse the corrected flag list from JSON
    pub fn get_correction(&self) -> Vec<String> {
        self.correction
            .as_ref()
            .and_then(|c| serde_json::from_str(c).ok())
            .unwrap_or_default()
    }
}

/// Aggregated success statistics for one pattern
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PatternStats {
    pub pattern_name: String,
    pub total_uses: i64,
    pub successful_uses: i64,
    pub success_rate: f64,
    pub last_updated: String, // ISO 8601 format from SQLite
}

impl PatternStats {
    /// Confidence in this pattern: success rate dampened while usage is low
    pub fn pattern_confidence(&self, saturation: i64) -> f64 {
        let usage_factor = (self.total_uses as f64 / saturation as f64).min(1.0);
        self.success_rate * usage_factor
    }
}

/// One context dimension's co-occurrence count for a pattern
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PatternContextRow {
    pub pattern_name: String,
    pub context_key: String, // "dimension:value", e.g. "lang:python"
    pub weight: f64,
}

/// A per-(user, project) preference weight for a pattern
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PreferenceWeight {
    pub id: i64,
    pub user_id: String,
    pub project_hash: String,
    pub pattern_name: String,
    pub preference_weight: f64,
    pub last_updated: String, // ISO 8601 format from SQLite
}
