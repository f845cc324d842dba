/// Flag recommendation engine
///
/// Combines the pattern catalog with stored history into a ranked
/// recommendation. The full path is a pure function of the storage
/// snapshot; the quick path never touches storage at all.

use crate::config::{ScoringWeights, SimilarityWeights};
use crate::context::ProjectContext;
use crate::db::PreferenceStore;
use crate::engine::catalog::{CatalogMatch, PatternCatalog};
use crate::engine::scorer::Scorer;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A ranked flag recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub pattern_id: String,
    pub flags: Vec<String>,
    pub confidence: i64,
    pub reasoning: Vec<String>,
    pub mcp_servers: Vec<String>,
    pub personas: Vec<String>,
}

impl Recommendation {
    /// The flags as a single shell-ready line
    pub fn flags_line(&self) -> String {
        self.flags.join(" ")
    }
}

/// Append a flag only if it is not already present
fn add_flag(flags: &mut Vec<String>, flag: &str) {
    if !flags.iter().any(|f| f == flag) {
        flags.push(flag.to_string());
    }
}

/// Apply context-driven flag adjustments in fixed order
///
/// Each step is idempotent, so applying the whole pipeline twice leaves
/// the flag list unchanged.
pub fn apply_adjustments(flags: &mut Vec<String>, context: &ProjectContext) {
    // 1. deeper thinking for complex work, unless already deeper
    if context.is_complex()
        && !flags.iter().any(|f| f == "--think-hard" || f == "--ultrathink")
    {
        if let Some(pos) = flags.iter().position(|f| f == "--think") {
            flags[pos] = "--think-hard".to_string();
        }
    }

    // 2-3. large projects get delegation, very large get compression
    if let Some(count) = context.file_count {
        if count > 50 {
            add_flag(flags, "--delegate");
        }
        if count > 100 {
            add_flag(flags, "--uc");
        }
    }

    // 4. python projects get validation
    if context.has_language("python") {
        add_flag(flags, "--validate");
    }

    // 5. component frameworks get UI generation
    if context.has_framework("react")
        || context.has_framework("vue")
        || context.has_framework("angular")
    {
        add_flag(flags, "--magic");
    }
}

/// MCP servers implied by the flag set
pub fn extract_mcp_servers(flags: &[String]) -> Vec<String> {
    let mut servers = Vec::new();
    let has = |name: &str| flags.iter().any(|f| f == name);

    if has("--seq") || has("--sequential") {
        servers.push("Sequential".to_string());
    }
    if has("--c7") || has("--context7") {
        servers.push("Context7".to_string());
    }
    if has("--magic") {
        servers.push("Magic".to_string());
    }
    if has("--play") || has("--playwright") {
        servers.push("Playwright".to_string());
    }
    servers
}

/// Personas named by the flag set
pub fn extract_personas(flags: &[String]) -> Vec<String> {
    flags
        .iter()
        .filter_map(|f| f.strip_prefix("--persona-"))
        .map(String::from)
        .collect()
}

/// Parse SQLite's CURRENT_TIMESTAMP format, falling back to RFC 3339
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Store-backed recommendation engine
#[derive(Clone)]
pub struct Recommender {
    catalog: std::sync::Arc<PatternCatalog>,
    store: PreferenceStore,
    weights: ScoringWeights,
    similarity: SimilarityWeights,
}

impl Recommender {
    pub fn new(store: PreferenceStore) -> Self {
        Self {
            catalog: std::sync::Arc::new(PatternCatalog::new()),
            store,
            weights: ScoringWeights::default(),
            similarity: SimilarityWeights::default(),
        }
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Catalog-only recommendation, no storage reads
    ///
    /// Used as the immediate answer on a cache miss and as the whole
    /// answer when no learning store is available.
    pub fn quick(
        &self,
        command: &str,
        description: &str,
        context: &ProjectContext,
    ) -> Recommendation {
        let m = self.catalog.find_match(command, description);
        Self::finish(m.pattern_id.clone(), m.base_flags.clone(), m.quick_confidence, vec![
            format!("pattern matched: {} (score {:.2})", m.pattern_id, m.raw_score),
        ], context)
    }

    /// Full recommendation from the stored-state snapshot
    ///
    /// Patterns with recorded history are scored with the adaptive
    /// formula; unseen patterns keep the catalog's quick confidence.
    pub async fn recommend(
        &self,
        command: &str,
        description: &str,
        context: &ProjectContext,
        user_id: &str,
        project_hash: &str,
    ) -> Recommendation {
        let m = self.catalog.find_match(command, description);

        let Some(stats) = self.store.get_pattern_stats(&m.pattern_id).await else {
            return self.quick_with_match(m, context, "no history yet");
        };
        if stats.total_uses == 0 {
            return self.quick_with_match(m, context, "no history yet");
        }

        let weight = self
            .store
            .get_preference_weight(user_id, project_hash, &m.pattern_id)
            .await;
        let history = self.store.get_pattern_context(&m.pattern_id).await;

        let context_similarity = Scorer::context_similarity(&self.similarity, context, &history);
        let pattern_confidence = stats.pattern_confidence(self.weights.usage_saturation);
        let recency = parse_timestamp(&stats.last_updated)
            .map(|ts| Scorer::recency_factor(&self.weights, ts))
            .unwrap_or(1.0);

        let score = Scorer::adaptive_score(
            &self.weights,
            stats.success_rate,
            weight,
            context_similarity,
            pattern_confidence,
            recency,
        );
        let confidence = Scorer::confidence(&self.weights, score);

        let reasoning = vec![
            format!("pattern matched: {} (score {:.2})", m.pattern_id, m.raw_score),
            format!(
                "success rate {:.0}% over {} uses",
                stats.success_rate * 100.0,
                stats.total_uses
            ),
            format!("preference weight {:.2}", weight),
            format!("context similarity {:.2}", context_similarity),
            format!("recency factor {:.2}", recency),
        ];

        Self::finish(m.pattern_id, m.base_flags, confidence, reasoning, context)
    }

    fn quick_with_match(
        &self,
        m: CatalogMatch,
        context: &ProjectContext,
        note: &str,
    ) -> Recommendation {
        Self::finish(
            m.pattern_id.clone(),
            m.base_flags,
            m.quick_confidence,
            vec![
                format!("pattern matched: {} (score {:.2})", m.pattern_id, m.raw_score),
                note.to_string(),
            ],
            context,
        )
    }

    fn finish(
        pattern_id: String,
        mut flags: Vec<String>,
        confidence: i64,
        reasoning: Vec<String>,
        context: &ProjectContext,
    ) -> Recommendation {
        apply_adjustments(&mut flags, context);
        let mcp_servers = extract_mcp_servers(&flags);
        let personas = extract_personas(&flags);
        Recommendation {
            pattern_id,
            flags,
            confidence: confidence.clamp(0, 100),
            reasoning,
            mcp_servers,
            personas,
        }
    }
}
