/// Static pattern catalog for flag recommendation
///
/// Two matching tiers: priority regex patterns checked first (any hit wins
/// outright), then keyword-set patterns scored by fraction of keywords
/// present. A per-command default covers requests nothing matches.

use regex::Regex;

/// Result of matching a request against the catalog
#[derive(Debug, Clone)]
pub struct CatalogMatch {
    pub pattern_id: String,
    /// Keyword match fraction, with the priority bonus where it applies
    pub raw_score: f64,
    pub base_flags: Vec<String>,
    /// Confidence usable without consulting stored history
    pub quick_confidence: i64,
}

struct RegexPattern {
    name: &'static str,
    regex: Regex,
    flags: &'static str,
    confidence: i64,
}

struct KeywordPattern {
    name: &'static str,
    keywords: &'static [&'static str],
    flags: &'static str,
    confidence: i64,
}

/// Priority names consulted before the general keyword scan. Names with no
/// keyword table entry are skipped; the list intentionally carries entries
/// the table does not define.
const PRIORITY_NAMES: &[&str] = &[
    "analyze_security",
    "analyze_performance",
    "analyze_architecture",
    "implement_authentication",
];

const PRIORITY_BONUS: f64 = 0.5;

/// Pattern catalog with compiled tier-1 regexes
pub struct PatternCatalog {
    regex_patterns: Vec<RegexPattern>,
    keyword_patterns: Vec<KeywordPattern>,
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternCatalog {
    pub fn new() -> Self {
        let regex_defs: [(&str, &str, &str, i64); 4] = [
            (
                "analyze_architecture",
                r"analyze.*architecture",
                "--persona-architect --ultrathink --seq",
                95,
            ),
            (
                "security_audit",
                r"security.*audit",
                "--persona-security --ultrathink --seq --validate",
                95,
            ),
            (
                "implement_auth",
                r"implement.*auth",
                "--persona-security --persona-backend --validate",
                90,
            ),
            (
                "optimize_performance",
                r"optimize.*performance",
                "--persona-performance --think-hard --play",
                90,
            ),
        ];

        let regex_patterns = regex_defs
            .into_iter()
            .filter_map(|(name, pattern, flags, confidence)| {
                Regex::new(pattern).ok().map(|regex| RegexPattern {
                    name,
                    regex,
                    flags,
                    confidence,
                })
            })
            .collect();

        let keyword_patterns = vec![
            KeywordPattern {
                name: "analyze_general",
                keywords: &["analyze", "review"],
                flags: "--persona-analyzer --think",
                confidence: 85,
            },
            KeywordPattern {
                name: "analyze_security",
                keywords: &["security", "vulnerability", "audit"],
                flags: "--persona-security --focus security --think --validate",
                confidence: 95,
            },
            KeywordPattern {
                name: "analyze_performance",
                keywords: &["performance", "optimize", "bottleneck"],
                flags: "--persona-performance --think-hard --focus performance",
                confidence: 90,
            },
            KeywordPattern {
                name: "implement_ui",
                keywords: &["component", "ui", "interface", "frontend"],
                flags: "--persona-frontend --magic --c7",
                confidence: 94,
            },
            KeywordPattern {
                name: "implement_api",
                keywords: &["api", "endpoint", "backend", "server"],
                flags: "--persona-backend --seq --c7",
                confidence: 92,
            },
            KeywordPattern {
                name: "improve_quality",
                keywords: &["improve", "refactor", "cleanup"],
                flags: "--persona-refactorer --loop --validate",
                confidence: 88,
            },
        ];

        Self {
            regex_patterns,
            keyword_patterns,
        }
    }

    /// Match a request against the catalog
    ///
    /// Never fails: a request nothing matches falls back to the
    /// per-command default pattern.
    pub fn find_match(&self, command: &str, description: &str) -> CatalogMatch {
        let full_text = format!("{} {}", command, description).to_lowercase();

        // Tier 1: any regex hit wins unconditionally
        for pattern in &self.regex_patterns {
            if pattern.regex.is_match(&full_text) {
                return CatalogMatch {
                    pattern_id: pattern.name.to_string(),
                    raw_score: 1.0,
                    base_flags: split_flags(pattern.flags),
                    quick_confidence: pattern.confidence,
                };
            }
        }

        // Priority keyword patterns: first with any keyword hit wins
        for name in PRIORITY_NAMES {
            let Some(pattern) = self.keyword_patterns.iter().find(|p| p.name == *name) else {
                continue;
            };
            let score = keyword_score(&full_text, pattern.keywords);
            if score > 0.0 {
                return Self::keyword_match(pattern, score + PRIORITY_BONUS);
            }
        }

        // Tier 2: best keyword fraction, declaration order breaks ties
        let mut best: Option<(&KeywordPattern, f64)> = None;
        for pattern in &self.keyword_patterns {
            let score = keyword_score(&full_text, pattern.keywords);
            if score > best.map(|(_, s)| s).unwrap_or(0.0) {
                best = Some((pattern, score));
            }
        }
        if let Some((pattern, score)) = best {
            return Self::keyword_match(pattern, score);
        }

        self.default_match(command)
    }

    fn keyword_match(pattern: &KeywordPattern, score: f64) -> CatalogMatch {
        // scale base confidence by match strength, floor at half
        let confidence = ((pattern.confidence as f64) * (0.5 + score * 0.5)).round() as i64;
        CatalogMatch {
            pattern_id: pattern.name.to_string(),
            raw_score: score,
            base_flags: split_flags(pattern.flags),
            quick_confidence: confidence.min(95),
        }
    }

    /// Per-command default when no pattern matched
    fn default_match(&self, command: &str) -> CatalogMatch {
        let (flags, confidence) = if command.contains("analyze") {
            ("--persona-analyzer --think", 70)
        } else if command.contains("implement") {
            ("--persona-backend --c7", 75)
        } else if command.contains("improve") {
            ("--persona-refactorer --think", 70)
        } else {
            ("--think", 60)
        };

        CatalogMatch {
            pattern_id: format!("{}_general", command),
            raw_score: 0.0,
            base_flags: split_flags(flags),
            quick_confidence: confidence,
        }
    }
}

/// Fraction of keywords present in the text
fn keyword_score(text: &str, keywords: &[&str]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let matches = keywords.iter().filter(|k| text.contains(**k)).count();
    matches as f64 / keywords.len() as f64
}

fn split_flags(flags: &str) -> Vec<String> {
    flags.split_whitespace().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_tier_wins() {
        let catalog = PatternCatalog::new();
        let m = catalog.find_match("analyze", "run a security audit of the api layer");

        assert_eq!(m.pattern_id, "security_audit");
        assert_eq!(m.quick_confidence, 95);
        assert!(m.base_flags.contains(&"--persona-security".to_string()));
        assert!(m.base_flags.contains(&"--ultrathink".to_string()));
    }

    #[test]
    fn test_priority_keyword_beats_general_scan() {
        let catalog = PatternCatalog::new();
        // "analyze" alone would score analyze_general, but the security
        // keyword routes through the priority list first
        let m = catalog.find_match("analyze", "find security vulnerabilities");

        assert_eq!(m.pattern_id, "analyze_security");
        assert!(m.raw_score > PRIORITY_BONUS);
        assert!(m.quick_confidence >= 85);
        assert!(m.base_flags.contains(&"--persona-security".to_string()));
    }

    #[test]
    fn test_absent_priority_names_skipped() {
        let catalog = PatternCatalog::new();
        // implement_authentication is in the priority list but not the
        // keyword table; the request must still resolve without error
        let m = catalog.find_match("implement", "add an api endpoint to the server");

        assert_eq!(m.pattern_id, "implement_api");
    }

    #[test]
    fn test_keyword_tie_broken_by_declaration_order() {
        let catalog = PatternCatalog::new();
        // one keyword each from implement_ui and implement_api; ui declared
        // first so it wins the tie
        let m = catalog.find_match("implement", "component api something");

        // both score 1/4; implement_ui is declared first
        assert_eq!(m.pattern_id, "implement_ui");
    }

    #[test]
    fn test_fallback_per_command() {
        let catalog = PatternCatalog::new();

        // the command word itself is an analyze_general keyword, so this
        // routes through tier 2 at half strength rather than the default
        let m = catalog.find_match("analyze", "zzz");
        assert_eq!(m.pattern_id, "analyze_general");
        assert_eq!(m.raw_score, 0.5);
        assert_eq!(m.quick_confidence, 64);

        let m = catalog.find_match("implement", "zzz");
        assert_eq!(m.pattern_id, "implement_general");
        assert_eq!(m.quick_confidence, 75);

        let m = catalog.find_match("document", "zzz");
        assert_eq!(m.pattern_id, "document_general");
        assert_eq!(m.quick_confidence, 60);
        assert_eq!(m.base_flags, vec!["--think"]);
    }

    #[test]
    fn test_match_never_fails_on_empty_input() {
        let catalog = PatternCatalog::new();
        let m = catalog.find_match("", "");
        assert_eq!(m.pattern_id, "_general");
        assert_eq!(m.quick_confidence, 60);
    }

    #[test]
    fn test_keyword_score_fraction() {
        assert_eq!(keyword_score("security audit now", &["security", "audit"]), 1.0);
        assert_eq!(keyword_score("security only", &["security", "audit"]), 0.5);
        assert_eq!(keyword_score("nothing", &["security", "audit"]), 0.0);
        assert_eq!(keyword_score("anything", &[]), 0.0);
    }
}
