// Project context passed alongside every recommendation request.
//
// Context is supplied by the caller (detected upstream) and treated as an
// opaque but structured snapshot of the working project: what it is, how
// big it is, and which languages and frameworks it uses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rough complexity tier of the task or project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Complexity::Simple => write!(f, "simple"),
            Complexity::Moderate => write!(f, "moderate"),
            Complexity::Complex => write!(f, "complex"),
        }
    }
}

/// Bucketed project size derived from file count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectSize {
    Small,
    Medium,
    Large,
}

impl ProjectSize {
    pub fn from_file_count(count: i64) -> Self {
        if count > 100 {
            ProjectSize::Large
        } else if count > 20 {
            ProjectSize::Medium
        } else {
            ProjectSize::Small
        }
    }
}

impl fmt::Display for ProjectSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectSize::Small => write!(f, "small"),
            ProjectSize::Medium => write!(f, "medium"),
            ProjectSize::Large => write!(f, "large"),
        }
    }
}

/// Snapshot of the project a recommendation is being made for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectContext {
    /// Free-form label, e.g. "python_backend" or "react_frontend"
    #[serde(default)]
    pub project_type: Option<String>,
    /// Domain hint, e.g. "security" or "frontend"
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub complexity: Option<Complexity>,
    #[serde(default)]
    pub file_count: Option<i64>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub frameworks: Vec<String>,
}

impl ProjectContext {
    /// Keys under which this context is counted against a pattern. Each key
    /// is a dimension:value pair in one of the three scored similarity
    /// dimensions (size, language, framework).
    pub fn feature_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(size) = self.size() {
            keys.push(format!("size:{}", size));
        }
        for lang in &self.languages {
            keys.push(format!("lang:{}", lang.to_lowercase()));
        }
        for fw in &self.frameworks {
            keys.push(format!("framework:{}", fw.to_lowercase()));
        }
        keys
    }

    pub fn size(&self) -> Option<ProjectSize> {
        self.file_count.map(ProjectSize::from_file_count)
    }

    pub fn is_complex(&self) -> bool {
        matches!(self.complexity, Some(Complexity::Complex))
    }

    /// Case-insensitive language membership test.
    pub fn has_language(&self, lang: &str) -> bool {
        self.languages.iter().any(|l| l.eq_ignore_ascii_case(lang))
    }

    /// Case-insensitive framework membership test.
    pub fn has_framework(&self, fw: &str) -> bool {
        self.frameworks.iter().any(|f| f.eq_ignore_ascii_case(fw))
    }

}
