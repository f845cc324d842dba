/// flagwise library
///
/// Adaptive flag recommendation engine: pattern matching, multi-factor
/// scoring, persistent preference learning, and cached recommendations.

pub mod advisor;
pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod identity;

// Re-exports for convenience
pub use advisor::Advisor;
pub use context::ProjectContext;
pub use db::Database;
pub use engine::Recommendation;
pub use error::{FlagwiseError, Result};
