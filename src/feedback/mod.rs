/// Feedback module
///
/// Outcome classification, weight adjustment, and trend analysis.

pub mod analysis;
pub mod processor;

pub use analysis::{TrendAnalysis, TrendAnalyzer};
pub use processor::{FeedbackProcessor, ProcessedFeedback};
