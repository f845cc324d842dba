/// Recommendation engine module
///
/// Pattern catalog, scoring math, the store-backed recommender, and
/// provider selection.

pub mod catalog;
pub mod provider;
pub mod recommender;
pub mod scorer;

pub use catalog::{CatalogMatch, PatternCatalog};
pub use provider::{Provide, Provider};
pub use recommender::{Recommendation, Recommender};
pub use scorer::Scorer;
