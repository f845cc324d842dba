/// Database module for flagwise
///
/// Handles all learning-store operations using SQLite and sqlx.
/// Implements connection pooling for performance.

pub mod connection;
pub mod models;
pub mod queries;
pub mod store;

pub use connection::Database;
pub use models::*;
pub use store::PreferenceStore;
