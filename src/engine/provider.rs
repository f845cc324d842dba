/// Provider selection for optional learning
///
/// The learning store is optional at runtime. Which capability is in play
/// is decided once at construction: a store that opened selects the
/// adaptive provider, anything else the static one. Callers only see the
/// `Provide` trait.

use crate::context::ProjectContext;
use crate::db::PreferenceStore;
use crate::engine::recommender::{Recommendation, Recommender};

/// Capability interface both providers implement
pub trait Provide {
    fn recommend(
        &self,
        command: &str,
        description: &str,
        context: &ProjectContext,
        user_id: &str,
        project_hash: &str,
    ) -> impl std::future::Future<Output = Recommendation> + Send;
}

/// Full store-backed adaptive scoring
#[derive(Clone)]
pub struct AdaptiveProvider {
    recommender: Recommender,
}

impl Provide for AdaptiveProvider {
    async fn recommend(
        &self,
        command: &str,
        description: &str,
        context: &ProjectContext,
        user_id: &str,
        project_hash: &str,
    ) -> Recommendation {
        self.recommender
            .recommend(command, description, context, user_id, project_hash)
            .await
    }
}

/// Catalog-only matching, used when no store is available
#[derive(Clone)]
pub struct StaticProvider {
    recommender: Recommender,
}

impl Provide for StaticProvider {
    async fn recommend(
        &self,
        command: &str,
        description: &str,
        context: &ProjectContext,
        _user_id: &str,
        _project_hash: &str,
    ) -> Recommendation {
        self.recommender.quick(command, description, context)
    }
}

/// The provider actually in play, chosen once at construction
#[derive(Clone)]
pub enum Provider {
    Adaptive(AdaptiveProvider),
    Static(StaticProvider),
}

impl Provider {
    /// Select the provider for a store: adaptive when it opened, static
    /// otherwise
    pub fn select(store: PreferenceStore) -> Self {
        let adaptive = store.is_available();
        let recommender = Recommender::new(store);
        if adaptive {
            Provider::Adaptive(AdaptiveProvider { recommender })
        } else {
            Provider::Static(StaticProvider { recommender })
        }
    }

    pub fn is_adaptive(&self) -> bool {
        matches!(self, Provider::Adaptive(_))
    }

    pub fn recommender(&self) -> &Recommender {
        match self {
            Provider::Adaptive(p) => &p.recommender,
            Provider::Static(p) => &p.recommender,
        }
    }
}

impl Provide for Provider {
    async fn recommend(
        &self,
        command: &str,
        description: &str,
        context: &ProjectContext,
        user_id: &str,
        project_hash: &str,
    ) -> Recommendation {
        match self {
            Provider::Adaptive(p) => {
                p.recommend(command, description, context, user_id, project_hash)
                    .await
            }
            Provider::Static(p) => {
                p.recommend(command, description, context, user_id, project_hash)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_unavailable_store_selects_static() {
        let provider = Provider::select(PreferenceStore::disabled());
        assert!(!provider.is_adaptive());

        let rec = provider
            .recommend("analyze", "review the code", &ProjectContext::default(), "u", "p")
            .await;
        assert!(!rec.flags.is_empty());
    }

    #[tokio::test]
    async fn test_open_store_selects_adaptive() {
        let db = Database::new_test().await.unwrap();
        let provider = Provider::select(PreferenceStore::from_database(db));
        assert!(provider.is_adaptive());
    }
}
