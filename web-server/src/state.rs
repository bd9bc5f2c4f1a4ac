// web-server/src/state.rs
use std::sync::Arc;

use questline_common::store::{MemoryStore, ProgressStore};
use questline_common::{Authenticator, Config, OnboardingCoordinator};

/// Shared application state, built once at startup
pub struct AppState {
    pub authenticator: Authenticator,
    pub coordinator: OnboardingCoordinator,
    pub catalog: Arc<dyn ProgressStore>,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<MemoryStore>) -> Self {
        Self {
            authenticator: Authenticator::from_config(config),
            coordinator: OnboardingCoordinator::new(
                store.clone(),
                store.clone(),
                config.onboarding.clone(),
            ),
            catalog: store,
        }
    }

    /// State backed by an in-memory store seeded from the configured catalog
    pub fn from_config(config: &Config) -> Self {
        let store = MemoryStore::with_catalog(
            config.catalog.quests.iter().map(|q| q.to_content()).collect(),
            config
                .catalog
                .achievements
                .iter()
                .map(|a| a.to_content())
                .collect(),
        );

        tracing::info!(
            "Seeded catalog with {} quests and {} achievements",
            config.catalog.quests.len(),
            config.catalog.achievements.len()
        );

        Self::new(config, Arc::new(store))
    }
}
