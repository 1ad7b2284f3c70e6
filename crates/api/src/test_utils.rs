//! Shared test utilities for API handler tests.
//!
//! Provides a test configuration and a flexible `TestStateBuilder` for
//! constructing `AppState` instances on top of a mock or in-memory store.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::test_utils::TestStateBuilder;
//!
//! let mut store = MockSharedStore::new();
//! store.expect_sorted_set_get_score().returning(|_, _| Ok(ScoreLookup::Miss));
//!
//! let state = TestStateBuilder::new().with_store(store).build();
//! ```

use std::sync::Arc;

use crate::config::Config;
use crate::game::{Catalog, Economy, Leaderboard, RateLimiter};
use crate::state::AppState;
use crate::stores::{MockSharedStore, SharedStore};

/// Creates a test configuration with the game's default rules.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 8080,
        store_url: "memory://".to_string(),
        namespace: "test".to_string(),
        env: "test".to_string(),
        sentry_dsn: None,
        max_feeds_per_minute: 60,
        rate_limit_fail_open: true,
        leaderboard_fetch_count: 100,
        scheduler_enabled: false,
        accrual_interval_secs: 60,
        accrual_lease_ttl_secs: 5,
        accrual_snapshot_limit: 10_000,
    }
}

/// Builder for constructing test `AppState` with a custom store.
///
/// Uses an empty mock store (any call fails the test) unless one is set.
pub struct TestStateBuilder {
    config: Config,
    store: Option<Arc<dyn SharedStore>>,
}

impl TestStateBuilder {
    /// Creates a new builder with no store configured.
    pub fn new() -> Self {
        Self {
            config: test_config(),
            store: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_store(self, store: impl SharedStore + 'static) -> Self {
        self.with_shared_store(Arc::new(store))
    }

    /// Use a store the test keeps a handle to, e.g. an `Arc<MemoryStore>`.
    pub fn with_shared_store(mut self, store: Arc<dyn SharedStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the `AppState` using the configured store or an empty mock.
    pub fn build(self) -> AppState {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MockSharedStore::new()));

        let leaderboard = Leaderboard::new(store.clone(), self.config.accrual_snapshot_limit);
        let economy = Economy::new(
            store.clone(),
            leaderboard.clone(),
            Arc::new(Catalog::standard()),
        );
        let rate_limiter = RateLimiter::new(store.clone(), self.config.rate_limit_policy());

        AppState {
            config: self.config,
            store,
            rate_limiter,
            leaderboard,
            economy,
        }
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
