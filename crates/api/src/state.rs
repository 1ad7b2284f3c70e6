use std::sync::Arc;

use crate::{
    config::Config,
    game::{Economy, Leaderboard, RateLimiter},
    stores::SharedStore,
};

#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Shared store (Redis or in-memory), used directly for health checks.
    pub store: Arc<dyn SharedStore>,
    /// Manual feed rate limiting.
    pub rate_limiter: RateLimiter,
    /// Global score ranking.
    pub leaderboard: Leaderboard,
    /// Auto-feeder catalog, purchases and holdings.
    pub economy: Economy,
}
