//! Per-player, per-action fixed-window rate limiting.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::stores::{CollectionTtl, SharedStore};

/// Limits applied by a [`RateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Most actions allowed in one window.
    pub max_per_window: i64,
    pub window: Duration,
    /// Let the action through when the store cannot be reached.
    pub fail_open: bool,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_per_window: 60,
            window: Duration::from_secs(60),
            fail_open: true,
        }
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Under the limit, includes current count.
    Allowed(i64),
    /// Over the limit, includes current count.
    Exceeded(i64),
    /// The counter could not be read and the policy fails open.
    FailedOpen,
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_) | RateLimitResult::FailedOpen)
    }
}

/// Fixed-window counter gate.
///
/// Every check increments the counter, including the one that is denied, so
/// hammering past the limit keeps consuming the window. The window starts at
/// the first action and is never extended; expiry resets it.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn SharedStore>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn SharedStore>, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    fn counter_key(player: &str) -> String {
        format!("{}-rate-limit", player)
    }

    pub async fn check(&self, player: &str, action: &str) -> Result<RateLimitResult> {
        let counted = self
            .store
            .counter_increment(
                &Self::counter_key(player),
                action,
                1,
                CollectionTtl::fixed(self.policy.window),
            )
            .await;

        let count = match counted {
            Ok(count) => count,
            Err(err) if self.policy.fail_open => {
                tracing::error!(player, action, error = %err, "rate limit check failed, allowing");
                return Ok(RateLimitResult::FailedOpen);
            }
            Err(err) => return Err(err.context("rate limit check failed")),
        };

        if count > self.policy.max_per_window {
            Ok(RateLimitResult::Exceeded(count))
        } else {
            Ok(RateLimitResult::Allowed(count))
        }
    }
}
