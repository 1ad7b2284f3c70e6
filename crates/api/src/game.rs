//! The game economy engine.
//!
//! Player actions (clicks and auto-feeder purchases) go through the
//! [`RateLimiter`] and then straight to the [`Leaderboard`] and [`Economy`].
//! The [`AccrualJob`] runs on its own timer, takes the accrual lease and
//! credits passive income to every player on the leaderboard.
//!
//! All coordination happens through the atomic primitives of the shared
//! store; nothing here holds in-process mutable state.

pub mod accrual;
mod catalog;
mod economy;
mod leaderboard;
mod lease;
mod rate_limit;

pub use accrual::AccrualJob;
pub use catalog::{Catalog, UnknownFeeder};
pub use economy::{Economy, PurchaseError, PurchaseOutcome};
pub use leaderboard::Leaderboard;
pub use lease::LeaseManager;
pub use rate_limit::{RateLimitPolicy, RateLimiter};

use std::time::Duration;

/// How long scores and holdings survive without a write.
pub const RETENTION: Duration = Duration::from_secs(24 * 60 * 60);
