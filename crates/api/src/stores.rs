//! Shared store client.
//!
//! The game keeps no state in-process. Every score, holding, rate-limit
//! counter and lease lives in a shared keyed store so that any number of
//! server replicas can serve players concurrently. Components only rely on
//! the primitives of [`SharedStore`]: counter increment with TTL, insert if
//! absent with TTL, and sorted-set increment/get/range.
//!
//! ## Stores
//!
//! - **redis_store** - Redis implementation (production)
//! - **memory** - In-process implementation (`memory://`, local play and tests)
//!
//! ## Key Patterns
//!
//! ```text
//! score-board                 → Sorted set of player → score (24h TTL, refreshed)
//! {player}-auto-feeders       → Dictionary feeder id → owned count (24h TTL, refreshed)
//! {player}-spent              → Dictionary feeder id → negative spent total (24h TTL, refreshed)
//! {player}-rate-limit         → Dictionary action → count (60s TTL, fixed)
//! auto-feeder-lease           → Accrual lease token (5s TTL)
//! ```

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

/// TTL applied to a collection (dictionary or sorted set) on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionTtl {
    pub ttl: Duration,
    /// Reset the TTL on every write. When false the TTL is only set when the
    /// collection has none, i.e. when it is created.
    pub refresh_ttl: bool,
}

impl CollectionTtl {
    pub const fn refreshing(ttl: Duration) -> Self {
        Self {
            ttl,
            refresh_ttl: true,
        }
    }

    pub const fn fixed(ttl: Duration) -> Self {
        Self {
            ttl,
            refresh_ttl: false,
        }
    }
}

/// Order for sorted-set range fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Outcome of an insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetIfAbsent {
    Stored,
    AlreadyExists,
}

/// Outcome of a sorted-set score lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreLookup {
    Hit(f64),
    Miss,
}

impl ScoreLookup {
    pub fn score(self) -> Option<f64> {
        match self {
            ScoreLookup::Hit(score) => Some(score),
            ScoreLookup::Miss => None,
        }
    }
}

/// Outcome of a dictionary fetch. Field values are returned as stored strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictionaryFetch {
    Hit(HashMap<String, String>),
    Miss,
}

/// A sorted-set member with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    pub member: String,
    pub score: f64,
}

/// Atomic primitives the game engine needs from the shared store.
///
/// Each call is a single round-trip and is linearizable per key. Nothing is
/// ordered across keys.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Health check - verify store connectivity.
    async fn health_check(&self) -> Result<bool>;

    /// Add `amount` to `field` of the dictionary at `key`, creating both at 0
    /// if absent. Returns the new value.
    async fn counter_increment(
        &self,
        key: &str,
        field: &str,
        amount: i64,
        ttl: CollectionTtl,
    ) -> Result<i64>;

    /// Store `value` at `key` only if nothing is stored there.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<SetIfAbsent>;

    /// Add `amount` to the score of `member`, inserting it at 0 if absent.
    /// Returns the new score.
    async fn sorted_set_increment(
        &self,
        set: &str,
        member: &str,
        amount: f64,
        ttl: CollectionTtl,
    ) -> Result<f64>;

    /// Point lookup of a member's score. Does not touch the TTL.
    async fn sorted_set_get_score(&self, set: &str, member: &str) -> Result<ScoreLookup>;

    /// Members ordered by score, at most `limit` of them (all if `None`).
    async fn sorted_set_fetch_by_score(
        &self,
        set: &str,
        order: SortOrder,
        limit: Option<usize>,
    ) -> Result<Vec<ScoredMember>>;

    /// All fields of the dictionary at `key`.
    async fn dictionary_fetch(&self, key: &str) -> Result<DictionaryFetch>;
}
