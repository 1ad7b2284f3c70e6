//! Global score ranking on a shared sorted set.

use std::sync::Arc;

use anyhow::Result;

use super::RETENTION;
use crate::stores::{CollectionTtl, ScoredMember, SharedStore, SortOrder};

const SCORE_BOARD: &str = "score-board";

/// A leaderboard row. Rank is the 1-based position in fetch order.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub rank: usize,
    pub player: String,
    pub score: f64,
}

#[derive(Clone)]
pub struct Leaderboard {
    store: Arc<dyn SharedStore>,
    /// Cap on the snapshot taken by [`Leaderboard::all_players`].
    snapshot_limit: usize,
}

impl Leaderboard {
    pub fn new(store: Arc<dyn SharedStore>, snapshot_limit: usize) -> Self {
        Self {
            store,
            snapshot_limit,
        }
    }

    /// Add `amount` to a player's score, creating the entry at 0 if needed,
    /// and push the board's expiry out to a full retention window.
    pub async fn increment(&self, player: &str, amount: f64) -> Result<f64> {
        self.store
            .sorted_set_increment(
                SCORE_BOARD,
                player,
                amount,
                CollectionTtl::refreshing(RETENTION),
            )
            .await
    }

    pub async fn score(&self, player: &str) -> Result<Option<f64>> {
        let lookup = self
            .store
            .sorted_set_get_score(SCORE_BOARD, player)
            .await?;
        Ok(lookup.score())
    }

    pub async fn top(&self, n: usize, order: SortOrder) -> Result<Vec<RankedEntry>> {
        let members = self
            .store
            .sorted_set_fetch_by_score(SCORE_BOARD, order, Some(n))
            .await?;

        Ok(members
            .into_iter()
            .enumerate()
            .map(|(i, m)| RankedEntry {
                rank: i + 1,
                player: m.member,
                score: m.score,
            })
            .collect())
    }

    /// Snapshot of every player on the board, best first.
    ///
    /// The snapshot is capped at `snapshot_limit` entries and is not paged
    /// past that; players beyond the cap are not visited by accrual.
    pub async fn all_players(&self) -> Result<Vec<ScoredMember>> {
        self.store
            .sorted_set_fetch_by_score(
                SCORE_BOARD,
                SortOrder::Descending,
                Some(self.snapshot_limit),
            )
            .await
    }
}
