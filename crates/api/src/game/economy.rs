//! Auto-feeder purchases and per-player holdings.
//!
//! A purchase is gated on the player's live leaderboard score but the cost
//! is not subtracted from that score. It is recorded in a separate spend
//! ledger (`{player}-spent`), and the owned count is bumped in the holdings
//! dictionary (`{player}-auto-feeders`). The two writes are independent
//! atomic increments with no transaction around them, so concurrent
//! purchases by one player can each pass the score check and all succeed.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};

use super::{Catalog, Leaderboard, RETENTION, UnknownFeeder};
use crate::stores::{CollectionTtl, DictionaryFetch, SharedStore};

/// Owned auto-feeder counts keyed by catalog id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Holdings(BTreeMap<u32, i64>);

impl Holdings {
    /// Parse a stored holdings dictionary. Fields that are not a feeder id
    /// with an integer count are dropped with a warning.
    pub fn from_fields<'a>(
        player: &str,
        fields: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Self {
        let mut counts = BTreeMap::new();

        for (field, value) in fields {
            match (field.parse::<u32>(), value.parse::<i64>()) {
                (Ok(id), Ok(count)) => {
                    counts.insert(id, count);
                }
                _ => {
                    tracing::warn!(
                        player,
                        field = %field,
                        value = %value,
                        "ignoring malformed holdings field"
                    );
                }
            }
        }

        Self(counts)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, i64)> + '_ {
        self.0.iter().map(|(id, count)| (*id, *count))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<u32, i64> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Purchased {
        feeder_id: u32,
        cost: u64,
        /// Score the purchase was checked against.
        score: f64,
        /// Units of this tier owned after the purchase.
        owned: i64,
        /// Cumulative spend on this tier as recorded in the ledger (negative).
        spent: i64,
    },
    InsufficientScore {
        feeder_id: u32,
        cost: u64,
        score: f64,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    #[error(transparent)]
    UnknownFeeder(#[from] UnknownFeeder),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct Economy {
    store: Arc<dyn SharedStore>,
    leaderboard: Leaderboard,
    catalog: Arc<Catalog>,
}

impl Economy {
    pub fn new(
        store: Arc<dyn SharedStore>,
        leaderboard: Leaderboard,
        catalog: Arc<Catalog>,
    ) -> Self {
        Self {
            store,
            leaderboard,
            catalog,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn holdings_key(player: &str) -> String {
        format!("{}-auto-feeders", player)
    }

    fn ledger_key(player: &str) -> String {
        format!("{}-spent", player)
    }

    pub async fn purchase(
        &self,
        player: &str,
        feeder_id: u32,
    ) -> Result<PurchaseOutcome, PurchaseError> {
        let feeder = *self.catalog.get(feeder_id)?;
        let score = self.leaderboard.score(player).await?.unwrap_or(0.0);

        if score < feeder.cost as f64 {
            tracing::debug!(
                player,
                feeder = feeder_id,
                score,
                cost = feeder.cost,
                "not enough score for auto-feeder"
            );
            return Ok(PurchaseOutcome::InsufficientScore {
                feeder_id,
                cost: feeder.cost,
                score,
            });
        }

        let cost = i64::try_from(feeder.cost)
            .map_err(|_| anyhow!("cost of feeder {feeder_id} does not fit a counter"))?;
        let field = feeder_id.to_string();
        let ttl = CollectionTtl::refreshing(RETENTION);

        let spent = self
            .store
            .counter_increment(&Self::ledger_key(player), &field, -cost, ttl)
            .await?;
        let owned = self
            .store
            .counter_increment(&Self::holdings_key(player), &field, 1, ttl)
            .await?;

        tracing::info!(player, feeder = feeder_id, owned, spent, "auto-feeder purchased");

        Ok(PurchaseOutcome::Purchased {
            feeder_id,
            cost: feeder.cost,
            score,
            owned,
            spent,
        })
    }

    pub async fn holdings(&self, player: &str) -> Result<Holdings> {
        match self.store.dictionary_fetch(&Self::holdings_key(player)).await? {
            DictionaryFetch::Hit(fields) => Ok(Holdings::from_fields(player, &fields)),
            DictionaryFetch::Miss => Ok(Holdings::default()),
        }
    }
}
