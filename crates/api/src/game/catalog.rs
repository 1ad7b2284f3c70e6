//! Auto-feeder catalog.

use std::collections::BTreeMap;

use shared::api::AutoFeederInfo;

/// A purchasable generator of passive score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoFeederType {
    pub id: u32,
    pub cost: u64,
    pub income_per_minute: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown auto-feeder type {0}")]
pub struct UnknownFeeder(pub u32);

/// Immutable table of auto-feeder tiers, built once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    feeders: BTreeMap<u32, AutoFeederType>,
}

impl Catalog {
    /// The three tiers the game ships with.
    pub fn standard() -> Self {
        Self::new([
            AutoFeederType {
                id: 1,
                cost: 100,
                income_per_minute: 5,
            },
            AutoFeederType {
                id: 2,
                cost: 10_000,
                income_per_minute: 50,
            },
            AutoFeederType {
                id: 3,
                cost: 1_000_000,
                income_per_minute: 500,
            },
        ])
    }

    pub fn new(feeders: impl IntoIterator<Item = AutoFeederType>) -> Self {
        Self {
            feeders: feeders.into_iter().map(|f| (f.id, f)).collect(),
        }
    }

    pub fn get(&self, id: u32) -> Result<&AutoFeederType, UnknownFeeder> {
        self.feeders.get(&id).ok_or(UnknownFeeder(id))
    }

    /// Income per minute of `count` units of feeder `id`.
    pub fn income_for(&self, id: u32, count: i64) -> Option<f64> {
        self.feeders
            .get(&id)
            .map(|f| f.income_per_minute as f64 * count as f64)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AutoFeederType> {
        self.feeders.values()
    }
}

impl From<&AutoFeederType> for AutoFeederInfo {
    fn from(feeder: &AutoFeederType) -> Self {
        Self {
            id: feeder.id,
            cost: feeder.cost,
            income_per_minute: feeder.income_per_minute,
        }
    }
}
