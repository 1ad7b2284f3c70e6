//! Shared API request/response types used by both CLI and game server.

use std::collections::BTreeMap;

use garde::Validate;
use serde::{Deserialize, Serialize};

/// Longest player name the server accepts.
pub const MAX_PLAYER_NAME_LEN: usize = 64;

/// A manual click on the feed button.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FeedPayload {
    #[garde(length(min = 1, max = MAX_PLAYER_NAME_LEN))]
    pub user: String,
}

/// Score after a successful click.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedResponse {
    pub score: f64,
}

/// Request to build an auto-feeder of the given catalog tier.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BuildAutoFeederPayload {
    #[garde(length(min = 1, max = MAX_PLAYER_NAME_LEN))]
    pub user: String,
    /// Catalog id of the auto-feeder. Unknown ids are rejected by the server.
    #[serde(rename = "type")]
    #[garde(skip)]
    pub feeder_type: u32,
}

/// Result of a build request. Not having enough score is a normal outcome,
/// reported with `purchased: false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildAutoFeederResponse {
    pub purchased: bool,
    #[serde(rename = "type")]
    pub feeder_type: u32,
    pub cost: u64,
    /// Player score seen when the purchase was checked.
    pub score: f64,
    /// Units of this tier owned after the purchase. Absent when nothing was bought.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned: Option<i64>,
    /// Total score spent on this tier so far. Absent when nothing was bought.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spent: Option<i64>,
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBoardEntry {
    pub rank: usize,
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreBoardResponse {
    pub elements: Vec<ScoreBoardEntry>,
}

/// A purchasable auto-feeder tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoFeederInfo {
    pub id: u32,
    pub cost: u64,
    pub income_per_minute: u64,
}

/// A player's current standing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerResponse {
    pub name: String,
    /// Absent if the player has never clicked or their entry expired.
    pub score: Option<f64>,
    /// Owned auto-feeders keyed by catalog id.
    pub auto_feeders: BTreeMap<u32, i64>,
}
