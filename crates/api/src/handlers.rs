//! HTTP handlers.
//!
//! - **game** - clicks, auto-feeder purchases, leaderboard and player lookups
//! - **health** - store reachability for load balancers

pub mod game;
pub mod health;
