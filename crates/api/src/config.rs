use std::time::Duration;

use anyhow::{Result, anyhow};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::game::RateLimitPolicy;

/// Server configuration, read from `FEEDER_*` environment variables.
///
/// Timing and limit settings must be non-zero; call [`Config::from_env`] to
/// get a validated value.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Config {
    #[serde(default = "default_host")]
    #[garde(skip)]
    pub host: String,
    #[serde(default = "default_port")]
    #[garde(skip)]
    pub port: u16,
    /// `redis://...` for a shared Redis, `memory://` for a single in-process replica.
    #[garde(length(min = 1))]
    pub store_url: String,
    /// Prefix for every key this game writes to the store.
    #[serde(default = "default_namespace")]
    #[garde(length(min = 1))]
    pub namespace: String,
    /// Set to "production" for JSON logging, anything else for human-readable.
    #[serde(default)]
    #[garde(skip)]
    pub env: String,
    /// Sentry DSN for error tracking
    #[serde(default)]
    #[garde(skip)]
    pub sentry_dsn: Option<String>,

    /// Manual feeds allowed per player per minute.
    #[serde(default = "default_max_feeds_per_minute")]
    #[garde(range(min = 1))]
    pub max_feeds_per_minute: i64,
    /// Allow actions through when the rate limit counter cannot be read.
    #[serde(default = "default_true")]
    #[garde(skip)]
    pub rate_limit_fail_open: bool,
    /// Rows returned by the leaderboard endpoint.
    #[serde(default = "default_leaderboard_fetch_count")]
    #[garde(range(min = 1))]
    pub leaderboard_fetch_count: usize,

    #[serde(default = "default_true")]
    #[garde(skip)]
    pub scheduler_enabled: bool,
    #[serde(default = "default_accrual_interval_secs")]
    #[garde(range(min = 1))]
    pub accrual_interval_secs: u64,
    #[serde(default = "default_accrual_lease_ttl_secs")]
    #[garde(range(min = 1))]
    pub accrual_lease_ttl_secs: u64,
    /// Most players visited by one accrual tick.
    #[serde(default = "default_accrual_snapshot_limit")]
    #[garde(range(min = 1))]
    pub accrual_snapshot_limit: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

fn default_namespace() -> String {
    "default-cache".into()
}

fn default_true() -> bool {
    true
}

fn default_max_feeds_per_minute() -> i64 {
    60
}

fn default_leaderboard_fetch_count() -> usize {
    100
}

fn default_accrual_interval_secs() -> u64 {
    60
}

fn default_accrual_lease_ttl_secs() -> u64 {
    5
}

fn default_accrual_snapshot_limit() -> usize {
    10_000
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        let config: Config = envy::prefixed("FEEDER_").from_iter(vars)?;
        config
            .validate()
            .map_err(|e| anyhow!("invalid configuration: {e}"))?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    pub fn is_memory_store(&self) -> bool {
        self.store_url.starts_with("memory://")
    }

    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            max_per_window: self.max_feeds_per_minute,
            window: Duration::from_secs(60),
            fail_open: self.rate_limit_fail_open,
        }
    }

    pub fn accrual_interval(&self) -> Duration {
        Duration::from_secs(self.accrual_interval_secs)
    }

    pub fn accrual_lease_ttl(&self) -> Duration {
        Duration::from_secs(self.accrual_lease_ttl_secs)
    }
}
