//! Non-blocking, TTL-bounded lease over the shared store.
//!
//! Acquiring is an insert-if-absent; whoever creates the key holds the
//! lease until it expires. There is no release: expiry is the only way a
//! lease ends. A holder whose work outlives the TTL no longer excludes
//! anyone, so jobs guarded by a lease run at most once per TTL in the
//! common case, not exactly once.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::stores::{SetIfAbsent, SharedStore};

/// Proof that this caller created the lease key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub key: String,
    pub token: Uuid,
    /// When the store drops the key. Best effort: measured from our clock
    /// before the round-trip.
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct LeaseManager {
    store: Arc<dyn SharedStore>,
}

impl LeaseManager {
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self { store }
    }

    /// Try once to take the lease at `key`. Returns `None` if someone else
    /// holds it.
    pub async fn try_acquire(
        &self,
        key: &str,
        token: Uuid,
        ttl: Duration,
    ) -> Result<Option<Lease>> {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        match self
            .store
            .set_if_absent(key, &token.to_string(), ttl)
            .await?
        {
            SetIfAbsent::Stored => Ok(Some(Lease {
                key: key.to_string(),
                token,
                expires_at,
            })),
            SetIfAbsent::AlreadyExists => Ok(None),
        }
    }
}
