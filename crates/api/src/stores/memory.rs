//! In-process shared store on a `moka` cache.
//!
//! Honours the same per-key atomicity and TTL rules as the Redis store, but
//! only within one process. Useful for running a single replica without
//! Redis and for tests that need real state. Expired keys are evicted by the
//! cache's own housekeeping, whether or not anyone reads them again.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};

use super::{
    CollectionTtl, DictionaryFetch, ScoreLookup, ScoredMember, SetIfAbsent, SharedStore, SortOrder,
};

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Dictionary(HashMap<String, i64>),
    SortedSet(HashMap<String, f64>),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Dictionary(_) => "dictionary",
            Value::SortedSet(_) => "sorted set",
        }
    }
}

/// A cached value with the TTL rule of its last write.
#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    ttl: CollectionTtl,
}

/// Fixed TTLs keep the deadline set at creation; refreshing TTLs restart on
/// every write.
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _at: Instant) -> Option<Duration> {
        Some(entry.ttl.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _at: Instant,
        remaining: Option<Duration>,
    ) -> Option<Duration> {
        if entry.ttl.refresh_ttl || remaining.is_none() {
            Some(entry.ttl.ttl)
        } else {
            remaining
        }
    }
}

/// The entry a compute wrote, or an error if it wrote nothing.
fn written(result: CompResult<String, Entry>) -> Result<Entry> {
    match result {
        CompResult::Inserted(entry) | CompResult::ReplacedWith(entry) => Ok(entry.into_value()),
        _ => bail!("memory store write was not applied"),
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    cache: Cache<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().expire_after(EntryExpiry).build(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn counter_increment(
        &self,
        key: &str,
        field: &str,
        amount: i64,
        ttl: CollectionTtl,
    ) -> Result<i64> {
        let result = self
            .cache
            .entry(key.to_string())
            .and_try_compute_with(|current| async move {
                let mut fields = match current.map(|e| e.into_value().value) {
                    None => HashMap::new(),
                    Some(Value::Dictionary(fields)) => fields,
                    Some(other) => bail!("{key} holds a {}, not a dictionary", other.kind()),
                };

                let counter = fields.entry(field.to_string()).or_insert(0);
                *counter = counter
                    .checked_add(amount)
                    .ok_or_else(|| anyhow!("counter {key}/{field} overflowed"))?;

                Ok::<_, anyhow::Error>(Op::Put(Entry {
                    value: Value::Dictionary(fields),
                    ttl,
                }))
            })
            .await?;

        match written(result)?.value {
            Value::Dictionary(fields) => fields
                .get(field)
                .copied()
                .ok_or_else(|| anyhow!("counter {key}/{field} missing after write")),
            other => bail!("{key} holds a {}, not a dictionary", other.kind()),
        }
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<SetIfAbsent> {
        let entry = self
            .cache
            .entry(key.to_string())
            .or_insert_with(async {
                Entry {
                    value: Value::Text(value.to_string()),
                    ttl: CollectionTtl::fixed(ttl),
                }
            })
            .await;

        Ok(if entry.is_fresh() {
            SetIfAbsent::Stored
        } else {
            SetIfAbsent::AlreadyExists
        })
    }

    async fn sorted_set_increment(
        &self,
        set: &str,
        member: &str,
        amount: f64,
        ttl: CollectionTtl,
    ) -> Result<f64> {
        let result = self
            .cache
            .entry(set.to_string())
            .and_try_compute_with(|current| async move {
                let mut members = match current.map(|e| e.into_value().value) {
                    None => HashMap::new(),
                    Some(Value::SortedSet(members)) => members,
                    Some(other) => bail!("{set} holds a {}, not a sorted set", other.kind()),
                };

                *members.entry(member.to_string()).or_insert(0.0) += amount;

                Ok::<_, anyhow::Error>(Op::Put(Entry {
                    value: Value::SortedSet(members),
                    ttl,
                }))
            })
            .await?;

        match written(result)?.value {
            Value::SortedSet(members) => members
                .get(member)
                .copied()
                .ok_or_else(|| anyhow!("{set}/{member} missing after write")),
            other => bail!("{set} holds a {}, not a sorted set", other.kind()),
        }
    }

    async fn sorted_set_get_score(&self, set: &str, member: &str) -> Result<ScoreLookup> {
        match self.cache.get(set).await.map(|e| e.value) {
            None => Ok(ScoreLookup::Miss),
            Some(Value::SortedSet(members)) => Ok(members
                .get(member)
                .copied()
                .map_or(ScoreLookup::Miss, ScoreLookup::Hit)),
            Some(other) => bail!("{set} holds a {}, not a sorted set", other.kind()),
        }
    }

    async fn sorted_set_fetch_by_score(
        &self,
        set: &str,
        order: SortOrder,
        limit: Option<usize>,
    ) -> Result<Vec<ScoredMember>> {
        let mut members: Vec<ScoredMember> = match self.cache.get(set).await.map(|e| e.value) {
            None => return Ok(Vec::new()),
            Some(Value::SortedSet(members)) => members
                .into_iter()
                .map(|(member, score)| ScoredMember { member, score })
                .collect(),
            Some(other) => bail!("{set} holds a {}, not a sorted set", other.kind()),
        };

        // Ties break on member name, as Redis does.
        members.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.member.cmp(&b.member))
        });
        if order == SortOrder::Descending {
            members.reverse();
        }
        if let Some(limit) = limit {
            members.truncate(limit);
        }

        Ok(members)
    }

    async fn dictionary_fetch(&self, key: &str) -> Result<DictionaryFetch> {
        match self.cache.get(key).await.map(|e| e.value) {
            None => Ok(DictionaryFetch::Miss),
            Some(Value::Dictionary(fields)) => Ok(DictionaryFetch::Hit(
                fields
                    .into_iter()
                    .map(|(field, value)| (field, value.to_string()))
                    .collect(),
            )),
            Some(other) => bail!("{key} holds a {}, not a dictionary", other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: CollectionTtl = CollectionTtl::fixed(Duration::from_secs(60));

    #[tokio::test]
    async fn counter_starts_at_amount() {
        let store = MemoryStore::new();

        let value = store
            .counter_increment("alice-rate-limit", "/game/feed", 1, MINUTE)
            .await
            .unwrap();

        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn counter_accepts_negative_amounts() {
        let store = MemoryStore::new();

        store.counter_increment("k", "1", -100, MINUTE).await.unwrap();
        let value = store.counter_increment("k", "1", -100, MINUTE).await.unwrap();

        assert_eq!(value, -200);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = MemoryStore::new();

        let writes = (0..50).map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.counter_increment("k", "f", 1, MINUTE).await })
        });
        for write in writes.collect::<Vec<_>>() {
            write.await.unwrap().unwrap();
        }

        let DictionaryFetch::Hit(fields) = store.dictionary_fetch("k").await.unwrap() else {
            panic!("expected counter");
        };
        assert_eq!(fields["f"], "50");
    }

    #[tokio::test]
    async fn fixed_ttl_is_not_extended_by_writes() {
        let store = MemoryStore::new();
        let ttl = CollectionTtl::fixed(Duration::from_millis(50));

        store.counter_increment("k", "f", 1, ttl).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        store.counter_increment("k", "f", 1, ttl).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        // The window opened by the first write has closed.
        let value = store.counter_increment("k", "f", 1, ttl).await.unwrap();
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn refreshing_ttl_is_extended_by_writes() {
        let store = MemoryStore::new();
        let ttl = CollectionTtl::refreshing(Duration::from_millis(80));

        store.sorted_set_increment("s", "a", 1.0, ttl).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.sorted_set_increment("s", "a", 1.0, ttl).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let score = store.sorted_set_get_score("s", "a").await.unwrap();
        assert_eq!(score, ScoreLookup::Hit(2.0));
    }

    #[tokio::test]
    async fn expired_keys_are_evicted_without_being_read() {
        let store = MemoryStore::new();
        let ttl = CollectionTtl::fixed(Duration::from_millis(5));

        for i in 0..1000 {
            store
                .counter_increment(&format!("p{i}-rate-limit"), "/game/feed", 1, ttl)
                .await
                .unwrap();
        }
        store.cache.run_pending_tasks().await;
        assert_eq!(store.cache.entry_count(), 1000);

        // Expiry is processed on the cache's timer wheel, which ticks about once a second.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        store.cache.run_pending_tasks().await;

        assert_eq!(store.cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn set_if_absent_expires() {
        let store = MemoryStore::new();
        let ttl = Duration::from_millis(20);

        assert_eq!(
            store.set_if_absent("lease", "a", ttl).await.unwrap(),
            SetIfAbsent::Stored
        );
        assert_eq!(
            store.set_if_absent("lease", "b", ttl).await.unwrap(),
            SetIfAbsent::AlreadyExists
        );

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(
            store.set_if_absent("lease", "c", ttl).await.unwrap(),
            SetIfAbsent::Stored
        );
    }

    #[tokio::test]
    async fn fetch_orders_and_limits() {
        let store = MemoryStore::new();
        let ttl = CollectionTtl::refreshing(Duration::from_secs(60));
        for (member, score) in [("a", 30.0), ("b", 10.0), ("c", 20.0)] {
            store.sorted_set_increment("s", member, score, ttl).await.unwrap();
        }

        let desc = store
            .sorted_set_fetch_by_score("s", SortOrder::Descending, Some(2))
            .await
            .unwrap();
        let asc = store
            .sorted_set_fetch_by_score("s", SortOrder::Ascending, None)
            .await
            .unwrap();

        let names = |m: &[ScoredMember]| m.iter().map(|m| m.member.clone()).collect::<Vec<_>>();
        assert_eq!(names(&desc), ["a", "c"]);
        assert_eq!(names(&asc), ["b", "c", "a"]);
    }

    #[tokio::test]
    async fn missing_dictionary_is_a_miss() {
        let store = MemoryStore::new();

        let fetched = store.dictionary_fetch("nobody-auto-feeders").await.unwrap();

        assert_eq!(fetched, DictionaryFetch::Miss);
    }

    #[tokio::test]
    async fn wrong_type_is_an_error() {
        let store = MemoryStore::new();
        store
            .set_if_absent("k", "v", Duration::from_secs(5))
            .await
            .unwrap();

        assert!(store.dictionary_fetch("k").await.is_err());
        assert!(store.counter_increment("k", "f", 1, MINUTE).await.is_err());
    }
}
