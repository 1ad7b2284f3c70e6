//! Shared store on Redis.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use redis::AsyncCommands;

use super::{
    CollectionTtl, DictionaryFetch, ScoreLookup, ScoredMember, SetIfAbsent, SharedStore, SortOrder,
};

/// Redis implementation of SharedStore.
///
/// Keys are prefixed with a namespace so several games can share one Redis.
/// Writes that also set a TTL run in one `MULTI` block. `PEXPIRE ... NX`
/// needs Redis 7.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    namespace: String,
}

impl RedisStore {
    pub fn new(client: redis::Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }
}

/// Queue a `PEXPIRE` for `key` on `pipe`, only on creation unless refreshing.
fn push_expire(pipe: &mut redis::Pipeline, key: &str, ttl: CollectionTtl) {
    pipe.cmd("PEXPIRE").arg(key).arg(ttl_millis(ttl.ttl));
    if !ttl.refresh_ttl {
        pipe.arg("NX");
    }
    pipe.ignore();
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn health_check(&self) -> Result<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }

    async fn counter_increment(
        &self,
        key: &str,
        field: &str,
        amount: i64,
        ttl: CollectionTtl,
    ) -> Result<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = self.key(key);

        let mut pipe = redis::pipe();
        pipe.atomic().hincr(&key, field, amount);
        push_expire(&mut pipe, &key, ttl);

        let (value,): (i64,) = pipe.query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<SetIfAbsent> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = self.key(key);

        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;

        Ok(match reply {
            Some(_) => SetIfAbsent::Stored,
            None => SetIfAbsent::AlreadyExists,
        })
    }

    async fn sorted_set_increment(
        &self,
        set: &str,
        member: &str,
        amount: f64,
        ttl: CollectionTtl,
    ) -> Result<f64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = self.key(set);

        let mut pipe = redis::pipe();
        pipe.atomic().zincr(&key, member, amount);
        push_expire(&mut pipe, &key, ttl);

        let (score,): (f64,) = pipe.query_async(&mut conn).await?;
        Ok(score)
    }

    async fn sorted_set_get_score(&self, set: &str, member: &str) -> Result<ScoreLookup> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = self.key(set);

        let score: Option<f64> = conn.zscore(&key, member).await?;
        Ok(score.map_or(ScoreLookup::Miss, ScoreLookup::Hit))
    }

    async fn sorted_set_fetch_by_score(
        &self,
        set: &str,
        order: SortOrder,
        limit: Option<usize>,
    ) -> Result<Vec<ScoredMember>> {
        let stop = match limit {
            Some(0) => return Ok(Vec::new()),
            Some(n) => isize::try_from(n).map_or(-1, |n| n - 1),
            None => -1,
        };

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = self.key(set);

        let rows: Vec<(String, f64)> = match order {
            SortOrder::Descending => conn.zrevrange_withscores(&key, 0, stop).await?,
            SortOrder::Ascending => conn.zrange_withscores(&key, 0, stop).await?,
        };

        Ok(rows
            .into_iter()
            .map(|(member, score)| ScoredMember { member, score })
            .collect())
    }

    async fn dictionary_fetch(&self, key: &str) -> Result<DictionaryFetch> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = self.key(key);

        let fields: HashMap<String, String> = conn.hgetall(&key).await?;

        if fields.is_empty() {
            Ok(DictionaryFetch::Miss)
        } else {
            Ok(DictionaryFetch::Hit(fields))
        }
    }
}
