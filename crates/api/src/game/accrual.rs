//! Periodic passive income.
//!
//! Every replica runs the scheduler. On each tick a replica tries to take the
//! accrual lease; the one that gets it walks the leaderboard and credits each
//! player `income_per_minute * count` for every auto-feeder tier they own.
//! The others skip the tick. Failures for one player or tier are logged and
//! skipped, never aborting the rest of the tick.
//!
//! ```text
//! Idle -> try_acquire -> Skipped -> Idle
//!                     -> Running -> Idle
//! ```

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use super::{Economy, Leaderboard, LeaseManager};

pub const LEASE_KEY: &str = "auto-feeder-lease";

/// What one completed tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Players in the leaderboard snapshot.
    pub players: usize,
    /// Players who received at least one credit.
    pub credited_players: usize,
    /// Total score credited across all players.
    pub credited: f64,
    /// Holdings fetches, unknown tiers and increments that were skipped.
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Another holder has the lease, or it could not be checked.
    Skipped,
    Completed(TickReport),
}

#[derive(Clone)]
pub struct AccrualJob {
    leaderboard: Leaderboard,
    economy: Economy,
    leases: LeaseManager,
    lease_ttl: Duration,
}

impl AccrualJob {
    pub fn new(
        leaderboard: Leaderboard,
        economy: Economy,
        leases: LeaseManager,
        lease_ttl: Duration,
    ) -> Self {
        Self {
            leaderboard,
            economy,
            leases,
            lease_ttl,
        }
    }

    /// Run one accrual tick. Safe to call from every replica on every timer
    /// fire; only the lease holder does any work.
    pub async fn run_tick(&self) -> TickOutcome {
        let lease = match self
            .leases
            .try_acquire(LEASE_KEY, Uuid::new_v4(), self.lease_ttl)
            .await
        {
            Ok(Some(lease)) => lease,
            Ok(None) => {
                tracing::info!("did not obtain lease, skipping auto-feeder run");
                return TickOutcome::Skipped;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to request auto-feeder lease");
                return TickOutcome::Skipped;
            }
        };
        tracing::debug!(
            key = %lease.key,
            token = %lease.token,
            expires_at = %lease.expires_at,
            "auto-feeder lease acquired"
        );

        let players = match self.leaderboard.all_players().await {
            Ok(players) => players,
            Err(err) => {
                tracing::error!(error = %err, "failed to fetch score board for auto-feeder run");
                return TickOutcome::Completed(TickReport::default());
            }
        };

        let mut report = TickReport {
            players: players.len(),
            ..TickReport::default()
        };
        for player in &players {
            self.credit(&player.member, &mut report).await;
        }

        tracing::info!(
            players = report.players,
            credited_players = report.credited_players,
            credited = report.credited,
            failures = report.failures,
            "auto-feeder run complete"
        );
        TickOutcome::Completed(report)
    }

    async fn credit(&self, player: &str, report: &mut TickReport) {
        let holdings = match self.economy.holdings(player).await {
            Ok(holdings) => holdings,
            Err(err) => {
                tracing::warn!(
                    player,
                    error = %err,
                    "failed to fetch auto-feeders, skipping player"
                );
                report.failures += 1;
                return;
            }
        };
        if holdings.is_empty() {
            return;
        }

        let mut credited = false;
        for (feeder_id, count) in holdings.iter().filter(|(_, count)| *count > 0) {
            let Some(amount) = self.economy.catalog().income_for(feeder_id, count) else {
                tracing::warn!(
                    player,
                    feeder = feeder_id,
                    "player owns unknown auto-feeder type"
                );
                report.failures += 1;
                continue;
            };

            match self.leaderboard.increment(player, amount).await {
                Ok(score) => {
                    tracing::debug!(
                        player,
                        feeder = feeder_id,
                        count,
                        amount,
                        score,
                        "credited auto-feeder income"
                    );
                    report.credited += amount;
                    credited = true;
                }
                Err(err) => {
                    tracing::warn!(
                        player,
                        feeder = feeder_id,
                        error = %err,
                        "failed to credit auto-feeder income"
                    );
                    report.failures += 1;
                }
            }
        }

        if credited {
            report.credited_players += 1;
        }
    }
}

/// Run `job` every `every` until `shutdown` fires or its sender is dropped.
///
/// The first tick runs immediately. Ticks missed while one is running are
/// skipped. Shutdown is only observed between ticks.
pub fn spawn(
    job: AccrualJob,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(every = ?every, "auto-feeder scheduler started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    job.run_tick().await;
                }
                _ = shutdown.changed() => break,
            }
        }
        tracing::info!("auto-feeder scheduler stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Catalog, RETENTION};
    use crate::stores::{
        CollectionTtl, DictionaryFetch, MemoryStore, MockSharedStore, ScoredMember, SetIfAbsent,
        SharedStore,
    };
    use std::collections::HashMap;
    use std::sync::Arc;

    const LEASE_TTL: Duration = Duration::from_secs(5);
    const RETAINED: CollectionTtl = CollectionTtl::refreshing(RETENTION);

    fn job(store: Arc<dyn SharedStore>, lease_ttl: Duration) -> AccrualJob {
        let leaderboard = Leaderboard::new(store.clone(), 10_000);
        let economy = Economy::new(
            store.clone(),
            leaderboard.clone(),
            Arc::new(Catalog::standard()),
        );
        AccrualJob::new(leaderboard, economy, LeaseManager::new(store), lease_ttl)
    }

    async fn give(store: &MemoryStore, player: &str, feeder: &str, count: i64) {
        store
            .counter_increment(&Economy::holdings_key(player), feeder, count, RETAINED)
            .await
            .unwrap();
    }

    async fn score(store: &MemoryStore, player: &str) -> Option<f64> {
        store
            .sorted_set_get_score("score-board", player)
            .await
            .unwrap()
            .score()
    }

    #[tokio::test]
    async fn tick_credits_income_for_every_owned_tier() {
        let store = Arc::new(MemoryStore::new());
        store
            .sorted_set_increment("score-board", "alice", 1000.0, RETAINED)
            .await
            .unwrap();
        give(&store, "alice", "1", 2).await;
        give(&store, "alice", "2", 1).await;

        let outcome = job(store.clone(), LEASE_TTL).run_tick().await;

        assert_eq!(
            outcome,
            TickOutcome::Completed(TickReport {
                players: 1,
                credited_players: 1,
                credited: 60.0,
                failures: 0,
            })
        );
        assert_eq!(score(&store, "alice").await, Some(1060.0));
    }

    #[tokio::test]
    async fn players_without_feeders_are_left_alone() {
        let store = Arc::new(MemoryStore::new());
        store
            .sorted_set_increment("score-board", "bob", 7.0, RETAINED)
            .await
            .unwrap();

        let outcome = job(store.clone(), LEASE_TTL).run_tick().await;

        let TickOutcome::Completed(report) = outcome else {
            panic!("expected a completed tick");
        };
        assert_eq!(report.players, 1);
        assert_eq!(report.credited_players, 0);
        assert_eq!(score(&store, "bob").await, Some(7.0));
    }

    #[tokio::test]
    async fn tick_is_skipped_while_lease_is_held() {
        let store = Arc::new(MemoryStore::new());
        store
            .sorted_set_increment("score-board", "alice", 0.0, RETAINED)
            .await
            .unwrap();
        give(&store, "alice", "1", 1).await;
        let job = job(store.clone(), LEASE_TTL);

        let first = job.run_tick().await;
        let second = job.run_tick().await;

        assert!(matches!(first, TickOutcome::Completed(_)));
        assert_eq!(second, TickOutcome::Skipped);
        assert_eq!(score(&store, "alice").await, Some(5.0));
    }

    #[tokio::test]
    async fn ticks_resume_once_the_lease_expires() {
        let store = Arc::new(MemoryStore::new());
        store
            .sorted_set_increment("score-board", "alice", 0.0, RETAINED)
            .await
            .unwrap();
        give(&store, "alice", "1", 1).await;
        let job = job(store.clone(), Duration::from_millis(20));

        job.run_tick().await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        let second = job.run_tick().await;

        assert!(matches!(second, TickOutcome::Completed(_)));
        assert_eq!(score(&store, "alice").await, Some(10.0));
    }

    #[tokio::test]
    async fn lease_error_skips_tick() {
        let mut store = MockSharedStore::new();
        store
            .expect_set_if_absent()
            .returning(|_, _, _| Err(anyhow::anyhow!("connection refused")));
        store.expect_sorted_set_fetch_by_score().never();

        let outcome = job(Arc::new(store), LEASE_TTL).run_tick().await;

        assert_eq!(outcome, TickOutcome::Skipped);
    }

    #[tokio::test]
    async fn failed_holdings_fetch_does_not_block_other_players() {
        let mut store = MockSharedStore::new();
        store
            .expect_set_if_absent()
            .returning(|_, _, _| Ok(SetIfAbsent::Stored));
        store.expect_sorted_set_fetch_by_score().returning(|_, _, _| {
            Ok(vec![
                ScoredMember {
                    member: "alice".to_string(),
                    score: 500.0,
                },
                ScoredMember {
                    member: "bob".to_string(),
                    score: 200.0,
                },
            ])
        });
        store
            .expect_dictionary_fetch()
            .withf(|key| key == "alice-auto-feeders")
            .returning(|_| Err(anyhow::anyhow!("timeout")));
        store
            .expect_dictionary_fetch()
            .withf(|key| key == "bob-auto-feeders")
            .returning(|_| {
                Ok(DictionaryFetch::Hit(HashMap::from([(
                    "1".to_string(),
                    "3".to_string(),
                )])))
            });
        store
            .expect_sorted_set_increment()
            .withf(|set, member, amount, _| {
                set == "score-board" && member == "bob" && *amount == 15.0
            })
            .times(1)
            .returning(|_, _, amount, _| Ok(200.0 + amount));

        let outcome = job(Arc::new(store), LEASE_TTL).run_tick().await;

        assert_eq!(
            outcome,
            TickOutcome::Completed(TickReport {
                players: 2,
                credited_players: 1,
                credited: 15.0,
                failures: 1,
            })
        );
    }

    #[tokio::test]
    async fn failed_increment_does_not_block_other_tiers() {
        let mut store = MockSharedStore::new();
        store
            .expect_set_if_absent()
            .returning(|_, _, _| Ok(SetIfAbsent::Stored));
        store.expect_sorted_set_fetch_by_score().returning(|_, _, _| {
            Ok(vec![ScoredMember {
                member: "alice".to_string(),
                score: 0.0,
            }])
        });
        store.expect_dictionary_fetch().returning(|_| {
            Ok(DictionaryFetch::Hit(HashMap::from([
                ("1".to_string(), "1".to_string()),
                ("3".to_string(), "1".to_string()),
            ])))
        });
        store
            .expect_sorted_set_increment()
            .withf(|_, _, amount, _| *amount == 5.0)
            .returning(|_, _, _, _| Err(anyhow::anyhow!("timeout")));
        store
            .expect_sorted_set_increment()
            .withf(|_, _, amount, _| *amount == 500.0)
            .times(1)
            .returning(|_, _, amount, _| Ok(amount));

        let outcome = job(Arc::new(store), LEASE_TTL).run_tick().await;

        let TickOutcome::Completed(report) = outcome else {
            panic!("expected a completed tick");
        };
        assert_eq!(report.credited, 500.0);
        assert_eq!(report.failures, 1);
    }

    #[tokio::test]
    async fn unknown_tiers_in_holdings_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        store
            .sorted_set_increment("score-board", "alice", 0.0, RETAINED)
            .await
            .unwrap();
        give(&store, "alice", "9", 4).await;
        give(&store, "alice", "1", 1).await;

        let outcome = job(store.clone(), LEASE_TTL).run_tick().await;

        let TickOutcome::Completed(report) = outcome else {
            panic!("expected a completed tick");
        };
        assert_eq!(report.failures, 1);
        assert_eq!(score(&store, "alice").await, Some(5.0));
    }

    #[tokio::test]
    async fn scheduler_ticks_until_shutdown() {
        let store = Arc::new(MemoryStore::new());
        store
            .sorted_set_increment("score-board", "alice", 0.0, RETAINED)
            .await
            .unwrap();
        give(&store, "alice", "1", 1).await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = spawn(
            job(store.clone(), LEASE_TTL),
            Duration::from_millis(10),
            shutdown_rx,
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        // Later ticks found the lease still held.
        assert_eq!(score(&store, "alice").await, Some(5.0));
    }
}
