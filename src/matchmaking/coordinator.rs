//! Matchmaking coordinator
//!
//! Orchestrates join/leave/status against the waiting pool and the match
//! record store. A player moves `Unregistered -> Waiting -> Matched ->
//! Finished`; every join starts a new cycle with a fresh record, discarding
//! the opponent link, score and finished flag of the previous one.
//!
//! Pairing order of effects, all under the join lock:
//! 1. write the joiner's fresh record,
//! 2. pair with the pool head or start waiting (one pool lock),
//! 3. link both records in one atomic store update.
//!
//! Because the joiner's record exists before it can be seen in the pool, a
//! later joiner that pops it always finds a record to link against. The join
//! lock keeps a re-join's record reset and its pool step together, so a
//! concurrent joiner can never pop the old standing in between.

use crate::error::{MatchmakingError, Result};
use crate::matchmaking::pool::WaitingPool;
use crate::metrics::MetricsCollector;
use crate::round::RoundContentGenerator;
use crate::store::MatchRecordStore;
use crate::types::{JoinOutcome, MatchStatus, PlayerId, PlayerPhase, RoundContent, StatusMode};
use crate::utils::validate_player_id;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, warn};

/// Statistics about coordinator operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorStats {
    /// Players currently in the waiting pool
    pub players_waiting: usize,
    /// Match records currently stored
    pub match_records: usize,
    /// Successful join requests
    pub joins: u64,
    /// Pairings completed
    pub pairings: u64,
    /// Players removed from the pool by leave requests
    pub leaves: u64,
    /// Round content batches generated
    pub rounds_generated: u64,
}

/// The matchmaking coordinator
#[derive(Clone)]
pub struct MatchmakingCoordinator {
    /// Players waiting for an opponent
    pool: Arc<WaitingPool>,
    /// Durable per-player records
    store: Arc<dyn MatchRecordStore>,
    /// Round content source
    generator: Arc<RoundContentGenerator>,
    /// Current round content, replaced whole on regeneration
    current_round: Arc<RwLock<Option<Arc<RoundContent>>>>,
    /// How status polls decide pairing
    status_mode: StatusMode,
    /// Operation counters
    stats: Arc<RwLock<CoordinatorStats>>,
    /// Metrics collector for recording performance data
    metrics_collector: Arc<MetricsCollector>,
    /// Serializes joins from record reset through the pairing write
    join_lock: Arc<tokio::sync::Mutex<()>>,
}

impl MatchmakingCoordinator {
    /// Create a coordinator with an empty pool and its own metrics collector
    pub fn new(
        store: Arc<dyn MatchRecordStore>,
        generator: Arc<RoundContentGenerator>,
    ) -> Result<Self> {
        let metrics_collector = Arc::new(MetricsCollector::new()?);
        Ok(Self::with_metrics(store, generator, metrics_collector))
    }

    /// Create a coordinator that records into the given metrics collector
    pub fn with_metrics(
        store: Arc<dyn MatchRecordStore>,
        generator: Arc<RoundContentGenerator>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            pool: Arc::new(WaitingPool::new()),
            store,
            generator,
            current_round: Arc::new(RwLock::new(None)),
            status_mode: StatusMode::default(),
            stats: Arc::new(RwLock::new(CoordinatorStats::default())),
            metrics_collector,
            join_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Use the given status semantics
    pub fn with_status_mode(mut self, status_mode: StatusMode) -> Self {
        self.status_mode = status_mode;
        self
    }

    /// Use an externally owned waiting pool
    pub fn with_pool(mut self, pool: Arc<WaitingPool>) -> Self {
        self.pool = pool;
        self
    }

    pub fn store(&self) -> Arc<dyn MatchRecordStore> {
        self.store.clone()
    }

    pub fn pool(&self) -> Arc<WaitingPool> {
        self.pool.clone()
    }

    pub fn status_mode(&self) -> StatusMode {
        self.status_mode
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    /// Join matchmaking with a caller-supplied player id
    pub async fn join(&self, player_id: PlayerId) -> Result<JoinOutcome> {
        let timer = self.metrics_collector.start_timer();
        info!("Processing join request - player_id: {}", player_id);

        let result = async {
            validate_player_id(player_id)?;
            let _guard = self.join_lock.lock().await;
            self.store.put_fresh(player_id).await?;
            self.enter_pool(player_id).await
        }
        .await;

        self.record_join_result(player_id, &result, timer.stop());
        result
    }

    /// Join matchmaking with a server-assigned player id
    pub async fn join_new(&self) -> Result<JoinOutcome> {
        let timer = self.metrics_collector.start_timer();
        let _guard = self.join_lock.lock().await;

        let record = self.store.allocate_fresh().await?;
        info!(
            "Processing join request - assigned player_id: {}",
            record.player_id
        );

        let result = self.enter_pool(record.player_id).await;
        self.record_join_result(record.player_id, &result, timer.stop());
        result
    }

    async fn enter_pool(&self, player_id: PlayerId) -> Result<JoinOutcome> {
        match self.pool.pair_or_enqueue(player_id)? {
            None => {
                if let Err(e) = self.regenerate_round() {
                    return self.withdraw_after_failed_round(player_id, e);
                }

                info!("Player {} is waiting for an opponent", player_id);
                Ok(JoinOutcome::waiting(player_id))
            }
            Some(opponent_id) => {
                if let Err(e) = self.store.pair(player_id, opponent_id).await {
                    return Err(self.recover_failed_pairing(player_id, opponent_id, e));
                }

                self.update_stats(|stats| stats.pairings += 1)?;
                info!("Paired player {} with waiting player {}", player_id, opponent_id);
                Ok(JoinOutcome::paired(player_id, opponent_id))
            }
        }
    }

    /// Take the joiner back out of the pool when no round content could be made
    fn withdraw_after_failed_round(
        &self,
        player_id: PlayerId,
        cause: anyhow::Error,
    ) -> Result<JoinOutcome> {
        error!(
            "Round content generation failed while player {} started waiting: {}",
            player_id, cause
        );

        match self.pool.remove(player_id) {
            Ok(()) => Err(cause),
            Err(_) => {
                // A concurrent leave already took this player out of the pool
                warn!(
                    "Player {} left the pool before it could be withdrawn",
                    player_id
                );
                Err(cause)
            }
        }
    }

    /// Undo the pool pop after the pairing write failed.
    ///
    /// Stores commit a pairing all or nothing, so neither record was changed.
    fn recover_failed_pairing(
        &self,
        player_id: PlayerId,
        opponent_id: PlayerId,
        cause: anyhow::Error,
    ) -> anyhow::Error {
        let opponent_missing = matches!(
            cause.downcast_ref::<MatchmakingError>(),
            Some(MatchmakingError::PlayerNotFound { player_id: missing }) if *missing == opponent_id
        );

        if opponent_missing {
            warn!(
                "Dropped pool entry {} with no match record while pairing player {}",
                opponent_id, player_id
            );
            return MatchmakingError::InternalError {
                message: format!(
                    "Waiting player {} had no match record; join again to be paired",
                    opponent_id
                ),
            }
            .into();
        }

        error!(
            "Pairing write failed for players {} and {}: {}",
            player_id, opponent_id, cause
        );
        if let Err(e) = self.pool.requeue_front(opponent_id) {
            error!("Failed to restore player {} to the pool: {}", opponent_id, e);
        }
        cause
    }

    fn record_join_result(
        &self,
        player_id: PlayerId,
        result: &Result<JoinOutcome>,
        duration: std::time::Duration,
    ) {
        let outcome = match result {
            Ok(outcome) if outcome.paired => "paired",
            Ok(_) => "waiting",
            Err(_) => "error",
        };

        if result.is_ok() {
            if let Err(e) = self.update_stats(|stats| stats.joins += 1) {
                warn!("Failed to update join stats: {}", e);
            }
        }

        self.metrics_collector.record_join(outcome, duration);
        if let Ok(waiting) = self.pool.len() {
            self.metrics_collector.set_players_waiting(waiting);
        }

        info!(
            "Join completed - player_id: {}, outcome: {}, duration: {:.2}ms",
            player_id,
            outcome,
            duration.as_secs_f64() * 1000.0
        );
    }

    /// Report whether a player has been paired, and with whom
    pub async fn status(&self, player_id: PlayerId) -> Result<MatchStatus> {
        let record = match self.store.get(player_id).await? {
            Some(record) => record,
            None => {
                self.metrics_collector.record_status_poll("not_found");
                debug!("Status poll for unknown player {}", player_id);
                return Err(MatchmakingError::PlayerNotFound { player_id }.into());
            }
        };

        let paired = match self.status_mode {
            StatusMode::OwnRecord => record.is_paired(),
            StatusMode::PoolProxy => self.pool.is_empty()?,
        };

        self.metrics_collector
            .record_status_poll(if paired { "paired" } else { "unpaired" });
        debug!(
            "Status poll - player_id: {}, paired: {}, opponent: {:?}, mode: {}",
            player_id, paired, record.opponent_id, self.status_mode
        );

        Ok(MatchStatus {
            paired,
            opponent_id: record.opponent_id,
        })
    }

    /// Remove a player from the waiting pool; the match record is kept
    pub async fn leave(&self, player_id: PlayerId) -> Result<()> {
        match self.pool.remove(player_id) {
            Ok(()) => {
                self.metrics_collector.record_leave(true);
                self.update_stats(|stats| stats.leaves += 1)?;
                if let Ok(waiting) = self.pool.len() {
                    self.metrics_collector.set_players_waiting(waiting);
                }
                info!("Player {} left the waiting pool", player_id);
                Ok(())
            }
            Err(e) => {
                self.metrics_collector.record_leave(false);
                info!("Leave request for player {} not in pool", player_id);
                Err(e)
            }
        }
    }

    /// The current round content, if any round has been generated yet
    pub fn round_content(&self) -> Result<Option<Arc<RoundContent>>> {
        let current = self
            .current_round
            .read()
            .map_err(|_| MatchmakingError::lock_poisoned("round content"))?;
        Ok(current.clone())
    }

    /// Generate a new batch and publish it in place of the previous one
    pub fn regenerate_round(&self) -> Result<Arc<RoundContent>> {
        let content = match self.generator.generate() {
            Ok(content) => Arc::new(content),
            Err(e) => {
                self.metrics_collector.record_round_generated(false);
                return Err(e);
            }
        };

        {
            let mut current = self
                .current_round
                .write()
                .map_err(|_| MatchmakingError::lock_poisoned("round content"))?;
            *current = Some(content.clone());
        }

        self.metrics_collector.record_round_generated(true);
        self.update_stats(|stats| stats.rounds_generated += 1)?;
        info!(
            "Generated round {} with {} tokens",
            content.round_id,
            content.tokens.len()
        );
        Ok(content)
    }

    /// Where a player currently sits in the matchmaking lifecycle
    pub async fn player_phase(&self, player_id: PlayerId) -> Result<PlayerPhase> {
        match self.store.get(player_id).await? {
            Some(record) => Ok(record.phase(self.pool.contains(player_id)?)),
            None => Ok(PlayerPhase::Unregistered),
        }
    }

    /// Get coordinator statistics
    pub async fn get_stats(&self) -> Result<CoordinatorStats> {
        let mut stats = self
            .stats
            .read()
            .map_err(|_| MatchmakingError::lock_poisoned("stats"))?
            .clone();

        stats.players_waiting = self.pool.len()?;
        stats.match_records = self.store.count().await?;
        Ok(stats)
    }

    fn update_stats(&self, update: impl FnOnce(&mut CoordinatorStats)) -> Result<()> {
        let mut stats = self
            .stats
            .write()
            .map_err(|_| MatchmakingError::lock_poisoned("stats"))?;
        update(&mut stats);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::as_matchmaking_error;
    use crate::store::InMemoryMatchStore;
    use crate::types::MatchRecord;
    use async_trait::async_trait;
    use mockall::mock;
    use tokio_test::{assert_err, assert_ok};

    mock! {
        pub Store {}

        #[async_trait]
        impl MatchRecordStore for Store {
            async fn get(&self, player_id: PlayerId) -> Result<Option<MatchRecord>>;
            async fn put_fresh(&self, player_id: PlayerId) -> Result<MatchRecord>;
            async fn allocate_fresh(&self) -> Result<MatchRecord>;
            async fn pair(
                &self,
                joiner: PlayerId,
                waiting: PlayerId,
            ) -> Result<(MatchRecord, MatchRecord)>;
            async fn set_score(&self, player_id: PlayerId, score: i64) -> Result<MatchRecord>;
            async fn mark_finished(&self, player_id: PlayerId) -> Result<MatchRecord>;
            async fn remove(&self, player_id: PlayerId) -> Result<bool>;
            async fn count(&self) -> Result<usize>;
            async fn all(&self) -> Result<Vec<MatchRecord>>;
        }
    }

    fn create_test_coordinator() -> MatchmakingCoordinator {
        MatchmakingCoordinator::new(
            Arc::new(InMemoryMatchStore::new()),
            Arc::new(RoundContentGenerator::with_defaults().unwrap()),
        )
        .unwrap()
    }

    fn coordinator_over(store: MockStore) -> MatchmakingCoordinator {
        MatchmakingCoordinator::new(
            Arc::new(store),
            Arc::new(RoundContentGenerator::with_defaults().unwrap()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_first_join_waits_and_generates_round() {
        let coordinator = create_test_coordinator();
        assert!(coordinator.round_content().unwrap().is_none());

        let outcome = coordinator.join(1).await.unwrap();
        assert_eq!(outcome, JoinOutcome::waiting(1));

        let content = coordinator.round_content().unwrap().unwrap();
        assert_eq!(content.tokens.len(), 20);
        assert_eq!(coordinator.player_phase(1).await.unwrap(), PlayerPhase::Waiting);
    }

    #[tokio::test]
    async fn test_second_join_pairs_with_first() {
        let coordinator = create_test_coordinator();
        coordinator.join(1).await.unwrap();
        let round = coordinator.round_content().unwrap().unwrap();

        let outcome = coordinator.join(2).await.unwrap();
        assert_eq!(outcome, JoinOutcome::paired(2, 1));

        let status = coordinator.status(1).await.unwrap();
        assert_eq!(
            status,
            MatchStatus {
                paired: true,
                opponent_id: Some(2)
            }
        );
        assert!(coordinator.pool().is_empty().unwrap());

        // Pairing does not replace the round the waiting player was shown
        assert_eq!(
            coordinator.round_content().unwrap().unwrap().round_id,
            round.round_id
        );
    }

    #[tokio::test]
    async fn test_status_of_unknown_player() {
        let coordinator = create_test_coordinator();
        let err = coordinator.status(42).await.unwrap_err();
        assert_eq!(
            as_matchmaking_error(&err),
            Some(&MatchmakingError::PlayerNotFound { player_id: 42 })
        );
        assert_eq!(
            coordinator.player_phase(42).await.unwrap(),
            PlayerPhase::Unregistered
        );
    }

    #[tokio::test]
    async fn test_leave_then_next_joiner_waits() {
        let coordinator = create_test_coordinator();
        coordinator.join(1).await.unwrap();
        assert_ok!(coordinator.leave(1).await);
        assert!(coordinator.pool().is_empty().unwrap());

        let outcome = coordinator.join(2).await.unwrap();
        assert!(!outcome.paired);

        // The record of the player who left is kept
        assert_eq!(coordinator.player_phase(1).await.unwrap(), PlayerPhase::Idle);
    }

    #[tokio::test]
    async fn test_leave_when_not_waiting() {
        let coordinator = create_test_coordinator();
        let err = assert_err!(coordinator.leave(9).await);
        assert_eq!(
            as_matchmaking_error(&err),
            Some(&MatchmakingError::NotInPool { player_id: 9 })
        );
    }

    #[tokio::test]
    async fn test_rejoin_while_waiting_does_not_self_pair() {
        let coordinator = create_test_coordinator();
        coordinator.join(1).await.unwrap();

        let outcome = coordinator.join(1).await.unwrap();
        assert_eq!(outcome, JoinOutcome::waiting(1));
        assert_eq!(coordinator.pool().snapshot().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_rejoin_resets_previous_cycle() {
        let coordinator = create_test_coordinator();
        coordinator.join(1).await.unwrap();
        coordinator.join(2).await.unwrap();
        let store = coordinator.store();
        store.set_score(1, 15).await.unwrap();
        store.mark_finished(1).await.unwrap();

        coordinator.join(1).await.unwrap();
        let record = store.get(1).await.unwrap().unwrap();
        assert_eq!(record, MatchRecord { updated_at: record.updated_at, ..MatchRecord::fresh(1) });
        assert_eq!(coordinator.player_phase(1).await.unwrap(), PlayerPhase::Waiting);
    }

    #[tokio::test]
    async fn test_zero_player_id_rejected() {
        let coordinator = create_test_coordinator();
        let err = coordinator.join(0).await.unwrap_err();
        assert_eq!(
            as_matchmaking_error(&err),
            Some(&MatchmakingError::InvalidPlayerId { player_id: 0 })
        );
        assert!(coordinator.pool().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_join_new_assigns_monotonic_ids() {
        let coordinator = create_test_coordinator();

        let first = coordinator.join_new().await.unwrap();
        let second = coordinator.join_new().await.unwrap();

        assert_eq!(first, JoinOutcome::waiting(1));
        assert_eq!(second, JoinOutcome::paired(2, 1));
    }

    #[tokio::test]
    async fn test_pool_proxy_status_mode() {
        let coordinator = create_test_coordinator().with_status_mode(StatusMode::PoolProxy);
        coordinator.join(1).await.unwrap();
        coordinator.join(2).await.unwrap();
        coordinator.join(3).await.unwrap();
        coordinator.leave(3).await.unwrap();

        // Player 3 never got an opponent, but the pool is empty
        let status = coordinator.status(3).await.unwrap();
        assert!(status.paired);
        assert_eq!(status.opponent_id, None);
    }

    #[tokio::test]
    async fn test_own_record_status_mode_ignores_other_pairs() {
        let coordinator = create_test_coordinator();
        coordinator.join(1).await.unwrap();
        coordinator.join(2).await.unwrap();
        coordinator.join(3).await.unwrap();
        coordinator.leave(3).await.unwrap();

        let status = coordinator.status(3).await.unwrap();
        assert!(!status.paired);
        assert_eq!(status.opponent_id, None);
    }

    #[tokio::test]
    async fn test_stats_tracking() {
        let coordinator = create_test_coordinator();
        coordinator.join(1).await.unwrap();
        coordinator.join(2).await.unwrap();
        coordinator.join(3).await.unwrap();
        coordinator.leave(3).await.unwrap();

        let stats = coordinator.get_stats().await.unwrap();
        assert_eq!(stats.joins, 3);
        assert_eq!(stats.pairings, 1);
        assert_eq!(stats.leaves, 1);
        assert_eq!(stats.rounds_generated, 2);
        assert_eq!(stats.players_waiting, 0);
        assert_eq!(stats.match_records, 3);
    }

    #[tokio::test]
    async fn test_failed_pairing_write_restores_waiting_player() {
        let mut store = MockStore::new();
        store
            .expect_put_fresh()
            .returning(|player_id| Ok(MatchRecord::fresh(player_id)));
        store.expect_pair().times(1).returning(|_, _| {
            Err(MatchmakingError::StorageError {
                message: "disk full".to_string(),
            }
            .into())
        });

        let coordinator = coordinator_over(store);
        coordinator.join(1).await.unwrap();

        let err = coordinator.join(2).await.unwrap_err();
        assert!(matches!(
            as_matchmaking_error(&err),
            Some(MatchmakingError::StorageError { .. })
        ));

        // Player 1 keeps their place; player 2 is not left half-paired in the pool
        assert_eq!(coordinator.pool().snapshot().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_pool_entry_without_record_is_dropped() {
        let mut store = MockStore::new();
        store
            .expect_put_fresh()
            .returning(|player_id| Ok(MatchRecord::fresh(player_id)));
        store
            .expect_pair()
            .returning(|_, waiting| Err(MatchmakingError::PlayerNotFound { player_id: waiting }.into()));

        let coordinator = coordinator_over(store);
        coordinator.pool().enqueue(5).unwrap();

        let err = coordinator.join(6).await.unwrap_err();
        assert!(matches!(
            as_matchmaking_error(&err),
            Some(MatchmakingError::InternalError { .. })
        ));
        assert!(coordinator.pool().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_store_failure_on_join_leaves_pool_untouched() {
        let mut store = MockStore::new();
        store.expect_put_fresh().returning(|_| {
            Err(MatchmakingError::StorageError {
                message: "unavailable".to_string(),
            }
            .into())
        });

        let coordinator = coordinator_over(store);
        assert!(coordinator.join(1).await.is_err());
        assert!(coordinator.pool().is_empty().unwrap());
        assert!(coordinator.round_content().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_metrics_integration() {
        let metrics_collector = Arc::new(MetricsCollector::new().unwrap());
        let coordinator = MatchmakingCoordinator::with_metrics(
            Arc::new(InMemoryMatchStore::new()),
            Arc::new(RoundContentGenerator::with_defaults().unwrap()),
            metrics_collector.clone(),
        );

        coordinator.join(1).await.unwrap();
        coordinator.join(2).await.unwrap();
        let _ = coordinator.leave(1).await;

        let matchmaking = metrics_collector.matchmaking();
        assert_eq!(matchmaking.pairings_total.get(), 1);
        assert_eq!(matchmaking.players_waiting.get(), 0);
        assert_eq!(
            matchmaking.leaves_total.with_label_values(&["not_in_pool"]).get(),
            1
        );
    }
}
