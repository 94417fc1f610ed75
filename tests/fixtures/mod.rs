//! Test fixtures shared by the integration and load tests

#![allow(dead_code)]

use async_trait::async_trait;
use flag_duel::error::{MatchmakingError, Result};
use flag_duel::matchmaking::{MatchmakingCoordinator, ScoreMediator};
use flag_duel::metrics::MetricsCollector;
use flag_duel::round::{RoundContentGenerator, Vocabulary};
use flag_duel::store::{InMemoryMatchStore, MatchRecordStore};
use flag_duel::types::{MatchRecord, PlayerId, StatusMode};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Coordinator and mediator over one shared store
pub struct TestSystem {
    pub store: Arc<dyn MatchRecordStore>,
    pub coordinator: MatchmakingCoordinator,
    pub mediator: ScoreMediator,
    pub metrics: Arc<MetricsCollector>,
}

impl TestSystem {
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryMatchStore::new()), StatusMode::OwnRecord)
    }

    pub fn with_status_mode(status_mode: StatusMode) -> Self {
        Self::with_store(Arc::new(InMemoryMatchStore::new()), status_mode)
    }

    pub fn with_store(store: Arc<dyn MatchRecordStore>, status_mode: StatusMode) -> Self {
        let metrics = Arc::new(MetricsCollector::new().expect("Failed to create metrics"));
        let generator = Arc::new(
            RoundContentGenerator::with_defaults().expect("Failed to create generator"),
        );

        let coordinator =
            MatchmakingCoordinator::with_metrics(store.clone(), generator, metrics.clone())
                .with_status_mode(status_mode);
        let mediator = ScoreMediator::new(store.clone(), metrics.clone());

        Self {
            store,
            coordinator,
            mediator,
            metrics,
        }
    }
}

impl Default for TestSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Vocabulary of `size` synthetic tokens
pub fn synthetic_vocabulary(size: usize) -> Vocabulary {
    Vocabulary::new((0..size).map(|i| format!("flag-{:03}", i)))
}

/// In-memory store whose pairing writes can be made to fail on demand
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: InMemoryMatchStore,
    fail_pairing: AtomicBool,
    pair_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_pairing(&self, fail: bool) {
        self.fail_pairing.store(fail, Ordering::SeqCst);
    }

    pub fn pair_calls(&self) -> usize {
        self.pair_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MatchRecordStore for FlakyStore {
    async fn get(&self, player_id: PlayerId) -> Result<Option<MatchRecord>> {
        self.inner.get(player_id).await
    }

    async fn put_fresh(&self, player_id: PlayerId) -> Result<MatchRecord> {
        self.inner.put_fresh(player_id).await
    }

    async fn allocate_fresh(&self) -> Result<MatchRecord> {
        self.inner.allocate_fresh().await
    }

    async fn pair(
        &self,
        joiner: PlayerId,
        waiting: PlayerId,
    ) -> Result<(MatchRecord, MatchRecord)> {
        self.pair_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_pairing.load(Ordering::SeqCst) {
            return Err(MatchmakingError::StorageError {
                message: "pairing write rejected".to_string(),
            }
            .into());
        }
        self.inner.pair(joiner, waiting).await
    }

    async fn set_score(&self, player_id: PlayerId, score: i64) -> Result<MatchRecord> {
        self.inner.set_score(player_id, score).await
    }

    async fn mark_finished(&self, player_id: PlayerId) -> Result<MatchRecord> {
        self.inner.mark_finished(player_id).await
    }

    async fn remove(&self, player_id: PlayerId) -> Result<bool> {
        self.inner.remove(player_id).await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }

    async fn all(&self) -> Result<Vec<MatchRecord>> {
        self.inner.all().await
    }
}

/// In-memory store that parks one chosen `put_fresh` call after its write
/// until the test releases it
#[derive(Debug)]
pub struct GatedStore {
    inner: InMemoryMatchStore,
    gated_player: PlayerId,
    gated_call: usize,
    put_calls: AtomicUsize,
    parked: Notify,
    released: Notify,
}

impl GatedStore {
    /// Park the `gated_call`-th (1-based) `put_fresh` of `gated_player`
    pub fn new(gated_player: PlayerId, gated_call: usize) -> Self {
        Self {
            inner: InMemoryMatchStore::new(),
            gated_player,
            gated_call,
            put_calls: AtomicUsize::new(0),
            parked: Notify::new(),
            released: Notify::new(),
        }
    }

    /// Resolves once the gated call has written its record and parked
    pub async fn wait_until_parked(&self) {
        self.parked.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }
}

#[async_trait]
impl MatchRecordStore for GatedStore {
    async fn get(&self, player_id: PlayerId) -> Result<Option<MatchRecord>> {
        self.inner.get(player_id).await
    }

    async fn put_fresh(&self, player_id: PlayerId) -> Result<MatchRecord> {
        let record = self.inner.put_fresh(player_id).await?;
        if player_id == self.gated_player
            && self.put_calls.fetch_add(1, Ordering::SeqCst) + 1 == self.gated_call
        {
            self.parked.notify_one();
            self.released.notified().await;
        }
        Ok(record)
    }

    async fn allocate_fresh(&self) -> Result<MatchRecord> {
        self.inner.allocate_fresh().await
    }

    async fn pair(
        &self,
        joiner: PlayerId,
        waiting: PlayerId,
    ) -> Result<(MatchRecord, MatchRecord)> {
        self.inner.pair(joiner, waiting).await
    }

    async fn set_score(&self, player_id: PlayerId, score: i64) -> Result<MatchRecord> {
        self.inner.set_score(player_id, score).await
    }

    async fn mark_finished(&self, player_id: PlayerId) -> Result<MatchRecord> {
        self.inner.mark_finished(player_id).await
    }

    async fn remove(&self, player_id: PlayerId) -> Result<bool> {
        self.inner.remove(player_id).await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }

    async fn all(&self) -> Result<Vec<MatchRecord>> {
        self.inner.all().await
    }
}

/// Pool entries are unique and nobody in the pool holds an opponent link
pub async fn assert_pool_agrees_with_records(system: &TestSystem) {
    let pool = system.coordinator.pool().snapshot().unwrap();
    let unique: std::collections::HashSet<_> = pool.iter().collect();
    assert_eq!(unique.len(), pool.len(), "duplicate pool entries: {:?}", pool);

    for player_id in pool {
        let record = system
            .store
            .get(player_id)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("waiting player {} has no record", player_id));
        assert_eq!(
            record.opponent_id, None,
            "player {} is waiting and matched at once",
            player_id
        );
    }
}
