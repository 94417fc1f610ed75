//! Match record storage interface and in-memory implementation
//!
//! One record per player: score, opponent link and finished flag. The store
//! has no matchmaking logic of its own; it only guarantees that each
//! operation below is applied atomically, including the two-row pairing write.

use crate::error::{MatchmakingError, Result};
use crate::types::{MatchRecord, PlayerId};
use crate::utils::current_timestamp;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Trait for match record storage operations
#[async_trait]
pub trait MatchRecordStore: Send + Sync {
    /// Get a player's record
    async fn get(&self, player_id: PlayerId) -> Result<Option<MatchRecord>>;

    /// Write a fresh unpaired record, discarding whatever was stored before
    async fn put_fresh(&self, player_id: PlayerId) -> Result<MatchRecord>;

    /// Assign the next unused player id and write a fresh record for it
    async fn allocate_fresh(&self) -> Result<MatchRecord>;

    /// Link two existing records to each other in a single atomic update
    async fn pair(
        &self,
        joiner: PlayerId,
        waiting: PlayerId,
    ) -> Result<(MatchRecord, MatchRecord)>;

    /// Overwrite a player's score
    async fn set_score(&self, player_id: PlayerId, score: i64) -> Result<MatchRecord>;

    /// Set the finished flag; never resets it
    async fn mark_finished(&self, player_id: PlayerId) -> Result<MatchRecord>;

    /// Remove a player's record
    async fn remove(&self, player_id: PlayerId) -> Result<bool>;

    /// Number of stored records
    async fn count(&self) -> Result<usize>;

    /// All stored records (for admin/debugging)
    async fn all(&self) -> Result<Vec<MatchRecord>>;
}

/// Serializable image of a store, used for snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub last_allocated: PlayerId,
    pub records: Vec<MatchRecord>,
}

#[derive(Debug, Default)]
struct StoreState {
    records: HashMap<PlayerId, MatchRecord>,
    last_allocated: PlayerId,
}

impl StoreState {
    fn record_mut(&mut self, player_id: PlayerId) -> Result<&mut MatchRecord> {
        self.records
            .get_mut(&player_id)
            .ok_or_else(|| MatchmakingError::PlayerNotFound { player_id }.into())
    }
}

/// In-memory match record storage
#[derive(Debug, Default)]
pub struct InMemoryMatchStore {
    state: RwLock<StoreState>,
}

impl InMemoryMatchStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let records = snapshot
            .records
            .into_iter()
            .map(|record| (record.player_id, record))
            .collect();

        Self {
            state: RwLock::new(StoreState {
                records,
                last_allocated: snapshot.last_allocated,
            }),
        }
    }

    /// Capture the current contents, ordered by player id
    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        let state = self.read()?;
        let mut records: Vec<MatchRecord> = state.records.values().cloned().collect();
        records.sort_by_key(|record| record.player_id);

        Ok(StoreSnapshot {
            last_allocated: state.last_allocated,
            records,
        })
    }

    /// Swap in the contents of `snapshot`, dropping everything held now
    pub fn replace(&self, snapshot: StoreSnapshot) -> Result<()> {
        let incoming = Self::from_snapshot(snapshot);
        let state = incoming
            .state
            .into_inner()
            .map_err(|_| MatchmakingError::lock_poisoned("match records snapshot"))?;
        *self.write()? = state;
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| MatchmakingError::lock_poisoned("match records read").into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| MatchmakingError::lock_poisoned("match records write").into())
    }
}

#[async_trait]
impl MatchRecordStore for InMemoryMatchStore {
    async fn get(&self, player_id: PlayerId) -> Result<Option<MatchRecord>> {
        Ok(self.read()?.records.get(&player_id).cloned())
    }

    async fn put_fresh(&self, player_id: PlayerId) -> Result<MatchRecord> {
        let record = MatchRecord::fresh(player_id);
        let mut state = self.write()?;

        if let Some(previous) = state.records.insert(player_id, record.clone()) {
            debug!(
                "Discarded previous record for player {} (opponent: {:?}, score: {}, finished: {})",
                player_id, previous.opponent_id, previous.score, previous.finished
            );
        }

        Ok(record)
    }

    async fn allocate_fresh(&self) -> Result<MatchRecord> {
        let mut state = self.write()?;

        let highest_stored = state.records.keys().copied().max().unwrap_or(0);
        let player_id = state.last_allocated.max(highest_stored) + 1;
        state.last_allocated = player_id;

        let record = MatchRecord::fresh(player_id);
        state.records.insert(player_id, record.clone());
        Ok(record)
    }

    async fn pair(
        &self,
        joiner: PlayerId,
        waiting: PlayerId,
    ) -> Result<(MatchRecord, MatchRecord)> {
        if joiner == waiting {
            return Err(MatchmakingError::InternalError {
                message: format!("Refusing to pair player {} with themselves", joiner),
            }
            .into());
        }

        let mut state = self.write()?;

        // Check both rows before touching either
        for player_id in [joiner, waiting] {
            if !state.records.contains_key(&player_id) {
                return Err(MatchmakingError::PlayerNotFound { player_id }.into());
            }
        }

        let now = current_timestamp();

        let joiner_record = state.record_mut(joiner)?;
        joiner_record.opponent_id = Some(waiting);
        joiner_record.updated_at = now;
        let joiner_record = joiner_record.clone();

        let waiting_record = state.record_mut(waiting)?;
        waiting_record.opponent_id = Some(joiner);
        waiting_record.updated_at = now;
        let waiting_record = waiting_record.clone();

        Ok((joiner_record, waiting_record))
    }

    async fn set_score(&self, player_id: PlayerId, score: i64) -> Result<MatchRecord> {
        let mut state = self.write()?;
        let record = state.record_mut(player_id)?;
        record.score = score;
        record.updated_at = current_timestamp();
        Ok(record.clone())
    }

    async fn mark_finished(&self, player_id: PlayerId) -> Result<MatchRecord> {
        let mut state = self.write()?;
        let record = state.record_mut(player_id)?;
        if !record.finished {
            record.finished = true;
            record.updated_at = current_timestamp();
        }
        Ok(record.clone())
    }

    async fn remove(&self, player_id: PlayerId) -> Result<bool> {
        Ok(self.write()?.records.remove(&player_id).is_some())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.records.len())
    }

    async fn all(&self) -> Result<Vec<MatchRecord>> {
        Ok(self.snapshot()?.records)
    }
}
