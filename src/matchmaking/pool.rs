//! FIFO waiting pool of players looking for an opponent
//!
//! Every operation takes the pool lock exactly once, so a head can only ever
//! be handed to one caller and concurrent enqueue/remove/dequeue calls never
//! corrupt the arrival order.

use crate::error::{MatchmakingError, Result};
use crate::types::PlayerId;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Shared queue of player ids, oldest first
#[derive(Debug, Default)]
pub struct WaitingPool {
    queue: Mutex<VecDeque<PlayerId>>,
}

impl WaitingPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, VecDeque<PlayerId>>> {
        self.queue
            .lock()
            .map_err(|_| MatchmakingError::lock_poisoned("waiting pool").into())
    }

    /// Append a player to the tail. Duplicates are not filtered here.
    pub fn enqueue(&self, player_id: PlayerId) -> Result<()> {
        self.lock()?.push_back(player_id);
        Ok(())
    }

    /// Remove and return the head, or `PoolEmpty`
    pub fn dequeue_front(&self) -> Result<PlayerId> {
        self.lock()?
            .pop_front()
            .ok_or_else(|| MatchmakingError::PoolEmpty.into())
    }

    /// Put a popped head back in front of everyone else
    pub fn requeue_front(&self, player_id: PlayerId) -> Result<()> {
        self.lock()?.push_front(player_id);
        Ok(())
    }

    /// Remove the first occurrence of `player_id`, wherever it sits
    pub fn remove(&self, player_id: PlayerId) -> Result<()> {
        let mut queue = self.lock()?;
        match queue.iter().position(|&id| id == player_id) {
            Some(index) => {
                queue.remove(index);
                Ok(())
            }
            None => Err(MatchmakingError::NotInPool { player_id }.into()),
        }
    }

    /// Pair with the head or start waiting, as one step.
    ///
    /// Any earlier standing of `player_id` is evicted first, so the head that
    /// comes back is never the caller. Returns the popped opponent, or `None`
    /// if the caller was appended to the tail.
    pub fn pair_or_enqueue(&self, player_id: PlayerId) -> Result<Option<PlayerId>> {
        let mut queue = self.lock()?;

        let before = queue.len();
        queue.retain(|&id| id != player_id);
        if queue.len() != before {
            debug!(
                "Evicted {} stale pool entries for player {}",
                before - queue.len(),
                player_id
            );
        }

        match queue.pop_front() {
            Some(opponent) => Ok(Some(opponent)),
            None => {
                queue.push_back(player_id);
                Ok(None)
            }
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn contains(&self, player_id: PlayerId) -> Result<bool> {
        Ok(self.lock()?.contains(&player_id))
    }

    /// Copy of the queue, head first
    pub fn snapshot(&self) -> Result<Vec<PlayerId>> {
        Ok(self.lock()?.iter().copied().collect())
    }
}
