//! File-backed match record store
//!
//! Keeps records in an [`InMemoryMatchStore`] and writes a JSON snapshot of
//! the whole store for every mutation, so records survive a restart. A
//! mutation is applied to a staged copy first and only becomes visible once
//! its snapshot is on disk; a failed write leaves the served records as they
//! were. The waiting pool and round content are never persisted.

use crate::error::{MatchmakingError, Result};
use crate::store::records::{InMemoryMatchStore, MatchRecordStore, StoreSnapshot};
use crate::types::{MatchRecord, PlayerId};
use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Match record store persisted as a JSON snapshot file
#[derive(Debug)]
pub struct JsonFileMatchStore {
    inner: InMemoryMatchStore,
    path: PathBuf,
    /// Serializes mutations from staging through the snapshot write
    write_lock: Mutex<()>,
}

impl JsonFileMatchStore {
    /// Open the snapshot at `path`, starting empty if the file does not exist
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let inner = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: StoreSnapshot = serde_json::from_slice(&bytes).map_err(|e| {
                    MatchmakingError::StorageError {
                        message: format!("Corrupt snapshot {}: {}", path.display(), e),
                    }
                })?;
                info!(
                    "Loaded {} match records from {}",
                    snapshot.records.len(),
                    path.display()
                );
                InMemoryMatchStore::from_snapshot(snapshot)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No snapshot at {}, starting empty", path.display());
                InMemoryMatchStore::new()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        Ok(Self {
            inner,
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the committed records to apply one mutation to
    fn stage(&self) -> Result<InMemoryMatchStore> {
        Ok(InMemoryMatchStore::from_snapshot(self.inner.snapshot()?))
    }

    /// Write the staged records to disk, then make them the served ones
    async fn commit(&self, staged: InMemoryMatchStore) -> Result<()> {
        let snapshot = staged.snapshot()?;
        let bytes = serde_json::to_vec_pretty(&snapshot).map_err(|e| {
            MatchmakingError::StorageError {
                message: format!("Failed to serialize snapshot: {}", e),
            }
        })?;

        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| MatchmakingError::StorageError {
                message: format!("Failed to write {}: {}", tmp_path.display(), e),
            })?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| MatchmakingError::StorageError {
                message: format!("Failed to replace {}: {}", self.path.display(), e),
            })?;

        let count = snapshot.records.len();
        self.inner.replace(snapshot)?;
        debug!("Persisted {} match records to {}", count, self.path.display());
        Ok(())
    }
}

#[async_trait]
impl MatchRecordStore for JsonFileMatchStore {
    async fn get(&self, player_id: PlayerId) -> Result<Option<MatchRecord>> {
        self.inner.get(player_id).await
    }

    async fn put_fresh(&self, player_id: PlayerId) -> Result<MatchRecord> {
        let _guard = self.write_lock.lock().await;
        let staged = self.stage()?;
        let record = staged.put_fresh(player_id).await?;
        self.commit(staged).await?;
        Ok(record)
    }

    async fn allocate_fresh(&self) -> Result<MatchRecord> {
        let _guard = self.write_lock.lock().await;
        let staged = self.stage()?;
        let record = staged.allocate_fresh().await?;
        self.commit(staged).await?;
        Ok(record)
    }

    async fn pair(
        &self,
        joiner: PlayerId,
        waiting: PlayerId,
    ) -> Result<(MatchRecord, MatchRecord)> {
        let _guard = self.write_lock.lock().await;
        let staged = self.stage()?;
        let records = staged.pair(joiner, waiting).await?;
        self.commit(staged).await?;
        Ok(records)
    }

    async fn set_score(&self, player_id: PlayerId, score: i64) -> Result<MatchRecord> {
        let _guard = self.write_lock.lock().await;
        let staged = self.stage()?;
        let record = staged.set_score(player_id, score).await?;
        self.commit(staged).await?;
        Ok(record)
    }

    async fn mark_finished(&self, player_id: PlayerId) -> Result<MatchRecord> {
        let _guard = self.write_lock.lock().await;
        let staged = self.stage()?;
        let record = staged.mark_finished(player_id).await?;
        self.commit(staged).await?;
        Ok(record)
    }

    async fn remove(&self, player_id: PlayerId) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let staged = self.stage()?;
        let removed = staged.remove(player_id).await?;
        if removed {
            self.commit(staged).await?;
        }
        Ok(removed)
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }

    async fn all(&self) -> Result<Vec<MatchRecord>> {
        self.inner.all().await
    }
}
