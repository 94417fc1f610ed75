//! Score relay between paired players
//!
//! Each player writes only their own record; reading back yields the
//! opponent's latest score and finished flag.

use crate::error::{MatchmakingError, Result};
use crate::metrics::MetricsCollector;
use crate::store::MatchRecordStore;
use crate::types::{OpponentView, PlayerId};
use crate::utils::validate_player_id;
use std::sync::Arc;
use tracing::{debug, info};

/// Relays scores and finished flags across a pairing
#[derive(Clone)]
pub struct ScoreMediator {
    store: Arc<dyn MatchRecordStore>,
    metrics_collector: Arc<MetricsCollector>,
}

impl ScoreMediator {
    pub fn new(store: Arc<dyn MatchRecordStore>, metrics_collector: Arc<MetricsCollector>) -> Self {
        Self {
            store,
            metrics_collector,
        }
    }

    /// Record the caller's score, if given, and return the opponent's view.
    ///
    /// Returns `None` while the caller has no opponent, or when the opponent's
    /// record is gone. Zero is a valid score and is written like any other.
    pub async fn report_score(
        &self,
        player_id: PlayerId,
        score: Option<i64>,
    ) -> Result<Option<OpponentView>> {
        let timer = self.metrics_collector.start_timer();
        validate_player_id(player_id)?;

        let record = match score {
            Some(score) => self.store.set_score(player_id, score).await?,
            None => self
                .store
                .get(player_id)
                .await?
                .ok_or(MatchmakingError::PlayerNotFound { player_id })?,
        };

        let view = match record.opponent_id {
            Some(opponent_id) => self.store.get(opponent_id).await?.map(|opponent| {
                OpponentView {
                    opponent_id,
                    score: opponent.score,
                    finished: opponent.finished,
                }
            }),
            None => None,
        };

        self.metrics_collector.record_score_report(view.is_some());
        self.metrics_collector
            .record_operation("report_score", timer.stop());

        match &view {
            Some(view) => debug!(
                "Score report - player_id: {}, score: {:?}, opponent: {}, opponent_score: {}",
                player_id, score, view.opponent_id, view.score
            ),
            None => debug!(
                "Score report from unpaired player {} - score: {:?}",
                player_id, score
            ),
        }

        Ok(view)
    }

    /// Mark the caller's round as finished. Finishing twice is harmless.
    pub async fn finish(&self, player_id: PlayerId) -> Result<()> {
        validate_player_id(player_id)?;
        self.store.mark_finished(player_id).await?;
        self.metrics_collector.record_finish();
        info!("Player {} finished their round", player_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::as_matchmaking_error;
    use crate::store::InMemoryMatchStore;

    async fn paired_store() -> Arc<InMemoryMatchStore> {
        let store = Arc::new(InMemoryMatchStore::new());
        store.put_fresh(1).await.unwrap();
        store.put_fresh(2).await.unwrap();
        store.pair(2, 1).await.unwrap();
        store
    }

    fn mediator_over(store: Arc<InMemoryMatchStore>) -> ScoreMediator {
        ScoreMediator::new(store, Arc::new(MetricsCollector::new().unwrap()))
    }

    #[tokio::test]
    async fn test_scores_relay_both_ways() {
        let mediator = mediator_over(paired_store().await);

        let view = mediator.report_score(1, Some(7)).await.unwrap().unwrap();
        assert_eq!(
            view,
            OpponentView {
                opponent_id: 2,
                score: 0,
                finished: false
            }
        );

        let view = mediator.report_score(2, Some(3)).await.unwrap().unwrap();
        assert_eq!(view.opponent_id, 1);
        assert_eq!(view.score, 7);
    }

    #[tokio::test]
    async fn test_zero_score_is_written() {
        let store = paired_store().await;
        let mediator = mediator_over(store.clone());

        mediator.report_score(1, Some(12)).await.unwrap();
        mediator.report_score(1, Some(0)).await.unwrap();

        assert_eq!(store.get(1).await.unwrap().unwrap().score, 0);
    }

    #[tokio::test]
    async fn test_poll_without_score_leaves_record_alone() {
        let store = paired_store().await;
        let mediator = mediator_over(store.clone());

        mediator.report_score(1, Some(5)).await.unwrap();
        let view = mediator.report_score(2, None).await.unwrap().unwrap();

        assert_eq!(view.score, 5);
        assert_eq!(store.get(2).await.unwrap().unwrap().score, 0);
    }

    #[tokio::test]
    async fn test_unpaired_player_gets_no_view() {
        let store = Arc::new(InMemoryMatchStore::new());
        store.put_fresh(4).await.unwrap();
        let mediator = mediator_over(store.clone());

        assert_eq!(mediator.report_score(4, Some(9)).await.unwrap(), None);
        assert_eq!(store.get(4).await.unwrap().unwrap().score, 9);
    }

    #[tokio::test]
    async fn test_unknown_player_rejected() {
        let mediator = mediator_over(Arc::new(InMemoryMatchStore::new()));

        let err = mediator.report_score(8, Some(1)).await.unwrap_err();
        assert_eq!(
            as_matchmaking_error(&err),
            Some(&MatchmakingError::PlayerNotFound { player_id: 8 })
        );

        let err = mediator.report_score(8, None).await.unwrap_err();
        assert_eq!(
            as_matchmaking_error(&err),
            Some(&MatchmakingError::PlayerNotFound { player_id: 8 })
        );
    }

    #[tokio::test]
    async fn test_finish_becomes_visible_to_opponent() {
        let mediator = mediator_over(paired_store().await);

        let before = mediator.report_score(2, None).await.unwrap().unwrap();
        assert!(!before.finished);

        mediator.finish(1).await.unwrap();
        mediator.finish(1).await.unwrap();

        let after = mediator.report_score(2, None).await.unwrap().unwrap();
        assert!(after.finished);
    }

    #[tokio::test]
    async fn test_opponent_record_removed() {
        let store = paired_store().await;
        let mediator = mediator_over(store.clone());
        store.remove(2).await.unwrap();

        assert_eq!(mediator.report_score(1, Some(3)).await.unwrap(), None);
    }
}
