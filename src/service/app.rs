//! Main application state and service coordination
//!
//! `AppState` wires the configured store, round generator, coordinator,
//! mediator and metrics together and owns the background tasks.

use crate::config::AppConfig;
use crate::matchmaking::{MatchmakingCoordinator, ScoreMediator};
use crate::metrics::MetricsCollector;
use crate::round::{RoundContentGenerator, Vocabulary};
use crate::store::{InMemoryMatchStore, JsonFileMatchStore, MatchRecordStore};
use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Interval between gauge refreshes
const METRICS_REFRESH_INTERVAL: Duration = Duration::from_secs(15);

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Pairing and pool management
    coordinator: Arc<MatchmakingCoordinator>,

    /// Score and finish relay
    mediator: Arc<ScoreMediator>,

    /// Metrics collector shared by every component
    metrics_collector: Arc<MetricsCollector>,

    /// Background task handles
    background_tasks: Mutex<Vec<JoinHandle<()>>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,

    started_at: Instant,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing flag-duel matchmaking service");
        info!(
            "Configuration: service={}, status_mode={}, assign_player_ids={}",
            config.service.name,
            config.matchmaking.status_mode,
            config.matchmaking.assign_player_ids
        );

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let store = Self::initialize_store(&config).await?;
        let generator = Arc::new(Self::initialize_generator(&config)?);

        let coordinator = Arc::new(
            MatchmakingCoordinator::with_metrics(
                store.clone(),
                generator,
                metrics_collector.clone(),
            )
            .with_status_mode(config.matchmaking.status_mode),
        );
        let mediator = Arc::new(ScoreMediator::new(store, metrics_collector.clone()));

        Ok(Self {
            config,
            coordinator,
            mediator,
            metrics_collector,
            background_tasks: Mutex::new(Vec::new()),
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        })
    }

    /// Mark the service running and start background tasks
    pub async fn start(&self) -> Result<(), ServiceError> {
        info!("Starting flag-duel matchmaking service");

        *self.is_running.write().await = true;
        self.start_background_tasks().await;

        info!("✅ Flag-duel matchmaking service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of flag-duel service");

        *self.is_running.write().await = false;
        self.stop_background_tasks().await;

        let final_stats =
            self.coordinator
                .get_stats()
                .await
                .map_err(|e| ServiceError::BackgroundTask {
                    message: format!("Failed to get final stats: {}", e),
                })?;

        info!("Final service statistics: {:?}", final_stats);
        info!("✅ Flag-duel service shutdown completed");
        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn coordinator(&self) -> Arc<MatchmakingCoordinator> {
        self.coordinator.clone()
    }

    pub fn mediator(&self) -> Arc<ScoreMediator> {
        self.mediator.clone()
    }

    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Pick the record store: a JSON snapshot file when configured, memory otherwise
    async fn initialize_store(
        config: &AppConfig,
    ) -> Result<Arc<dyn MatchRecordStore>, ServiceError> {
        match &config.store.snapshot_path {
            Some(path) => {
                info!("Using match record snapshot at {}", path.display());
                let store = JsonFileMatchStore::open(path.clone()).await.map_err(|e| {
                    ServiceError::Initialization {
                        message: format!("Failed to open match record snapshot: {}", e),
                    }
                })?;
                Ok(Arc::new(store))
            }
            None => {
                info!("Using in-memory match record store");
                Ok(Arc::new(InMemoryMatchStore::new()))
            }
        }
    }

    fn initialize_generator(config: &AppConfig) -> Result<RoundContentGenerator, ServiceError> {
        let vocabulary = match &config.round.vocabulary_path {
            Some(path) => {
                Vocabulary::from_file(path).map_err(|e| ServiceError::Configuration {
                    message: format!("Failed to load vocabulary: {}", e),
                })?
            }
            None => Vocabulary::default(),
        };

        info!(
            "Round vocabulary has {} tokens, {} per round",
            vocabulary.len(),
            config.round.token_count
        );

        RoundContentGenerator::new(
            vocabulary,
            config.round.token_count,
            config.round.max_generation_attempts,
        )
        .map_err(|e| ServiceError::Configuration {
            message: format!("Invalid round settings: {}", e),
        })
    }

    async fn start_background_tasks(&self) {
        let metrics_task = {
            let coordinator = self.coordinator.clone();
            let metrics_collector = self.metrics_collector.clone();
            let is_running = self.is_running.clone();
            let started_at = self.started_at;

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(METRICS_REFRESH_INTERVAL);
                info!("Metrics update task started");

                while *is_running.read().await {
                    interval.tick().await;

                    metrics_collector
                        .service()
                        .uptime_seconds
                        .set(started_at.elapsed().as_secs() as i64);

                    match coordinator.get_stats().await {
                        Ok(stats) => {
                            debug!(
                                "Updating metrics - waiting: {}, records: {}, pairings: {}",
                                stats.players_waiting, stats.match_records, stats.pairings
                            );
                            metrics_collector.update_from_stats(&stats);
                        }
                        Err(e) => warn!("Failed to get coordinator stats for metrics: {}", e),
                    }
                }

                info!("Metrics update task stopped");
            })
        };

        self.background_tasks.lock().await.push(metrics_task);
    }

    async fn stop_background_tasks(&self) {
        let mut tasks = self.background_tasks.lock().await;
        let task_count = tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);
        for task in tasks.drain(..) {
            task.abort();
        }
        info!("✅ All {} background tasks stopped", task_count);
    }
}
