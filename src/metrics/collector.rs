//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the flag-duel matchmaking
//! service using Prometheus metrics.

use crate::matchmaking::coordinator::CoordinatorStats;
use anyhow::Result;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Queue and pairing metrics
    matchmaking_metrics: MatchmakingMetrics,

    /// Score and finish relay metrics
    play_metrics: PlayMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,
}

/// Queue and pairing metrics
#[derive(Clone)]
pub struct MatchmakingMetrics {
    /// Join requests by outcome (waiting, paired, error)
    pub joins_total: IntCounterVec,

    /// Pairings completed
    pub pairings_total: IntCounter,

    /// Leave requests by result (removed, not_in_pool)
    pub leaves_total: IntCounterVec,

    /// Status polls by result (paired, unpaired, not_found)
    pub status_polls_total: IntCounterVec,

    /// Players currently in the waiting pool
    pub players_waiting: IntGauge,

    /// Match records currently stored
    pub match_records: IntGauge,

    /// Round content generations by status
    pub round_generations_total: IntCounterVec,
}

/// Score and finish relay metrics
#[derive(Clone)]
pub struct PlayMetrics {
    /// Score reports by result (relayed, unpaired)
    pub score_reports_total: IntCounterVec,

    /// Players that marked their round finished
    pub finishes_total: IntCounter,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Coordinator operation durations
    pub operation_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let matchmaking_metrics = MatchmakingMetrics::new(&registry)?;
        let play_metrics = PlayMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            matchmaking_metrics,
            play_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get matchmaking metrics
    pub fn matchmaking(&self) -> &MatchmakingMetrics {
        &self.matchmaking_metrics
    }

    /// Get play metrics
    pub fn play(&self) -> &PlayMetrics {
        &self.play_metrics
    }

    /// Get performance metrics
    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Refresh gauges from coordinator stats
    pub fn update_from_stats(&self, stats: &CoordinatorStats) {
        self.matchmaking_metrics
            .players_waiting
            .set(stats.players_waiting as i64);
        self.matchmaking_metrics
            .match_records
            .set(stats.match_records as i64);
    }

    /// Record a join request
    pub fn record_join(&self, outcome: &str, duration: Duration) {
        self.matchmaking_metrics
            .joins_total
            .with_label_values(&[outcome])
            .inc();

        if outcome == "paired" {
            self.matchmaking_metrics.pairings_total.inc();
        }

        self.record_operation("join", duration);
    }

    /// Record a leave request
    pub fn record_leave(&self, removed: bool) {
        let result = if removed { "removed" } else { "not_in_pool" };
        self.matchmaking_metrics
            .leaves_total
            .with_label_values(&[result])
            .inc();
    }

    /// Record a status poll
    pub fn record_status_poll(&self, result: &str) {
        self.matchmaking_metrics
            .status_polls_total
            .with_label_values(&[result])
            .inc();
    }

    /// Record a round content generation
    pub fn record_round_generated(&self, success: bool) {
        let status = if success { "success" } else { "failed" };
        self.matchmaking_metrics
            .round_generations_total
            .with_label_values(&[status])
            .inc();
    }

    /// Record a score report
    pub fn record_score_report(&self, relayed: bool) {
        let result = if relayed { "relayed" } else { "unpaired" };
        self.play_metrics
            .score_reports_total
            .with_label_values(&[result])
            .inc();
    }

    /// Record a player finishing their round
    pub fn record_finish(&self) {
        self.play_metrics.finishes_total.inc();
    }

    /// Set the waiting pool size
    pub fn set_players_waiting(&self, count: usize) {
        self.matchmaking_metrics.players_waiting.set(count as i64);
    }

    /// Record an operation duration
    pub fn record_operation(&self, operation: &str, duration: Duration) {
        self.performance_metrics
            .operation_duration
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("flag_duel_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "flag_duel_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
        })
    }
}

impl MatchmakingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let joins_total = IntCounterVec::new(
            Opts::new("flag_duel_joins_total", "Join requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(joins_total.clone()))?;

        let pairings_total =
            IntCounter::new("flag_duel_pairings_total", "Total pairings completed")?;
        registry.register(Box::new(pairings_total.clone()))?;

        let leaves_total = IntCounterVec::new(
            Opts::new("flag_duel_leaves_total", "Leave requests by result"),
            &["result"],
        )?;
        registry.register(Box::new(leaves_total.clone()))?;

        let status_polls_total = IntCounterVec::new(
            Opts::new("flag_duel_status_polls_total", "Status polls by result"),
            &["result"],
        )?;
        registry.register(Box::new(status_polls_total.clone()))?;

        let players_waiting = IntGauge::new(
            "flag_duel_players_waiting",
            "Players currently in the waiting pool",
        )?;
        registry.register(Box::new(players_waiting.clone()))?;

        let match_records =
            IntGauge::new("flag_duel_match_records", "Match records currently stored")?;
        registry.register(Box::new(match_records.clone()))?;

        let round_generations_total = IntCounterVec::new(
            Opts::new(
                "flag_duel_round_generations_total",
                "Round content generations by status",
            ),
            &["status"],
        )?;
        registry.register(Box::new(round_generations_total.clone()))?;

        Ok(Self {
            joins_total,
            pairings_total,
            leaves_total,
            status_polls_total,
            players_waiting,
            match_records,
            round_generations_total,
        })
    }
}

impl PlayMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let score_reports_total = IntCounterVec::new(
            Opts::new("flag_duel_score_reports_total", "Score reports by result"),
            &["result"],
        )?;
        registry.register(Box::new(score_reports_total.clone()))?;

        let finishes_total = IntCounter::new(
            "flag_duel_finishes_total",
            "Players that marked their round finished",
        )?;
        registry.register(Box::new(finishes_total.clone()))?;

        Ok(Self {
            score_reports_total,
            finishes_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "flag_duel_operation_duration_seconds",
                "Matchmaking operation duration",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self { operation_duration })
    }
}
