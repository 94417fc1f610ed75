//! Metrics and monitoring for the flag-duel matchmaking service
//!
//! This module provides Prometheus metrics collection for queueing, pairing
//! and score relay operations.

pub mod collector;

pub use collector::{
    MatchmakingMetrics, MetricsCollector, MetricsTimer, PerformanceMetrics, PlayMetrics,
    ServiceMetrics,
};
