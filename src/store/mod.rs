//! Durable per-player match records
//!
//! This module defines the storage contract the matchmaking coordinator
//! relies on, with an in-memory implementation and a JSON snapshot backed one.

pub mod records;
pub mod snapshot;

// Re-export commonly used types
pub use records::{InMemoryMatchStore, MatchRecordStore, StoreSnapshot};
pub use snapshot::JsonFileMatchStore;
