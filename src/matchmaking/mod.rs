//! Matchmaking core: the waiting pool, the coordinator that pairs players,
//! and the mediator that relays scores between them.

pub mod coordinator;
pub mod mediator;
pub mod pool;

pub use coordinator::{CoordinatorStats, MatchmakingCoordinator};
pub use mediator::ScoreMediator;
pub use pool::WaitingPool;
