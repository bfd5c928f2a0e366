//! Engine module - rule orchestration and the turn lifecycle
//!
//! [`BoardEngine`] owns one level session's board state and resolves
//! selections, blasts, gravity and deadlock recovery. [`GameStateMachine`]
//! drives the phase lifecycle on top of it and tracks the move/time budget.

pub mod board_engine;
pub mod events;
pub mod pending;
pub mod shuffle;
pub mod state;

// Re-export commonly used types
pub use board_engine::{BoardEngine, SelectOutcome, EFFECT_BLAST, EFFECT_GROUP_POP};
pub use events::{BoardEvents, GameEvents, NullEvents};
pub use pending::PendingOps;
pub use shuffle::Reshuffle;
pub use state::{BudgetTracker, GameStateMachine, DEADLOCK_RETRY_LIMIT};
