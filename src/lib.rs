//! Tile-blast board simulation core
//!
//! The rules engine of a tile-matching puzzle: a rectangular grid of colored
//! tiles where connected same-color groups are removed, special tiles clear
//! areas, rows, columns or colors, gravity compacts what remains, and a
//! deadlocked board is reshuffled with a guaranteed valid move. Rendering,
//! audio and UI are external collaborators reached through the callback
//! traits in [`engine::events`]; nothing in here touches I/O.
//!
//! # Example
//!
//! ```
//! use tile_blast::{GamePhase, GameStateMachine, LevelConfig, NullEvents};
//!
//! let mut machine = GameStateMachine::new(LevelConfig::default()).unwrap();
//! machine.start(&mut NullEvents);
//!
//! // a headless host completes the drop animations immediately
//! machine.complete_all_drops(&mut NullEvents);
//! assert_eq!(machine.phase(), GamePhase::WaitingInput);
//! assert!(machine.engine().has_valid_move());
//! ```

pub mod config;
pub mod core;
pub mod engine;
pub mod types;

// Re-export the public surface at the crate root
pub use crate::config::{ConfigError, LevelConfig, SpawnRule, StaticQuota, TierThresholds};
pub use crate::core::board::{BoardModel, Cell};
pub use crate::core::grid::{GridManager, Node};
pub use crate::core::group::GroupIndex;
pub use crate::core::pool::{Effect, EffectId, InstancePool, TileId};
pub use crate::core::rng::SimpleRng;
pub use crate::core::tile::{Archetype, ArchetypeKind, GroupContext, Tile};
pub use crate::engine::board_engine::{BoardEngine, SelectOutcome};
pub use crate::engine::events::{BoardEvents, GameEvents, NullEvents};
pub use crate::engine::pending::PendingOps;
pub use crate::engine::state::{BudgetTracker, GameStateMachine};
pub use crate::types::{ColorId, GamePhase, EMPTY};
