//! Core module - board data model, connectivity and pooling
//!
//! Pure board state and the algorithms over it: the flat cell grid, the node
//! lattice, flood-fill group detection, blast searches and the instance
//! pool. No game-rule orchestration lives here; that is the engine's job.

pub mod board;
pub mod grid;
pub mod group;
pub mod pool;
pub mod rng;
pub mod tile;

// Re-export commonly used types
pub use board::{BoardModel, Cell};
pub use grid::{GridManager, Node};
pub use group::{GroupIndex, GroupInfo};
pub use pool::{Effect, EffectId, InstancePool, TileId};
pub use rng::SimpleRng;
pub use tile::{gather_affected_cells, Archetype, ArchetypeKind, GroupContext, Tile};
