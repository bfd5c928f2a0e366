//! Core types shared across the crate
//! This module contains pure data types with no external dependencies

/// Color value of an unoccupied cell.
pub const EMPTY: u8 = 255;

/// Board dimension limits (inclusive)
pub const MIN_BOARD_DIM: usize = 2;
pub const MAX_BOARD_DIM: usize = 10;

/// Palette size limits (inclusive)
pub const MIN_COLORS: u8 = 1;
pub const MAX_COLORS: u8 = 6;

/// Index into the configured color palette.
pub type ColorId = u8;

/// Lifecycle states of one level session.
///
/// `GenerateLevel` and `Falling` are pass-through states that run their work
/// synchronously and advance. `SpawningBlocks` waits for every pending drop
/// to report completion. `Win` and `Lose` are terminal and only reachable
/// from the budget tracker, never from board mechanics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    GenerateLevel,
    SpawningBlocks,
    WaitingInput,
    Falling,
    Deadlock,
    Pause,
    Win,
    Lose,
}

impl GamePhase {
    /// Convert to string (for logs and host UI)
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::GenerateLevel => "generateLevel",
            GamePhase::SpawningBlocks => "spawningBlocks",
            GamePhase::WaitingInput => "waitingInput",
            GamePhase::Falling => "falling",
            GamePhase::Deadlock => "deadlock",
            GamePhase::Pause => "pause",
            GamePhase::Win => "win",
            GamePhase::Lose => "lose",
        }
    }

    /// Terminal states accept no further input or ticks.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GamePhase::Win | GamePhase::Lose)
    }
}
