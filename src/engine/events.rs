//! Event traits - outbound notifications to excluded collaborators
//!
//! UI, audio and counter panels consume these fire-and-forget callbacks; the
//! core never depends on their internals and expects no return values. All
//! methods default to no-ops so a sink implements only what it cares about.

use crate::types::{ColorId, GamePhase};

/// Notifications emitted while resolving board mutations
pub trait BoardEvents {
    /// A color group of `size` members was cleared
    fn group_cleared(&mut self, _color: ColorId, _size: usize) {}

    /// The player activated something that is not a valid move
    fn invalid_selection(&mut self, _index: usize) {}

    /// A special tile detonated at grid position (x, y)
    fn blast_at(&mut self, _color: ColorId, _x: usize, _y: usize) {}

    /// A static target was collected; `collected` of `total` so far
    fn static_collected(&mut self, _color: ColorId, _collected: usize, _total: usize) {}
}

/// Notifications emitted by the state machine on top of board events
pub trait GameEvents: BoardEvents {
    fn state_changed(&mut self, _from: GamePhase, _to: GamePhase) {}

    fn budget_changed(&mut self, _moves_left: Option<u32>, _time_left_ms: Option<u32>) {}
}

/// Sink that swallows every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEvents;

impl BoardEvents for NullEvents {}
impl GameEvents for NullEvents {}
