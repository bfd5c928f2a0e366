//! State machine module - drives the turn lifecycle over the board engine
//!
//! Transitions are synchronous triggers: entering `GenerateLevel` or
//! `Falling` does its work and advances immediately, while `SpawningBlocks`
//! waits on the pending-drop continuation before resolving to
//! `WaitingInput` or `Deadlock`. `Win` and `Lose` come only from the budget
//! tracker; board mechanics can never end the game on their own.

use log::error;

use crate::config::{ConfigError, LevelConfig};
use crate::engine::board_engine::{BoardEngine, SelectOutcome};
use crate::engine::events::GameEvents;
use crate::engine::pending::PendingOps;
use crate::types::GamePhase;

/// Consecutive failed deadlock recoveries tolerated before the machine stops
/// retrying on its own. A failure here means the shuffle/regeneration
/// guarantee broke, which is a bug worth surfacing, not something to loop on.
pub const DEADLOCK_RETRY_LIMIT: u32 = 3;

/// Independently enable-able move and time budgets
#[derive(Debug, Clone, Copy)]
pub struct BudgetTracker {
    moves_left: Option<u32>,
    time_left_ms: Option<u32>,
}

impl BudgetTracker {
    pub fn new(move_limit: Option<u32>, time_limit_ms: Option<u32>) -> Self {
        Self {
            moves_left: move_limit,
            time_left_ms: time_limit_ms,
        }
    }

    pub fn spend_move(&mut self) {
        if let Some(moves) = self.moves_left.as_mut() {
            *moves = moves.saturating_sub(1);
        }
    }

    pub fn tick(&mut self, dt_ms: u32) {
        if let Some(time) = self.time_left_ms.as_mut() {
            *time = time.saturating_sub(dt_ms);
        }
    }

    pub fn moves_exhausted(&self) -> bool {
        self.moves_left == Some(0)
    }

    pub fn time_exhausted(&self) -> bool {
        self.time_left_ms == Some(0)
    }

    pub fn moves_left(&self) -> Option<u32> {
        self.moves_left
    }

    pub fn time_left_ms(&self) -> Option<u32> {
        self.time_left_ms
    }
}

/// Turn/round lifecycle over one [`BoardEngine`] session
pub struct GameStateMachine {
    engine: BoardEngine,
    phase: GamePhase,
    budget: BudgetTracker,
    pending: PendingOps,
    deadlock_failures: u32,
}

impl GameStateMachine {
    /// Validate the configuration and build a machine parked in
    /// `GenerateLevel`; call [`start`](Self::start) to run it.
    pub fn new(config: LevelConfig) -> Result<Self, ConfigError> {
        let budget = BudgetTracker::new(config.move_limit, config.time_limit_ms);
        let engine = BoardEngine::new(config)?;
        Ok(Self {
            engine,
            phase: GamePhase::GenerateLevel,
            budget,
            pending: PendingOps::new(),
            deadlock_failures: 0,
        })
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn engine(&self) -> &BoardEngine {
        &self.engine
    }

    /// Mutable engine access for level scripting and tests. The machine does
    /// not observe direct board edits until the next resolution point; call
    /// [`check_deadlock`](Self::check_deadlock) after editing mid-round.
    pub fn engine_mut(&mut self) -> &mut BoardEngine {
        &mut self.engine
    }

    pub fn budget(&self) -> &BudgetTracker {
        &self.budget
    }

    /// Drop tweens the host still owes a completion call for
    pub fn pending_drops(&self) -> u32 {
        self.pending.pending()
    }

    /// Initialize the level and advance into the first spawn batch
    pub fn start(&mut self, events: &mut dyn GameEvents) {
        if self.phase != GamePhase::GenerateLevel {
            return;
        }
        self.engine.generate_level();
        self.transition(GamePhase::SpawningBlocks, events);
    }

    /// Resolve a player activation of the tile at `index`. Only acted on in
    /// `WaitingInput`; anything else reports an invalid selection without
    /// touching the board.
    pub fn select(&mut self, index: usize, events: &mut dyn GameEvents) -> SelectOutcome {
        if self.phase != GamePhase::WaitingInput {
            return SelectOutcome::Invalid;
        }
        let outcome = self.engine.select(index, events);
        if !outcome.is_valid_move() {
            return outcome;
        }

        self.budget.spend_move();
        events.budget_changed(self.budget.moves_left(), self.budget.time_left_ms());

        if self.engine.statics_total() > 0
            && self.engine.statics_collected() >= self.engine.statics_total()
        {
            self.transition(GamePhase::Win, events);
        } else if self.budget.moves_exhausted() {
            self.transition(GamePhase::Lose, events);
        } else {
            self.transition(GamePhase::Falling, events);
        }
        outcome
    }

    /// Host callback: one drop tween finished
    pub fn complete_drop(&mut self, events: &mut dyn GameEvents) {
        if self.pending.complete() {
            self.resolve_spawn(events);
        }
    }

    /// Complete every outstanding drop at once (headless hosts, tests)
    pub fn complete_all_drops(&mut self, events: &mut dyn GameEvents) {
        while self.pending.pending() > 0 {
            if self.pending.complete() {
                self.resolve_spawn(events);
                return;
            }
        }
    }

    /// Advance the countdown clock. Runs in active states only; `Pause`
    /// freezes the timer and terminal states ignore it.
    pub fn tick(&mut self, dt_ms: u32, events: &mut dyn GameEvents) {
        if self.phase.is_terminal()
            || matches!(self.phase, GamePhase::Pause | GamePhase::GenerateLevel)
        {
            return;
        }
        if self.budget.time_left_ms().is_none() {
            return;
        }
        self.budget.tick(dt_ms);
        events.budget_changed(self.budget.moves_left(), self.budget.time_left_ms());
        if self.budget.time_exhausted() {
            self.transition(GamePhase::Lose, events);
        }
    }

    /// Enter the modal-UI side state
    pub fn pause(&mut self, events: &mut dyn GameEvents) {
        if self.phase == GamePhase::WaitingInput {
            self.transition(GamePhase::Pause, events);
        }
    }

    pub fn resume(&mut self, events: &mut dyn GameEvents) {
        if self.phase == GamePhase::Pause {
            self.transition(GamePhase::WaitingInput, events);
        }
    }

    /// Re-evaluate the board while waiting for input; used by hosts after
    /// scripted board edits. Moves into `Deadlock` when no move exists.
    pub fn check_deadlock(&mut self, events: &mut dyn GameEvents) {
        if self.phase == GamePhase::WaitingInput && !self.engine.has_valid_move() {
            self.transition(GamePhase::Deadlock, events);
        }
    }

    /// Host request to retry recovery after the machine gave up
    pub fn retry_deadlock(&mut self, events: &mut dyn GameEvents) {
        if self.phase == GamePhase::Deadlock {
            self.deadlock_failures = 0;
            self.recover_from_deadlock(events);
        }
    }

    fn transition(&mut self, to: GamePhase, events: &mut dyn GameEvents) {
        let from = self.phase;
        self.phase = to;
        events.state_changed(from, to);
        self.enter(to, events);
    }

    fn enter(&mut self, phase: GamePhase, events: &mut dyn GameEvents) {
        match phase {
            GamePhase::SpawningBlocks => {
                let spawned = self.engine.refill();
                for _ in 0..spawned {
                    self.pending.begin();
                }
                if self.pending.arm() {
                    self.resolve_spawn(events);
                }
            }
            GamePhase::Falling => {
                self.engine.apply_gravity();
                self.transition(GamePhase::SpawningBlocks, events);
            }
            GamePhase::Deadlock => {
                self.recover_from_deadlock(events);
            }
            _ => {}
        }
    }

    /// Fires once the whole spawn batch has dropped
    fn resolve_spawn(&mut self, events: &mut dyn GameEvents) {
        self.engine.release_effects();
        if self.engine.has_valid_move() {
            self.deadlock_failures = 0;
            self.transition(GamePhase::WaitingInput, events);
        } else {
            self.transition(GamePhase::Deadlock, events);
        }
    }

    fn recover_from_deadlock(&mut self, events: &mut dyn GameEvents) {
        if self.deadlock_failures >= DEADLOCK_RETRY_LIMIT {
            error!(
                "deadlock recovery suspended after {} failed attempts",
                self.deadlock_failures
            );
            return;
        }

        if !self.engine.shuffle_board() {
            self.engine.regenerate_board();
        }

        if self.engine.has_valid_move() {
            self.deadlock_failures = 0;
            self.transition(GamePhase::WaitingInput, events);
        } else {
            // the shuffle/regeneration guarantee failed; log the fault and
            // stay in Deadlock rather than crash
            self.deadlock_failures += 1;
            error!(
                "board still deadlocked after recovery attempt {}",
                self.deadlock_failures
            );
            self.transition(GamePhase::Deadlock, events);
        }
    }
}
