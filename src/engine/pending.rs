//! Pending-count continuation - deferred completion for animated operations
//!
//! Board state is mutated eagerly; the notification to the state machine is
//! deferred until every visual sub-operation (each tile's drop tween in a
//! spawn batch) has reported in. One counter, one flag: increment on start,
//! decrement on completion, fire once when the count reaches zero while the
//! resolution flag is set.

use log::warn;

/// Counter-based one-shot completion latch
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingOps {
    pending: u32,
    armed: bool,
}

impl PendingOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the start of one sub-operation
    pub fn begin(&mut self) {
        self.pending += 1;
    }

    /// Request resolution once every started sub-operation completes.
    /// Returns true when the batch is already drained, in which case the
    /// caller fires the continuation immediately and the latch stays unset.
    pub fn arm(&mut self) -> bool {
        if self.pending == 0 {
            self.armed = false;
            return true;
        }
        self.armed = true;
        false
    }

    /// Report one sub-operation finished. Returns true exactly once per
    /// batch: when the count reaches zero while armed.
    pub fn complete(&mut self) -> bool {
        if self.pending == 0 {
            warn!("pending: completion reported with no operation in flight");
            return false;
        }
        self.pending -= 1;
        if self.pending == 0 && self.armed {
            self.armed = false;
            return true;
        }
        false
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    pub fn is_idle(&self) -> bool {
        self.pending == 0
    }
}
