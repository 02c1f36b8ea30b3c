//! Two-state rising-edge latch.
//!
//! A latch reports `true` only on the update where its condition goes from
//! false to true. It stays `Active` while the condition holds and drops back
//! to `Idle` the first time it does not.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatchState {
    #[default]
    Idle,
    Active,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeLatch {
    state: LatchState,
}

impl EdgeLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current condition; returns true on a rising edge.
    pub fn observe(&mut self, condition: bool) -> bool {
        let (next, fired) = match (self.state, condition) {
            (LatchState::Idle, true) => (LatchState::Active, true),
            (LatchState::Active, true) => (LatchState::Active, false),
            (_, false) => (LatchState::Idle, false),
        };
        self.state = next;
        fired
    }

    pub fn state(&self) -> LatchState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == LatchState::Active
    }

    pub fn reset(&mut self) {
        self.state = LatchState::Idle;
    }
}
