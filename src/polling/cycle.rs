//! Tick counter that multiplexes the slow detail refresh onto the fast one

/// Position within the clock/detail cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollCycle {
    tick: u32,
    detail_every: u32,
}

impl PollCycle {
    /// Start a cycle at tick 1
    #[must_use]
    pub fn new(detail_every: u32) -> Self {
        Self {
            tick: 1,
            detail_every: detail_every.max(1),
        }
    }

    /// Advance past the current tick
    ///
    /// Returns true when the detail refresh is due, in which case the
    /// counter has wrapped back to 1.
    pub const fn advance(&mut self) -> bool {
        self.tick += 1;
        if self.tick > self.detail_every {
            self.tick = 1;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub const fn tick(&self) -> u32 {
        self.tick
    }

    #[must_use]
    pub const fn detail_every(&self) -> u32 {
        self.detail_every
    }
}
