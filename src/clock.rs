use crate::model::BASE_TICK_RATE;
use serde::{Deserialize, Serialize};

/// Number of ticks that make up one simulated day at `speed`.
pub fn ticks_per_day(speed: f64) -> u64 {
    ((BASE_TICK_RATE / speed).floor() as u64).max(1)
}

/// Frame and day counters of a simulation.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationClock {
    frame: u64,
    day: u64,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames elapsed since the last day boundary.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn day(&self) -> u64 {
        self.day
    }

    /// Advance by one frame.
    ///
    /// The first frame of each day returns that day's number, so the first
    /// tick after a reset returns day 0 and `day()` then counts the days
    /// started so far.
    pub fn tick(&mut self, speed: f64) -> Option<u64> {
        let started = (self.frame == 0).then(|| {
            self.day += 1;
            self.day - 1
        });
        self.frame += 1;
        if self.frame >= ticks_per_day(speed) {
            self.frame = 0;
        }
        started
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
