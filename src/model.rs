//! Simulation data types.

use crate::params::{ConfigError, check_finite};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Radius of an agent; positions stay at least this far from every wall.
pub const AGENT_RADIUS: f64 = 3.0;

/// Number of ticks per simulated second that all per-tick probabilities assume.
pub const BASE_TICK_RATE: f64 = 60.0;

/// Health state of an agent.
///
/// `Healthy` agents become `Infected` through contact or `Vaccinated` passively,
/// and `Infected` agents become `Recovered`. `Recovered` and `Vaccinated` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Infected,
    Recovered,
    Vaccinated,
}

impl HealthState {
    pub const ALL: [HealthState; 4] = [
        HealthState::Healthy,
        HealthState::Infected,
        HealthState::Recovered,
        HealthState::Vaccinated,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, HealthState::Recovered | HealthState::Vaccinated)
    }
}

/// Rectangular arena the agents move in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f64,
    pub height: f64,
}

impl Arena {
    /// Smallest accepted width and height (exclusive).
    pub const MIN_EXTENT: f64 = 2.0 * crate::population::SPAWN_MARGIN;

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_finite("arena width", self.width)?;
        check_finite("arena height", self.height)?;
        if self.width <= Self::MIN_EXTENT || self.height <= Self::MIN_EXTENT {
            return Err(ConfigError::ArenaTooSmall {
                min: Self::MIN_EXTENT,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Whether a point lies inside the region reachable by an agent's center.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (AGENT_RADIUS..=self.width - AGENT_RADIUS).contains(&x)
            && (AGENT_RADIUS..=self.height - AGENT_RADIUS).contains(&y)
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// Agent of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    state: HealthState,
    infected_duration: f64,
    uses_protection: bool,
}

impl Agent {
    /// Create a new healthy agent.
    pub fn new(position: (f64, f64), velocity: (f64, f64), uses_protection: bool) -> Self {
        Self {
            x: position.0,
            y: position.1,
            vx: velocity.0,
            vy: velocity.1,
            state: HealthState::Healthy,
            infected_duration: 0.0,
            uses_protection,
        }
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn velocity(&self) -> (f64, f64) {
        (self.vx, self.vy)
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    /// Simulated time since the agent last became infected.
    pub fn infected_duration(&self) -> f64 {
        self.infected_duration
    }

    pub fn uses_protection(&self) -> bool {
        self.uses_protection
    }

    pub(crate) fn set_uses_protection(&mut self, uses_protection: bool) {
        self.uses_protection = uses_protection;
    }

    /// Mark the agent infected, restarting its infection clock.
    pub fn infect(&mut self) {
        self.state = HealthState::Infected;
        self.infected_duration = 0.0;
    }

    pub fn distance(&self, other: &Agent) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Move the agent by its velocity scaled by `speed`, bouncing off the walls.
    pub fn advance(&mut self, speed: f64, arena: &Arena) {
        self.x += self.vx * speed;
        self.y += self.vy * speed;

        (self.x, self.vx) = bounce(self.x, self.vx, arena.width);
        (self.y, self.vy) = bounce(self.y, self.vy, arena.height);
    }

    /// Let an infected agent progress towards recovery.
    ///
    /// Returns `true` if the agent recovered.
    pub fn decay_infection<R: Rng + ?Sized>(
        &mut self,
        recovery_rate: f64,
        speed: f64,
        rng: &mut R,
    ) -> bool {
        if self.state != HealthState::Infected {
            return false;
        }
        self.infected_duration += speed;

        let prob = recovery_rate * speed / BASE_TICK_RATE;
        if trial(rng, prob) {
            self.state = HealthState::Recovered;
            self.infected_duration = 0.0;
            return true;
        }
        false
    }

    /// Let a healthy agent get vaccinated passively.
    ///
    /// Returns `true` if the agent was vaccinated.
    pub fn maybe_vaccinate<R: Rng + ?Sized>(
        &mut self,
        vaccination_rate: f64,
        speed: f64,
        rng: &mut R,
    ) -> bool {
        if self.state != HealthState::Healthy {
            return false;
        }
        // The trailing factor of 100 attenuates the rate by an extra order of
        // magnitude relative to recovery; kept as observed.
        let prob = (vaccination_rate / 100.0) * speed / BASE_TICK_RATE / 100.0;
        if trial(rng, prob) {
            self.state = HealthState::Vaccinated;
            return true;
        }
        false
    }
}

/// Reflect a coordinate off the walls of `[AGENT_RADIUS, extent - AGENT_RADIUS]`.
fn bounce(pos: f64, vel: f64, extent: f64) -> (f64, f64) {
    let max = extent - AGENT_RADIUS;
    if pos <= AGENT_RADIUS {
        (AGENT_RADIUS, vel.abs())
    } else if pos >= max {
        (max, -vel.abs())
    } else {
        (pos, vel)
    }
}

/// Bernoulli trial succeeding with probability `prob`.
///
/// Probabilities above 1 always succeed and probabilities of 0 or less never do.
pub(crate) fn trial<R: Rng + ?Sized>(rng: &mut R, prob: f64) -> bool {
    rng.random::<f64>() < prob
}
