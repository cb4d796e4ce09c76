use crate::model::{Agent, BASE_TICK_RATE, HealthState, trial};
use crate::params::{ConfigError, check_num, check_positive};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const INFECTION_RADIUS: f64 = 15.0;
pub const PROTECTION_EFFECTIVENESS: f64 = 0.8;

/// Pairwise transmission model.
///
/// An infected agent may infect a healthy agent closer than `infection_radius`.
/// Each party using protection discounts the probability by
/// `protection_effectiveness`, and the discounts compound.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactModel {
    pub infection_radius: f64,
    pub protection_effectiveness: f64,
}

impl Default for ContactModel {
    fn default() -> Self {
        Self {
            infection_radius: INFECTION_RADIUS,
            protection_effectiveness: PROTECTION_EFFECTIVENESS,
        }
    }
}

impl ContactModel {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("infection radius", self.infection_radius)?;
        check_num(
            "protection effectiveness",
            self.protection_effectiveness,
            0.0..=1.0,
        )?;
        Ok(())
    }

    /// Whether `source` is able to infect `target` at all.
    pub fn in_contact(&self, source: &Agent, target: &Agent) -> bool {
        source.state() == HealthState::Infected
            && target.state() == HealthState::Healthy
            && source.distance(target) < self.infection_radius
    }

    /// Per-tick probability that `source` infects `target`, assuming contact.
    pub fn transmission_probability(
        &self,
        source: &Agent,
        target: &Agent,
        infection_rate: f64,
        speed: f64,
    ) -> f64 {
        let mut prob = (infection_rate / 100.0) * speed / BASE_TICK_RATE;
        let discount = 1.0 - self.protection_effectiveness;
        if source.uses_protection() {
            prob *= discount;
        }
        if target.uses_protection() {
            prob *= discount;
        }
        prob
    }

    /// Evaluate a single directed contact from `source` to `target`.
    ///
    /// Draws from `rng` only when the agents are in contact. Returns `true`
    /// if `target` was infected.
    pub fn evaluate_contact<R: Rng + ?Sized>(
        &self,
        source: &Agent,
        target: &mut Agent,
        infection_rate: f64,
        speed: f64,
        rng: &mut R,
    ) -> bool {
        if !self.in_contact(source, target) {
            return false;
        }
        let prob = self.transmission_probability(source, target, infection_rate, speed);
        if trial(rng, prob) {
            target.infect();
            return true;
        }
        false
    }
}
