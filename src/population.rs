use crate::contact::ContactModel;
use crate::model::{Agent, Arena, HealthState};
use crate::params::{ConfigError, SimulationParameters, protection_probability};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use std::fmt::Display;

/// Inset from the arena edges within which new agents are placed.
pub const SPAWN_MARGIN: f64 = 20.0;

/// Distributions used to place new agents.
#[derive(Debug, Clone)]
struct Spawner {
    x_dist: Uniform<f64>,
    y_dist: Uniform<f64>,
    vel_dist: Uniform<f64>,
}

impl Spawner {
    fn new(arena: &Arena) -> Result<Self, ConfigError> {
        arena.validate()?;
        Ok(Self {
            x_dist: Uniform::new(SPAWN_MARGIN, arena.width - SPAWN_MARGIN).map_err(spawn_err)?,
            y_dist: Uniform::new(SPAWN_MARGIN, arena.height - SPAWN_MARGIN).map_err(spawn_err)?,
            vel_dist: Uniform::new(-1.0, 1.0).map_err(spawn_err)?,
        })
    }

    fn spawn<R: Rng + ?Sized>(&self, protection_prob: f64, rng: &mut R) -> Agent {
        let position = (self.x_dist.sample(rng), self.y_dist.sample(rng));
        let velocity = (self.vel_dist.sample(rng), self.vel_dist.sample(rng));
        let uses_protection = rng.random_bool(protection_prob);
        Agent::new(position, velocity, uses_protection)
    }
}

fn spawn_err(err: impl Display) -> ConfigError {
    ConfigError::Spawn(err.to_string())
}

/// Ordered collection of agents.
///
/// Order is creation order and only fixes the sequence of random draws.
#[derive(Debug, Clone)]
pub struct Population {
    spawner: Spawner,
    agt_vec: Vec<Agent>,
    i_agt_inf: Vec<usize>,
}

impl Population {
    /// Create an empty population for `arena`.
    pub fn new(arena: &Arena) -> Result<Self, ConfigError> {
        Ok(Self {
            spawner: Spawner::new(arena)?,
            agt_vec: Vec::new(),
            i_agt_inf: Vec::new(),
        })
    }

    /// Create a population from existing agents.
    ///
    /// # Errors
    /// Returns an error if any agent lies outside `arena`.
    pub fn from_agents(arena: &Arena, agt_vec: Vec<Agent>) -> Result<Self, ConfigError> {
        let mut population = Self::new(arena)?;
        for (index, agt) in agt_vec.iter().enumerate() {
            let (x, y) = agt.position();
            if !arena.contains(x, y) {
                return Err(ConfigError::AgentOutsideArena { index, x, y });
            }
        }
        population.agt_vec = agt_vec;
        Ok(population)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agt_vec
    }

    pub fn len(&self) -> usize {
        self.agt_vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agt_vec.is_empty()
    }

    /// Number of agents in `state`.
    pub fn count(&self, state: HealthState) -> usize {
        self.agt_vec.iter().filter(|agt| agt.state() == state).count()
    }

    /// Replace every agent with `n_agt` new ones; the first one starts infected.
    pub fn recreate<R: Rng + ?Sized>(
        &mut self,
        n_agt: usize,
        protection_adoption: u32,
        rng: &mut R,
    ) {
        let protection_prob = protection_probability(protection_adoption);

        self.agt_vec.clear();
        self.agt_vec.reserve(n_agt);
        for _ in 0..n_agt {
            self.agt_vec.push(self.spawner.spawn(protection_prob, rng));
        }

        if let Some(agt) = self.agt_vec.first_mut() {
            agt.infect();
        }
    }

    /// Move every agent and apply recovery and vaccination.
    pub fn advance_all<R: Rng + ?Sized>(
        &mut self,
        params: &SimulationParameters,
        arena: &Arena,
        rng: &mut R,
    ) {
        for agt in &mut self.agt_vec {
            agt.advance(params.speed, arena);
            agt.decay_infection(params.recovery_rate, params.speed, rng);
            agt.maybe_vaccinate(params.vaccination_rate, params.speed, rng);
        }
    }

    /// Evaluate every contact from an infected agent to any other agent.
    ///
    /// Only agents infected before the scan act as sources. Agents infected
    /// during the scan can no longer be infected again, but do not transmit
    /// until the next call. Returns the number of new infections.
    pub fn resolve_contacts<R: Rng + ?Sized>(
        &mut self,
        model: &ContactModel,
        params: &SimulationParameters,
        rng: &mut R,
    ) -> usize {
        self.i_agt_inf.clear();
        self.i_agt_inf.extend(
            self.agt_vec
                .iter()
                .enumerate()
                .filter(|(_, agt)| agt.state() == HealthState::Infected)
                .map(|(i_agt, _)| i_agt),
        );

        let mut n_new = 0;
        for &i_src in &self.i_agt_inf {
            let source = self.agt_vec[i_src];
            for (i_tgt, target) in self.agt_vec.iter_mut().enumerate() {
                if i_tgt == i_src {
                    continue;
                }
                if model.evaluate_contact(
                    &source,
                    target,
                    params.infection_rate,
                    params.speed,
                    rng,
                ) {
                    n_new += 1;
                }
            }
        }
        n_new
    }

    /// Resample every agent's protection flag without touching health states.
    pub fn resample_protection<R: Rng + ?Sized>(&mut self, protection_adoption: u32, rng: &mut R) {
        let protection_prob = protection_probability(protection_adoption);
        for agt in &mut self.agt_vec {
            agt.set_uses_protection(rng.random_bool(protection_prob));
        }
    }
}
