use crate::clock::SimulationClock;
use crate::contact::ContactModel;
use crate::model::{Agent, Arena, HealthState};
use crate::params::{ConfigError, ParamsDelta, SimulationParameters};
use crate::population::Population;
use crate::stats::{Counts, HistoryEntry, StatisticsAggregator};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

/// Whether the engine consumes ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Stopped,
    Running,
}

/// Rendering view of a single agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub x: f64,
    pub y: f64,
    pub state: HealthState,
    pub uses_protection: bool,
}

impl From<&Agent> for AgentView {
    fn from(agt: &Agent) -> Self {
        let (x, y) = agt.position();
        Self {
            x,
            y,
            state: agt.state(),
            uses_protection: agt.uses_protection(),
        }
    }
}

/// Immutable copy of the simulation state taken between ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub agents: Vec<AgentView>,
    pub counts: Counts,
    pub day: u64,
    pub peak_infected: usize,
}

/// Simulation engine.
///
/// Owns the population, clock, statistics and random number generator, and is
/// driven by an external caller invoking [`SimulationEngine::tick`] once per frame.
pub struct SimulationEngine {
    params: SimulationParameters,
    arena: Arena,
    contact: ContactModel,
    population: Population,
    clock: SimulationClock,
    stats: StatisticsAggregator,
    run_state: RunState,
    rng: ChaCha12Rng,
}

impl SimulationEngine {
    /// Create a stopped engine with a freshly generated population.
    ///
    /// With a `seed` every run is reproducible; otherwise the generator is
    /// seeded from the operating system.
    pub fn new(
        params: SimulationParameters,
        arena: Arena,
        contact: ContactModel,
        seed: Option<u64>,
    ) -> Result<Self> {
        let population = Population::new(&arena).context("invalid arena")?;
        let mut engine = Self::build(params, arena, contact, population, seed)?;
        engine.recreate_population();
        log::info!(
            "created engine with {} agents in a {} x {} arena",
            engine.population.len(),
            arena.width,
            arena.height
        );
        Ok(engine)
    }

    /// Create a stopped engine around the given agents.
    ///
    /// The agents must match the configured population size, lie inside the
    /// arena and include exactly one infected agent. They are kept as given
    /// until the next population change or reset.
    pub fn with_population(
        params: SimulationParameters,
        arena: Arena,
        contact: ContactModel,
        agt_vec: Vec<Agent>,
        seed: Option<u64>,
    ) -> Result<Self> {
        if agt_vec.len() != params.population {
            return Err(ConfigError::PopulationMismatch {
                expected: params.population,
                actual: agt_vec.len(),
            })
            .context("invalid agents");
        }
        let n_inf = agt_vec
            .iter()
            .filter(|agt| agt.state() == HealthState::Infected)
            .count();
        if n_inf != 1 {
            return Err(ConfigError::SeedInfected { count: n_inf }).context("invalid agents");
        }
        let population = Population::from_agents(&arena, agt_vec).context("invalid agents")?;
        Self::build(params, arena, contact, population, seed)
    }

    fn build(
        params: SimulationParameters,
        arena: Arena,
        contact: ContactModel,
        population: Population,
        seed: Option<u64>,
    ) -> Result<Self> {
        params.validate().context("invalid parameters")?;
        contact.validate().context("invalid contact model")?;

        let rng = match seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng().context("failed to seed rng")?,
        };

        let mut stats = StatisticsAggregator::default();
        stats.refresh(&population);

        Ok(Self {
            params,
            arena,
            contact,
            population,
            clock: SimulationClock::new(),
            stats,
            run_state: RunState::Stopped,
            rng,
        })
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn day(&self) -> u64 {
        self.clock.day()
    }

    pub fn peak_infected(&self) -> usize {
        self.stats.peak_infected()
    }

    /// Counts from the last recorded day or population change.
    pub fn counts(&self) -> Counts {
        self.stats.latest()
    }

    /// Bounded history of daily counts, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.stats.history().copied().collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            agents: self.population.agents().iter().map(AgentView::from).collect(),
            counts: self.stats.latest(),
            day: self.clock.day(),
            peak_infected: self.stats.peak_infected(),
        }
    }

    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.run_state = RunState::Running;
        log::info!("started at day {}", self.clock.day());
    }

    pub fn pause(&mut self) {
        if !self.is_running() {
            return;
        }
        self.run_state = RunState::Stopped;
        log::info!("paused at day {}", self.clock.day());
    }

    /// Stop the engine and return it to its initial state.
    pub fn reset(&mut self) {
        self.run_state = RunState::Stopped;
        self.clock.reset();
        self.stats.clear();
        self.recreate_population();
        log::info!("reset with {} agents", self.population.len());
    }

    /// Advance the whole simulation by one frame.
    ///
    /// Returns `None` without touching any state while stopped.
    pub fn tick(&mut self) -> Option<Snapshot> {
        if !self.is_running() {
            return None;
        }

        self.population.advance_all(&self.params, &self.arena, &mut self.rng);

        let n_new = self.population.resolve_contacts(&self.contact, &self.params, &mut self.rng);
        log::trace!("{n_new} new infections");

        // Counts are sampled after the contacts of the tick that starts a day.
        if let Some(day) = self.clock.tick(self.params.speed) {
            let counts = StatisticsAggregator::sample(&self.population);
            self.stats.record(day, counts);
            log::debug!("day {day}: {counts:?}");
        }

        Some(self.snapshot())
    }

    /// Apply a partial configuration change.
    ///
    /// While stopped, the population is recreated whenever its size differs
    /// from the configured one; while running, size changes are deferred to
    /// the next reset. Providing a protection adoption resamples every
    /// agent's protection flag.
    ///
    /// # Errors
    /// Returns an error, leaving the engine unchanged, if the resulting
    /// parameters are invalid.
    pub fn configure(&mut self, delta: &ParamsDelta) -> Result<(), ConfigError> {
        let params = self.params.merged(delta)?;
        let population_changed = params.population != self.params.population;
        self.params = params;

        if self.is_running() {
            if population_changed {
                log::info!(
                    "deferring population change to {} until reset",
                    self.params.population
                );
            }
        } else if self.params.population != self.population.len() {
            self.recreate_population();
            return Ok(());
        }

        if delta.protection_adoption.is_some() {
            self.population.resample_protection(self.params.protection_adoption, &mut self.rng);
        }

        Ok(())
    }

    fn recreate_population(&mut self) {
        self.population.recreate(
            self.params.population,
            self.params.protection_adoption,
            &mut self.rng,
        );
        self.stats.refresh(&self.population);
    }
}
