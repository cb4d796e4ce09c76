use crate::model::HealthState;
use crate::population::Population;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of samples kept in the history.
pub const HISTORY_CAPACITY: usize = 200;

/// Number of agents in each health state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub healthy: usize,
    pub infected: usize,
    pub recovered: usize,
    pub vaccinated: usize,
}

impl Counts {
    pub fn get(&self, state: HealthState) -> usize {
        match state {
            HealthState::Healthy => self.healthy,
            HealthState::Infected => self.infected,
            HealthState::Recovered => self.recovered,
            HealthState::Vaccinated => self.vaccinated,
        }
    }

    fn add(&mut self, state: HealthState) {
        match state {
            HealthState::Healthy => self.healthy += 1,
            HealthState::Infected => self.infected += 1,
            HealthState::Recovered => self.recovered += 1,
            HealthState::Vaccinated => self.vaccinated += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.healthy + self.infected + self.recovered + self.vaccinated
    }
}

/// Counts recorded at the end of a simulated day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub day: u64,
    #[serde(flatten)]
    pub counts: Counts,
}

/// Tallies health states and keeps a bounded history of daily counts.
#[derive(Debug, Clone)]
pub struct StatisticsAggregator {
    history: VecDeque<HistoryEntry>,
    capacity: usize,
    latest: Counts,
    peak_infected: usize,
}

impl Default for StatisticsAggregator {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl StatisticsAggregator {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity + 1),
            capacity,
            latest: Counts::default(),
            peak_infected: 0,
        }
    }

    /// Count the agents of `population` in each health state.
    pub fn sample(population: &Population) -> Counts {
        let mut counts = Counts::default();
        for agt in population.agents() {
            counts.add(agt.state());
        }
        counts
    }

    /// Update the latest counts without recording them.
    pub fn refresh(&mut self, population: &Population) -> Counts {
        self.latest = Self::sample(population);
        self.latest
    }

    /// Append `counts` for `day`, evicting the oldest entry when full.
    pub fn record(&mut self, day: u64, counts: Counts) {
        self.latest = counts;
        self.peak_infected = self.peak_infected.max(counts.infected);

        self.history.push_back(HistoryEntry { day, counts });
        if self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    pub fn latest(&self) -> Counts {
        self.latest
    }

    pub fn peak_infected(&self) -> usize {
        self.peak_infected
    }

    pub fn history(&self) -> impl ExactSizeIterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    /// Forget the history and the peak.
    pub fn clear(&mut self) {
        self.history.clear();
        self.latest = Counts::default();
        self.peak_infected = 0;
    }
}

/// Running mean and sample standard deviation (Welford's algorithm).
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}
