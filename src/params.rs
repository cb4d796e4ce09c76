use serde::{Deserialize, Serialize};
use std::{fmt::Debug, ops::RangeBounds};
use thiserror::Error;

/// Error raised when a configuration value is rejected.
///
/// The state that was about to be configured is always left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be in the range {range}, but is {value}")]
    OutOfRange {
        name: &'static str,
        range: String,
        value: String,
    },
    #[error("{name} must be finite, but is {value}")]
    NotFinite { name: &'static str, value: f64 },
    #[error("{name} must be positive, but is {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("arena must be larger than {min} in each dimension, but is {width} x {height}")]
    ArenaTooSmall { min: f64, width: f64, height: f64 },
    #[error("failed to build spawn distribution: {0}")]
    Spawn(String),
    #[error("population must have {expected} agents, but has {actual}")]
    PopulationMismatch { expected: usize, actual: usize },
    #[error("population must start with exactly one infected agent, but has {count}")]
    SeedInfected { count: usize },
    #[error("agent {index} at ({x}, {y}) lies outside the arena")]
    AgentOutsideArena { index: usize, x: f64, y: f64 },
}

/// Simulation parameters.
///
/// Rates are expressed in the units the control surface uses; every per-tick
/// probability is derived from them by scaling with `speed / 60`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Number of agents.
    pub population: usize,
    /// Contact transmission rate (percent).
    pub infection_rate: f64,
    /// Recovery rate of infected agents (per minute).
    pub recovery_rate: f64,
    /// Passive vaccination rate of healthy agents (percent).
    pub vaccination_rate: f64,
    /// Fraction of agents using protection (percent, at most 100).
    pub protection_adoption: u32,
    /// Speed multiplier for motion and for the accrual of simulated time.
    pub speed: f64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            population: 200,
            infection_rate: 2.5,
            recovery_rate: 0.1,
            vaccination_rate: 0.5,
            protection_adoption: 60,
            speed: 1.0,
        }
    }
}

/// Partial update of [`SimulationParameters`].
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct ParamsDelta {
    pub population: Option<usize>,
    pub infection_rate: Option<f64>,
    pub recovery_rate: Option<f64>,
    pub vaccination_rate: Option<f64>,
    pub protection_adoption: Option<u32>,
    pub speed: Option<f64>,
}

impl SimulationParameters {
    /// Check every parameter, reporting the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_num("population", self.population, 1..)?;
        check_rate("infection rate", self.infection_rate)?;
        check_rate("recovery rate", self.recovery_rate)?;
        check_rate("vaccination rate", self.vaccination_rate)?;
        check_num("protection adoption", self.protection_adoption, 0..=100)?;
        check_positive("speed", self.speed)?;
        Ok(())
    }

    /// Return a copy of these parameters with `delta` applied.
    ///
    /// Protection adoption above 100 percent is clamped, since it is a
    /// probability; every other invalid value is rejected.
    ///
    /// # Errors
    /// Returns an error if the merged parameters are invalid.
    pub fn merged(&self, delta: &ParamsDelta) -> Result<Self, ConfigError> {
        let mut params = self.clone();
        if let Some(population) = delta.population {
            params.population = population;
        }
        if let Some(rate) = delta.infection_rate {
            params.infection_rate = rate;
        }
        if let Some(rate) = delta.recovery_rate {
            params.recovery_rate = rate;
        }
        if let Some(rate) = delta.vaccination_rate {
            params.vaccination_rate = rate;
        }
        if let Some(adoption) = delta.protection_adoption {
            if adoption > 100 {
                log::warn!("clamping protection adoption {adoption} to 100");
            }
            params.protection_adoption = adoption.min(100);
        }
        if let Some(speed) = delta.speed {
            params.speed = speed;
        }
        params.validate()?;
        Ok(params)
    }

    /// Probability that an agent samples `uses_protection = true`.
    pub fn protection_probability(&self) -> f64 {
        protection_probability(self.protection_adoption)
    }
}

pub(crate) fn protection_probability(adoption: u32) -> f64 {
    f64::from(adoption.min(100)) / 100.0
}

pub(crate) fn check_num<T, R>(name: &'static str, num: T, range: R) -> Result<(), ConfigError>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        return Err(ConfigError::OutOfRange {
            name,
            range: format!("{range:?}"),
            value: format!("{num:?}"),
        });
    }
    Ok(())
}

pub(crate) fn check_finite(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { name, value });
    }
    Ok(())
}

pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    check_finite(name, value)?;
    if value <= 0.0 {
        return Err(ConfigError::NotPositive { name, value });
    }
    Ok(())
}

fn check_rate(name: &'static str, value: f64) -> Result<(), ConfigError> {
    check_finite(name, value)?;
    check_num(name, value, 0.0..)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(SimulationParameters::default().validate(), Ok(()));
    }

    #[test]
    fn merge_applies_only_given_fields() {
        let params = SimulationParameters::default();
        let delta = ParamsDelta {
            infection_rate: Some(10.0),
            speed: Some(2.0),
            ..ParamsDelta::default()
        };
        let merged = params.merged(&delta).expect("valid delta");
        assert_eq!(merged.infection_rate, 10.0);
        assert_eq!(merged.speed, 2.0);
        assert_eq!(merged.population, params.population);
        assert_eq!(merged.recovery_rate, params.recovery_rate);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let params = SimulationParameters::default();

        let zero_population = ParamsDelta {
            population: Some(0),
            ..ParamsDelta::default()
        };
        assert!(matches!(
            params.merged(&zero_population),
            Err(ConfigError::OutOfRange {
                name: "population",
                ..
            })
        ));

        let negative_rate = ParamsDelta {
            recovery_rate: Some(-0.5),
            ..ParamsDelta::default()
        };
        assert!(matches!(
            params.merged(&negative_rate),
            Err(ConfigError::OutOfRange {
                name: "recovery rate",
                ..
            })
        ));

        let nan_rate = ParamsDelta {
            infection_rate: Some(f64::NAN),
            ..ParamsDelta::default()
        };
        assert!(matches!(
            params.merged(&nan_rate),
            Err(ConfigError::NotFinite { .. })
        ));

        let zero_speed = ParamsDelta {
            speed: Some(0.0),
            ..ParamsDelta::default()
        };
        assert!(matches!(
            params.merged(&zero_speed),
            Err(ConfigError::NotPositive { name: "speed", .. })
        ));
    }

    #[test]
    fn protection_adoption_is_clamped() {
        let delta = ParamsDelta {
            protection_adoption: Some(250),
            ..ParamsDelta::default()
        };
        let merged = SimulationParameters::default()
            .merged(&delta)
            .expect("adoption is clamped, not rejected");
        assert_eq!(merged.protection_adoption, 100);
        assert_eq!(merged.protection_probability(), 1.0);
    }
}
