use crate::contact::ContactModel;
use crate::model::Arena;
use crate::params::{SimulationParameters, check_num};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Run configuration.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base seed of the random number generator (run `i` uses `seed + i`).
    #[serde(default)]
    pub seed: Option<u64>,

    /// Simulation parameters.
    pub params: SimulationParameters,

    /// Arena dimensions.
    pub arena: Arena,

    /// Contact model (defaults if omitted).
    #[serde(default)]
    pub contact: ContactModel,

    /// Output configuration.
    pub output: OutputConfig,
}

/// Output configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Number of simulated days per run.
    pub n_days: u64,
    /// Number of simulated days between trajectory saves.
    pub days_per_save: u64,
}

impl OutputConfig {
    /// Number of snapshots saved per run.
    pub fn n_saves(&self) -> u64 {
        self.n_days / self.days_per_save
    }
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.params.validate().context("invalid params")?;
        self.arena.validate().context("invalid arena")?;
        self.contact.validate().context("invalid contact model")?;

        check_num("number of days", self.output.n_days, 1..=100_000)
            .context("invalid output")?;
        check_num(
            "number of days per save",
            self.output.days_per_save,
            1..=self.output.n_days,
        )
        .context("invalid output")?;

        Ok(())
    }
}
