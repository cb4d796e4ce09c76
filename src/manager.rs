use crate::analysis::Analyzer;
use crate::config::Config;
use crate::engine::SimulationEngine;
use anyhow::{Context, Result};
use glob::glob;
use rmp_serde::encode;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Manages the runs of a simulation directory.
///
/// The directory holds a `config.toml` and one `run-NNNN` directory per run.
pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Run a new simulation in the next free run directory.
    pub fn create_run(&self) -> Result<()> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let seed = self.cfg.seed.map(|seed| seed.wrapping_add(run_idx as u64));
        let mut engine = SimulationEngine::new(
            self.cfg.params.clone(),
            self.cfg.arena,
            self.cfg.contact,
            seed,
        )
        .context("failed to construct engine")?;

        self.perform_run(&mut engine, run_idx).context("failed to perform run")?;

        let history_file = self.history_file(run_idx);
        let file = File::create(&history_file)
            .with_context(|| format!("failed to create {history_file:?}"))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &engine.history())
            .context("failed to serialize history")?;
        log::info!("wrote {history_file:?}");

        Ok(())
    }

    fn perform_run(&self, engine: &mut SimulationEngine, run_idx: usize) -> Result<()> {
        let file = self.trajectory_file(run_idx);
        let file = File::create(&file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let n_days = self.cfg.output.n_days;
        let days_per_save = self.cfg.output.days_per_save;

        engine.start();
        while engine.day() < n_days {
            let prev_day = engine.day();
            let snapshot = engine.tick().context("engine stopped unexpectedly")?;
            if snapshot.day == prev_day || snapshot.day % days_per_save != 0 {
                continue;
            }

            encode::write(&mut writer, &snapshot).context("failed to serialize snapshot")?;

            let progress = 100.0 * snapshot.day as f64 / n_days as f64;
            log::info!("completed {progress:06.2}%");
        }
        engine.pause();

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }

    /// Analyze every run and save its results.
    pub fn analyze_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let mut analyzer = Analyzer::new(self.cfg.clone());

            analyzer
                .add_file(self.trajectory_file(run_idx))
                .context("failed to add file")?;

            let results_file = self.results_file(run_idx);
            analyzer
                .save_results(&results_file)
                .context("failed to save results")?;
            log::info!("wrote {results_file:?}");
        }

        Ok(())
    }

    /// Remove every run directory.
    pub fn clean_sim(&self) -> Result<()> {
        for run_dir in self.run_dirs().context("failed to list run dirs")? {
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }

        Ok(())
    }

    fn run_dirs(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let run_dirs = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        Ok(run_dirs)
    }

    fn count_run_dirs(&self) -> Result<usize> {
        Ok(self.run_dirs()?.len())
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn trajectory_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("trajectory.msgpack")
    }

    fn history_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("history.json")
    }

    fn results_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("results.json")
    }
}
