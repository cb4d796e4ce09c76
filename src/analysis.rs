use crate::config::Config;
use crate::engine::Snapshot;
use crate::model::HealthState;
use crate::stats::{Accumulator, Counts};
use anyhow::{Context, Result};
use rmp_serde::decode;
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

pub trait Obs {
    fn update(&mut self, snapshot: &Snapshot) -> Result<()>;
    fn report(&self) -> serde_json::Value;
}

pub struct PeakInfected {
    peak: usize,
    day: u64,
}

impl PeakInfected {
    pub fn new() -> Self {
        Self { peak: 0, day: 0 }
    }
}

impl Obs for PeakInfected {
    fn update(&mut self, snapshot: &Snapshot) -> Result<()> {
        if snapshot.counts.infected > self.peak {
            self.peak = snapshot.counts.infected;
            self.day = snapshot.day;
        }
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "peak_infected": { "count": self.peak, "day": self.day } })
    }
}

pub struct FinalCounts {
    last: Option<(u64, Counts)>,
}

impl FinalCounts {
    pub fn new() -> Self {
        Self { last: None }
    }
}

impl Obs for FinalCounts {
    fn update(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.last = Some((snapshot.day, snapshot.counts));
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        let Some((day, counts)) = self.last else {
            return serde_json::json!({ "final_counts": null });
        };
        // Share of the population that was ever infected.
        let attack_rate = (counts.infected + counts.recovered) as f64 / counts.total() as f64;
        serde_json::json!({
            "final_counts": { "day": day, "counts": counts, "attack_rate": attack_rate }
        })
    }
}

pub struct MeanCounts {
    acc_vec: Vec<Accumulator>,
}

impl MeanCounts {
    pub fn new() -> Self {
        let mut acc_vec = Vec::new();
        acc_vec.resize_with(HealthState::ALL.len(), Accumulator::new);
        Self { acc_vec }
    }
}

impl Obs for MeanCounts {
    fn update(&mut self, snapshot: &Snapshot) -> Result<()> {
        for (acc, state) in self.acc_vec.iter_mut().zip(HealthState::ALL) {
            acc.add(snapshot.counts.get(state) as f64);
        }
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        let reports: serde_json::Map<String, serde_json::Value> = HealthState::ALL
            .iter()
            .zip(&self.acc_vec)
            .map(|(state, acc)| {
                let key = format!("{state:?}").to_lowercase();
                (key, serde_json::json!(acc.report()))
            })
            .collect();
        serde_json::json!({ "mean_counts": reports })
    }
}

pub struct Analyzer {
    cfg: Config,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(cfg: Config) -> Self {
        let mut obs_ptr_vec: Vec<Box<dyn Obs>> = Vec::new();
        obs_ptr_vec.push(Box::new(PeakInfected::new()));
        obs_ptr_vec.push(Box::new(FinalCounts::new()));
        obs_ptr_vec.push(Box::new(MeanCounts::new()));
        Self { cfg, obs_ptr_vec }
    }

    pub fn add_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        for obs in &mut self.obs_ptr_vec {
            obs.update(snapshot).context("failed to update observable")?;
        }
        Ok(())
    }

    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        for _ in 0..self.cfg.output.n_saves() {
            let snapshot: Snapshot =
                decode::from_read(&mut reader).context("failed to read snapshot")?;
            self.add_snapshot(&snapshot)?;
        }
        Ok(())
    }

    pub fn results(&self) -> Vec<serde_json::Value> {
        self.obs_ptr_vec.iter().map(|obs| obs.report()).collect()
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, &self.results())
            .context("failed to serialize results")?;
        Ok(())
    }
}
