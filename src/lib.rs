//! Stochastic agent-based model of epidemic spread.
//!
//! Agents move in a bounded arena and an infected agent may infect healthy
//! agents in its proximity. Infected agents recover and healthy agents get
//! vaccinated passively. The [`engine::SimulationEngine`] is driven one tick
//! at a time by an external caller and exposes snapshots and a bounded
//! history of daily counts.

pub mod analysis;
pub mod clock;
pub mod config;
pub mod contact;
pub mod engine;
pub mod manager;
pub mod model;
pub mod params;
pub mod population;
pub mod stats;
