// src/engine/mod.rs

//! Simulation engine for cloudy.
//!
//! The pure tick loop lives in [`simulation`]; it owns one scheduler and one
//! interruption stream and performs no IO. The async shell in [`runner`]
//! fans several seeded runs out over Tokio's blocking pool.

pub mod runner;
pub mod simulation;

pub use runner::run_many;
pub use simulation::{Simulation, SimulationReport};
