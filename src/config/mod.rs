// src/config/mod.rs

//! Configuration loading and validation for cloudy.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Locate and load a config file (`loader.rs`).
//! - Validate counts, caps and probabilities (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    CONFIG_ENV, ConfigSource, load_and_validate, load_from_path, load_source, locate_config,
    parse_config,
};
pub use model::{ClusterSection, ConfigFile, GenerationSection, RawConfigFile, SimulationSection};
