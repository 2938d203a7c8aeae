// src/dag/mod.rs

//! Job dependency graph.
//!
//! - [`graph`] holds the directed "must terminate before" graph and rejects
//!   mutations that would close a cycle.

pub mod graph;

pub use graph::{DependencyGraph, GraphSnapshot};
