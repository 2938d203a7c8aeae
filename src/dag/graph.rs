// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::Direction;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{CloudyError, Result};
use crate::types::{JobId, Status};

/// Directed graph of "must terminate before" edges between jobs.
///
/// Edge direction: dependency -> job. For a job B that depends on A we add
/// A -> B, so B is reachable from everything it (transitively) waits on.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraphMap<JobId, ()>,
}

/// Ordered copy of the adjacency, for before/after comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSnapshot {
    pub dependencies: BTreeMap<JobId, BTreeSet<JobId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `job` with its dependencies.
    ///
    /// Before anything is applied, every dependency is checked in ascending
    /// id order: if `job` already reaches it, the new edge would close a
    /// cycle and the call fails with [`CloudyError::CycleDetected`] leaving
    /// the graph untouched. Dependencies that are not yet known become bare
    /// nodes.
    pub fn add_job(&mut self, job: JobId, depends_on: &BTreeSet<JobId>) -> Result<()> {
        for dep in depends_on {
            if *dep == job {
                return Err(CloudyError::CycleDetected {
                    job,
                    dependency: *dep,
                });
            }
            if self.graph.contains_node(job)
                && self.graph.contains_node(*dep)
                && has_path_connecting(&self.graph, job, *dep, None)
            {
                return Err(CloudyError::CycleDetected {
                    job,
                    dependency: *dep,
                });
            }
        }

        self.graph.add_node(job);
        for dep in depends_on {
            self.graph.add_edge(*dep, job, ());
        }

        debug!(job = %job, deps = depends_on.len(), "dag: job registered");
        Ok(())
    }

    pub fn contains(&self, job: JobId) -> bool {
        self.graph.contains_node(job)
    }

    /// True iff every dependency of `job` is terminated.
    ///
    /// Jobs the graph has never seen have no dependencies and are ready.
    pub fn is_ready(&self, job: JobId, status_of: impl Fn(JobId) -> Option<Status>) -> bool {
        self.dependencies_of(job)
            .into_iter()
            .all(|dep| status_of(dep) == Some(Status::Terminated))
    }

    /// Direct dependencies, ascending.
    pub fn dependencies_of(&self, job: JobId) -> Vec<JobId> {
        self.neighbors(job, Direction::Incoming)
    }

    /// Direct dependents, ascending.
    pub fn dependents_of(&self, job: JobId) -> Vec<JobId> {
        self.neighbors(job, Direction::Outgoing)
    }

    fn neighbors(&self, job: JobId, dir: Direction) -> Vec<JobId> {
        if !self.graph.contains_node(job) {
            return Vec::new();
        }
        let mut out: Vec<JobId> = self.graph.neighbors_directed(job, dir).collect();
        out.sort_unstable();
        out
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let dependencies = self
            .graph
            .nodes()
            .map(|job| (job, self.dependencies_of(job).into_iter().collect()))
            .collect();
        GraphSnapshot { dependencies }
    }

    /// Whole-graph check; a topological sort fails if there is a cycle.
    pub fn verify_acyclic(&self) -> Result<()> {
        self.topological_order().map(|_| ())
    }

    /// Jobs ordered so every dependency precedes its dependents.
    pub fn topological_order(&self) -> Result<Vec<JobId>> {
        toposort(&self.graph, None).map_err(|cycle| {
            CloudyError::InvariantViolation(format!(
                "dependency graph has a cycle through {}",
                cycle.node_id()
            ))
        })
    }
}
