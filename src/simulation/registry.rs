//! Registry of simulation runs
//!
//! Hosts that manage several runs keep them in a [`SimulationRegistry`] they
//! own and pass around, rather than in process-wide state.

use crate::simulation::Simulation;
use crate::types::{RunStatus, SimulationId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Listing entry for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    /// Run identifier
    pub id: SimulationId,
    /// Run state
    pub status: RunStatus,
    /// Simulated seconds elapsed
    pub simulation_time: f64,
    /// Fraction of the horizon covered
    pub progress: f64,
    /// Cars in the crossing
    pub active_cars: usize,
    /// Cars admitted
    pub total_arrivals: u64,
    /// Cars that finished inspection
    pub total_completions: u64,
}

impl From<&Simulation> for SimulationSummary {
    fn from(simulation: &Simulation) -> Self {
        let crossing = simulation.crossing();
        Self {
            id: simulation.id(),
            status: simulation.status(),
            simulation_time: simulation.simulation_time(),
            progress: simulation.progress(),
            active_cars: crossing.total_active_cars(),
            total_arrivals: crossing.total_arrivals(),
            total_completions: crossing.total_completions(),
        }
    }
}

/// Runs in creation order with lookup by identifier
#[derive(Debug, Default)]
pub struct SimulationRegistry {
    simulations: Vec<Simulation>,
    index: HashMap<SimulationId, usize>,
}

impl SimulationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a run and return its identifier
    pub fn create(&mut self, simulation: Simulation) -> SimulationId {
        let id = simulation.id();
        self.index.insert(id, self.simulations.len());
        self.simulations.push(simulation);
        debug!(simulation = %id, total = self.simulations.len(), "simulation registered");
        id
    }

    /// Look up a run
    pub fn get(&self, id: SimulationId) -> Option<&Simulation> {
        self.index.get(&id).map(|&i| &self.simulations[i])
    }

    /// Look up a run for mutation
    pub fn get_mut(&mut self, id: SimulationId) -> Option<&mut Simulation> {
        let i = *self.index.get(&id)?;
        self.simulations.get_mut(i)
    }

    /// Remove a run, handing it back to the caller
    pub fn remove(&mut self, id: SimulationId) -> Option<Simulation> {
        let i = self.index.remove(&id)?;
        let simulation = self.simulations.remove(i);
        self.rebuild_index();
        debug!(simulation = %id, "simulation removed");
        Some(simulation)
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .simulations
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id(), i))
            .collect();
    }

    /// Number of runs held
    pub fn len(&self) -> usize {
        self.simulations.len()
    }

    /// Whether the registry holds no runs
    pub fn is_empty(&self) -> bool {
        self.simulations.is_empty()
    }

    /// Summaries in creation order, optionally filtered by status and capped
    pub fn list(&self, status: Option<RunStatus>, limit: Option<usize>) -> Vec<SimulationSummary> {
        self.simulations
            .iter()
            .filter(|s| status.map_or(true, |wanted| s.status() == wanted))
            .take(limit.unwrap_or(usize::MAX))
            .map(SimulationSummary::from)
            .collect()
    }
}
