//! Simulation driving, reporting and error handling
//!
//! # Overview
//!
//! - **Simulation**: owns a crossing, advances it tick by tick and decides when to stop
//! - **SimulationRegistry**: host-owned collection of runs
//! - **CrossingStatistics / SimulationReport**: metrics snapshots and the end-of-run report
//! - **SimulationError**: error type shared by the engine and the driver
//! - **LoggingConfig**: tracing subscriber setup
//!
//! # Usage Example
//!
//! ```rust
//! use border_wait_sim::simulation::*;
//! use border_wait_sim::types::*;
//!
//! let mut scenario = ScenarioConfig::default();
//! scenario.simulation.seed = Some(42);
//! scenario.simulation.max_simulation_time = 600.0;
//!
//! let mut simulation = Simulation::from_scenario(&scenario).unwrap();
//! let report = simulation.run().unwrap();
//! assert_eq!(report.status, RunStatus::Completed);
//! println!("{}", report.compact_summary());
//! ```

pub mod driver;
pub mod error;
pub mod logging;
pub mod registry;
pub mod statistics;

// Re-export all public types for convenience
pub use driver::*;
pub use error::*;
pub use logging::*;
pub use registry::*;
pub use statistics::*;
