//! Border Wait Simulator
//!
//! A discrete-time simulation of vehicle flow through a multi-lane,
//! multi-booth border crossing. It produces time-resolved state for wait-time
//! estimation and synthetic position data.
//!
//! # Overview
//!
//! Each lane is a one-dimensional road on which cars follow each other at a
//! safe distance and end at one or more inspection booths. Arrivals are
//! Poisson with an hour-of-day profile and booths draw exponential service
//! times. The crossing routes every arrival to a lane, runs car-following,
//! moves head cars into free booths and finishes due inspections, once per
//! tick.
//!
//! ## Key Features
//!
//! - **Car-Following Physics**: bounded acceleration and gap-based target speeds
//! - **Stochastic Processes**: time-of-day arrivals and several service time models
//! - **Lane Assignment**: random, shortest-queue and round-robin policies
//! - **Reproducible Runs**: one seeded generator per simulation threads through every draw
//! - **Reporting**: state snapshots, per-lane and per-booth statistics, JSON reports
//!
//! ## Quick Start
//!
//! ```rust
//! use border_wait_sim::*;
//!
//! let crossing_config = BorderCrossingConfig::default();
//! let simulation_config = SimulationConfig {
//!     max_simulation_time: 900.0,
//!     seed: Some(7),
//!     ..Default::default()
//! };
//!
//! let mut simulation = Simulation::new(
//!     crossing_config,
//!     simulation_config,
//!     Box::new(PolylinePath::straight(1000.0)),
//! )?;
//! let report = simulation.run()?;
//! println!("{}", report.compact_summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`types`]: identifiers, enums and configuration
//! - [`geometry`]: points and the path cars travel along
//! - [`queuing`]: arrival and service processes, M/M/1 reference model
//! - [`crossing`]: cars, booths, lanes and the crossing
//! - [`simulation`]: the driver, registry, statistics, logging and errors
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │   Types     │    │  Queuing    │    │  Geometry   │
//! │             │    │             │    │             │
//! │ Identifiers │◄───┤ Arrivals    │    │ Point2D     │
//! │ Enums       │    │ Service     │    │ Paths       │
//! │ Config      │    │ M/M/1       │    │             │
//! └─────────────┘    └─────────────┘    └─────────────┘
//!        ▲                   ▲                   ▲
//!        │                   │                   │
//! ┌─────────────┐    ┌─────────────┐            │
//! │  Crossing   │    │ Simulation  │────────────┘
//! │             │    │             │
//! │ Cars, Lanes │◄───┤ Driver      │
//! │ Booths      │    │ Registry    │
//! │ Snapshots   │    │ Statistics  │
//! └─────────────┘    └─────────────┘
//! ```
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

// Module declarations
pub mod crossing;
pub mod geometry;
pub mod queuing;
pub mod simulation;

pub mod types;

// Core types and identifiers
pub use types::{
    // Configuration
    BorderCrossingConfig,
    // Identifiers
    CarId,
    // Enums
    CarStatus,
    ConfigError,
    ConfigValidationError,
    NodeId,
    QueueAssignment,
    RunStatus,
    ScenarioConfig,
    ServiceTimeModel,
    SimulationConfig,
    SimulationId,
};

// Geometry
pub use geometry::{PathGeometry, Point2D, PolylinePath};

// Stochastic processes
pub use queuing::{ArrivalProcess, Mm1Queue, Mm1Report, ServiceProcess};

// Crossing model
pub use crossing::{BorderCrossing, Car, CarQueue, CrossingState, ServiceNode};

// Simulation types and functionality
pub use simulation::{
    CrossingStatistics, NoopObserver, Simulation, SimulationError, SimulationRegistry,
    SimulationReport, SimulationResult, StopHandle, TickObserver,
};
