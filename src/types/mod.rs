//! Core types and identifiers for the border crossing simulator
//!
//! This module contains fundamental types, identifiers, and configuration structures
//! used throughout the simulation system.
//!
//! # Overview
//!
//! - **Identifiers**: lane-scoped car and booth identifiers, UUID-based run identifiers
//! - **Enums**: car lifecycle, lane assignment policy, service model and run status
//! - **Configuration**: crossing and driver configuration with validation and CLI support
//!
//! # Usage Example
//!
//! ```rust
//! use border_wait_sim::types::*;
//!
//! let car = CarId::new(0, 3);
//! assert_eq!(car.to_string(), "q0_c3");
//!
//! let config = BorderCrossingConfig {
//!     queue_assignment: QueueAssignment::RoundRobin,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod enums;
pub mod identifiers;

// Re-export all public types for convenience
pub use config::*;
pub use enums::*;
pub use identifiers::*;
