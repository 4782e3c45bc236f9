//! Error types and handling
//!
//! This module contains error types for the crossing engine and the driver.

use crate::types::{ConfigError, ConfigValidationError};
use thiserror::Error;

/// Errors that can occur during simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ConfigurationError(String),

    /// Time step or clock error
    #[error("Time management error: {0}")]
    TimeError(String),

    /// Service node error
    #[error("Service node error: {0}")]
    NodeError(String),

    /// Queue error
    #[error("Queue error: {0}")]
    QueueError(String),

    /// Operation not allowed in the current run state
    #[error("Invalid state: {0}")]
    StateError(String),

    /// Bookkeeping invariant broken
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<ConfigValidationError> for SimulationError {
    fn from(error: ConfigValidationError) -> Self {
        SimulationError::ConfigurationError(error.to_string())
    }
}

impl From<ConfigError> for SimulationError {
    fn from(error: ConfigError) -> Self {
        SimulationError::ConfigurationError(error.to_string())
    }
}

impl SimulationError {
    /// Create a configuration error
    pub fn configuration_error(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Create a time management error
    pub fn time_error(msg: impl Into<String>) -> Self {
        Self::TimeError(msg.into())
    }

    /// Create a service node error
    pub fn node_error(msg: impl Into<String>) -> Self {
        Self::NodeError(msg.into())
    }

    /// Create a queue error
    pub fn queue_error(msg: impl Into<String>) -> Self {
        Self::QueueError(msg.into())
    }

    /// Create a run state error
    pub fn state_error(msg: impl Into<String>) -> Self {
        Self::StateError(msg.into())
    }

    /// Create an invariant violation
    pub fn invariant_violation(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Check if this is a recoverable error
    ///
    /// A recoverable error rejected one call without touching engine state;
    /// the caller may correct its input and try again.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SimulationError::ConfigurationError(_) => false,
            SimulationError::TimeError(_) => true,
            SimulationError::NodeError(_) => true,
            SimulationError::QueueError(_) => true,
            SimulationError::StateError(_) => true,
            SimulationError::InvariantViolation(_) => false,
            SimulationError::IoError(_) => true,
            SimulationError::SerializationError(_) => true,
        }
    }

    /// Get the error category
    pub fn category(&self) -> &'static str {
        match self {
            SimulationError::ConfigurationError(_) => "Configuration",
            SimulationError::TimeError(_) => "Time Management",
            SimulationError::NodeError(_) => "Service Node",
            SimulationError::QueueError(_) => "Queue",
            SimulationError::StateError(_) => "State",
            SimulationError::InvariantViolation(_) => "Invariant",
            SimulationError::IoError(_) => "IO",
            SimulationError::SerializationError(_) => "Serialization",
        }
    }
}

/// Result type for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;
