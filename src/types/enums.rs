//! Enumeration types for the border crossing simulator
//!
//! Car lifecycle states, queue assignment policies, service-time models and
//! simulation run states.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a car
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarStatus {
    /// Created but not yet admitted to a lane
    Arriving,
    /// Waiting in a lane
    Queued,
    /// At a booth being inspected
    Serving,
    /// Inspection finished, left the crossing
    Completed,
    /// Turned away because the lane was full
    Balked,
}

impl CarStatus {
    /// Whether the car has left the system for good
    pub fn is_terminal(&self) -> bool {
        matches!(self, CarStatus::Completed | CarStatus::Balked)
    }
}

impl fmt::Display for CarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CarStatus::Arriving => write!(f, "arriving"),
            CarStatus::Queued => write!(f, "queued"),
            CarStatus::Serving => write!(f, "serving"),
            CarStatus::Completed => write!(f, "completed"),
            CarStatus::Balked => write!(f, "balked"),
        }
    }
}

impl FromStr for CarStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arriving" => Ok(CarStatus::Arriving),
            "queued" => Ok(CarStatus::Queued),
            "serving" => Ok(CarStatus::Serving),
            "completed" => Ok(CarStatus::Completed),
            "balked" => Ok(CarStatus::Balked),
            _ => Err(format!("Unknown car status: {}", s)),
        }
    }
}

/// Policy used to pick a lane for each arriving car
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueueAssignment {
    /// Uniformly random lane
    Random,
    /// Lane with the fewest active cars, ties broken at random
    #[default]
    Shortest,
    /// Cycle through lanes in order
    RoundRobin,
}

impl fmt::Display for QueueAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueAssignment::Random => write!(f, "random"),
            QueueAssignment::Shortest => write!(f, "shortest"),
            QueueAssignment::RoundRobin => write!(f, "round_robin"),
        }
    }
}

impl FromStr for QueueAssignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" => Ok(QueueAssignment::Random),
            "shortest" => Ok(QueueAssignment::Shortest),
            "round_robin" | "round-robin" | "roundrobin" => Ok(QueueAssignment::RoundRobin),
            _ => Err(format!("Unknown queue assignment strategy: {}", s)),
        }
    }
}

/// How a booth draws service durations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTimeModel {
    /// Plain exponential draw with mean 1/rate
    #[default]
    Exponential,
    /// Exponential draw with time-of-day and congestion adjusted rate
    Conditional,
    /// Exponential draw plus Gaussian jitter
    Variable,
}

impl fmt::Display for ServiceTimeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceTimeModel::Exponential => write!(f, "exponential"),
            ServiceTimeModel::Conditional => write!(f, "conditional"),
            ServiceTimeModel::Variable => write!(f, "variable"),
        }
    }
}

impl FromStr for ServiceTimeModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exponential" | "exp" => Ok(ServiceTimeModel::Exponential),
            "conditional" => Ok(ServiceTimeModel::Conditional),
            "variable" => Ok(ServiceTimeModel::Variable),
            _ => Err(format!("Unknown service time model: {}", s)),
        }
    }
}

/// Lifecycle state of a simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, no tick executed yet
    #[default]
    NotStarted,
    /// At least one tick executed and not finished
    Running,
    /// Termination condition reached
    Completed,
    /// A tick failed; state is that of the last committed tick
    Failed,
    /// Stopped through the cancellation flag
    Cancelled,
}

impl RunStatus {
    /// Whether the run can no longer advance
    pub fn is_finished(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::NotStarted => write!(f, "not_started"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "not_started" | "pending" => Ok(RunStatus::NotStarted),
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            "cancelled" | "canceled" => Ok(RunStatus::Cancelled),
            _ => Err(format!("Unknown run status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_car_status_display_and_parse() {
        let all = [
            CarStatus::Arriving,
            CarStatus::Queued,
            CarStatus::Serving,
            CarStatus::Completed,
            CarStatus::Balked,
        ];
        for status in all {
            assert_eq!(status.to_string().parse::<CarStatus>().unwrap(), status);
        }
        assert!("parked".parse::<CarStatus>().is_err());
    }

    #[test]
    fn test_car_status_terminal() {
        assert!(CarStatus::Completed.is_terminal());
        assert!(CarStatus::Balked.is_terminal());
        assert!(!CarStatus::Queued.is_terminal());
        assert!(!CarStatus::Serving.is_terminal());
    }

    #[test]
    fn test_queue_assignment_parsing() {
        assert_eq!("random".parse::<QueueAssignment>().unwrap(), QueueAssignment::Random);
        assert_eq!("Shortest".parse::<QueueAssignment>().unwrap(), QueueAssignment::Shortest);
        assert_eq!(
            "round_robin".parse::<QueueAssignment>().unwrap(),
            QueueAssignment::RoundRobin
        );
        assert!("fastest".parse::<QueueAssignment>().is_err());
        assert_eq!(QueueAssignment::default(), QueueAssignment::Shortest);
    }

    #[test]
    fn test_queue_assignment_serde_uses_snake_case() {
        let json = serde_json::to_string(&QueueAssignment::RoundRobin).unwrap();
        assert_eq!(json, "\"round_robin\"");
        let err = serde_json::from_str::<QueueAssignment>("\"least_loaded\"");
        assert!(err.is_err());
    }

    #[test]
    fn test_service_time_model_parsing() {
        assert_eq!(ServiceTimeModel::default(), ServiceTimeModel::Exponential);
        assert_eq!(
            "conditional".parse::<ServiceTimeModel>().unwrap(),
            ServiceTimeModel::Conditional
        );
        assert!("gamma".parse::<ServiceTimeModel>().is_err());
    }

    #[test]
    fn test_run_status_finished() {
        assert!(!RunStatus::NotStarted.is_finished());
        assert!(!RunStatus::Running.is_finished());
        assert!(RunStatus::Completed.is_finished());
        assert!(RunStatus::Failed.is_finished());
        assert!(RunStatus::Cancelled.is_finished());
        assert_eq!("canceled".parse::<RunStatus>().unwrap(), RunStatus::Cancelled);
    }
}
