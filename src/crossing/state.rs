//! Point-in-time snapshots of the crossing for telemetry and visualization

use super::{Car, CarQueue, ServiceNode};
use crate::types::{CarId, CarStatus, NodeId};
use serde::{Deserialize, Serialize};

/// Snapshot of one car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarState {
    /// Car identifier
    pub id: CarId,
    /// Meters from the lane entry
    pub position: f64,
    /// m/s
    pub velocity: f64,
    /// m/s²
    pub acceleration: f64,
    /// Lifecycle state
    pub status: CarStatus,
    /// Lane index
    pub queue: Option<usize>,
    /// Simulated second of arrival
    pub arrival_time: Option<f64>,
    /// Simulated second the car reached a booth
    pub service_start_time: Option<f64>,
    /// Simulated second the inspection finished
    pub completion_time: Option<f64>,
}

impl From<&Car> for CarState {
    fn from(car: &Car) -> Self {
        Self {
            id: car.id(),
            position: car.position(),
            velocity: car.velocity(),
            acceleration: car.acceleration(),
            status: car.status(),
            queue: car.queue(),
            arrival_time: car.arrival_time(),
            service_start_time: car.service_start_time(),
            completion_time: car.completion_time(),
        }
    }
}

/// Snapshot of one booth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceNodeState {
    /// Booth identifier
    pub id: NodeId,
    /// Lane index
    pub queue: usize,
    /// Whether a car is at the booth
    pub busy: bool,
    /// Car at the booth
    pub current_car: Option<CarId>,
    /// Cars per minute
    pub service_rate: f64,
    /// When the current inspection finishes
    pub service_completion_time: Option<f64>,
    /// Cars served so far
    pub total_served: u64,
    /// Summed inspection seconds
    pub total_service_time: f64,
}

impl From<&ServiceNode> for ServiceNodeState {
    fn from(node: &ServiceNode) -> Self {
        Self {
            id: node.id(),
            queue: node.id().queue,
            busy: node.is_busy(),
            current_car: node.current_car(),
            service_rate: node.service_rate(),
            service_completion_time: node.service_completion_time(),
            total_served: node.total_served(),
            total_service_time: node.total_service_time(),
        }
    }
}

/// Snapshot of one lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    /// Lane index
    pub index: usize,
    /// Cars in the lane, waiting or at a booth
    pub active_cars: usize,
    /// Waiting cars in arrival order
    pub waiting: Vec<CarId>,
    /// Busy booths
    pub busy_nodes: usize,
    /// Booths in the lane
    pub total_nodes: usize,
}

impl From<&CarQueue> for QueueState {
    fn from(queue: &CarQueue) -> Self {
        Self {
            index: queue.index(),
            active_cars: queue.active_cars(),
            waiting: queue.waiting_ids().collect(),
            busy_nodes: queue.busy_nodes(),
            total_nodes: queue.nodes().len(),
        }
    }
}

/// Full snapshot of the crossing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossingState {
    /// Simulated seconds
    pub current_time: f64,
    /// Every active car
    pub cars: Vec<CarState>,
    /// Every booth in lane order
    pub nodes: Vec<ServiceNodeState>,
    /// Per-lane summary
    pub queues: Vec<QueueState>,
}

impl CrossingState {
    /// Look up a car by identifier
    pub fn car(&self, id: CarId) -> Option<&CarState> {
        self.cars.iter().find(|c| c.id == id)
    }

    /// Look up a booth by identifier
    pub fn node(&self, id: NodeId) -> Option<&ServiceNodeState> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
