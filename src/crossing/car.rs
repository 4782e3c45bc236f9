//! One-dimensional car model
//!
//! A car moves along its lane toward the booths. Position is the distance in
//! meters from the lane entry; the front of the lane is the highest position.

use crate::types::{CarId, CarStatus};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Vehicle length in meters
pub const CAR_LENGTH: f64 = 4.5;
/// Speed limit in the approach, m/s
pub const MAX_VELOCITY: f64 = 15.0;
/// Strongest acceleration, m/s²
pub const MAX_ACCELERATION: f64 = 3.0;
/// Strongest braking, m/s² (negative)
pub const MAX_DECELERATION: f64 = -5.0;

/// A car in the crossing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    id: CarId,
    position: f64,
    velocity: f64,
    acceleration: f64,
    length: f64,
    max_velocity: f64,
    status: CarStatus,
    queue: Option<usize>,
    arrival_time: Option<f64>,
    service_start_time: Option<f64>,
    completion_time: Option<f64>,
}

impl Car {
    /// A stationary car at the lane entry, status `arriving`
    pub fn new(id: CarId) -> Self {
        Self {
            id,
            position: 0.0,
            velocity: 0.0,
            acceleration: 0.0,
            length: CAR_LENGTH,
            max_velocity: MAX_VELOCITY,
            status: CarStatus::Arriving,
            queue: None,
            arrival_time: None,
            service_start_time: None,
            completion_time: None,
        }
    }

    /// Place the car at `position` moving at `velocity`
    ///
    /// Both values are clamped into their valid ranges.
    pub fn with_kinematics(mut self, position: f64, velocity: f64) -> Self {
        self.position = if position.is_finite() { position.max(0.0) } else { 0.0 };
        self.velocity = if velocity.is_finite() { velocity.clamp(0.0, self.max_velocity) } else { 0.0 };
        self
    }

    /// Identifier
    pub fn id(&self) -> CarId {
        self.id
    }

    /// Distance from the lane entry in meters
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Speed in m/s
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Last applied acceleration in m/s²
    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    /// Vehicle length in meters
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Speed limit in m/s
    pub fn max_velocity(&self) -> f64 {
        self.max_velocity
    }

    /// Current lifecycle state
    pub fn status(&self) -> CarStatus {
        self.status
    }

    /// Lane the car was admitted to
    pub fn queue(&self) -> Option<usize> {
        self.queue
    }

    /// Record the lane assignment
    pub fn assign_queue(&mut self, queue: usize) {
        self.queue = Some(queue);
    }

    /// Time the car entered the system (simulated seconds)
    pub fn arrival_time(&self) -> Option<f64> {
        self.arrival_time
    }

    /// Time the car reached a booth
    pub fn service_start_time(&self) -> Option<f64> {
        self.service_start_time
    }

    /// Time the inspection finished
    pub fn completion_time(&self) -> Option<f64> {
        self.completion_time
    }

    /// Seconds between arrival and reaching a booth
    pub fn waiting_time(&self) -> Option<f64> {
        Some(self.service_start_time? - self.arrival_time?)
    }

    /// Seconds spent at the booth
    pub fn service_time(&self) -> Option<f64> {
        Some(self.completion_time? - self.service_start_time?)
    }

    /// Advance the kinematic state by `dt` seconds toward `target_velocity`
    ///
    /// Semi-implicit Euler: acceleration, then velocity, then position. A
    /// non-positive or non-finite `dt` leaves the car untouched.
    pub fn update_physics(&mut self, target_velocity: f64, dt: f64) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }

        let target = if target_velocity.is_finite() { target_velocity } else { 0.0 };
        let required = (target - self.velocity) / dt;
        self.acceleration = required.clamp(MAX_DECELERATION, MAX_ACCELERATION);
        self.velocity = (self.velocity + self.acceleration * dt).clamp(0.0, self.max_velocity);
        self.position += self.velocity * dt;
    }

    /// Move to `status` at simulated time `time`
    ///
    /// The status always changes; the matching timestamp is only written the
    /// first time the car enters that phase.
    pub fn set_status(&mut self, status: CarStatus, time: f64) {
        trace!(car = %self.id, from = %self.status, to = %status, time, "car status change");
        self.status = status;

        let slot = match status {
            CarStatus::Arriving | CarStatus::Queued | CarStatus::Balked => &mut self.arrival_time,
            CarStatus::Serving => &mut self.service_start_time,
            CarStatus::Completed => &mut self.completion_time,
        };
        if slot.is_none() {
            *slot = Some(time);
        }
    }
}
