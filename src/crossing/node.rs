//! Inspection booth state machine

use super::Car;
use crate::queuing::{hour_of_day, ServiceProcess};
use crate::simulation::{SimulationError, SimulationResult};
use crate::types::{CarId, CarStatus, NodeId, ServiceTimeModel};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The car currently at a booth
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveService {
    /// Car being inspected
    pub car: CarId,
    /// Simulated second the inspection started
    pub started_at: f64,
    /// Simulated second the inspection finishes
    pub completion_time: f64,
}

/// A booth serving one car at a time
///
/// Idle ⇄ Busy. The car and its completion time live in a single
/// [`ActiveService`], so a busy booth always knows both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceNode {
    id: NodeId,
    service_process: ServiceProcess,
    service_model: ServiceTimeModel,
    active: Option<ActiveService>,
    total_served: u64,
    total_service_time: f64,
}

impl ServiceNode {
    /// Create an idle booth using the plain exponential model
    pub fn new(id: NodeId, service_rate: f64) -> Self {
        Self {
            id,
            service_process: ServiceProcess::new(service_rate),
            service_model: ServiceTimeModel::Exponential,
            active: None,
            total_served: 0,
            total_service_time: 0.0,
        }
    }

    /// Choose how service durations are drawn
    pub fn with_service_model(mut self, model: ServiceTimeModel, variation: f64) -> Self {
        self.service_model = model;
        self.service_process = self.service_process.with_variation(variation);
        self
    }

    /// Identifier
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Completions per minute
    pub fn service_rate(&self) -> f64 {
        self.service_process.service_rate()
    }

    /// Service model in use
    pub fn service_model(&self) -> ServiceTimeModel {
        self.service_model
    }

    /// Whether a car is at the booth
    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// Whether the booth can take a car
    pub fn is_available(&self) -> bool {
        self.active.is_none()
    }

    /// The car at the booth
    pub fn current_car(&self) -> Option<CarId> {
        self.active.map(|a| a.car)
    }

    /// When the current inspection finishes
    pub fn service_completion_time(&self) -> Option<f64> {
        self.active.map(|a| a.completion_time)
    }

    /// Current inspection, if any
    pub fn active_service(&self) -> Option<&ActiveService> {
        self.active.as_ref()
    }

    /// Whether the current inspection has finished by `now`
    pub fn is_due(&self, now: f64) -> bool {
        self.active.map_or(false, |a| now >= a.completion_time)
    }

    /// Cars served so far
    pub fn total_served(&self) -> u64 {
        self.total_served
    }

    /// Summed inspection seconds
    pub fn total_service_time(&self) -> f64 {
        self.total_service_time
    }

    /// Mean inspection seconds per served car
    pub fn average_service_time(&self) -> f64 {
        if self.total_served == 0 {
            0.0
        } else {
            self.total_service_time / self.total_served as f64
        }
    }

    /// Fraction of `elapsed` seconds spent serving
    pub fn utilization(&self, elapsed: f64) -> f64 {
        if elapsed > 0.0 {
            (self.total_service_time / elapsed).min(1.0)
        } else {
            0.0
        }
    }

    /// Replace the service rate; takes effect for the next car
    pub fn update_service_rate(&mut self, service_rate: f64) -> SimulationResult<()> {
        if !(service_rate.is_finite() && service_rate > 0.0) {
            return Err(SimulationError::node_error(format!(
                "service rate for {} must be positive, got {}",
                self.id, service_rate
            )));
        }
        debug!(node = %self.id, old = self.service_rate(), new = service_rate, "service rate updated");
        self.service_process.set_service_rate(service_rate);
        Ok(())
    }

    /// Start inspecting `car` at `now`
    ///
    /// Returns `false` and changes nothing if the booth is busy.
    pub fn start_service<R: Rng + ?Sized>(&mut self, car: &mut Car, now: f64, rng: &mut R) -> bool {
        self.start_service_with_load(car, now, 0, rng)
    }

    /// Like [`start_service`](Self::start_service), passing the lane length
    /// for the congestion-aware model
    pub fn start_service_with_load<R: Rng + ?Sized>(
        &mut self,
        car: &mut Car,
        now: f64,
        queue_length: usize,
        rng: &mut R,
    ) -> bool {
        if self.active.is_some() {
            return false;
        }

        let minutes =
            self.service_process.sample(self.service_model, hour_of_day(now), queue_length, rng);
        let completion_time = now + minutes * 60.0;

        car.set_status(CarStatus::Serving, now);
        self.active = Some(ActiveService { car: car.id(), started_at: now, completion_time });

        debug!(node = %self.id, car = %car.id(), now, completion_time, "service started");
        true
    }

    /// Drop the current inspection without recording it
    pub(crate) fn release(&mut self) -> Option<ActiveService> {
        self.active.take()
    }

    /// Finish the current inspection
    ///
    /// Returns the service time in seconds, or `None` if the booth is idle or
    /// `car` is not the one at the booth.
    pub fn complete_service(&mut self, car: &mut Car, now: f64) -> Option<f64> {
        let active = self.active?;
        if active.car != car.id() {
            return None;
        }

        let started = car.service_start_time().unwrap_or(active.started_at);
        let service_time = (now - started).max(0.0);

        car.set_status(CarStatus::Completed, now);
        self.total_served += 1;
        self.total_service_time += service_time;
        self.active = None;

        debug!(node = %self.id, car = %car.id(), service_time, "service completed");
        Some(service_time)
    }
}
