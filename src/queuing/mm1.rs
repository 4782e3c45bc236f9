//! Event-driven M/M/1 reference model
//!
//! A single exponential server fed by a homogeneous Poisson stream. Used to
//! check the samplers against closed-form queuing results, independent of the
//! tick quantization of the crossing engine.

use super::{ArrivalProcess, ServiceProcess};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Outcome of [`Mm1Queue::simulate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mm1Report {
    /// Simulated minutes
    pub duration_minutes: f64,
    /// Cars admitted
    pub total_arrivals: u64,
    /// Cars that finished service
    pub total_departures: u64,
    /// Cars turned away at a full queue
    pub balked: u64,
    /// Time-average number of cars in the system (queue plus server)
    pub average_number_in_system: f64,
    /// Mean wait before service, in minutes
    pub average_wait_in_queue: f64,
    /// Mean time from arrival to departure, in minutes
    pub average_time_in_system: f64,
    /// Fraction of time the server was busy
    pub observed_utilization: f64,
    /// ρ / (1 - ρ)
    pub theoretical_average_number_in_system: f64,
    /// 1 / (μ - λ)
    pub theoretical_average_time_in_system: f64,
}

impl Mm1Report {
    /// Relative error of the observed mean number in system against theory
    pub fn relative_error(&self) -> f64 {
        let theory = self.theoretical_average_number_in_system;
        if !theory.is_finite() || theory == 0.0 {
            return f64::INFINITY;
        }
        (self.average_number_in_system - theory).abs() / theory
    }
}

/// Single-server queue with Poisson arrivals and exponential service
#[derive(Debug, Clone)]
pub struct Mm1Queue {
    arrival_process: ArrivalProcess,
    service_process: ServiceProcess,
    max_queue_length: usize,

    current_time: f64,
    waiting: VecDeque<f64>,
    // arrival time of the car at the server
    in_service: Option<f64>,
    total_arrivals: u64,
    total_departures: u64,
    balked: u64,
    area_in_system: f64,
    busy_time: f64,
    total_wait: f64,
    services_started: u64,
    total_sojourn: f64,
}

impl Mm1Queue {
    /// Create a queue; `max_queue_length` bounds the waiting line, not the server
    pub fn new(arrival_rate: f64, service_rate: f64, max_queue_length: usize) -> Self {
        Self {
            arrival_process: ArrivalProcess::constant(arrival_rate),
            service_process: ServiceProcess::new(service_rate),
            max_queue_length,
            current_time: 0.0,
            waiting: VecDeque::new(),
            in_service: None,
            total_arrivals: 0,
            total_departures: 0,
            balked: 0,
            area_in_system: 0.0,
            busy_time: 0.0,
            total_wait: 0.0,
            services_started: 0,
            total_sojourn: 0.0,
        }
    }

    /// ρ = λ / μ
    pub fn utilization(&self) -> f64 {
        self.arrival_process.base_rate() / self.service_process.service_rate()
    }

    /// Whether ρ < 1
    pub fn is_stable(&self) -> bool {
        self.utilization() < 1.0
    }

    /// Cars currently waiting (excluding the one in service)
    pub fn queue_length(&self) -> usize {
        self.waiting.len()
    }

    /// L = ρ / (1 - ρ), infinite when unstable
    pub fn theoretical_average_queue_length(&self) -> f64 {
        if !self.is_stable() {
            return f64::INFINITY;
        }
        let rho = self.utilization();
        rho / (1.0 - rho)
    }

    /// W = 1 / (μ - λ) minutes, infinite when unstable
    pub fn theoretical_average_waiting_time(&self) -> f64 {
        if !self.is_stable() {
            return f64::INFINITY;
        }
        1.0 / (self.service_process.service_rate() - self.arrival_process.base_rate())
    }

    /// Clear all state and counters
    pub fn reset(&mut self) {
        self.current_time = 0.0;
        self.waiting.clear();
        self.in_service = None;
        self.total_arrivals = 0;
        self.total_departures = 0;
        self.balked = 0;
        self.area_in_system = 0.0;
        self.busy_time = 0.0;
        self.total_wait = 0.0;
        self.services_started = 0;
        self.total_sojourn = 0.0;
    }

    fn number_in_system(&self) -> usize {
        self.waiting.len() + usize::from(self.in_service.is_some())
    }

    fn advance_clock(&mut self, to: f64) {
        let dt = to - self.current_time;
        self.area_in_system += self.number_in_system() as f64 * dt;
        if self.in_service.is_some() {
            self.busy_time += dt;
        }
        self.current_time = to;
    }

    fn begin_service<R: Rng + ?Sized>(&mut self, arrived_at: f64, rng: &mut R) -> f64 {
        self.total_wait += self.current_time - arrived_at;
        self.services_started += 1;
        self.in_service = Some(arrived_at);
        self.current_time + self.service_process.generate_service_time(rng)
    }

    /// Run from an empty system for `duration_minutes`
    pub fn simulate<R: Rng + ?Sized>(&mut self, duration_minutes: f64, rng: &mut R) -> Mm1Report {
        self.reset();
        let end = duration_minutes.max(0.0);

        let mut next_arrival = self.arrival_process.generate_interarrival_time(0.0, rng);
        let mut next_departure = f64::INFINITY;

        loop {
            let next_event = next_arrival.min(next_departure);
            if next_event > end {
                self.advance_clock(end);
                break;
            }
            self.advance_clock(next_event);

            if next_arrival <= next_departure {
                if self.waiting.len() >= self.max_queue_length {
                    self.balked += 1;
                } else {
                    self.total_arrivals += 1;
                    if self.in_service.is_none() {
                        next_departure = self.begin_service(self.current_time, rng);
                    } else {
                        self.waiting.push_back(self.current_time);
                    }
                }
                next_arrival = self.current_time
                    + self.arrival_process.generate_interarrival_time(self.current_time * 60.0, rng);
            } else {
                if let Some(arrived_at) = self.in_service.take() {
                    self.total_departures += 1;
                    self.total_sojourn += self.current_time - arrived_at;
                }
                next_departure = match self.waiting.pop_front() {
                    Some(arrived_at) => self.begin_service(arrived_at, rng),
                    None => f64::INFINITY,
                };
            }
        }

        let report = self.report(end);
        debug!(
            arrivals = report.total_arrivals,
            departures = report.total_departures,
            average_in_system = report.average_number_in_system,
            "M/M/1 run finished"
        );
        report
    }

    fn report(&self, duration: f64) -> Mm1Report {
        let per_time = |value: f64| if duration > 0.0 { value / duration } else { 0.0 };
        let per_count = |value: f64, count: u64| if count > 0 { value / count as f64 } else { 0.0 };

        Mm1Report {
            duration_minutes: duration,
            total_arrivals: self.total_arrivals,
            total_departures: self.total_departures,
            balked: self.balked,
            average_number_in_system: per_time(self.area_in_system),
            average_wait_in_queue: per_count(self.total_wait, self.services_started),
            average_time_in_system: per_count(self.total_sojourn, self.total_departures),
            observed_utilization: per_time(self.busy_time),
            theoretical_average_number_in_system: self.theoretical_average_queue_length(),
            theoretical_average_time_in_system: self.theoretical_average_waiting_time(),
        }
    }
}
