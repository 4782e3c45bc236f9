//! Multi-lane, multi-booth border crossing
//!
//! The crossing owns every lane and booth, schedules arrivals centrally and
//! routes each arriving car to a lane through the configured
//! [`QueueAssignment`] policy. One call to [`BorderCrossing::advance_time`]
//! is one tick:
//!
//! 1. advance the clock by `dt`
//! 2. admit every arrival due by the new time
//! 3. per lane, run car-following and move the head car to a free booth
//! 4. finish every inspection that is due
//!
//! All randomness comes from the generator handed to [`BorderCrossing::new`].

use super::{Car, CarQueue, CarState, CrossingState, QueueState, ServiceNode, ServiceNodeState};
use crate::queuing::ArrivalProcess;
use crate::simulation::{
    throughput_per_minute, BorderCrossingStats, CrossingStatistics, QueueStats, ServiceNodeStats,
    SimulationError, SimulationResult,
};
use crate::types::{BorderCrossingConfig, CarId, NodeId, QueueAssignment};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument, warn};

/// The whole crossing
#[derive(Debug, Clone)]
pub struct BorderCrossing {
    config: BorderCrossingConfig,
    queues: Vec<CarQueue>,
    arrival_process: ArrivalProcess,
    rng: StdRng,
    current_time: f64,
    next_arrival_time: f64,
    next_queue_index: usize,
    // cars turned away since the last drain
    balked: Vec<Car>,
    // integral of cars in system over time, car-seconds
    area_in_system: f64,
}

impl BorderCrossing {
    /// Build a crossing from a validated configuration
    #[instrument(skip(config, rng), fields(num_queues = config.num_queues, arrival_rate = config.arrival_rate))]
    pub fn new(config: BorderCrossingConfig, rng: StdRng) -> SimulationResult<Self> {
        config.validate()?;

        let queues = (0..config.num_queues)
            .map(|q| {
                let nodes = config
                    .service_rates_for_queue(q)
                    .iter()
                    .enumerate()
                    .map(|(slot, &rate)| {
                        ServiceNode::new(NodeId::new(q, slot), rate)
                            .with_service_model(config.service_time_model, config.service_time_variation)
                    })
                    .collect();
                CarQueue::new(q, nodes, config.safe_distance, config.max_queue_length)
            })
            .collect();

        let arrival_process = ArrivalProcess::new(config.arrival_rate)
            .with_time_of_day_modulation(config.time_of_day_modulation);

        info!(
            "Border crossing ready: {} queues, {} service nodes, {} assignment",
            config.num_queues,
            config.total_service_nodes(),
            config.queue_assignment
        );

        Ok(Self {
            config,
            queues,
            arrival_process,
            rng,
            current_time: 0.0,
            next_arrival_time: 0.0,
            next_queue_index: 0,
            balked: Vec::new(),
            area_in_system: 0.0,
        })
    }

    /// Build a crossing with a generator seeded from `seed`
    pub fn with_seed(config: BorderCrossingConfig, seed: u64) -> SimulationResult<Self> {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    /// Configuration in effect, including runtime booth changes
    pub fn config(&self) -> &BorderCrossingConfig {
        &self.config
    }

    /// Simulated seconds elapsed
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Simulated second of the next scheduled arrival
    pub fn next_arrival_time(&self) -> f64 {
        self.next_arrival_time
    }

    /// All lanes
    pub fn queues(&self) -> &[CarQueue] {
        &self.queues
    }

    /// One lane
    pub fn queue(&self, index: usize) -> Option<&CarQueue> {
        self.queues.get(index)
    }

    /// Every booth in lane order
    pub fn service_nodes(&self) -> impl Iterator<Item = &ServiceNode> {
        self.queues.iter().flat_map(|q| q.nodes().iter())
    }

    /// Look up a booth
    pub fn service_node(&self, id: NodeId) -> Option<&ServiceNode> {
        self.queues.get(id.queue)?.nodes().get(id.slot)
    }

    /// Cars currently in any lane
    pub fn total_active_cars(&self) -> usize {
        self.queues.iter().map(CarQueue::active_cars).sum()
    }

    /// Cars admitted to a lane
    pub fn total_arrivals(&self) -> u64 {
        self.queues.iter().map(CarQueue::total_arrivals).sum()
    }

    /// Cars that finished inspection
    pub fn total_completions(&self) -> u64 {
        self.queues.iter().map(CarQueue::total_completions).sum()
    }

    /// Cars turned away at a full lane
    pub fn total_balked(&self) -> u64 {
        self.queues.iter().map(CarQueue::total_balked).sum()
    }

    /// Balked cars not yet drained
    pub fn balked_cars(&self) -> &[Car] {
        &self.balked
    }

    /// Take the balked cars collected so far
    pub fn drain_balked(&mut self) -> Vec<Car> {
        std::mem::take(&mut self.balked)
    }

    /// Time-weighted mean number of cars in the system
    pub fn average_cars_in_system(&self) -> f64 {
        if self.current_time > 0.0 {
            self.area_in_system / self.current_time
        } else {
            0.0
        }
    }

    /// Pick the lane for the next car
    pub fn assign_queue(&mut self) -> usize {
        let n = self.queues.len();
        match self.config.queue_assignment {
            QueueAssignment::Random => self.rng.gen_range(0..n),
            QueueAssignment::Shortest => {
                let min = self.queues.iter().map(CarQueue::active_cars).min().unwrap_or(0);
                let candidates: Vec<usize> = self
                    .queues
                    .iter()
                    .filter(|q| q.active_cars() == min)
                    .map(CarQueue::index)
                    .collect();
                candidates.choose(&mut self.rng).copied().unwrap_or(0)
            }
            QueueAssignment::RoundRobin => {
                let index = self.next_queue_index;
                self.next_queue_index = (self.next_queue_index + 1) % n;
                index
            }
        }
    }

    /// Route a new car to a lane at the current time
    ///
    /// Returns the car and its lane, or `None` when the chosen lane was full
    /// and the car balked.
    pub fn add_car(&mut self) -> Option<(CarId, usize)> {
        let index = self.assign_queue();
        let now = self.current_time;
        match self.queues[index].add_car(now) {
            Ok(id) => Some((id, index)),
            Err(car) => {
                self.balked.push(car);
                None
            }
        }
    }

    /// Run one tick of `dt` seconds
    ///
    /// Returns the cars whose inspection finished during the tick. A negative
    /// or non-finite `dt` is rejected before any state changes.
    pub fn advance_time(&mut self, dt: f64) -> SimulationResult<Vec<Car>> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(SimulationError::time_error(format!(
                "time step must be finite and non-negative, got {}",
                dt
            )));
        }

        self.area_in_system += self.total_active_cars() as f64 * dt;
        self.current_time += dt;
        let now = self.current_time;

        while now >= self.next_arrival_time {
            self.add_car();
            let gap_minutes = self.arrival_process.generate_interarrival_time(now, &mut self.rng);
            if !gap_minutes.is_finite() {
                self.next_arrival_time = f64::INFINITY;
                break;
            }
            self.next_arrival_time += gap_minutes * 60.0;
        }

        for queue in &mut self.queues {
            queue.update_positions(dt);
            if let Some((car, node)) = queue.assign_head(now, &mut self.rng) {
                debug!(car = %car, node = %node, now, "car assigned to booth");
            }
        }

        let completed: Vec<Car> = self
            .queues
            .iter_mut()
            .flat_map(|queue| queue.complete_due(now))
            .collect();

        Ok(completed)
    }

    // Only valid for an id that names an existing booth
    fn flat_node_index(&self, id: NodeId) -> usize {
        self.queues[..id.queue].iter().map(|q| q.nodes().len()).sum::<usize>() + id.slot
    }

    /// Change a booth's service rate; applies from the next car it serves
    pub fn update_service_rate(&mut self, id: NodeId, rate: f64) -> SimulationResult<()> {
        let node = self
            .queues
            .get_mut(id.queue)
            .and_then(|q| q.node_mut(id.slot))
            .ok_or_else(|| SimulationError::node_error(format!("service node {} not found", id)))?;
        node.update_service_rate(rate)?;

        let flat = self.flat_node_index(id);
        if let Some(slot) = self.config.service_rates.get_mut(flat) {
            *slot = rate;
        }
        Ok(())
    }

    /// Open a new booth on lane `queue`
    pub fn add_service_node(&mut self, queue: usize, rate: f64) -> SimulationResult<NodeId> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(SimulationError::node_error(format!(
                "service rate must be positive, got {}",
                rate
            )));
        }
        let lane = self
            .queues
            .get_mut(queue)
            .ok_or_else(|| SimulationError::queue_error(format!("queue {} not found", queue)))?;

        let id = lane.add_node(rate, self.config.service_time_model, self.config.service_time_variation);
        let insert_at: usize = self.config.nodes_per_queue.iter().take(queue + 1).sum();
        self.config.service_rates.insert(insert_at, rate);
        self.config.nodes_per_queue[queue] += 1;

        info!(node = %id, rate, "service node added");
        Ok(id)
    }

    /// Snapshot of every car, booth and lane
    pub fn get_state(&self) -> CrossingState {
        CrossingState {
            current_time: self.current_time,
            cars: self
                .queues
                .iter()
                .flat_map(|q| q.cars().map(CarState::from))
                .collect(),
            nodes: self.service_nodes().map(ServiceNodeState::from).collect(),
            queues: self.queues.iter().map(QueueState::from).collect(),
        }
    }

    /// Aggregate and per-lane, per-booth metrics
    pub fn get_statistics(&self) -> CrossingStatistics {
        let total_nodes = self.service_nodes().count();
        let busy_nodes: usize = self.queues.iter().map(CarQueue::busy_nodes).sum();
        let total_completions = self.total_completions();

        let services_started: u64 = self.queues.iter().map(CarQueue::services_started).sum();
        let total_wait: f64 = self.queues.iter().map(CarQueue::total_wait_time).sum();
        let served: u64 = self.service_nodes().map(ServiceNode::total_served).sum();
        let service_time: f64 = self.service_nodes().map(ServiceNode::total_service_time).sum();

        let crossing = BorderCrossingStats {
            current_time: self.current_time,
            num_queues: self.queues.len(),
            total_service_nodes: total_nodes,
            queue_assignment: self.config.queue_assignment,
            total_arrivals: self.total_arrivals(),
            total_completions,
            total_balked: self.total_balked(),
            active_cars: self.total_active_cars(),
            overall_utilization: if total_nodes > 0 {
                busy_nodes as f64 / total_nodes as f64
            } else {
                0.0
            },
            average_waiting_time: if services_started > 0 {
                total_wait / services_started as f64
            } else {
                0.0
            },
            average_service_time: if served > 0 { service_time / served as f64 } else { 0.0 },
            average_cars_in_system: self.average_cars_in_system(),
            throughput: throughput_per_minute(total_completions, self.current_time),
        };

        let queues = self
            .queues
            .iter()
            .map(|q| QueueStats {
                index: q.index(),
                active_cars: q.active_cars(),
                waiting: q.waiting_len(),
                busy_nodes: q.busy_nodes(),
                total_nodes: q.nodes().len(),
                utilization: q.utilization(),
                average_wait_time: q.average_wait_time(),
                total_arrivals: q.total_arrivals(),
                total_completions: q.total_completions(),
                total_balked: q.total_balked(),
            })
            .collect();

        let nodes = self
            .service_nodes()
            .map(|n| ServiceNodeStats {
                id: n.id(),
                service_rate: n.service_rate(),
                busy: n.is_busy(),
                total_served: n.total_served(),
                total_service_time: n.total_service_time(),
                average_service_time: n.average_service_time(),
                utilization: n.utilization(self.current_time),
            })
            .collect();

        CrossingStatistics { crossing, queues, nodes }
    }

    /// Check capacity, booth state and car conservation across all lanes
    pub fn verify_invariants(&self) -> SimulationResult<()> {
        for queue in &self.queues {
            queue.verify().map_err(SimulationError::invariant_violation)?;
        }

        let arrivals = self.total_arrivals();
        let completions = self.total_completions();
        let active = self.total_active_cars() as u64;
        if arrivals != completions + active {
            warn!(arrivals, completions, active, "car conservation broken");
            return Err(SimulationError::invariant_violation(format!(
                "arrivals {} != completions {} + active {}",
                arrivals, completions, active
            )));
        }
        Ok(())
    }
}
