//! A single lane: ordered cars, car-following and the lane's booths

use super::{Car, ServiceNode};
use crate::types::{CarId, CarStatus, NodeId, ServiceTimeModel};
use rand::Rng;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, warn};

/// Speed of a car moving through its booth, m/s
pub const SERVICE_SPEED: f64 = 5.0;
/// Follower speeds up to this multiple of the leader's speed when the gap is large
pub const CATCH_UP_FACTOR: f64 = 1.1;
/// Follower slows to this multiple of the leader's speed when too close
pub const BACK_OFF_FACTOR: f64 = 0.9;
/// Gaps below this fraction of the safe distance count as too close
pub const CLOSE_GAP_RATIO: f64 = 0.8;

/// Target speed for a follower given its leader
///
/// `gap` is the bumper-to-bumper distance: leader position minus follower
/// position minus leader length.
pub fn following_target(gap: f64, leader_velocity: f64, follower_max_velocity: f64, safe_distance: f64) -> f64 {
    if gap > safe_distance {
        follower_max_velocity.min(CATCH_UP_FACTOR * leader_velocity)
    } else if gap < CLOSE_GAP_RATIO * safe_distance {
        (BACK_OFF_FACTOR * leader_velocity).max(0.0)
    } else {
        leader_velocity
    }
}

/// Cars in one lane together with the booths that serve it
#[derive(Debug, Clone)]
pub struct CarQueue {
    index: usize,
    safe_distance: f64,
    max_queue_length: usize,
    // every active car in the lane, waiting or at a booth
    cars: BTreeMap<CarId, Car>,
    // cars not yet at a booth, in arrival order
    waiting: VecDeque<CarId>,
    nodes: Vec<ServiceNode>,
    next_seq: u64,
    total_arrivals: u64,
    total_completions: u64,
    total_balked: u64,
    total_wait_time: f64,
    services_started: u64,
}

impl CarQueue {
    /// Create an empty lane served by `nodes`
    pub fn new(index: usize, nodes: Vec<ServiceNode>, safe_distance: f64, max_queue_length: usize) -> Self {
        Self {
            index,
            safe_distance,
            max_queue_length,
            cars: BTreeMap::new(),
            waiting: VecDeque::new(),
            nodes,
            next_seq: 0,
            total_arrivals: 0,
            total_completions: 0,
            total_balked: 0,
            total_wait_time: 0.0,
            services_started: 0,
        }
    }

    /// Lane index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Safe following distance in meters
    pub fn safe_distance(&self) -> f64 {
        self.safe_distance
    }

    /// Lane capacity
    pub fn max_queue_length(&self) -> usize {
        self.max_queue_length
    }

    /// Cars in the lane, waiting or at a booth
    pub fn active_cars(&self) -> usize {
        self.cars.len()
    }

    /// Cars not yet at a booth
    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    /// Whether the next arrival would balk
    pub fn is_full(&self) -> bool {
        self.cars.len() >= self.max_queue_length
    }

    /// Look up an active car
    pub fn car(&self, id: CarId) -> Option<&Car> {
        self.cars.get(&id)
    }

    /// Active cars ordered by identifier
    pub fn cars(&self) -> impl Iterator<Item = &Car> {
        self.cars.values()
    }

    /// Waiting cars in arrival order
    pub fn waiting_ids(&self) -> impl Iterator<Item = CarId> + '_ {
        self.waiting.iter().copied()
    }

    /// Booths serving this lane
    pub fn nodes(&self) -> &[ServiceNode] {
        &self.nodes
    }

    /// Mutable access to one booth
    pub fn node_mut(&mut self, slot: usize) -> Option<&mut ServiceNode> {
        self.nodes.get_mut(slot)
    }

    /// Booths currently serving a car
    pub fn busy_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_busy()).count()
    }

    /// Cars admitted
    pub fn total_arrivals(&self) -> u64 {
        self.total_arrivals
    }

    /// Cars that finished service
    pub fn total_completions(&self) -> u64 {
        self.total_completions
    }

    /// Cars turned away
    pub fn total_balked(&self) -> u64 {
        self.total_balked
    }

    /// Mean seconds from arrival to reaching a booth
    pub fn average_wait_time(&self) -> f64 {
        if self.services_started == 0 {
            0.0
        } else {
            self.total_wait_time / self.services_started as f64
        }
    }

    /// Summed seconds cars waited before reaching a booth
    pub fn total_wait_time(&self) -> f64 {
        self.total_wait_time
    }

    /// Cars that reached a booth
    pub fn services_started(&self) -> u64 {
        self.services_started
    }

    /// Fraction of booths currently busy
    pub fn utilization(&self) -> f64 {
        if self.nodes.is_empty() {
            0.0
        } else {
            self.busy_nodes() as f64 / self.nodes.len() as f64
        }
    }

    /// Add a booth to the lane
    pub fn add_node(&mut self, service_rate: f64, model: ServiceTimeModel, variation: f64) -> NodeId {
        let id = NodeId::new(self.index, self.nodes.len());
        self.nodes.push(ServiceNode::new(id, service_rate).with_service_model(model, variation));
        id
    }

    /// Admit a new car at the lane entry
    ///
    /// A full lane turns the car away: it is returned as `Err` with status
    /// `balked` and is not tracked.
    pub fn add_car(&mut self, now: f64) -> Result<CarId, Car> {
        let id = CarId::new(self.index, self.next_seq);
        self.next_seq += 1;

        let mut car = Car::new(id);
        car.assign_queue(self.index);

        if self.is_full() {
            car.set_status(CarStatus::Balked, now);
            self.total_balked += 1;
            warn!(queue = self.index, car = %id, active = self.cars.len(), "queue full, car balked");
            return Err(car);
        }

        car.set_status(CarStatus::Queued, now);
        self.cars.insert(id, car);
        self.waiting.push_back(id);
        self.total_arrivals += 1;
        debug!(queue = self.index, car = %id, "car queued");
        Ok(id)
    }

    /// Car-following update for every active car
    ///
    /// Cars are ordered front-first (highest position, ties by identifier).
    /// The lead car moves at [`SERVICE_SPEED`] while being served and holds
    /// otherwise; followers react to the car ahead. All targets are taken from
    /// the pre-update state before any car moves.
    pub fn update_positions(&mut self, dt: f64) {
        if self.cars.is_empty() {
            return;
        }

        let mut order: Vec<(CarId, f64, f64, f64, CarStatus, f64)> = self
            .cars
            .values()
            .map(|c| (c.id(), c.position(), c.velocity(), c.length(), c.status(), c.max_velocity()))
            .collect();
        order.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let targets: Vec<(CarId, f64)> = order
            .iter()
            .enumerate()
            .map(|(i, &(id, position, _, _, status, max_velocity))| {
                let target = if i == 0 {
                    if status == CarStatus::Serving {
                        SERVICE_SPEED
                    } else {
                        0.0
                    }
                } else {
                    let (_, lead_pos, lead_vel, lead_len, _, _) = order[i - 1];
                    let gap = lead_pos - position - lead_len;
                    following_target(gap, lead_vel, max_velocity, self.safe_distance)
                };
                (id, target)
            })
            .collect();

        for (id, target) in targets {
            if let Some(car) = self.cars.get_mut(&id) {
                car.update_physics(target, dt);
            }
        }
    }

    /// Move the head waiting car to the first free booth
    ///
    /// At most one assignment per call.
    pub fn assign_head<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> Option<(CarId, NodeId)> {
        let head = *self.waiting.front()?;
        let queue_length = self.waiting.len();
        let node = self.nodes.iter_mut().find(|n| n.is_available())?;
        let car = self.cars.get_mut(&head)?;

        if !node.start_service_with_load(car, now, queue_length, rng) {
            return None;
        }

        self.waiting.pop_front();
        if let Some(wait) = car.waiting_time() {
            self.total_wait_time += wait;
        }
        self.services_started += 1;
        Some((head, node.id()))
    }

    /// Finish every inspection due by `now`
    ///
    /// Finished cars leave the lane and are returned with status `completed`.
    pub fn complete_due(&mut self, now: f64) -> Vec<Car> {
        let mut completed = Vec::new();

        for node in self.nodes.iter_mut().filter(|n| n.is_due(now)) {
            let Some(car_id) = node.current_car() else { continue };
            match self.cars.remove(&car_id) {
                Some(mut car) => {
                    if node.complete_service(&mut car, now).is_some() {
                        self.total_completions += 1;
                        completed.push(car);
                    }
                }
                None => {
                    warn!(node = %node.id(), car = %car_id, "booth held an untracked car; releasing");
                    node.release();
                }
            }
        }

        completed
    }

    /// Check the lane's structural invariants
    pub fn verify(&self) -> Result<(), String> {
        if self.cars.len() > self.max_queue_length {
            return Err(format!(
                "queue {} holds {} cars, capacity {}",
                self.index,
                self.cars.len(),
                self.max_queue_length
            ));
        }

        for id in &self.waiting {
            match self.cars.get(id) {
                Some(car) if car.status() == CarStatus::Queued => {}
                Some(car) => {
                    return Err(format!("waiting car {} has status {}", id, car.status()))
                }
                None => return Err(format!("waiting car {} is not tracked", id)),
            }
        }

        for node in &self.nodes {
            if node.is_busy() != node.service_completion_time().is_some() {
                return Err(format!("booth {} busy flag disagrees with completion time", node.id()));
            }
            if let Some(id) = node.current_car() {
                match self.cars.get(&id) {
                    Some(car) if car.status() == CarStatus::Serving => {}
                    _ => return Err(format!("booth {} holds car {} that is not being served", node.id(), id)),
                }
            }
        }

        let serving = self.cars.values().filter(|c| c.status() == CarStatus::Serving).count();
        if serving + self.waiting.len() != self.cars.len() || serving != self.busy_nodes() {
            return Err(format!(
                "queue {} tracks {} cars but {} waiting and {} serving",
                self.index,
                self.cars.len(),
                self.waiting.len(),
                serving
            ));
        }

        if self.total_arrivals != self.total_completions + self.cars.len() as u64 {
            return Err(format!(
                "queue {} arrivals {} != completions {} + active {}",
                self.index,
                self.total_arrivals,
                self.total_completions,
                self.cars.len()
            ));
        }

        Ok(())
    }
}
