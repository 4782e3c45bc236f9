//! Outer simulation driver
//!
//! [`Simulation`] owns one [`BorderCrossing`], advances it in fixed ticks of
//! `time_factor` simulated seconds and decides when the run ends. A run moves
//! through `not_started → running → {completed, failed, cancelled}`.

use crate::crossing::{BorderCrossing, Car};
use crate::geometry::{PathGeometry, Point2D, PolylinePath};
use crate::simulation::{SimulationError, SimulationReport, SimulationResult};
use crate::types::{
    validate_time_factor, BorderCrossingConfig, CarId, NodeId, RunStatus, ScenarioConfig,
    SimulationConfig, SimulationId,
};
use crate::{perf_span, sim_event};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, field, info, instrument, warn};

/// Simulated seconds during which an empty crossing keeps running
pub const WARM_UP_SECONDS: f64 = 300.0;

/// Callbacks invoked by [`Simulation::run_with_observer`]
///
/// All methods have default no-op implementations.
pub trait TickObserver {
    /// Called after every committed tick with the cars that finished in it
    fn on_tick_end(&mut self, _simulation_time: f64, _crossing: &BorderCrossing, _completed: &[Car]) {}

    /// Called with the position samples taken at the end of a tick
    ///
    /// Receives every sample, including those past the in-memory cap.
    fn on_positions(&mut self, _samples: &[PositionSample]) {}

    /// Called once when the run stops, whatever the reason
    fn on_run_end(&mut self, _status: RunStatus, _crossing: &BorderCrossing) {}
}

/// A [`TickObserver`] that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl TickObserver for NoopObserver {}

/// Cooperative cancellation flag shared with a host
///
/// The driver polls it once per tick boundary.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Ask the run to stop before its next tick
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Where a car was at the end of a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Car identifier
    pub car_id: CarId,
    /// Simulated second of the sample
    pub simulation_time: f64,
    /// Wall-clock instant the sample stands for
    pub timestamp: DateTime<Utc>,
    /// Meters travelled along the path
    pub distance: f64,
    /// Point on the path
    pub point: Point2D,
}

/// One simulation run
pub struct Simulation {
    id: SimulationId,
    config: SimulationConfig,
    crossing: BorderCrossing,
    path: Box<dyn PathGeometry + Send + Sync>,
    simulation_time: f64,
    status: RunStatus,
    failure_reason: Option<String>,
    stop: StopHandle,
    ticks: u64,
    positions: Vec<PositionSample>,
    // samples taken at the end of the latest tick
    tick_positions: Vec<PositionSample>,
    positions_dropped: u64,
    next_position_sample: f64,
    // completed and balked cars, kept for statistics
    finished: Vec<Car>,
    epoch: DateTime<Utc>,
    wall_clock: Duration,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("simulation_time", &self.simulation_time)
            .field("ticks", &self.ticks)
            .field("path_length", &self.path.length())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Create a run over `path`
    #[instrument(skip_all, fields(max_time = config.max_simulation_time, time_factor = config.time_factor))]
    pub fn new(
        crossing_config: BorderCrossingConfig,
        config: SimulationConfig,
        path: Box<dyn PathGeometry + Send + Sync>,
    ) -> SimulationResult<Self> {
        config.validate()?;

        let rng: StdRng = if let Some(seed) = config.seed {
            info!("Using deterministic seed: {}", seed);
            rand::SeedableRng::seed_from_u64(seed)
        } else {
            debug!("Using entropy-based random seed");
            rand::SeedableRng::from_entropy()
        };

        let crossing = BorderCrossing::new(crossing_config, rng)?;
        let id = SimulationId::new();
        info!(simulation = %id, path_length = path.length(), "Simulation created");

        Ok(Self {
            id,
            config,
            crossing,
            path,
            simulation_time: 0.0,
            status: RunStatus::NotStarted,
            failure_reason: None,
            stop: StopHandle::default(),
            ticks: 0,
            positions: Vec::new(),
            tick_positions: Vec::new(),
            positions_dropped: 0,
            next_position_sample: 0.0,
            finished: Vec::new(),
            epoch: Utc::now(),
            wall_clock: Duration::ZERO,
        })
    }

    /// Create a run on a straight path of the configured length
    pub fn from_scenario(scenario: &ScenarioConfig) -> SimulationResult<Self> {
        let path = PolylinePath::straight(scenario.simulation.path_length);
        Self::new(scenario.border_crossing.clone(), scenario.simulation.clone(), Box::new(path))
    }

    /// Run identifier
    pub fn id(&self) -> SimulationId {
        self.id
    }

    /// Current run state
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Why the run failed, if it did
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Driver configuration
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The crossing being simulated
    pub fn crossing(&self) -> &BorderCrossing {
        &self.crossing
    }

    /// Change a booth's service rate mid-run
    pub fn update_service_rate(&mut self, id: NodeId, rate: f64) -> SimulationResult<()> {
        self.crossing.update_service_rate(id, rate)
    }

    /// Open a new booth on lane `queue` mid-run
    pub fn add_service_node(&mut self, queue: usize, rate: f64) -> SimulationResult<NodeId> {
        self.crossing.add_service_node(queue, rate)
    }

    /// Simulated seconds elapsed
    pub fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    /// Simulated seconds per tick
    pub fn time_factor(&self) -> f64 {
        self.config.time_factor
    }

    /// Ticks committed so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Position samples kept in memory, oldest first
    pub fn positions(&self) -> &[PositionSample] {
        &self.positions
    }

    /// Samples taken at the end of the latest tick
    pub fn last_positions(&self) -> &[PositionSample] {
        &self.tick_positions
    }

    /// Samples taken after the in-memory cap was reached
    pub fn positions_dropped(&self) -> u64 {
        self.positions_dropped
    }

    /// Completed and balked cars
    pub fn finished_cars(&self) -> &[Car] {
        &self.finished
    }

    /// Handle a host can use to cancel the run
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Request cancellation at the next tick boundary
    pub fn cancel(&self) {
        self.stop.stop();
    }

    /// Change the tick length
    pub fn set_time_factor(&mut self, time_factor: f64) -> SimulationResult<()> {
        validate_time_factor(time_factor)?;
        debug!(old = self.config.time_factor, new = time_factor, "time factor updated");
        self.config.time_factor = time_factor;
        Ok(())
    }

    /// Fraction of the horizon covered, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        (self.simulation_time / self.config.max_simulation_time).min(1.0)
    }

    /// Move the clock forward one tick and return the step size
    pub fn advance_time(&mut self) -> f64 {
        self.simulation_time += self.config.time_factor;
        self.config.time_factor
    }

    /// Whether another tick should run
    ///
    /// Stops at the horizon, or once the crossing is empty after the warm-up.
    pub fn should_continue(&self) -> bool {
        self.simulation_time < self.config.max_simulation_time
            && (self.crossing.total_active_cars() > 0 || self.simulation_time < WARM_UP_SECONDS)
    }

    /// Sample every active car's point on the path
    ///
    /// Does nothing when position tracking is disabled or the sample interval
    /// has not elapsed. At most `max_position_samples` are kept; later ones are
    /// counted and only reach observers. Engine state is not touched.
    pub fn record_positions(&mut self) {
        self.tick_positions.clear();
        if !self.config.enable_position_tracking {
            return;
        }

        let now = self.simulation_time;
        // Tolerance absorbs float drift when the interval is a multiple of the tick
        if now + 1e-9 < self.next_position_sample {
            return;
        }
        self.next_position_sample = now + self.config.position_sample_interval;

        let timestamp = self.epoch + chrono::Duration::milliseconds((now * 1000.0) as i64);
        let length = self.path.length();
        let path = &self.path;
        let samples = self.crossing.queues().iter().flat_map(|q| q.cars()).map(|car| {
            let distance = car.position().min(length);
            PositionSample {
                car_id: car.id(),
                simulation_time: now,
                timestamp,
                distance,
                point: path.point_at_distance(distance),
            }
        });
        self.tick_positions.extend(samples);

        let room = self.config.max_position_samples.saturating_sub(self.positions.len());
        let kept = room.min(self.tick_positions.len());
        self.positions.extend_from_slice(&self.tick_positions[..kept]);
        let dropped = (self.tick_positions.len() - kept) as u64;
        if dropped > 0 {
            if self.positions_dropped == 0 {
                warn!(
                    simulation = %self.id,
                    cap = self.config.max_position_samples,
                    "position sample cap reached, further samples are not stored"
                );
            }
            self.positions_dropped += dropped;
        }
    }

    /// Run exactly one tick
    ///
    /// A failed tick rolls the clock back, leaves the crossing at its last
    /// committed state and marks the run failed.
    pub fn step(&mut self) -> SimulationResult<Vec<Car>> {
        self.ensure_running()?;
        let dt = self.advance_time();
        self.commit_tick(dt)
    }

    /// Run one tick of `dt` seconds instead of `time_factor`
    ///
    /// For hosts that drive the clock themselves. A negative or non-finite
    /// `dt` is rejected without touching the run.
    pub fn advance_by(&mut self, dt: f64) -> SimulationResult<Vec<Car>> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(SimulationError::time_error(format!(
                "time step must be finite and non-negative, got {}",
                dt
            )));
        }
        self.ensure_running()?;
        self.simulation_time += dt;
        self.commit_tick(dt)
    }

    fn ensure_running(&mut self) -> SimulationResult<()> {
        match self.status {
            RunStatus::NotStarted => self.status = RunStatus::Running,
            RunStatus::Running => {}
            finished => {
                return Err(SimulationError::state_error(format!(
                    "simulation {} is already {}",
                    self.id, finished
                )))
            }
        }
        Ok(())
    }

    // The clock has already moved by `dt`
    fn commit_tick(&mut self, dt: f64) -> SimulationResult<Vec<Car>> {
        match self.crossing.advance_time(dt) {
            Ok(completed) => {
                self.ticks += 1;
                self.finished.extend(self.crossing.drain_balked());
                self.finished.extend(completed.iter().cloned());
                self.record_positions();
                Ok(completed)
            }
            Err(error) => {
                self.simulation_time -= dt;
                self.fail(&error);
                Err(error)
            }
        }
    }

    fn fail(&mut self, error: &SimulationError) {
        warn!(simulation = %self.id, category = error.category(), "simulation failed: {}", error);
        self.status = RunStatus::Failed;
        self.failure_reason = Some(error.to_string());
    }

    /// Run to the end without callbacks
    pub fn run(&mut self) -> SimulationResult<SimulationReport> {
        self.run_with_observer(&mut NoopObserver)
    }

    /// Run to the end, reporting each tick to `observer`
    #[instrument(skip_all, fields(simulation = %self.id))]
    pub fn run_with_observer(&mut self, observer: &mut dyn TickObserver) -> SimulationResult<SimulationReport> {
        if self.status.is_finished() {
            return Err(SimulationError::state_error(format!(
                "simulation {} is already {}",
                self.id, self.status
            )));
        }

        let span = perf_span!("simulation_run", max_time = self.config.max_simulation_time);
        let _enter = span.enter();
        let started = Instant::now();
        self.status = RunStatus::Running;
        sim_event!(info, "simulation started", simulation = field::display(self.id));

        let outcome = loop {
            if self.stop.is_stopped() {
                self.status = RunStatus::Cancelled;
                break Ok(());
            }
            if !self.should_continue() {
                self.status = RunStatus::Completed;
                break Ok(());
            }
            match self.step() {
                Ok(completed) => {
                    observer.on_tick_end(self.simulation_time, &self.crossing, &completed);
                    if !self.tick_positions.is_empty() {
                        observer.on_positions(&self.tick_positions);
                    }
                }
                Err(error) => break Err(error),
            }
        };

        self.wall_clock += started.elapsed();
        observer.on_run_end(self.status, &self.crossing);
        outcome?;

        sim_event!(
            info,
            "simulation finished",
            simulation = field::display(self.id),
            status = field::display(self.status),
            ticks = self.ticks,
            completions = self.crossing.total_completions(),
        );
        Ok(self.report())
    }

    /// End-of-run report for the current state
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            simulation_id: self.id,
            status: self.status,
            failure_reason: self.failure_reason.clone(),
            border_crossing: self.crossing.config().clone(),
            simulation: self.config.clone(),
            statistics: self.crossing.get_statistics(),
            simulation_time: self.simulation_time,
            ticks: self.ticks,
            positions_recorded: self.positions.len(),
            positions_dropped: self.positions_dropped,
            wall_clock_duration: self.wall_clock,
            completed_at: Utc::now(),
        }
    }
}
