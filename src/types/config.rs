//! Configuration structures for the border crossing simulator
//!
//! Configuration is layered: built-in defaults, then an optional JSON file,
//! then command line overrides. [`ScenarioConfig`] bundles the crossing model
//! and the outer driver settings; both halves validate independently.

use super::{QueueAssignment, ServiceTimeModel};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Model defaults matching the reference deployment (three lanes, seven booths)
pub mod defaults {
    /// Number of lanes
    pub const NUM_QUEUES: usize = 3;
    /// Booths per lane
    pub const NODES_PER_QUEUE: [usize; 3] = [2, 3, 2];
    /// System-wide arrival rate in cars per minute
    pub const ARRIVAL_RATE: f64 = 6.0;
    /// Per-booth service rates in cars per minute
    pub const SERVICE_RATES: [f64; 7] = [3.5, 3.0, 4.0, 3.2, 3.8, 3.1, 3.9];
    /// Minimum comfortable following distance in meters
    pub const SAFE_DISTANCE: f64 = 8.0;
    /// Lane capacity before arrivals balk
    pub const MAX_QUEUE_LENGTH: usize = 50;
    /// Coefficient of variation for the jittered service model
    pub const SERVICE_TIME_VARIATION: f64 = 0.2;
    /// Simulated horizon in seconds
    pub const MAX_SIMULATION_TIME: f64 = 3600.0;
    /// Simulated seconds advanced per tick
    pub const TIME_FACTOR: f64 = 1.0;
    /// Length of the approach path in meters
    pub const PATH_LENGTH: f64 = 1000.0;
    /// Simulated seconds between position samples
    pub const POSITION_SAMPLE_INTERVAL: f64 = 1.0;
    /// Position samples kept in memory by the driver
    pub const MAX_POSITION_SAMPLES: usize = 100_000;
}

/// Command line arguments structure
#[derive(Debug, Clone, Parser)]
#[command(
    name = "border-wait-sim",
    version = "0.1.0",
    about = "Border Wait Simulator - Simulates vehicle flow through a multi-lane border crossing",
    long_about = "Simulates cars arriving at a border crossing, choosing a lane, following each other \
toward the inspection booths and being served. Produces queue, booth and throughput statistics \
for wait-time estimation.

EXAMPLES:
    # Run with default settings (3 lanes, 7 booths, one simulated hour)
    border-wait-sim

    # Use a configuration file
    border-wait-sim --config scenario.json

    # Override specific settings
    border-wait-sim --num-queues 2 --nodes-per-queue 1,1 --service-rates 3.0,3.5

    # Reproducible run with a JSON report
    border-wait-sim --seed 42 --output report.json

    # Generate configuration template
    border-wait-sim --print-config > scenario.json

    # Validate configuration without running
    border-wait-sim --config scenario.json --dry-run

CONFIGURATION:
    Configuration can be provided via:
    1. Command line arguments (highest priority)
    2. Configuration file (--config flag)
    3. Default values (lowest priority)

    Supported configuration file formats: JSON (.json)

    Use --print-config to generate a template configuration file."
)]
pub struct CliArgs {
    /// Configuration file path (JSON format)
    #[arg(
        short,
        long,
        help = "Configuration file path (JSON format)",
        long_help = "Path to a JSON configuration file. CLI arguments will override file settings."
    )]
    pub config: Option<String>,

    /// Number of lanes
    #[arg(long, help = "Number of lanes (queues)")]
    pub num_queues: Option<usize>,

    /// Booths per lane as a comma separated list
    #[arg(
        long,
        value_delimiter = ',',
        help = "Booths per lane, e.g. 2,3,2",
        long_help = "Number of service nodes (booths) in each lane, comma separated. Must have one entry per lane. Default: 2,3,2"
    )]
    pub nodes_per_queue: Option<Vec<usize>>,

    /// System-wide arrival rate (cars/minute)
    #[arg(long, help = "Arrival rate in cars per minute")]
    pub arrival_rate: Option<f64>,

    /// Per-booth service rates as a comma separated list
    #[arg(
        long,
        value_delimiter = ',',
        help = "Service rate per booth in cars per minute",
        long_help = "Service rate of every booth in lane order, comma separated. Must have one entry per booth."
    )]
    pub service_rates: Option<Vec<f64>>,

    /// Lane assignment strategy
    #[arg(
        long,
        help = "Lane assignment strategy (random, shortest, round_robin)",
        long_help = "How arriving cars choose a lane. Supported: random, shortest, round_robin. Default: shortest"
    )]
    pub queue_assignment: Option<String>,

    /// Safe following distance (meters)
    #[arg(long, help = "Safe following distance in meters")]
    pub safe_distance: Option<f64>,

    /// Lane capacity before arrivals balk
    #[arg(long, help = "Maximum cars per lane before arrivals balk")]
    pub max_queue_length: Option<usize>,

    /// Service time model
    #[arg(
        long,
        help = "Service time model (exponential, conditional, variable)",
        long_help = "How booths draw service durations. exponential: plain draw; conditional: rate adjusted for time of day and congestion; variable: exponential plus Gaussian jitter. Default: exponential"
    )]
    pub service_time_model: Option<String>,

    /// Disable time-of-day modulation of the arrival rate
    #[arg(long, help = "Use a constant arrival rate regardless of simulated hour")]
    pub no_time_of_day: bool,

    /// Simulated horizon in seconds
    #[arg(long, help = "Maximum simulated time in seconds")]
    pub max_simulation_time: Option<f64>,

    /// Simulated seconds per tick
    #[arg(long, help = "Simulated seconds advanced per tick")]
    pub time_factor: Option<f64>,

    /// Random seed for reproducible results
    #[arg(long, help = "Random seed for reproducible results")]
    pub seed: Option<u64>,

    /// Approach path length in meters
    #[arg(long, help = "Length of the straight approach path in meters")]
    pub path_length: Option<f64>,

    /// Disable position sampling
    #[arg(long, help = "Do not record car positions each tick")]
    pub no_position_tracking: bool,

    /// Seconds between position samples
    #[arg(long, help = "Simulated seconds between position samples")]
    pub position_sample_interval: Option<f64>,

    /// Cap on stored position samples
    #[arg(long, help = "Maximum number of position samples kept in memory")]
    pub max_position_samples: Option<usize>,

    /// Output path for the JSON run report
    #[arg(short, long, help = "Write the JSON run report to this path")]
    pub output: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, help = "Enable debug logging")]
    pub debug: bool,

    /// Emit logs as JSON
    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    /// Dry run mode - validate configuration without running simulation
    #[arg(long, help = "Validate configuration without running simulation")]
    pub dry_run: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in JSON format and exit")]
    pub print_config: bool,
}

/// Border crossing model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderCrossingConfig {
    /// Number of lanes
    pub num_queues: usize,
    /// Booths per lane
    pub nodes_per_queue: Vec<usize>,
    /// System-wide arrival rate (cars/minute)
    pub arrival_rate: f64,
    /// Service rate of every booth in lane order (cars/minute)
    pub service_rates: Vec<f64>,
    /// Lane assignment policy
    pub queue_assignment: QueueAssignment,
    /// Safe following distance (meters)
    pub safe_distance: f64,
    /// Lane capacity
    pub max_queue_length: usize,
    /// How booths draw service durations
    pub service_time_model: ServiceTimeModel,
    /// Coefficient of variation for [`ServiceTimeModel::Variable`]
    pub service_time_variation: f64,
    /// Whether the arrival rate follows the simulated hour of day
    pub time_of_day_modulation: bool,
}

impl Default for BorderCrossingConfig {
    fn default() -> Self {
        Self {
            num_queues: defaults::NUM_QUEUES,
            nodes_per_queue: defaults::NODES_PER_QUEUE.to_vec(),
            arrival_rate: defaults::ARRIVAL_RATE,
            service_rates: defaults::SERVICE_RATES.to_vec(),
            queue_assignment: QueueAssignment::Shortest,
            safe_distance: defaults::SAFE_DISTANCE,
            max_queue_length: defaults::MAX_QUEUE_LENGTH,
            service_time_model: ServiceTimeModel::Exponential,
            service_time_variation: defaults::SERVICE_TIME_VARIATION,
            time_of_day_modulation: true,
        }
    }
}

impl BorderCrossingConfig {
    /// Single lane, single booth configuration
    pub fn single_server(arrival_rate: f64, service_rate: f64) -> Self {
        Self {
            num_queues: 1,
            nodes_per_queue: vec![1],
            arrival_rate,
            service_rates: vec![service_rate],
            ..Default::default()
        }
    }

    /// Total number of booths across all lanes
    pub fn total_service_nodes(&self) -> usize {
        self.nodes_per_queue.iter().sum()
    }

    /// Service rates of the booths in lane `queue`
    ///
    /// Only meaningful on a validated configuration.
    pub fn service_rates_for_queue(&self, queue: usize) -> &[f64] {
        let start: usize = self.nodes_per_queue.iter().take(queue).sum();
        let count = self.nodes_per_queue.get(queue).copied().unwrap_or(0);
        let end = (start + count).min(self.service_rates.len());
        &self.service_rates[start.min(end)..end]
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.num_queues == 0 {
            return Err(ConfigValidationError::InvalidQueueCount(self.num_queues));
        }

        if self.nodes_per_queue.len() != self.num_queues {
            return Err(ConfigValidationError::NodesPerQueueMismatch {
                expected: self.num_queues,
                actual: self.nodes_per_queue.len(),
            });
        }

        if let Some(queue) = self.nodes_per_queue.iter().position(|&n| n == 0) {
            return Err(ConfigValidationError::QueueWithoutNodes(queue));
        }

        if !(self.arrival_rate.is_finite() && self.arrival_rate > 0.0) {
            return Err(ConfigValidationError::InvalidArrivalRate(self.arrival_rate));
        }

        let total_nodes = self.total_service_nodes();
        if self.service_rates.len() != total_nodes {
            return Err(ConfigValidationError::ServiceRatesMismatch {
                expected: total_nodes,
                actual: self.service_rates.len(),
            });
        }

        for (node, &rate) in self.service_rates.iter().enumerate() {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(ConfigValidationError::InvalidServiceRate { node, rate });
            }
        }

        if !(self.safe_distance.is_finite() && self.safe_distance > 0.0) {
            return Err(ConfigValidationError::InvalidSafeDistance(self.safe_distance));
        }

        if self.max_queue_length == 0 {
            return Err(ConfigValidationError::InvalidMaxQueueLength(self.max_queue_length));
        }

        if !(self.service_time_variation.is_finite() && self.service_time_variation >= 0.0) {
            return Err(ConfigValidationError::InvalidServiceTimeVariation(
                self.service_time_variation,
            ));
        }

        Ok(())
    }
}

/// Outer driver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulated horizon in seconds
    pub max_simulation_time: f64,
    /// Simulated seconds advanced per tick
    pub time_factor: f64,
    /// Record car positions
    pub enable_position_tracking: bool,
    /// Simulated seconds between position samples
    pub position_sample_interval: f64,
    /// Samples kept in memory; later samples only reach observers
    pub max_position_samples: usize,
    /// Random seed for reproducible results
    pub seed: Option<u64>,
    /// Length of the approach path in meters
    pub path_length: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_simulation_time: defaults::MAX_SIMULATION_TIME,
            time_factor: defaults::TIME_FACTOR,
            enable_position_tracking: true,
            position_sample_interval: defaults::POSITION_SAMPLE_INTERVAL,
            max_position_samples: defaults::MAX_POSITION_SAMPLES,
            seed: None,
            path_length: defaults::PATH_LENGTH,
        }
    }
}

impl SimulationConfig {
    /// Validate the driver parameters
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.max_simulation_time.is_finite() && self.max_simulation_time > 0.0) {
            return Err(ConfigValidationError::InvalidMaxSimulationTime(self.max_simulation_time));
        }

        validate_time_factor(self.time_factor)?;

        if !(self.path_length.is_finite() && self.path_length > 0.0) {
            return Err(ConfigValidationError::InvalidPathLength(self.path_length));
        }

        let interval = self.position_sample_interval;
        if !(interval.is_finite() && interval > 0.0) {
            return Err(ConfigValidationError::InvalidPositionSampleInterval(interval));
        }

        Ok(())
    }
}

/// Check a tick length in simulated seconds
pub fn validate_time_factor(time_factor: f64) -> Result<(), ConfigValidationError> {
    if !(time_factor.is_finite() && time_factor > 0.0) {
        return Err(ConfigValidationError::InvalidTimeFactor(time_factor));
    }
    Ok(())
}

/// Complete scenario: crossing model plus driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScenarioConfig {
    /// Crossing model
    pub border_crossing: BorderCrossingConfig,
    /// Outer driver
    pub simulation: SimulationConfig,
}

/// Partial crossing section of a configuration file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BorderCrossingSection {
    /// Number of lanes
    pub num_queues: Option<usize>,
    /// Booths per lane
    pub nodes_per_queue: Option<Vec<usize>>,
    /// System-wide arrival rate (cars/minute)
    pub arrival_rate: Option<f64>,
    /// Per-booth service rates (cars/minute)
    pub service_rates: Option<Vec<f64>>,
    /// Lane assignment policy
    pub queue_assignment: Option<QueueAssignment>,
    /// Safe following distance (meters)
    pub safe_distance: Option<f64>,
    /// Lane capacity
    pub max_queue_length: Option<usize>,
    /// Service time model
    pub service_time_model: Option<ServiceTimeModel>,
    /// Coefficient of variation for the jittered model
    pub service_time_variation: Option<f64>,
    /// Time-of-day modulation of arrivals
    pub time_of_day_modulation: Option<bool>,
}

/// Partial driver section of a configuration file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SimulationSection {
    /// Simulated horizon in seconds
    pub max_simulation_time: Option<f64>,
    /// Simulated seconds per tick
    pub time_factor: Option<f64>,
    /// Record car positions
    pub enable_position_tracking: Option<bool>,
    /// Seconds between position samples
    pub position_sample_interval: Option<f64>,
    /// Cap on stored position samples
    pub max_position_samples: Option<usize>,
    /// Random seed
    pub seed: Option<u64>,
    /// Approach path length
    pub path_length: Option<f64>,
}

/// Configuration file structure (allows partial configuration)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Crossing model overrides
    pub border_crossing: Option<BorderCrossingSection>,
    /// Driver overrides
    pub simulation: Option<SimulationSection>,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Configuration file read error
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("Failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unsupported configuration file format
    #[error("Unsupported configuration file format: {0} (supported: .json)")]
    UnsupportedFormat(String),

    /// A command line value could not be interpreted
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Argument name
        field: String,
        /// Parser message
        message: String,
    },
}

/// Validation errors for scenario configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    /// Lane count is invalid
    #[error("Number of queues must be at least 1, got {0}")]
    InvalidQueueCount(usize),

    /// nodes_per_queue has the wrong length
    #[error("nodes_per_queue must have {expected} entries (one per queue), got {actual}")]
    NodesPerQueueMismatch {
        /// Number of queues
        expected: usize,
        /// Entries supplied
        actual: usize,
    },

    /// A lane has no booth
    #[error("Queue {0} has no service nodes")]
    QueueWithoutNodes(usize),

    /// Arrival rate is not positive
    #[error("Arrival rate must be positive, got {0}")]
    InvalidArrivalRate(f64),

    /// service_rates has the wrong length
    #[error("service_rates must have {expected} entries (one per service node), got {actual}")]
    ServiceRatesMismatch {
        /// Total booths
        expected: usize,
        /// Entries supplied
        actual: usize,
    },

    /// A booth rate is not positive
    #[error("Service rate for node {node} must be positive, got {rate}")]
    InvalidServiceRate {
        /// Flat booth index
        node: usize,
        /// Offending rate
        rate: f64,
    },

    /// Safe distance is not positive
    #[error("Safe distance must be positive, got {0}")]
    InvalidSafeDistance(f64),

    /// Lane capacity is zero
    #[error("Max queue length must be at least 1, got {0}")]
    InvalidMaxQueueLength(usize),

    /// Jitter coefficient is negative
    #[error("Service time variation must be non-negative, got {0}")]
    InvalidServiceTimeVariation(f64),

    /// Tick length is not positive
    #[error("Time factor must be positive, got {0}")]
    InvalidTimeFactor(f64),

    /// Horizon is not positive
    #[error("Max simulation time must be positive, got {0}")]
    InvalidMaxSimulationTime(f64),

    /// Path length is not positive
    #[error("Path length must be positive, got {0}")]
    InvalidPathLength(f64),

    /// Position sample interval is not positive
    #[error("Position sample interval must be positive, got {0}")]
    InvalidPositionSampleInterval(f64),
}

impl ScenarioConfig {
    /// Create a new configuration from command line arguments and optional config file
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::from_cli_args(args)
    }

    /// Create configuration from parsed CLI arguments
    pub fn from_cli_args(args: CliArgs) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(config_path) = &args.config {
            config = Self::from_file(config_path)?;
        }

        // CLI takes precedence over the file
        Self::apply_cli_overrides(&mut config, args)?;

        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let config_file: ConfigFile = serde_json::from_str(&content)?;
                Ok(Self::from_config_file(config_file))
            }
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::UnsupportedFormat("no extension".to_string())),
        }
    }

    /// Create configuration from a config file, merging with defaults
    fn from_config_file(config_file: ConfigFile) -> Self {
        let defaults = Self::default();
        let crossing = config_file.border_crossing.unwrap_or_default();
        let sim = config_file.simulation.unwrap_or_default();
        let bc = defaults.border_crossing;
        let sd = defaults.simulation;

        Self {
            border_crossing: BorderCrossingConfig {
                num_queues: crossing.num_queues.unwrap_or(bc.num_queues),
                nodes_per_queue: crossing.nodes_per_queue.unwrap_or(bc.nodes_per_queue),
                arrival_rate: crossing.arrival_rate.unwrap_or(bc.arrival_rate),
                service_rates: crossing.service_rates.unwrap_or(bc.service_rates),
                queue_assignment: crossing.queue_assignment.unwrap_or(bc.queue_assignment),
                safe_distance: crossing.safe_distance.unwrap_or(bc.safe_distance),
                max_queue_length: crossing.max_queue_length.unwrap_or(bc.max_queue_length),
                service_time_model: crossing.service_time_model.unwrap_or(bc.service_time_model),
                service_time_variation: crossing
                    .service_time_variation
                    .unwrap_or(bc.service_time_variation),
                time_of_day_modulation: crossing
                    .time_of_day_modulation
                    .unwrap_or(bc.time_of_day_modulation),
            },
            simulation: SimulationConfig {
                max_simulation_time: sim.max_simulation_time.unwrap_or(sd.max_simulation_time),
                time_factor: sim.time_factor.unwrap_or(sd.time_factor),
                enable_position_tracking: sim
                    .enable_position_tracking
                    .unwrap_or(sd.enable_position_tracking),
                position_sample_interval: sim
                    .position_sample_interval
                    .unwrap_or(sd.position_sample_interval),
                max_position_samples: sim.max_position_samples.unwrap_or(sd.max_position_samples),
                seed: sim.seed.or(sd.seed),
                path_length: sim.path_length.unwrap_or(sd.path_length),
            },
        }
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(config: &mut Self, args: CliArgs) -> Result<(), ConfigError> {
        let crossing = &mut config.border_crossing;
        if let Some(value) = args.num_queues {
            crossing.num_queues = value;
        }
        if let Some(value) = args.nodes_per_queue {
            crossing.nodes_per_queue = value;
        }
        if let Some(value) = args.arrival_rate {
            crossing.arrival_rate = value;
        }
        if let Some(value) = args.service_rates {
            crossing.service_rates = value;
        }
        if let Some(value) = args.queue_assignment {
            crossing.queue_assignment = value.parse().map_err(|message| {
                ConfigError::InvalidValue { field: "queue_assignment".to_string(), message }
            })?;
        }
        if let Some(value) = args.safe_distance {
            crossing.safe_distance = value;
        }
        if let Some(value) = args.max_queue_length {
            crossing.max_queue_length = value;
        }
        if let Some(value) = args.service_time_model {
            crossing.service_time_model = value.parse().map_err(|message| {
                ConfigError::InvalidValue { field: "service_time_model".to_string(), message }
            })?;
        }
        if args.no_time_of_day {
            crossing.time_of_day_modulation = false;
        }

        let sim = &mut config.simulation;
        if let Some(value) = args.max_simulation_time {
            sim.max_simulation_time = value;
        }
        if let Some(value) = args.time_factor {
            sim.time_factor = value;
        }
        if let Some(value) = args.seed {
            sim.seed = Some(value);
        }
        if let Some(value) = args.path_length {
            sim.path_length = value;
        }
        if args.no_position_tracking {
            sim.enable_position_tracking = false;
        }
        if let Some(value) = args.position_sample_interval {
            sim.position_sample_interval = value;
        }
        if let Some(value) = args.max_position_samples {
            sim.max_position_samples = value;
        }

        Ok(())
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Print configuration as JSON
    pub fn print_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate both halves of the scenario
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.border_crossing.validate()?;
        self.simulation.validate()
    }
}
