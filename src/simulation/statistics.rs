//! Statistics collection and reporting
//!
//! This module contains the crossing metrics snapshot and the end-of-run report.

use crate::types::{BorderCrossingConfig, NodeId, QueueAssignment, RunStatus, SimulationConfig, SimulationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Cars per minute given completions over `seconds` of simulated time
pub fn throughput_per_minute(completions: u64, seconds: f64) -> f64 {
    if seconds > 0.0 {
        completions as f64 / (seconds / 60.0)
    } else {
        0.0
    }
}

/// Crossing-wide counters and rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderCrossingStats {
    /// Simulated seconds elapsed
    pub current_time: f64,
    /// Number of lanes
    pub num_queues: usize,
    /// Number of booths
    pub total_service_nodes: usize,
    /// Lane assignment policy in use
    pub queue_assignment: QueueAssignment,
    /// Cars admitted to a lane
    pub total_arrivals: u64,
    /// Cars that finished inspection
    pub total_completions: u64,
    /// Cars turned away at a full lane
    pub total_balked: u64,
    /// Cars currently in a lane
    pub active_cars: usize,
    /// Busy booths over all booths, at this instant
    pub overall_utilization: f64,
    /// Mean seconds from arrival to reaching a booth
    pub average_waiting_time: f64,
    /// Mean inspection seconds
    pub average_service_time: f64,
    /// Time-weighted mean number of cars in the system
    pub average_cars_in_system: f64,
    /// Completions per simulated minute
    pub throughput: f64,
}

impl BorderCrossingStats {
    /// Cars offered to the crossing, admitted or not
    pub fn total_offered(&self) -> u64 {
        self.total_arrivals + self.total_balked
    }

    /// Share of offered cars that balked, as a percentage
    pub fn balk_percentage(&self) -> f64 {
        let offered = self.total_offered();
        if offered == 0 {
            0.0
        } else {
            self.total_balked as f64 / offered as f64 * 100.0
        }
    }
}

/// Per-lane metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Lane index
    pub index: usize,
    /// Cars in the lane
    pub active_cars: usize,
    /// Cars waiting for a booth
    pub waiting: usize,
    /// Busy booths
    pub busy_nodes: usize,
    /// Booths in the lane
    pub total_nodes: usize,
    /// Busy over total booths
    pub utilization: f64,
    /// Mean seconds from arrival to reaching a booth
    pub average_wait_time: f64,
    /// Cars admitted
    pub total_arrivals: u64,
    /// Cars that finished inspection
    pub total_completions: u64,
    /// Cars turned away
    pub total_balked: u64,
}

/// Per-booth metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceNodeStats {
    /// Booth identifier
    pub id: NodeId,
    /// Cars per minute
    pub service_rate: f64,
    /// Whether a car is at the booth
    pub busy: bool,
    /// Cars served
    pub total_served: u64,
    /// Summed inspection seconds
    pub total_service_time: f64,
    /// Mean inspection seconds
    pub average_service_time: f64,
    /// Fraction of elapsed time spent serving
    pub utilization: f64,
}

/// Everything [`BorderCrossing::get_statistics`](crate::crossing::BorderCrossing::get_statistics) returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossingStatistics {
    /// Crossing-wide figures
    pub crossing: BorderCrossingStats,
    /// One entry per lane
    pub queues: Vec<QueueStats>,
    /// One entry per booth, in lane order
    pub nodes: Vec<ServiceNodeStats>,
}

/// End-of-run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Run identifier
    pub simulation_id: SimulationId,
    /// Final run state
    pub status: RunStatus,
    /// Cause of a failed run
    pub failure_reason: Option<String>,
    /// Crossing configuration used
    pub border_crossing: BorderCrossingConfig,
    /// Driver configuration used
    pub simulation: SimulationConfig,
    /// Crossing metrics at the end of the run
    pub statistics: CrossingStatistics,
    /// Simulated seconds covered
    pub simulation_time: f64,
    /// Ticks executed
    pub ticks: u64,
    /// Position samples kept in memory
    pub positions_recorded: usize,
    /// Position samples taken past the in-memory cap
    #[serde(default)]
    pub positions_dropped: u64,
    /// Wall-clock time spent running
    pub wall_clock_duration: Duration,
    /// When the report was produced
    pub completed_at: DateTime<Utc>,
}

impl SimulationReport {
    /// Generate a comprehensive summary report
    pub fn generate_summary_report(&self) -> String {
        let stats = &self.statistics.crossing;
        let mut report = String::new();

        report.push_str("=== Border Crossing Simulation Report ===\n\n");
        report.push_str(&format!("Simulation: {}\n", self.simulation_id));
        report.push_str(&format!("Status: {}\n", self.status));
        if let Some(reason) = &self.failure_reason {
            report.push_str(&format!("Failure: {}\n", reason));
        }
        report.push_str(&format!(
            "Simulated Time: {:.0} s ({:.1} min) over {} ticks\n",
            self.simulation_time,
            self.simulation_time / 60.0,
            self.ticks
        ));
        report.push_str(&format!(
            "Wall Clock: {:.3} seconds\n\n",
            self.wall_clock_duration.as_secs_f64()
        ));

        report.push_str("Layout:\n");
        report.push_str(&format!("  • Queues: {}\n", stats.num_queues));
        report.push_str(&format!("  • Service Nodes: {}\n", stats.total_service_nodes));
        report.push_str(&format!("  • Assignment: {}\n", stats.queue_assignment));
        report.push_str(&format!(
            "  • Arrival Rate: {:.2} cars/min\n\n",
            self.border_crossing.arrival_rate
        ));

        report.push_str("Traffic:\n");
        report.push_str(&format!("  • Arrivals: {}\n", stats.total_arrivals));
        report.push_str(&format!("  • Completions: {}\n", stats.total_completions));
        report.push_str(&format!(
            "  • Balked: {} ({:.1}%)\n",
            stats.total_balked,
            stats.balk_percentage()
        ));
        report.push_str(&format!("  • Still In System: {}\n", stats.active_cars));
        report.push_str(&format!("  • Throughput: {:.2} cars/min\n", stats.throughput));
        report.push_str(&format!(
            "  • Mean Cars In System: {:.2}\n",
            stats.average_cars_in_system
        ));
        report.push_str(&format!("  • Mean Wait: {:.1} s\n", stats.average_waiting_time));
        report.push_str(&format!(
            "  • Mean Service: {:.1} s\n\n",
            stats.average_service_time
        ));

        report.push_str("Queues:\n");
        for queue in &self.statistics.queues {
            report.push_str(&format!(
                "  • Queue {}: {} cars ({} waiting), {}/{} booths busy, mean wait {:.1} s, {} served, {} balked\n",
                queue.index,
                queue.active_cars,
                queue.waiting,
                queue.busy_nodes,
                queue.total_nodes,
                queue.average_wait_time,
                queue.total_completions,
                queue.total_balked
            ));
        }

        report.push_str("\nService Nodes:\n");
        for node in &self.statistics.nodes {
            report.push_str(&format!(
                "  • {}: rate {:.2}/min, {} served, utilization {:.1}%\n",
                node.id,
                node.service_rate,
                node.total_served,
                node.utilization * 100.0
            ));
        }

        if self.positions_recorded > 0 {
            report.push_str(&format!("\nPosition Samples: {}\n", self.positions_recorded));
        }
        if self.positions_dropped > 0 {
            report.push_str(&format!("  • Not stored (cap reached): {}\n", self.positions_dropped));
        }

        report
    }

    /// Generate a compact one-line summary suitable for logging
    pub fn compact_summary(&self) -> String {
        let stats = &self.statistics.crossing;
        format!(
            "{} {} | t={:.0}s | arrivals {} | completed {} | balked {} | throughput {:.2}/min | mean wait {:.1}s",
            self.simulation_id,
            self.status,
            self.simulation_time,
            stats.total_arrivals,
            stats.total_completions,
            stats.total_balked,
            stats.throughput,
            stats.average_waiting_time
        )
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.generate_summary_report())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crossing_stats() -> BorderCrossingStats {
        BorderCrossingStats {
            current_time: 600.0,
            num_queues: 1,
            total_service_nodes: 1,
            queue_assignment: QueueAssignment::Shortest,
            total_arrivals: 30,
            total_completions: 25,
            total_balked: 10,
            active_cars: 5,
            overall_utilization: 1.0,
            average_waiting_time: 42.0,
            average_service_time: 20.0,
            average_cars_in_system: 4.2,
            throughput: throughput_per_minute(25, 600.0),
        }
    }

    fn report() -> SimulationReport {
        SimulationReport {
            simulation_id: SimulationId::new(),
            status: RunStatus::Completed,
            failure_reason: None,
            border_crossing: BorderCrossingConfig::single_server(2.0, 3.0),
            simulation: SimulationConfig::default(),
            statistics: CrossingStatistics {
                crossing: crossing_stats(),
                queues: vec![QueueStats {
                    index: 0,
                    active_cars: 5,
                    waiting: 4,
                    busy_nodes: 1,
                    total_nodes: 1,
                    utilization: 1.0,
                    average_wait_time: 42.0,
                    total_arrivals: 30,
                    total_completions: 25,
                    total_balked: 10,
                }],
                nodes: vec![ServiceNodeStats {
                    id: NodeId::new(0, 0),
                    service_rate: 3.0,
                    busy: true,
                    total_served: 25,
                    total_service_time: 500.0,
                    average_service_time: 20.0,
                    utilization: 500.0 / 600.0,
                }],
            },
            simulation_time: 600.0,
            ticks: 600,
            positions_recorded: 0,
            positions_dropped: 0,
            wall_clock_duration: Duration::from_millis(12),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_throughput_per_minute() {
        assert_eq!(throughput_per_minute(25, 600.0), 2.5);
        assert_eq!(throughput_per_minute(25, 0.0), 0.0);
    }

    #[test]
    fn test_balk_percentage() {
        let stats = crossing_stats();
        assert_eq!(stats.total_offered(), 40);
        assert_eq!(stats.balk_percentage(), 25.0);
    }

    #[test]
    fn test_summary_report_contents() {
        let text = report().generate_summary_report();
        assert!(text.contains("Border Crossing Simulation Report"));
        assert!(text.contains("Arrivals: 30"));
        assert!(text.contains("Balked: 10 (25.0%)"));
        assert!(text.contains("Throughput: 2.50 cars/min"));
        assert!(text.contains("q0_n0"));
        assert!(!text.contains("Failure:"));
    }

    #[test]
    fn test_compact_summary_is_single_line() {
        let summary = report().compact_summary();
        assert!(!summary.contains('\n'));
        assert!(summary.contains("completed 25"));
        assert!(summary.starts_with("SIM_"));
    }

    #[test]
    fn test_report_serializes() {
        let json = serde_json::to_string(&report()).unwrap();
        let back: SimulationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.statistics, report().statistics);
        assert_eq!(back.status, RunStatus::Completed);
    }
}
