//! Tests for the crossing engine: tick semantics, invariants and snapshots
//!
//! These tests run multi-lane crossings for simulated hours and check car
//! conservation, booth consistency and reproducibility from a seed.

use border_wait_sim::{
    BorderCrossing, BorderCrossingConfig, CarStatus, NodeId, QueueAssignment, ServiceTimeModel,
    SimulationError,
};
use std::collections::HashSet;

fn busy_config() -> BorderCrossingConfig {
    BorderCrossingConfig {
        arrival_rate: 12.0,
        time_of_day_modulation: false,
        max_queue_length: 15,
        ..Default::default()
    }
}

#[test]
fn test_conservation_every_tick() {
    let mut crossing = BorderCrossing::with_seed(busy_config(), 21).unwrap();
    let mut completed_total = 0u64;

    for _ in 0..2_400 {
        let completed = crossing.advance_time(0.5).unwrap();
        completed_total += completed.len() as u64;

        assert_eq!(
            crossing.total_arrivals(),
            crossing.total_completions() + crossing.total_active_cars() as u64
        );
        assert_eq!(crossing.total_completions(), completed_total);
        crossing.verify_invariants().unwrap();
    }

    assert!(crossing.total_completions() > 0);
}

#[test]
fn test_lane_capacity_and_booth_consistency() {
    // Arrivals well beyond total booth capacity
    let config = BorderCrossingConfig { arrival_rate: 40.0, ..busy_config() };
    let mut crossing = BorderCrossing::with_seed(config, 22).unwrap();

    for _ in 0..1_800 {
        crossing.advance_time(1.0).unwrap();
        let state = crossing.get_state();

        for queue in crossing.queues() {
            assert!(queue.active_cars() <= queue.max_queue_length());
        }

        let mut serving = HashSet::new();
        for node in &state.nodes {
            assert_eq!(node.busy, node.current_car.is_some());
            assert_eq!(node.busy, node.service_completion_time.is_some());
            if let Some(car_id) = node.current_car {
                // No car is at two booths at once
                assert!(serving.insert(car_id));
                let car = state.car(car_id).unwrap();
                assert_eq!(car.status, CarStatus::Serving);
                assert_eq!(car.queue, Some(node.queue));
            }
        }
    }

    assert!(crossing.total_balked() > 0);
}

#[test]
fn test_completed_cars_leave_the_crossing() {
    let mut crossing = BorderCrossing::with_seed(busy_config(), 23).unwrap();
    let mut seen_completed = 0;

    for _ in 0..1_200 {
        for car in crossing.advance_time(1.0).unwrap() {
            seen_completed += 1;
            assert_eq!(car.status(), CarStatus::Completed);
            let start = car.service_start_time().unwrap();
            let end = car.completion_time().unwrap();
            assert!(car.arrival_time().unwrap() <= start);
            assert!(start <= end);
            assert!(crossing.get_state().car(car.id()).is_none());
        }
    }

    assert!(seen_completed > 0);
}

#[test]
fn test_one_assignment_per_lane_per_tick() {
    let config = BorderCrossingConfig {
        num_queues: 1,
        nodes_per_queue: vec![3],
        service_rates: vec![0.01; 3],
        arrival_rate: 1.0,
        time_of_day_modulation: false,
        ..Default::default()
    };
    let mut crossing = BorderCrossing::with_seed(config, 24).unwrap();
    for _ in 0..3 {
        crossing.add_car().unwrap();
    }

    crossing.advance_time(0.1).unwrap();
    assert_eq!(crossing.queue(0).unwrap().busy_nodes(), 1);
    crossing.advance_time(0.1).unwrap();
    assert_eq!(crossing.queue(0).unwrap().busy_nodes(), 2);
    crossing.advance_time(0.1).unwrap();
    assert_eq!(crossing.queue(0).unwrap().busy_nodes(), 3);
}

#[test]
fn test_zero_dt_only_processes_due_arrivals() {
    let mut crossing =
        BorderCrossing::with_seed(BorderCrossingConfig::single_server(2.0, 3.0), 25).unwrap();

    // The first arrival is due at t = 0
    crossing.advance_time(0.0).unwrap();
    assert_eq!(crossing.current_time(), 0.0);
    assert_eq!(crossing.total_arrivals(), 1);
    assert!(crossing.next_arrival_time() > 0.0);
}

#[test]
fn test_invalid_dt_is_a_time_error() {
    let mut crossing = BorderCrossing::with_seed(busy_config(), 26).unwrap();
    crossing.advance_time(5.0).unwrap();
    let before = crossing.get_state();

    for dt in [-0.5, f64::NAN, f64::INFINITY] {
        let error = crossing.advance_time(dt).unwrap_err();
        assert!(matches!(error, SimulationError::TimeError(_)));
        assert_eq!(error.category(), "Time Management");
    }
    assert_eq!(crossing.get_state(), before);
}

#[test]
fn test_same_seed_same_state() {
    let run = |seed: u64| {
        let mut crossing = BorderCrossing::with_seed(busy_config(), seed).unwrap();
        for _ in 0..600 {
            crossing.advance_time(1.0).unwrap();
        }
        crossing.get_state()
    };

    assert_eq!(run(99), run(99));
    assert_ne!(run(99), run(100));
}

#[test]
fn test_all_service_models_run_clean() {
    for model in [ServiceTimeModel::Exponential, ServiceTimeModel::Conditional, ServiceTimeModel::Variable] {
        let config = BorderCrossingConfig {
            service_time_model: model,
            queue_assignment: QueueAssignment::Random,
            ..busy_config()
        };
        let mut crossing = BorderCrossing::with_seed(config, 27).unwrap();
        for _ in 0..900 {
            crossing.advance_time(1.0).unwrap();
        }
        crossing.verify_invariants().unwrap();
        assert!(crossing.total_completions() > 0, "{} produced no completions", model);
    }
}

#[test]
fn test_snapshot_serializes_to_json() {
    let mut crossing = BorderCrossing::with_seed(busy_config(), 28).unwrap();
    for _ in 0..120 {
        crossing.advance_time(1.0).unwrap();
    }

    let state = crossing.get_state();
    assert_eq!(state.current_time, 120.0);
    assert_eq!(state.queues.len(), 3);
    assert_eq!(state.nodes.len(), 7);
    assert_eq!(state.cars.len(), crossing.total_active_cars());

    let json = serde_json::to_value(&state).unwrap();
    assert!(json["cars"].is_array());
    assert_eq!(json["nodes"][0]["id"], "q0_n0");
}

#[test]
fn test_runtime_reconfiguration() {
    let mut crossing = BorderCrossing::with_seed(busy_config(), 29).unwrap();
    crossing.advance_time(30.0).unwrap();

    // Booth q2_n1 is the last entry of the flat rate list
    crossing.update_service_rate(NodeId::new(2, 1), 6.0).unwrap();
    assert_eq!(crossing.config().service_rates[6], 6.0);
    assert_eq!(crossing.service_node(NodeId::new(2, 1)).unwrap().service_rate(), 6.0);

    let missing = crossing.update_service_rate(NodeId::new(5, 0), 6.0).unwrap_err();
    assert!(matches!(missing, SimulationError::NodeError(_)));

    let id = crossing.add_service_node(0, 5.0).unwrap();
    assert_eq!(id, NodeId::new(0, 2));
    assert_eq!(crossing.config().nodes_per_queue, vec![3, 3, 2]);
    assert_eq!(crossing.config().service_rates[2], 5.0);
    assert_eq!(crossing.service_nodes().count(), 8);
    assert!(crossing.config().validate().is_ok());

    assert!(crossing.add_service_node(9, 5.0).is_err());
    assert!(crossing.add_service_node(0, -1.0).is_err());

    for _ in 0..300 {
        crossing.advance_time(1.0).unwrap();
    }
    crossing.verify_invariants().unwrap();
}

#[test]
fn test_out_of_range_booth_is_a_node_error() {
    let mut crossing = BorderCrossing::with_seed(busy_config(), 31).unwrap();
    let rates_before = crossing.config().service_rates.clone();

    let far_slot: NodeId = format!("q1_n{}", usize::MAX).parse().unwrap();
    for id in [far_slot, NodeId::new(1, 3), NodeId::new(2, usize::MAX)] {
        let error = crossing.update_service_rate(id, 2.0).unwrap_err();
        assert!(matches!(error, SimulationError::NodeError(_)), "{} gave {}", id, error);
    }
    assert_eq!(crossing.config().service_rates, rates_before);

    // The last booth of the last lane still updates the last flat entry
    crossing.update_service_rate(NodeId::new(2, 1), 2.0).unwrap();
    assert_eq!(crossing.config().service_rates.last(), Some(&2.0));
}

#[test]
fn test_statistics_track_counters() {
    let mut crossing = BorderCrossing::with_seed(busy_config(), 30).unwrap();
    for _ in 0..1_200 {
        crossing.advance_time(1.0).unwrap();
    }

    let stats = crossing.get_statistics();
    assert_eq!(stats.crossing.total_arrivals, crossing.total_arrivals());
    assert_eq!(stats.crossing.total_completions, crossing.total_completions());
    assert_eq!(stats.crossing.total_balked, crossing.total_balked());
    assert_eq!(stats.crossing.total_service_nodes, 7);
    assert_eq!(stats.queues.len(), 3);
    assert_eq!(stats.nodes.len(), 7);

    let served: u64 = stats.nodes.iter().map(|n| n.total_served).sum();
    assert_eq!(served, stats.crossing.total_completions);
    let per_lane: u64 = stats.queues.iter().map(|q| q.total_arrivals).sum();
    assert_eq!(per_lane, stats.crossing.total_arrivals);

    assert!(stats.crossing.overall_utilization >= 0.0 && stats.crossing.overall_utilization <= 1.0);
    assert!(stats.crossing.average_waiting_time >= 0.0);
    assert!(stats.crossing.average_cars_in_system > 0.0);
    assert!(stats.crossing.throughput > 0.0);
}
