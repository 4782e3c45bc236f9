//! Tests for inspection booths and service-time models

use border_wait_sim::queuing::MIN_VARIABLE_SERVICE_MINUTES;
use border_wait_sim::{Car, CarId, CarStatus, NodeId, ServiceNode, ServiceProcess, ServiceTimeModel};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn node(rate: f64) -> ServiceNode {
    ServiceNode::new(NodeId::new(0, 0), rate)
}

/// Starting a second car on a busy booth changes nothing
#[test]
fn test_double_start_service_rejected() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut booth = node(3.0);
    let mut first = Car::new(CarId::new(0, 0));
    let mut second = Car::new(CarId::new(0, 1));
    first.set_status(CarStatus::Queued, 0.0);
    second.set_status(CarStatus::Queued, 0.0);

    assert!(booth.start_service(&mut first, 5.0, &mut rng));
    let completion = booth.service_completion_time();

    assert!(!booth.start_service(&mut second, 6.0, &mut rng));
    assert_eq!(booth.current_car(), Some(first.id()));
    assert_eq!(booth.service_completion_time(), completion);
    assert_eq!(second.status(), CarStatus::Queued);
    assert_eq!(second.service_start_time(), None);
}

#[test]
fn test_full_service_cycle() {
    let mut rng = StdRng::seed_from_u64(2);
    let mut booth = node(3.0);
    let mut car = Car::new(CarId::new(0, 0));
    car.set_status(CarStatus::Queued, 10.0);

    assert!(booth.is_available());
    assert!(booth.start_service(&mut car, 12.0, &mut rng));
    assert!(booth.is_busy());
    assert_eq!(car.status(), CarStatus::Serving);
    assert_eq!(car.waiting_time(), Some(2.0));

    let due = booth.service_completion_time().unwrap();
    assert!(due >= 12.0);
    assert!(booth.is_due(due));

    let service_time = booth.complete_service(&mut car, due).unwrap();
    assert!((service_time - (due - 12.0)).abs() < 1e-9);
    assert!(booth.is_available());
    assert_eq!(booth.current_car(), None);
    assert_eq!(booth.service_completion_time(), None);
    assert_eq!(booth.total_served(), 1);
    assert_eq!(car.status(), CarStatus::Completed);
    assert_eq!(car.completion_time(), Some(due));
}

#[test]
fn test_rate_change_applies_to_next_car() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut booth = node(3.0);
    let mut car = Car::new(CarId::new(0, 0));
    booth.start_service(&mut car, 0.0, &mut rng);
    let due = booth.service_completion_time();

    booth.update_service_rate(0.5).unwrap();
    // The car already at the booth keeps its drawn completion time
    assert_eq!(booth.service_completion_time(), due);
    assert_eq!(booth.service_rate(), 0.5);

    assert!(booth.update_service_rate(0.0).is_err());
    assert!(booth.update_service_rate(f64::NAN).is_err());
    assert_eq!(booth.service_rate(), 0.5);
}

#[test]
fn test_exponential_mean_service_time() {
    let mut rng = StdRng::seed_from_u64(4);
    let process = ServiceProcess::new(4.0);
    let n = 40_000;
    let mean = (0..n).map(|_| process.generate_service_time(&mut rng)).sum::<f64>() / n as f64;
    assert!((mean - 0.25).abs() < 0.01, "mean {} minutes", mean);
}

#[test]
fn test_variable_model_respects_floor() {
    let mut rng = StdRng::seed_from_u64(5);
    let process = ServiceProcess::new(20.0).with_variation(1.0);
    for _ in 0..2_000 {
        let minutes = process.sample(ServiceTimeModel::Variable, 12, 0, &mut rng);
        assert!(minutes >= MIN_VARIABLE_SERVICE_MINUTES);
    }
}

#[test]
fn test_conditional_rate_adjustments() {
    let process = ServiceProcess::new(3.0);
    // Peak hours and long lanes both slow inspection down
    assert!(process.service_rate_at(8, 0) < process.service_rate_at(3, 0));
    assert!(process.service_rate_at(3, 20) < process.service_rate_at(3, 0));
}

#[test]
fn test_node_uses_configured_model() {
    let booth = node(3.0).with_service_model(ServiceTimeModel::Conditional, 0.2);
    assert_eq!(booth.service_model(), ServiceTimeModel::Conditional);
    assert_eq!(node(3.0).service_model(), ServiceTimeModel::Exponential);
}
