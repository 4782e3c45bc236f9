//! Tests for car kinematics and the car-following rules
//!
//! These tests drive cars through the public physics update and the lane's
//! following rules, checking acceleration bounds and gap behaviour.

use border_wait_sim::crossing::{
    following_target, CarQueue, ServiceNode, BACK_OFF_FACTOR, MAX_ACCELERATION, MAX_DECELERATION,
    MAX_VELOCITY,
};
use border_wait_sim::{Car, CarId, CarStatus, NodeId};
use rand::rngs::StdRng;
use rand::SeedableRng;

const SAFE_DISTANCE: f64 = 8.0;

fn car() -> Car {
    Car::new(CarId::new(0, 0))
}

/// A follower 3 m behind a moving leader slows down
#[test]
fn test_follower_too_close_decelerates() {
    let leader = car().with_kinematics(20.0, 10.0);
    let mut follower = Car::new(CarId::new(0, 1)).with_kinematics(12.5, 10.0);

    let gap = leader.position() - follower.position() - leader.length();
    assert!((gap - 3.0).abs() < 1e-9);

    let target = following_target(gap, leader.velocity(), follower.max_velocity(), SAFE_DISTANCE);
    assert!((target - BACK_OFF_FACTOR * 10.0).abs() < 1e-9);

    follower.update_physics(target, 1.0);
    assert!(follower.acceleration() < 0.0);
    assert!((follower.velocity() - 9.0).abs() < 1e-9);
}

#[test]
fn test_follower_with_room_catches_up() {
    let target = following_target(30.0, 10.0, MAX_VELOCITY, SAFE_DISTANCE);
    assert!((target - 11.0).abs() < 1e-9);

    // Catching up never exceeds the speed limit
    let target = following_target(30.0, 14.5, MAX_VELOCITY, SAFE_DISTANCE);
    assert_eq!(target, MAX_VELOCITY);
}

#[test]
fn test_follower_in_band_matches_leader() {
    // Between 0.8 * safe and safe the follower copies the leader
    let target = following_target(7.0, 6.0, MAX_VELOCITY, SAFE_DISTANCE);
    assert_eq!(target, 6.0);
    let target = following_target(SAFE_DISTANCE, 6.0, MAX_VELOCITY, SAFE_DISTANCE);
    assert_eq!(target, 6.0);
}

#[test]
fn test_acceleration_bounds_over_many_steps() {
    let mut car = car();
    let mut previous = car.velocity();

    for step in 0..50 {
        // Alternate between flooring it and braking hard
        let target = if step % 10 < 5 { 100.0 } else { -100.0 };
        car.update_physics(target, 0.5);

        assert!(car.acceleration() <= MAX_ACCELERATION);
        assert!(car.acceleration() >= MAX_DECELERATION);
        assert!(car.velocity() >= 0.0);
        assert!(car.velocity() <= MAX_VELOCITY);
        assert!((car.velocity() - previous).abs() <= 5.0 * 0.5 + 1e-9);
        previous = car.velocity();
    }
}

#[test]
fn test_position_never_moves_backwards() {
    let mut car = car().with_kinematics(5.0, 12.0);
    let mut last = car.position();
    for _ in 0..20 {
        car.update_physics(0.0, 0.25);
        assert!(car.position() >= last);
        last = car.position();
    }
    assert_eq!(car.velocity(), 0.0);
}

#[test]
fn test_non_positive_dt_is_ignored() {
    let mut car = car().with_kinematics(10.0, 4.0);
    let before = car.clone();
    car.update_physics(15.0, 0.0);
    car.update_physics(15.0, -1.0);
    car.update_physics(15.0, f64::NAN);
    assert_eq!(car, before);
}

#[test]
fn test_lane_keeps_head_car_in_front() {
    let mut rng = StdRng::seed_from_u64(11);
    // Very slow booth so the head car stays in service for the whole test
    let nodes = vec![ServiceNode::new(NodeId::new(0, 0), 0.001)];
    let mut lane = CarQueue::new(0, nodes, SAFE_DISTANCE, 10);

    let head = lane.add_car(0.0).unwrap();
    let second = lane.add_car(0.0).unwrap();
    let third = lane.add_car(0.0).unwrap();
    assert_eq!(lane.assign_head(0.0, &mut rng), Some((head, NodeId::new(0, 0))));

    for _ in 0..60 {
        lane.update_positions(0.5);

        let head_car = lane.car(head).unwrap();
        assert_eq!(head_car.status(), CarStatus::Serving);
        for id in [second, third] {
            let follower = lane.car(id).unwrap();
            assert!(follower.position() <= head_car.position());
            assert!(follower.velocity() <= follower.max_velocity());
        }
    }

    assert!(lane.car(head).unwrap().position() > 0.0);
    assert!(lane.verify().is_ok());
}
