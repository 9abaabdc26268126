//! Direction-of-audio tracking and sampling

use robot_head_motion::{
    doa::{doa_to_yaw, DoaSampler, DoaTracker},
    hardware::{RobotBackend, SimulatedRobot},
};
use std::{
    f64::consts::PI,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

mod test_helpers;
use test_helpers::assert_close;

#[test]
fn test_circular_mean_across_the_seam() {
    let mut tracker = DoaTracker::default();
    tracker.start_speech_segment();
    tracker.add_doa_sample(179f64.to_radians(), true);
    tracker.add_doa_sample((-179f64).to_radians(), true);

    let estimate = tracker.get_average_doa().unwrap();
    // An arithmetic mean would give 0 (straight ahead)
    assert!(estimate.angle.abs().to_degrees() > 178.0, "{}", estimate.angle.to_degrees());
}

#[test]
fn test_non_speech_samples_do_not_move_the_average() {
    let mut tracker = DoaTracker::default();
    tracker.add_doa_sample(0.5, true);
    tracker.add_doa_sample(-2.0, false);
    tracker.add_doa_sample(3.0, false);

    let estimate = tracker.get_average_doa().unwrap();
    assert_close(estimate.angle, 0.5, 1e-12);
    assert_eq!(estimate.sample_count, 1);
    assert_eq!(tracker.total_sample_count(), 3);
    assert!(!estimate.is_speech_detected);
}

#[test]
fn test_no_speech_means_no_estimate() {
    let mut tracker = DoaTracker::default();
    assert!(tracker.get_average_doa().is_none());
    tracker.add_doa_sample(1.0, false);
    assert!(tracker.get_average_doa().is_none());
}

#[test]
fn test_new_segment_forgets_the_old_one() {
    let mut tracker = DoaTracker::default();
    for _ in 0..10 {
        tracker.add_doa_sample(PI / 2.0, true);
    }
    tracker.start_speech_segment();
    assert!(tracker.get_average_doa().is_none());
    assert_eq!(tracker.total_sample_count(), 0);

    tracker.add_doa_sample(-PI / 2.0, true);
    assert_close(tracker.get_average_doa().unwrap().angle, -PI / 2.0, 1e-12);
}

#[test]
fn test_smoothing_converges_toward_new_bearing() {
    let mut tracker = DoaTracker::new(0.3, 0.7);
    tracker.add_doa_sample(0.0, true);
    let mut previous = 0.0;
    for _ in 0..20 {
        tracker.add_doa_sample(1.0, true);
        let angle = tracker.get_average_doa().unwrap().angle;
        assert!(angle >= previous);
        previous = angle;
    }
    assert_close(previous, 1.0, 0.01);
}

#[test]
fn test_doa_to_yaw_halves_and_clamps() {
    assert_close(doa_to_yaw(PI / 3.0), 30.0, 1e-9);
    assert_close(doa_to_yaw(-PI / 3.0), -30.0, 1e-9);
    assert_eq!(doa_to_yaw(2.0 * PI / 3.0), 45.0);
}

#[test]
fn test_sampler_feeds_tracker() {
    let robot = Arc::new(SimulatedRobot::new());
    robot.script_doa([(0.4, true), (0.4, false)], (0.4, true));
    let backend: Arc<dyn RobotBackend> = robot;
    let tracker = Arc::new(Mutex::new(DoaTracker::default()));

    let mut sampler = DoaSampler::spawn(backend, Arc::clone(&tracker), Duration::from_millis(5));
    assert!(sampler.is_running());
    thread::sleep(Duration::from_millis(100));
    sampler.stop();
    assert!(!sampler.is_running());

    let tracker = tracker.lock().unwrap();
    assert!(tracker.total_sample_count() >= 3);
    assert_close(tracker.get_average_doa().unwrap().angle, 0.4, 1e-9);
}

#[test]
fn test_sampler_survives_backend_errors() {
    let robot = Arc::new(SimulatedRobot::new());
    robot.script_doa(std::iter::empty(), (-0.3, true));
    robot.fail_next(2);
    let backend: Arc<dyn RobotBackend> = robot;
    let tracker = Arc::new(Mutex::new(DoaTracker::default()));

    let mut sampler = DoaSampler::spawn(backend, Arc::clone(&tracker), Duration::from_millis(5));
    thread::sleep(Duration::from_millis(100));
    sampler.stop();

    let estimate = tracker.lock().unwrap().get_average_doa().unwrap();
    assert_close(estimate.angle, -0.3, 1e-9);
}
