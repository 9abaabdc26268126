//! Helper functions and utilities for tests

#![allow(dead_code)]

use robot_head_motion::{
    config::Config,
    hardware::{RobotBackend, SimulatedRobot},
    movement_manager::MovementManager,
    Result,
};
use std::sync::Arc;

/// Movement manager wired to a fresh simulator, with the simulator handle kept for inspection
pub fn simulated_manager(config: &Config) -> Result<(Arc<SimulatedRobot>, MovementManager)> {
    let robot = Arc::new(SimulatedRobot::new());
    let backend: Arc<dyn RobotBackend> = robot.clone();
    let manager = MovementManager::new(backend, config)?;
    Ok((robot, manager))
}

/// Default configuration with millisecond backoff so recovery tests run quickly
pub fn fast_recovery_config() -> Config {
    let mut config = Config::default();
    config.control.backoff_base_secs = 0.001;
    config.control.backoff_max_secs = 0.01;
    config
}

/// Assert two angles agree within `tolerance`
pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} ± {tolerance}, got {actual}"
    );
}
