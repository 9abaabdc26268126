//! Motion core for an expressive robot head.
//!
//! This library turns high-level intent ("look left", "happy antennas") into a
//! stream of safe joint commands:
//! - Named directions and expressions are mapped to numeric targets
//! - A base layer eases toward the target while an idle layer adds antenna sway
//! - Every composed pose passes the safety manager before reaching hardware
//! - A fixed-rate control loop dispatches poses and recovers from link errors
//!
//! Direction-of-audio readings are tracked alongside so the head can turn
//! toward whoever is speaking.
//!
//! # Examples
//!
//! ## Mapping names to values
//!
//! ```
//! use robot_head_motion::mapping::{name_to_value, value_to_name, ParamValue, Parameter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pitch = name_to_value(Parameter::Pitch, &"slightly up".into())?;
//! assert_eq!(pitch, ParamValue::Numeric(10.0));
//!
//! let yaw = name_to_value(Parameter::Yaw, &"left".into())?;
//! assert_eq!(value_to_name(Parameter::Yaw, &yaw)?, "left");
//! # Ok(())
//! # }
//! ```
//!
//! ## Validating a pose
//!
//! ```
//! use robot_head_motion::{config::SafetyConfig, safety::{SafetyManager, SafetyState}};
//!
//! let safety = SafetyManager::new(SafetyConfig::default());
//! let current = SafetyState::new(0.0, 0.0, 0.0, 0.0);
//! // Head tilted left with the body turned left sits in a collision zone
//! let target = SafetyState::new(20.0, 0.0, 0.0, 30.0);
//!
//! let safe = safety.validate_movement(&current, &target);
//! assert!(safety.is_safe(&safe));
//! assert!(safe.body_yaw <= 0.0);
//! ```
//!
//! ## Driving a simulated robot
//!
//! ```no_run
//! use robot_head_motion::{
//!     config::Config,
//!     controller::{PoseCommand, RobotController},
//!     hardware::SimulatedRobot,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut controller = RobotController::new(Arc::new(SimulatedRobot::new()), Config::default())?;
//! controller.start()?;
//!
//! controller.apply_command(&PoseCommand {
//!     yaw: Some("front left".into()),
//!     antennas: Some("curious".into()),
//!     ..PoseCommand::default()
//! })?;
//! controller.enable_idle(true);
//!
//! std::thread::sleep(std::time::Duration::from_secs(2));
//! println!("{}", controller.describe_current_pose());
//! controller.stop();
//! # Ok(())
//! # }
//! ```

/// Pose representation and angle conversions
pub mod pose;

/// Translation between agent words and numeric pose values
pub mod mapping;

/// Composable movement layers
pub mod layers;

/// Joint limits and collision avoidance
pub mod safety;

/// Fixed-rate control loop with error recovery
pub mod movement_manager;

/// Direction-of-audio tracking
pub mod doa;

/// Hardware abstraction and the simulated robot
pub mod hardware;

/// Upstream-facing facade
pub mod controller;

/// Error types and result handling
pub mod error;

/// Constants used throughout the crate
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
