//! Boundary to the hardware daemon.
//!
//! The daemon owns the wire protocol to the actuators and the microphone
//! array. The motion core only needs the four calls of [`RobotBackend`].

/// In-process backend for tests and dry runs
pub mod simulated;

use crate::{error::Result, pose::RobotPose};
use nalgebra::Matrix4;

pub use simulated::SimulatedRobot;

/// Operations the motion core consumes from the hardware layer.
///
/// Transient transport failures must be reported as
/// [`Error::Connection`](crate::Error::Connection) so the control loop can back
/// off and reset the daemon; anything else is logged and skipped.
pub trait RobotBackend: Send + Sync {
    /// Live joint state in degrees
    fn get_current_state(&self) -> Result<RobotPose>;

    /// Command the head (4x4 pose matrix), antennas and body (radians)
    fn set_target(&self, head: &Matrix4<f64>, antennas: [f64; 2], body_yaw: f64) -> Result<()>;

    /// Tear down and respawn the daemon connection; blocks until done or timed out
    fn reset(&self) -> Result<()>;

    /// Direction of audio in radians (0 = front, positive = left) and whether
    /// speech is currently detected
    fn get_doa(&self) -> Result<(f64, bool)>;
}
