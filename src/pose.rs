//! Robot pose value type.
//!
//! A [`RobotPose`] is one point in the configuration space of the robot: head
//! roll/pitch/yaw, the two antennas and the body yaw, all in degrees. Poses are
//! plain `Copy` values; every operation returns a new pose.

use crate::{error::Result, hardware::RobotBackend};
use nalgebra::{Matrix4, Rotation3};
use serde::{Deserialize, Serialize};

/// Pose of the robot in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotPose {
    /// Head roll (positive tilts toward the robot's left)
    pub roll: f64,
    /// Head pitch (positive looks up)
    pub pitch: f64,
    /// Head yaw (positive turns left)
    pub yaw: f64,
    /// Left and right antenna angles
    pub antennas: [f64; 2],
    /// Body yaw
    pub body_yaw: f64,
}

/// The same pose expressed in radians, as the hardware boundary expects it
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseRadians {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub antennas: [f64; 2],
    pub body_yaw: f64,
}

impl RobotPose {
    /// Create a pose from degree values
    #[must_use]
    pub const fn new(roll: f64, pitch: f64, yaw: f64, antennas: [f64; 2], body_yaw: f64) -> Self {
        Self {
            roll,
            pitch,
            yaw,
            antennas,
            body_yaw,
        }
    }

    /// The all-zero neutral pose
    #[must_use]
    pub const fn neutral() -> Self {
        Self::new(0.0, 0.0, 0.0, [0.0, 0.0], 0.0)
    }

    /// Build a pose from radian values
    #[must_use]
    pub fn from_radians(rad: &PoseRadians) -> Self {
        Self {
            roll: rad.roll.to_degrees(),
            pitch: rad.pitch.to_degrees(),
            yaw: rad.yaw.to_degrees(),
            antennas: [rad.antennas[0].to_degrees(), rad.antennas[1].to_degrees()],
            body_yaw: rad.body_yaw.to_degrees(),
        }
    }

    /// Convert every field to radians
    #[must_use]
    pub fn to_radians(&self) -> PoseRadians {
        PoseRadians {
            roll: self.roll.to_radians(),
            pitch: self.pitch.to_radians(),
            yaw: self.yaw.to_radians(),
            antennas: [self.antennas[0].to_radians(), self.antennas[1].to_radians()],
            body_yaw: self.body_yaw.to_radians(),
        }
    }

    /// Snapshot the live hardware state
    ///
    /// # Errors
    ///
    /// Propagates whatever the backend reports (usually a connection error).
    pub fn from_current_state(backend: &dyn RobotBackend) -> Result<Self> {
        backend.get_current_state()
    }

    /// Per-field linear interpolation toward `other`.
    ///
    /// `alpha` is clamped to `[0, 1]`; 0 returns `self`, 1 returns `other`.
    #[must_use]
    pub fn blend(&self, other: &Self, alpha: f64) -> Self {
        let t = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };
        let lerp = |a: f64, b: f64| a + (b - a) * t;
        Self {
            roll: lerp(self.roll, other.roll),
            pitch: lerp(self.pitch, other.pitch),
            yaw: lerp(self.yaw, other.yaw),
            antennas: [
                lerp(self.antennas[0], other.antennas[0]),
                lerp(self.antennas[1], other.antennas[1]),
            ],
            body_yaw: lerp(self.body_yaw, other.body_yaw),
        }
    }

    /// Explicit copy, for call sites that want to spell out the snapshot
    #[must_use]
    pub fn copy(&self) -> Self {
        *self
    }

    #[must_use]
    pub fn with_antennas(&self, antennas: [f64; 2]) -> Self {
        Self { antennas, ..*self }
    }

    #[must_use]
    pub fn with_body_yaw(&self, body_yaw: f64) -> Self {
        Self { body_yaw, ..*self }
    }

    /// Add an offset to the antenna channel only
    #[must_use]
    pub fn add_antennas(&self, delta: [f64; 2]) -> Self {
        self.with_antennas([self.antennas[0] + delta[0], self.antennas[1] + delta[1]])
    }

    /// 4x4 homogeneous head pose (rotation only, no translation)
    #[must_use]
    pub fn head_matrix(&self) -> Matrix4<f64> {
        let rad = self.to_radians();
        Rotation3::from_euler_angles(rad.roll, rad.pitch, rad.yaw).to_homogeneous()
    }

    /// Field-wise comparison with an absolute tolerance in degrees
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() <= tolerance;
        close(self.roll, other.roll)
            && close(self.pitch, other.pitch)
            && close(self.yaw, other.yaw)
            && close(self.antennas[0], other.antennas[0])
            && close(self.antennas[1], other.antennas[1])
            && close(self.body_yaw, other.body_yaw)
    }
}

/// Recover roll/pitch/yaw (radians) from a head pose matrix
#[must_use]
pub fn euler_from_matrix(matrix: &Matrix4<f64>) -> (f64, f64, f64) {
    let rotation = Rotation3::from_matrix_unchecked(matrix.fixed_view::<3, 3>(0, 0).into_owned());
    rotation.euler_angles()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_is_neutral() {
        assert_eq!(RobotPose::default(), RobotPose::neutral());
    }

    #[test]
    fn test_radian_round_trip() {
        let pose = RobotPose::new(10.0, -15.0, 30.0, [20.0, -5.0], 45.0);
        let back = RobotPose::from_radians(&pose.to_radians());
        assert!(pose.approx_eq(&back, 1e-9));
        assert!((pose.to_radians().yaw - std::f64::consts::FRAC_PI_6).abs() < 1e-12);
    }

    #[test]
    fn test_blend_midpoint_and_clamp() {
        let a = RobotPose::neutral();
        let b = RobotPose::new(10.0, 20.0, -30.0, [40.0, -40.0], 50.0);

        let mid = a.blend(&b, 0.5);
        assert!(mid.approx_eq(&RobotPose::new(5.0, 10.0, -15.0, [20.0, -20.0], 25.0), 1e-12));

        assert_eq!(a.blend(&b, 2.0), b);
        assert_eq!(a.blend(&b, -1.0), a);
    }

    #[test]
    fn test_add_antennas_leaves_head_alone() {
        let pose = RobotPose::new(1.0, 2.0, 3.0, [4.0, 5.0], 6.0);
        let moved = pose.add_antennas([1.0, -1.0]);
        assert_eq!(moved.antennas, [5.0, 4.0]);
        assert_eq!((moved.roll, moved.pitch, moved.yaw, moved.body_yaw), (1.0, 2.0, 3.0, 6.0));
    }

    #[test]
    fn test_head_matrix_round_trip() {
        let pose = RobotPose::new(10.0, -20.0, 35.0, [0.0, 0.0], 0.0);
        let (roll, pitch, yaw) = euler_from_matrix(&pose.head_matrix());
        assert!((roll.to_degrees() - 10.0).abs() < 1e-9);
        assert!((pitch.to_degrees() + 20.0).abs() < 1e-9);
        assert!((yaw.to_degrees() - 35.0).abs() < 1e-9);
        assert_eq!(pose.head_matrix()[(3, 3)], 1.0);
    }

    proptest! {
        #[test]
        fn prop_blend_with_self_is_identity(
            roll in -40.0..40.0f64,
            pitch in -40.0..40.0f64,
            yaw in -170.0..170.0f64,
            left in -90.0..90.0f64,
            right in -90.0..90.0f64,
            body in -160.0..160.0f64,
            alpha in -1.0..2.0f64,
        ) {
            let pose = RobotPose::new(roll, pitch, yaw, [left, right], body);
            prop_assert_eq!(pose.blend(&pose, alpha), pose);
        }
    }
}
