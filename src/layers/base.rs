use super::PoseLayer;
use crate::pose::RobotPose;
use std::{
    f64::consts::PI,
    time::{Duration, Instant},
};

/// Cosine ease-in-out: zero velocity at both ends
#[must_use]
pub fn ease_in_out(progress: f64) -> f64 {
    (1.0 - (PI * progress.clamp(0.0, 1.0)).cos()) / 2.0
}

/// Smoothed transition from the current pose to a commanded target
#[derive(Debug, Clone)]
pub struct BasePoseLayer {
    current_pose: RobotPose,
    target_pose: RobotPose,
    transition_start: Instant,
    transition_duration: Duration,
    in_transition: bool,
}

impl BasePoseLayer {
    #[must_use]
    pub fn new(initial: RobotPose) -> Self {
        Self {
            current_pose: initial,
            target_pose: initial,
            transition_start: Instant::now(),
            transition_duration: Duration::ZERO,
            in_transition: false,
        }
    }

    /// Start a transition toward `pose`, beginning now
    pub fn set_target(&mut self, pose: RobotPose, duration: Duration) {
        self.set_target_at(pose, duration, Instant::now());
    }

    /// Start a transition toward `pose` at an explicit start time.
    ///
    /// Retargeting mid-transition continues from the pose reached so far.
    pub fn set_target_at(&mut self, pose: RobotPose, duration: Duration, now: Instant) {
        if self.in_transition {
            self.current_pose = self.evaluate(now);
        }
        self.target_pose = pose;
        self.transition_start = now;
        self.transition_duration = duration;
        self.in_transition = true;
    }

    /// Evaluate the layer, finishing the transition once it has run its course
    pub fn get_pose(&mut self, now: Instant) -> RobotPose {
        if !self.in_transition {
            return self.current_pose;
        }

        if self.progress(now) >= 1.0 {
            self.current_pose = self.target_pose;
            self.in_transition = false;
            return self.current_pose;
        }

        self.evaluate(now)
    }

    /// Drop any transition and hold `pose`
    pub fn reset_to(&mut self, pose: RobotPose) {
        self.current_pose = pose;
        self.target_pose = pose;
        self.in_transition = false;
    }

    #[must_use]
    pub fn current_pose(&self) -> RobotPose {
        self.current_pose
    }

    #[must_use]
    pub fn target_pose(&self) -> RobotPose {
        self.target_pose
    }

    #[must_use]
    pub fn is_in_transition(&self) -> bool {
        self.in_transition
    }

    /// Linear progress of the running transition in `[0, 1]`
    #[must_use]
    pub fn progress(&self, now: Instant) -> f64 {
        if self.transition_duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.transition_start);
        (elapsed.as_secs_f64() / self.transition_duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    fn evaluate(&self, now: Instant) -> RobotPose {
        self.current_pose
            .blend(&self.target_pose, ease_in_out(self.progress(now)))
    }
}

impl PoseLayer for BasePoseLayer {
    fn is_active(&self) -> bool {
        true
    }

    fn get_pose(&mut self, now: Instant) -> Option<RobotPose> {
        Some(BasePoseLayer::get_pose(self, now))
    }

    fn name(&self) -> &str {
        "BasePoseLayer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_endpoints() {
        assert_eq!(ease_in_out(0.0), 0.0);
        assert!((ease_in_out(0.5) - 0.5).abs() < 1e-12);
        assert!((ease_in_out(1.0) - 1.0).abs() < 1e-12);
        assert!(ease_in_out(0.25) < 0.25); // slow start
    }

    #[test]
    fn test_idle_layer_holds_pose() {
        let start = RobotPose::new(1.0, 2.0, 3.0, [4.0, 5.0], 6.0);
        let mut layer = BasePoseLayer::new(start);
        assert_eq!(layer.get_pose(Instant::now()), start);
        assert!(!layer.is_in_transition());
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let t0 = Instant::now();
        let target = RobotPose::new(0.0, 15.0, 0.0, [0.0, 0.0], 0.0);
        let mut layer = BasePoseLayer::new(RobotPose::neutral());
        layer.set_target_at(target, Duration::ZERO, t0);
        assert_eq!(layer.get_pose(t0), target);
        assert!(!layer.is_in_transition());
    }

    #[test]
    fn test_retarget_mid_transition_has_no_jump() {
        let t0 = Instant::now();
        let mut layer = BasePoseLayer::new(RobotPose::neutral());
        layer.set_target_at(RobotPose::new(0.0, 20.0, 0.0, [0.0, 0.0], 0.0), Duration::from_secs(2), t0);

        let t1 = t0 + Duration::from_secs(1);
        let before = layer.get_pose(t1);
        layer.set_target_at(RobotPose::new(0.0, -20.0, 0.0, [0.0, 0.0], 0.0), Duration::from_secs(2), t1);
        let after = layer.get_pose(t1);

        assert!(before.approx_eq(&after, 1e-9));
        assert!((after.pitch - 10.0).abs() < 1e-9);
    }
}
