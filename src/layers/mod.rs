//! Movement layers that contribute to the commanded pose.
//!
//! Each control tick the layers are evaluated in a fixed order. The base layer
//! produces an absolute pose (the commanded target, eased in over time) and the
//! idle layer adds a small antenna animation on top of it.

/// Eased transition toward the commanded target pose
pub mod base;

/// Fading sinusoidal antenna animation
pub mod idle;

use crate::{config::IdleConfig, pose::RobotPose};
use base::BasePoseLayer;
use idle::IdleLayer;
use std::time::{Duration, Instant};

/// Capability shared by every movement layer
pub trait PoseLayer: Send {
    /// Whether the layer currently contributes to the pose
    fn is_active(&self) -> bool;

    /// Evaluate the layer at `now`
    fn get_pose(&mut self, now: Instant) -> Option<RobotPose>;

    /// Advance time-dependent bookkeeping without producing a pose
    fn update(&mut self, _now: Instant) {}

    /// Get layer name
    fn name(&self) -> &str;
}

/// The closed set of layer kinds
#[derive(Debug, Clone)]
pub enum Layer {
    Base(BasePoseLayer),
    Idle(IdleLayer),
}

impl Layer {
    /// Fold this layer into the pose accumulated from the layers before it
    fn compose(&mut self, accumulated: Option<RobotPose>, now: Instant) -> Option<RobotPose> {
        match self {
            Self::Base(base) => Some(base.get_pose(now)),
            Self::Idle(idle) => {
                idle.update(now);
                match accumulated {
                    Some(pose) if idle.is_active() => Some(idle.apply(&pose, now)),
                    other => other,
                }
            }
        }
    }
}

impl PoseLayer for Layer {
    fn is_active(&self) -> bool {
        match self {
            Self::Base(base) => base.is_active(),
            Self::Idle(idle) => idle.is_active(),
        }
    }

    fn get_pose(&mut self, now: Instant) -> Option<RobotPose> {
        match self {
            Self::Base(base) => PoseLayer::get_pose(base, now),
            Self::Idle(idle) => PoseLayer::get_pose(idle, now),
        }
    }

    fn update(&mut self, now: Instant) {
        match self {
            Self::Base(base) => base.update(now),
            Self::Idle(idle) => idle.update(now),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Base(base) => base.name(),
            Self::Idle(idle) => idle.name(),
        }
    }
}

/// Ordered collection of layers: base first, then additive layers
#[derive(Debug, Clone)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    /// Create the standard base + idle stack starting at `initial`
    #[must_use]
    pub fn new(initial: RobotPose, idle: &IdleConfig) -> Self {
        Self {
            layers: vec![
                Layer::Base(BasePoseLayer::new(initial)),
                Layer::Idle(IdleLayer::from_config(idle)),
            ],
        }
    }

    /// Evaluate every layer in order and return the composite pose
    pub fn compose(&mut self, now: Instant) -> RobotPose {
        self.layers
            .iter_mut()
            .fold(None, |pose, layer| layer.compose(pose, now))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn base(&self) -> Option<&BasePoseLayer> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Base(base) => Some(base),
            Layer::Idle(_) => None,
        })
    }

    pub fn base_mut(&mut self) -> Option<&mut BasePoseLayer> {
        self.layers.iter_mut().find_map(|layer| match layer {
            Layer::Base(base) => Some(base),
            Layer::Idle(_) => None,
        })
    }

    #[must_use]
    pub fn idle(&self) -> Option<&IdleLayer> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Idle(idle) => Some(idle),
            Layer::Base(_) => None,
        })
    }

    pub fn idle_mut(&mut self) -> Option<&mut IdleLayer> {
        self.layers.iter_mut().find_map(|layer| match layer {
            Layer::Idle(idle) => Some(idle),
            Layer::Base(_) => None,
        })
    }

    /// Start a base transition toward `pose`
    pub fn set_target(&mut self, pose: RobotPose, duration: Duration, now: Instant) {
        if let Some(base) = self.base_mut() {
            base.set_target_at(pose, duration, now);
        }
    }

    /// Fade the idle animation in or out
    pub fn enable_idle(&mut self, enabled: bool, now: Instant) {
        if let Some(idle) = self.idle_mut() {
            idle.enable_at(enabled, now);
        }
    }

    /// Snap the base layer onto a live pose, dropping any transition
    pub fn reset_base(&mut self, pose: RobotPose) {
        if let Some(base) = self.base_mut() {
            base.reset_to(pose);
        }
    }

    /// Names of the layers in composition order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.layers.iter().map(PoseLayer::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_order() {
        let stack = LayerStack::new(RobotPose::neutral(), &IdleConfig::default());
        assert_eq!(stack.names(), vec!["BasePoseLayer", "IdleLayer"]);
    }

    #[test]
    fn test_compose_without_idle_is_base_pose() {
        let start = RobotPose::new(5.0, 0.0, 0.0, [10.0, 10.0], 0.0);
        let mut stack = LayerStack::new(start, &IdleConfig::default());
        assert_eq!(stack.compose(Instant::now()), start);
    }

    #[test]
    fn test_compose_with_idle_only_moves_antennas() {
        let t0 = Instant::now();
        let start = RobotPose::new(5.0, -3.0, 12.0, [10.0, 10.0], 7.0);
        let mut stack = LayerStack::new(start, &IdleConfig::default());
        stack.enable_idle(true, t0);

        // Quarter period of the default 0.25 Hz oscillation, after the fade-in
        let pose = stack.compose(t0 + Duration::from_secs(1));
        assert_eq!((pose.roll, pose.pitch, pose.yaw, pose.body_yaw), (5.0, -3.0, 12.0, 7.0));
        assert!((pose.antennas[0] - 25.0).abs() < 1e-9);
        assert!((pose.antennas[1] + 5.0).abs() < 1e-9);
    }
}
