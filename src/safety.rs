//! Joint limit and self-collision protection.
//!
//! Every candidate state passes through the same pipeline before it reaches the
//! hardware:
//! 1. each axis is clamped to its configured limit,
//! 2. head-priority collision resolution: the head keeps its pose and the body
//!    yaw is limited or retreats away from a tilted head,
//! 3. head and body yaw are pulled toward each other until their difference is
//!    within `max_yaw_difference`,
//! 4. a final zone check moves the body out of any collision zone that step 3
//!    may have pushed it back into.
//!
//! The manager holds only configuration; validation is a pure function of its
//! inputs. Antennas are never restricted.

use crate::{
    config::{CollisionZone, SafetyConfig},
    constants::EPSILON,
    pose::RobotPose,
};
use log::{debug, warn};
use std::fmt;

/// The restricted part of a pose, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SafetyState {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub body_yaw: f64,
}

impl SafetyState {
    #[must_use]
    pub const fn new(roll: f64, pitch: f64, yaw: f64, body_yaw: f64) -> Self {
        Self {
            roll,
            pitch,
            yaw,
            body_yaw,
        }
    }

    #[must_use]
    pub fn from_pose(pose: &RobotPose) -> Self {
        Self::new(pose.roll, pose.pitch, pose.yaw, pose.body_yaw)
    }

    /// Copy these axes onto `pose`, keeping its antennas
    #[must_use]
    pub fn apply_to(&self, pose: &RobotPose) -> RobotPose {
        RobotPose::new(self.roll, self.pitch, self.yaw, pose.antennas, self.body_yaw)
    }
}

/// Joint axes the safety manager restricts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Roll,
    Pitch,
    Yaw,
    BodyYaw,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Roll => "roll",
            Self::Pitch => "pitch",
            Self::Yaw => "yaw",
            Self::BodyYaw => "body_yaw",
        };
        f.write_str(name)
    }
}

/// One change the safety pipeline made to a requested state
#[derive(Debug, Clone, PartialEq)]
pub enum SafetyAdjustment {
    /// An axis was outside its limit
    Clamped { axis: Axis, requested: f64, limit: f64 },
    /// Tilted head inside a collision zone: body moved to the retreat angle
    BodyRetreat { zone: String, body_yaw: f64 },
    /// Tilted head: body yaw magnitude reduced to the tilt-dependent maximum
    BodyLimited { requested: f64, max_safe: f64 },
    /// Head and body yaw moved toward each other by `excess / 2` each
    YawDifference { excess: f64 },
    /// Final check found the state inside a zone and moved the body out
    ZoneFallback { zone: String, body_yaw: f64 },
}

impl fmt::Display for SafetyAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clamped { axis, requested, limit } => {
                write!(f, "{axis} {requested:.1} clamped to ±{limit:.1}")
            }
            Self::BodyRetreat { zone, body_yaw } => {
                write!(f, "collision zone '{zone}': body retreats to {body_yaw:.1}")
            }
            Self::BodyLimited { requested, max_safe } => {
                write!(f, "body yaw {requested:.1} limited to ±{max_safe:.1} for tilted head")
            }
            Self::YawDifference { excess } => {
                write!(f, "head/body yaw difference exceeded by {excess:.1}, split symmetrically")
            }
            Self::ZoneFallback { zone, body_yaw } => {
                write!(f, "state still in zone '{zone}': body moved to {body_yaw:.1}")
            }
        }
    }
}

/// Validates and rewrites candidate head/body states
#[derive(Debug, Clone, Default)]
pub struct SafetyManager {
    config: SafetyConfig,
}

impl SafetyManager {
    #[must_use]
    pub fn new(config: SafetyConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    /// Swap limits and zones; takes effect on the next validation
    pub fn set_config(&mut self, config: SafetyConfig) {
        self.config = config;
    }

    /// Return the closest safe state to `target`, logging every adjustment
    #[must_use]
    pub fn validate_movement(&self, current: &SafetyState, target: &SafetyState) -> SafetyState {
        let (safe, adjustments) = self.validate_movement_with_report(current, target);
        for adjustment in &adjustments {
            debug!("Safety: {}", adjustment);
        }
        safe
    }

    /// Same as [`validate_movement`](Self::validate_movement) but also returns
    /// the list of adjustments that were applied, in order.
    #[must_use]
    pub fn validate_movement_with_report(
        &self,
        current: &SafetyState,
        target: &SafetyState,
    ) -> (SafetyState, Vec<SafetyAdjustment>) {
        let mut adjustments = Vec::new();

        let state = self.clamp_to_limits(target, &mut adjustments);
        let state = self.resolve_collisions(state, &mut adjustments);
        let state = self.enforce_yaw_difference(state, &mut adjustments);
        let state = self.enforce_zone_clearance(state, &mut adjustments);

        if !adjustments.is_empty() {
            debug!(
                "Safety adjusted move from {:?} toward {:?} into {:?}",
                current, target, state
            );
        }

        (state, adjustments)
    }

    /// Whether `state` already satisfies every rule
    #[must_use]
    pub fn is_safe(&self, state: &SafetyState) -> bool {
        let cfg = &self.config;
        state.roll.abs() <= cfg.head_roll_limit
            && state.pitch.abs() <= cfg.head_pitch_limit
            && state.yaw.abs() <= cfg.head_yaw_limit
            && state.body_yaw.abs() <= cfg.body_yaw_limit
            && (state.yaw - state.body_yaw).abs() <= cfg.max_yaw_difference + EPSILON
            && self.zone_at(state.roll, state.pitch, state.body_yaw).is_none()
    }

    /// First collision zone containing the given coordinates
    #[must_use]
    pub fn zone_at(&self, roll: f64, pitch: f64, body_yaw: f64) -> Option<&CollisionZone> {
        self.config
            .collision_zones
            .iter()
            .find(|zone| zone.contains(roll, pitch, body_yaw))
    }

    /// Largest body yaw magnitude allowed for a given head roll
    #[must_use]
    pub fn max_safe_body_yaw(&self, roll: f64) -> f64 {
        let cfg = &self.config;
        let tilt_ratio = roll.abs() / cfg.head_roll_limit;
        (cfg.body_yaw_limit - tilt_ratio * cfg.body_retreat_angle)
            .max(cfg.min_safe_body_yaw)
            .min(cfg.body_yaw_limit)
    }

    fn clamp_to_limits(&self, target: &SafetyState, adjustments: &mut Vec<SafetyAdjustment>) -> SafetyState {
        let cfg = &self.config;
        let mut clamp = |axis, value: f64, limit: f64| {
            let clamped = if value.is_nan() { 0.0 } else { value.clamp(-limit, limit) };
            if clamped != value || value.is_nan() {
                adjustments.push(SafetyAdjustment::Clamped {
                    axis,
                    requested: value,
                    limit,
                });
            }
            clamped
        };

        SafetyState {
            roll: clamp(Axis::Roll, target.roll, cfg.head_roll_limit),
            pitch: clamp(Axis::Pitch, target.pitch, cfg.head_pitch_limit),
            yaw: clamp(Axis::Yaw, target.yaw, cfg.head_yaw_limit),
            body_yaw: clamp(Axis::BodyYaw, target.body_yaw, cfg.body_yaw_limit),
        }
    }

    fn resolve_collisions(&self, state: SafetyState, adjustments: &mut Vec<SafetyAdjustment>) -> SafetyState {
        let cfg = &self.config;
        if state.roll.abs() <= cfg.safe_margin {
            return state;
        }

        if let Some(zone) = self.zone_at(state.roll, state.pitch, state.body_yaw) {
            let body_yaw = (-state.roll.signum() * cfg.body_retreat_angle).clamp(-cfg.body_yaw_limit, cfg.body_yaw_limit);
            adjustments.push(SafetyAdjustment::BodyRetreat {
                zone: zone.name.clone(),
                body_yaw,
            });
            return SafetyState { body_yaw, ..state };
        }

        let max_safe = self.max_safe_body_yaw(state.roll);
        if state.body_yaw.abs() > max_safe {
            adjustments.push(SafetyAdjustment::BodyLimited {
                requested: state.body_yaw,
                max_safe,
            });
            return SafetyState {
                body_yaw: max_safe.copysign(state.body_yaw),
                ..state
            };
        }

        state
    }

    fn enforce_yaw_difference(&self, state: SafetyState, adjustments: &mut Vec<SafetyAdjustment>) -> SafetyState {
        let diff = state.yaw - state.body_yaw;
        let excess = diff.abs() - self.config.max_yaw_difference;
        if excess <= 0.0 {
            return state;
        }

        let shift = diff.signum() * excess / 2.0;
        adjustments.push(SafetyAdjustment::YawDifference { excess });
        SafetyState {
            yaw: state.yaw - shift,
            body_yaw: state.body_yaw + shift,
            ..state
        }
    }

    fn enforce_zone_clearance(&self, state: SafetyState, adjustments: &mut Vec<SafetyAdjustment>) -> SafetyState {
        let cfg = &self.config;
        let Some(zone) = self.zone_at(state.roll, state.pitch, state.body_yaw) else {
            return state;
        };

        let away = if state.roll > 0.0 {
            -1.0
        } else if state.roll < 0.0 {
            1.0
        } else {
            0.0
        };
        let limit = cfg.body_yaw_limit;
        let candidates = [
            away * cfg.body_retreat_angle,
            -away * cfg.body_retreat_angle,
            0.0,
            limit,
            -limit,
        ]
        .map(|body| body.clamp(-limit, limit));

        let body_yaw = candidates
            .iter()
            .copied()
            .find(|&body| self.zone_at(state.roll, state.pitch, body).is_none())
            .unwrap_or_else(|| {
                warn!(
                    "No body yaw clears collision zone '{}' at roll {:.1}, pitch {:.1}",
                    zone.name, state.roll, state.pitch
                );
                candidates[0]
            });

        adjustments.push(SafetyAdjustment::ZoneFallback {
            zone: zone.name.clone(),
            body_yaw,
        });

        // The body is now fixed, so only the head yaw may close the gap
        let yaw = state
            .yaw
            .clamp(body_yaw - cfg.max_yaw_difference, body_yaw + cfg.max_yaw_difference)
            .clamp(-cfg.head_yaw_limit, cfg.head_yaw_limit);

        SafetyState { yaw, body_yaw, ..state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SafetyManager {
        SafetyManager::new(SafetyConfig::default())
    }

    #[test]
    fn test_safe_state_passes_through() {
        let safety = manager();
        let target = SafetyState::new(2.0, 10.0, 20.0, 10.0);
        let (safe, adjustments) = safety.validate_movement_with_report(&SafetyState::default(), &target);
        assert_eq!(safe, target);
        assert!(adjustments.is_empty());
    }

    #[test]
    fn test_basic_clamp() {
        let safety = manager();
        let target = SafetyState::new(0.0, 90.0, -500.0, 0.0);
        let safe = safety.validate_movement(&SafetyState::default(), &target);
        assert_eq!(safe.pitch, 40.0);
        // yaw clamped to -170 then pulled toward the body by the yaw rule
        assert!((safe.yaw - safe.body_yaw).abs() <= 65.0 + 1e-9);
    }

    #[test]
    fn test_nan_axis_is_zeroed() {
        let safety = manager();
        let safe = safety.validate_movement(&SafetyState::default(), &SafetyState::new(f64::NAN, 0.0, 0.0, 0.0));
        assert_eq!(safe.roll, 0.0);
    }

    #[test]
    fn test_max_safe_body_yaw_scales_with_tilt() {
        let safety = manager();
        assert_eq!(safety.max_safe_body_yaw(0.0), 160.0);
        assert!((safety.max_safe_body_yaw(20.0) - 145.0).abs() < 1e-9);
        assert!((safety.max_safe_body_yaw(-40.0) - 130.0).abs() < 1e-9);
    }

    #[test]
    fn test_max_safe_body_yaw_floor() {
        let mut config = SafetyConfig::default();
        config.body_retreat_angle = 500.0;
        let safety = SafetyManager::new(config);
        assert_eq!(safety.max_safe_body_yaw(40.0), 5.0);
    }

    #[test]
    fn test_tilted_head_limits_body() {
        let safety = manager();
        let target = SafetyState::new(20.0, 0.0, 120.0, 150.0);
        let (safe, adjustments) = safety.validate_movement_with_report(&SafetyState::default(), &target);
        assert!((safe.body_yaw - 145.0).abs() < 1e-9);
        assert!(matches!(adjustments[0], SafetyAdjustment::BodyLimited { .. }));
    }

    #[test]
    fn test_yaw_difference_split() {
        let safety = manager();
        let target = SafetyState::new(0.0, 0.0, 100.0, -15.0);
        let safe = safety.validate_movement(&SafetyState::default(), &target);
        // excess 50: each side moves 25
        assert!((safe.yaw - 75.0).abs() < 1e-9);
        assert!((safe.body_yaw - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_yaw_split_back_into_zone_is_corrected() {
        let safety = manager();
        // Tilted left, body far right of the zone, head yawed hard the other way
        let target = SafetyState::new(20.0, 0.0, -170.0, 150.0);
        let (safe, adjustments) = safety.validate_movement_with_report(&SafetyState::default(), &target);
        assert!(safety.is_safe(&safe), "{safe:?} {adjustments:?}");
        assert!(adjustments
            .iter()
            .any(|a| matches!(a, SafetyAdjustment::ZoneFallback { .. })));
        assert_eq!(safe.body_yaw, -30.0);
    }

    #[test]
    fn test_config_swap_takes_effect() {
        let mut safety = manager();
        let target = SafetyState::new(0.0, 30.0, 0.0, 0.0);
        assert_eq!(safety.validate_movement(&target, &target).pitch, 30.0);

        let mut config = SafetyConfig::default();
        config.head_pitch_limit = 15.0;
        safety.set_config(config);
        assert_eq!(safety.validate_movement(&target, &target).pitch, 15.0);
    }
}
