//! Background antenna animation.
//!
//! The idle layer produces a mirrored sinusoid on the antennas whose amplitude
//! is scaled by a fade value. Enabling fades the animation in; disabling fades
//! it out and only then switches the layer off.

use super::PoseLayer;
use crate::{config::IdleConfig, pose::RobotPose};
use log::warn;
use std::{
    f64::consts::TAU,
    time::{Duration, Instant},
};

/// Fading sinusoidal antenna animation
#[derive(Debug, Clone)]
pub struct IdleLayer {
    amplitude: f64,
    frequency: f64,
    fade_duration: Duration,
    enabled: bool,
    fading_in: bool,
    fading_out: bool,
    fade_value: f64,
    fade_from: f64,
    fade_start_time: Instant,
    phase_start: Instant,
}

impl IdleLayer {
    /// Create a disabled idle layer
    #[must_use]
    pub fn new(amplitude: f64, frequency: f64, fade_duration: Duration) -> Self {
        let now = Instant::now();
        Self {
            amplitude,
            frequency,
            fade_duration,
            enabled: false,
            fading_in: false,
            fading_out: false,
            fade_value: 0.0,
            fade_from: 0.0,
            fade_start_time: now,
            phase_start: now,
        }
    }

    /// Build from settings; a fade time that is negative or not finite
    /// switches instantly
    #[must_use]
    pub fn from_config(config: &IdleConfig) -> Self {
        let fade_duration = Duration::try_from_secs_f64(config.fade_duration_secs).unwrap_or_else(|e| {
            warn!("Idle fade duration {} unusable ({}), fading instantly", config.fade_duration_secs, e);
            Duration::ZERO
        });
        Self::new(config.amplitude_deg, config.frequency_hz, fade_duration)
    }

    pub fn enable(&mut self, enabled: bool) {
        self.enable_at(enabled, Instant::now());
    }

    /// Start fading in (`true`) or out (`false`) at `now`
    pub fn enable_at(&mut self, enabled: bool, now: Instant) {
        self.advance(now);

        if enabled {
            if !self.enabled {
                // Coming from fully off: restart the oscillation at zero offset
                self.enabled = true;
                self.fade_value = 0.0;
                self.phase_start = now;
            }
            if self.fading_out || self.fade_value < 1.0 {
                self.fading_out = false;
                self.fading_in = true;
                self.fade_from = self.fade_value;
                self.fade_start_time = now;
            }
        } else if self.enabled && !self.fading_out {
            self.fading_in = false;
            self.fading_out = true;
            self.fade_from = self.fade_value;
            self.fade_start_time = now;
        }
    }

    /// Move the fade toward its goal; finishes fade-outs by disabling the layer
    pub fn advance(&mut self, now: Instant) {
        if !self.fading_in && !self.fading_out {
            return;
        }

        let step = if self.fade_duration.is_zero() {
            1.0
        } else {
            now.saturating_duration_since(self.fade_start_time).as_secs_f64() / self.fade_duration.as_secs_f64()
        };

        if self.fading_in {
            self.fade_value = (self.fade_from + step).min(1.0);
            if self.fade_value >= 1.0 {
                self.fade_value = 1.0;
                self.fading_in = false;
            }
        } else {
            self.fade_value = (self.fade_from - step).max(0.0);
            if self.fade_value <= 0.0 {
                self.fade_value = 0.0;
                self.fading_out = false;
                self.enabled = false;
            }
        }
    }

    /// Antenna offset delta at `now`; every other field is zero
    pub fn get_pose(&mut self, now: Instant) -> Option<RobotPose> {
        self.advance(now);
        if !self.enabled {
            return None;
        }

        let elapsed = now.saturating_duration_since(self.phase_start).as_secs_f64();
        let offset = self.amplitude * (TAU * self.frequency * elapsed).sin() * self.fade_value;
        Some(RobotPose::neutral().with_antennas([offset, -offset]))
    }

    /// Add the animation onto the antenna channel of `base`
    pub fn apply(&mut self, base: &RobotPose, now: Instant) -> RobotPose {
        match self.get_pose(now) {
            Some(delta) => base.add_antennas(delta.antennas),
            None => *base,
        }
    }

    #[must_use]
    pub fn fade_value(&self) -> f64 {
        self.fade_value
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn is_fading_in(&self) -> bool {
        self.fading_in
    }

    #[must_use]
    pub fn is_fading_out(&self) -> bool {
        self.fading_out
    }

    #[must_use]
    pub fn fade_duration(&self) -> Duration {
        self.fade_duration
    }
}

impl PoseLayer for IdleLayer {
    fn is_active(&self) -> bool {
        self.enabled
    }

    fn get_pose(&mut self, now: Instant) -> Option<RobotPose> {
        IdleLayer::get_pose(self, now)
    }

    fn update(&mut self, now: Instant) {
        self.advance(now);
    }

    fn name(&self) -> &str {
        "IdleLayer"
    }
}
