//! Configuration management for the motion core

use crate::{
    constants::{
        BODY_RETREAT_ANGLE, BODY_YAW_LIMIT, DEFAULT_BACKOFF_BASE_SECS, DEFAULT_BACKOFF_MAX_SECS,
        DEFAULT_CONTROL_FREQUENCY_HZ, DEFAULT_DOA_ALPHA, DEFAULT_DOA_SAMPLE_INTERVAL_MS, DEFAULT_ERROR_THRESHOLD,
        DEFAULT_IDLE_AMPLITUDE_DEG, DEFAULT_IDLE_FADE_SECS, DEFAULT_IDLE_FREQUENCY_HZ, DEFAULT_SPEECH_CONFIDENCE,
        HEAD_PITCH_LIMIT, HEAD_ROLL_LIMIT, HEAD_YAW_LIMIT, MAX_YAW_DIFFERENCE, MIN_SAFE_BODY_YAW, SAFE_MARGIN,
    },
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Complete motion core configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Control loop timing and recovery
    pub control: ControlConfig,

    /// Joint limits and collision zones
    pub safety: SafetyConfig,

    /// Idle animation
    pub idle: IdleConfig,

    /// Direction-of-audio tracking
    pub doa: DoaConfig,
}

/// Control loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Loop rate in Hz
    pub frequency_hz: f64,

    /// Consecutive connection errors before resetting the daemon
    pub error_threshold: u32,

    /// First backoff step in seconds
    pub backoff_base_secs: f64,

    /// Upper bound on a single backoff sleep in seconds
    pub backoff_max_secs: f64,
}

/// Safety limits, tuning and collision zones (degrees)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub head_roll_limit: f64,
    pub head_pitch_limit: f64,
    pub head_yaw_limit: f64,
    pub body_yaw_limit: f64,

    /// Roll magnitude below which the head counts as upright
    pub safe_margin: f64,

    /// Body yaw magnitude used when retreating from a tilted head
    pub body_retreat_angle: f64,

    /// Largest allowed |head yaw - body yaw|
    pub max_yaw_difference: f64,

    /// Floor for the tilt-dependent body yaw limit
    pub min_safe_body_yaw: f64,

    /// Regions of (roll, pitch, body yaw) space that are unsafe
    pub collision_zones: Vec<CollisionZone>,
}

/// Axis-aligned unsafe region in (head roll, head pitch, body yaw) space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionZone {
    pub name: String,
    /// Inclusive head roll range
    pub roll: [f64; 2],
    /// Inclusive head pitch range
    pub pitch: [f64; 2],
    /// Inclusive body yaw range
    pub body_yaw: [f64; 2],
}

/// Idle animation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    /// Peak antenna offset in degrees
    pub amplitude_deg: f64,

    /// Oscillation frequency in Hz
    pub frequency_hz: f64,

    /// Time for a full fade in or out
    pub fade_duration_secs: f64,

    /// Fade in as soon as the controller starts
    pub enabled_on_start: bool,
}

/// DOA tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoaConfig {
    /// Exponential moving average factor for new samples
    pub smoothing_alpha: f64,

    /// Speech sample ratio above which a segment counts as speech
    pub speech_confidence_threshold: f64,

    /// Sampling period of the background DOA poller
    pub sample_interval_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            frequency_hz: DEFAULT_CONTROL_FREQUENCY_HZ,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            backoff_base_secs: DEFAULT_BACKOFF_BASE_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            head_roll_limit: HEAD_ROLL_LIMIT,
            head_pitch_limit: HEAD_PITCH_LIMIT,
            head_yaw_limit: HEAD_YAW_LIMIT,
            body_yaw_limit: BODY_YAW_LIMIT,
            safe_margin: SAFE_MARGIN,
            body_retreat_angle: BODY_RETREAT_ANGLE,
            max_yaw_difference: MAX_YAW_DIFFERENCE,
            min_safe_body_yaw: MIN_SAFE_BODY_YAW,
            collision_zones: vec![
                CollisionZone::new("left_tilt_body_left", [10.0, 40.0], [-40.0, 40.0], [5.0, 60.0]),
                CollisionZone::new("right_tilt_body_right", [-40.0, -10.0], [-40.0, 40.0], [-60.0, -5.0]),
            ],
        }
    }
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            amplitude_deg: DEFAULT_IDLE_AMPLITUDE_DEG,
            frequency_hz: DEFAULT_IDLE_FREQUENCY_HZ,
            fade_duration_secs: DEFAULT_IDLE_FADE_SECS,
            enabled_on_start: false,
        }
    }
}

impl Default for DoaConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: DEFAULT_DOA_ALPHA,
            speech_confidence_threshold: DEFAULT_SPEECH_CONFIDENCE,
            sample_interval_ms: DEFAULT_DOA_SAMPLE_INTERVAL_MS,
        }
    }
}

impl CollisionZone {
    #[must_use]
    pub fn new(name: &str, roll: [f64; 2], pitch: [f64; 2], body_yaw: [f64; 2]) -> Self {
        Self {
            name: name.to_string(),
            roll,
            pitch,
            body_yaw,
        }
    }

    /// True when all three coordinates fall inside their ranges
    #[must_use]
    pub fn contains(&self, roll: f64, pitch: f64, body_yaw: f64) -> bool {
        let within = |range: [f64; 2], value: f64| range[0] <= value && value <= range[1];
        within(self.roll, roll) && within(self.pitch, pitch) && within(self.body_yaw, body_yaw)
    }
}

impl ControlConfig {
    /// Tick period derived from the loop rate
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.frequency_hz).unwrap_or(Duration::ZERO)
    }
}

impl DoaConfig {
    #[must_use]
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

impl SafetyConfig {
    /// Check limits and zones
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for non-positive limits, negative tuning
    /// values or zones whose ranges are inverted or non-finite.
    pub fn validate(&self) -> Result<()> {
        let limits = [
            ("head_roll_limit", self.head_roll_limit),
            ("head_pitch_limit", self.head_pitch_limit),
            ("head_yaw_limit", self.head_yaw_limit),
            ("body_yaw_limit", self.body_yaw_limit),
            ("max_yaw_difference", self.max_yaw_difference),
        ];
        for (name, value) in limits {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::ConfigError(format!("{name} must be positive, got {value}")));
            }
        }

        let tuning = [
            ("safe_margin", self.safe_margin),
            ("body_retreat_angle", self.body_retreat_angle),
            ("min_safe_body_yaw", self.min_safe_body_yaw),
        ];
        for (name, value) in tuning {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::ConfigError(format!("{name} must not be negative, got {value}")));
            }
        }

        for zone in &self.collision_zones {
            for (axis, range) in [("roll", zone.roll), ("pitch", zone.pitch), ("body_yaw", zone.body_yaw)] {
                if !(range[0].is_finite() && range[1].is_finite()) || range[0] > range[1] {
                    return Err(Error::ConfigError(format!(
                        "Collision zone '{}' has invalid {axis} range [{}, {}]",
                        zone.name, range[0], range[1]
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| Error::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Control loop
        if !(self.control.frequency_hz.is_finite() && self.control.period() > Duration::ZERO) {
            return Err(Error::ConfigError("Control frequency must be greater than 0".to_string()));
        }
        if self.control.error_threshold == 0 {
            return Err(Error::ConfigError("Error threshold must be greater than 0".to_string()));
        }
        let (base, max) = (self.control.backoff_base_secs, self.control.backoff_max_secs);
        if !(base.is_finite() && max.is_finite() && base >= 0.0 && max >= base) {
            return Err(Error::ConfigError(
                "Backoff must satisfy 0 <= backoff_base_secs <= backoff_max_secs".to_string(),
            ));
        }

        self.safety.validate()?;

        // Idle animation
        let idle = [self.idle.amplitude_deg, self.idle.frequency_hz, self.idle.fade_duration_secs];
        if !idle.iter().all(|v| v.is_finite() && *v >= 0.0) {
            return Err(Error::ConfigError(
                "Idle amplitude, frequency and fade duration must be finite and not negative".to_string(),
            ));
        }

        // DOA tracking
        if !(self.doa.smoothing_alpha > 0.0 && self.doa.smoothing_alpha <= 1.0) {
            return Err(Error::ConfigError("DOA smoothing alpha must be in (0, 1]".to_string()));
        }
        if !(0.0..=1.0).contains(&self.doa.speech_confidence_threshold) {
            return Err(Error::ConfigError(
                "Speech confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.doa.sample_interval_ms == 0 {
            return Err(Error::ConfigError("DOA sample interval must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Robot head motion configuration

# Control loop
control:
  frequency_hz: 50.0
  error_threshold: 3
  backoff_base_secs: 0.5
  backoff_max_secs: 5.0

# Joint limits (degrees) and self-collision handling
safety:
  head_roll_limit: 40.0
  head_pitch_limit: 40.0
  head_yaw_limit: 170.0
  body_yaw_limit: 160.0
  safe_margin: 5.0
  body_retreat_angle: 30.0
  max_yaw_difference: 65.0
  min_safe_body_yaw: 5.0
  collision_zones:
    - name: left_tilt_body_left
      roll: [10.0, 40.0]
      pitch: [-40.0, 40.0]
      body_yaw: [5.0, 60.0]
    - name: right_tilt_body_right
      roll: [-40.0, -10.0]
      pitch: [-40.0, 40.0]
      body_yaw: [-60.0, -5.0]

# Idle antenna animation
idle:
  amplitude_deg: 15.0
  frequency_hz: 0.25
  fade_duration_secs: 1.0
  enabled_on_start: false

# Direction of audio
doa:
  smoothing_alpha: 0.3
  speech_confidence_threshold: 0.7
  sample_interval_ms: 100
"#;
