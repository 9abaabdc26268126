//! Constants used throughout the motion core

/// Default control loop rate
pub const DEFAULT_CONTROL_FREQUENCY_HZ: f64 = 50.0;

/// Consecutive connection errors before a daemon reset is attempted
pub const DEFAULT_ERROR_THRESHOLD: u32 = 3;

/// Backoff parameters for connection errors (seconds)
pub const DEFAULT_BACKOFF_BASE_SECS: f64 = 0.5;
pub const DEFAULT_BACKOFF_MAX_SECS: f64 = 5.0;

/// Per-axis joint limits (degrees, symmetric around zero)
pub const HEAD_ROLL_LIMIT: f64 = 40.0;
pub const HEAD_PITCH_LIMIT: f64 = 40.0;
pub const HEAD_YAW_LIMIT: f64 = 170.0;
pub const BODY_YAW_LIMIT: f64 = 160.0;

/// Roll below this is treated as an upright head (degrees)
pub const SAFE_MARGIN: f64 = 5.0;

/// Body yaw used when backing away from a tilted head (degrees)
pub const BODY_RETREAT_ANGLE: f64 = 30.0;

/// Largest allowed difference between head yaw and body yaw (degrees)
pub const MAX_YAW_DIFFERENCE: f64 = 65.0;

/// Floor for the tilt-dependent body yaw limit (degrees)
pub const MIN_SAFE_BODY_YAW: f64 = 5.0;

/// Compass-derived yaw is clamped to this magnitude (degrees)
pub const COMPASS_YAW_LIMIT: f64 = 45.0;

/// Idle animation defaults
pub const DEFAULT_IDLE_AMPLITUDE_DEG: f64 = 15.0;
pub const DEFAULT_IDLE_FREQUENCY_HZ: f64 = 0.25;
pub const DEFAULT_IDLE_FADE_SECS: f64 = 1.0;

/// DOA smoothing factor for the exponential moving average
pub const DEFAULT_DOA_ALPHA: f64 = 0.3;

/// Fraction of speech samples needed to report a segment as speech
pub const DEFAULT_SPEECH_CONFIDENCE: f64 = 0.7;

/// DOA sampling cadence (milliseconds)
pub const DEFAULT_DOA_SAMPLE_INTERVAL_MS: u64 = 100;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-9;
