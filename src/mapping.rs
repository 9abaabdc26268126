//! Translation between natural-language pose names and joint values.
//!
//! The upstream agent speaks in words ("look front right", "antennas happy",
//! "move slowly"). This module turns those words into numeric joint targets and
//! back again. Yaw parameters are parsed as compass directions by summing unit
//! vectors; every other parameter uses a fixed lookup table.
//!
//! A few words are not values at all but requests for the caller to resolve the
//! value later: `return`, `back` and `doa`. They are surfaced as dedicated
//! [`ParamValue`] variants instead of magic strings.

use crate::{
    constants::{COMPASS_YAW_LIMIT, EPSILON},
    error::{Error, Result},
    pose::RobotPose,
};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Pose parameters the agent can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    Roll,
    Pitch,
    Yaw,
    BodyYaw,
    Antennas,
    Duration,
}

impl Parameter {
    /// Every parameter, in the order they appear in a pose description
    pub const ALL: [Self; 6] = [
        Self::Roll,
        Self::Pitch,
        Self::Yaw,
        Self::BodyYaw,
        Self::Antennas,
        Self::Duration,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Roll => "roll",
            Self::Pitch => "pitch",
            Self::Yaw => "yaw",
            Self::BodyYaw => "body_yaw",
            Self::Antennas => "antennas",
            Self::Duration => "duration",
        }
    }

    /// Yaw-like parameters are parsed as compass directions
    #[must_use]
    pub const fn is_compass(self) -> bool {
        matches!(self, Self::Yaw | Self::BodyYaw)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Parameter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "roll" | "head_roll" => Ok(Self::Roll),
            "pitch" | "head_pitch" => Ok(Self::Pitch),
            "yaw" | "head_yaw" => Ok(Self::Yaw),
            "body_yaw" | "body" => Ok(Self::BodyYaw),
            "antennas" | "antenna" => Ok(Self::Antennas),
            "duration" | "speed" => Ok(Self::Duration),
            _ => Err(Error::UnknownParameter(s.to_string())),
        }
    }
}

/// A parameter value as supplied by the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamInput {
    Number(f64),
    List(Vec<f64>),
    Name(String),
}

impl From<f64> for ParamInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Vec<f64>> for ParamInput {
    fn from(value: Vec<f64>) -> Self {
        Self::List(value)
    }
}

impl From<&str> for ParamInput {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<String> for ParamInput {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

/// A resolved parameter value, or a marker the caller must resolve itself
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Numeric(f64),
    List(Vec<f64>),
    /// Go back to the neutral value for this parameter
    Return,
    /// Restore the value held before the last command
    Back,
    /// Point toward the current direction-of-audio estimate
    Doa,
}

impl ParamValue {
    /// Scalar view; single-element lists count as scalars. Non-finite
    /// numbers have no view.
    #[must_use]
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(*v),
            Self::List(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
        .filter(|v| v.is_finite())
    }

    /// Antenna pair view; a single number drives both antennas
    #[must_use]
    pub fn as_pair(&self) -> Option<[f64; 2]> {
        match self {
            Self::Numeric(v) => Some([*v, *v]),
            Self::List(v) if v.len() == 2 => Some([v[0], v[1]]),
            Self::List(v) if v.len() == 1 => Some([v[0], v[0]]),
            _ => None,
        }
        .filter(|pair| pair.iter().all(|v| v.is_finite()))
    }

    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        matches!(self, Self::Return | Self::Back | Self::Doa)
    }
}

const PITCH_TABLE: &[(&str, f64)] = &[
    ("up", 20.0),
    ("slightly up", 10.0),
    ("neutral", 0.0),
    ("slightly down", -10.0),
    ("down", -20.0),
];

const ROLL_TABLE: &[(&str, f64)] = &[
    ("left", 20.0),
    ("slightly left", 10.0),
    ("neutral", 0.0),
    ("slightly right", -10.0),
    ("right", -20.0),
];

const DURATION_TABLE: &[(&str, f64)] = &[
    ("instant", 0.2),
    ("fast", 0.5),
    ("normal", 1.0),
    ("slow", 2.0),
    ("very slow", 3.0),
];

const ANTENNA_TABLE: &[(&str, [f64; 2])] = &[
    ("happy", [30.0, 30.0]),
    ("sad", [-30.0, -30.0]),
    ("neutral", [0.0, 0.0]),
    ("curious", [20.0, -20.0]),
    ("confused", [-20.0, 20.0]),
    ("alert", [45.0, 45.0]),
];

// Synonyms rewritten before table lookup; never table entries themselves, so
// the nearest-name inverse stays unambiguous.
const ALIASES: &[(&str, &str)] = &[
    ("center", "neutral"),
    ("centre", "neutral"),
    ("level", "neutral"),
    ("straight", "neutral"),
    ("rest", "neutral"),
    ("quick", "fast"),
    ("quickly", "fast"),
    ("slowly", "slow"),
    ("medium", "normal"),
    ("joyful", "happy"),
    ("excited", "alert"),
];

const COMPASS_SECTORS: [&str; 8] = [
    "front",
    "front right",
    "right",
    "back right",
    "back",
    "back left",
    "left",
    "front left",
];

/// Lowercase, turn `_`/`-` into spaces and collapse whitespace
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve_alias(name: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |(_, canonical)| *canonical)
}

fn sentinel(name: &str) -> Option<ParamValue> {
    match name {
        "return" => Some(ParamValue::Return),
        "back" => Some(ParamValue::Back),
        "doa" => Some(ParamValue::Doa),
        _ => None,
    }
}

fn scalar_table(parameter: Parameter) -> &'static [(&'static str, f64)] {
    match parameter {
        Parameter::Pitch => PITCH_TABLE,
        Parameter::Roll => ROLL_TABLE,
        Parameter::Duration => DURATION_TABLE,
        Parameter::Yaw | Parameter::BodyYaw | Parameter::Antennas => &[],
    }
}

/// Names accepted for a parameter (compass parameters list the eight sectors)
#[must_use]
pub fn table_names(parameter: Parameter) -> Vec<&'static str> {
    match parameter {
        Parameter::Yaw | Parameter::BodyYaw => COMPASS_SECTORS.to_vec(),
        Parameter::Antennas => ANTENNA_TABLE.iter().map(|(name, _)| *name).collect(),
        _ => scalar_table(parameter).iter().map(|(name, _)| *name).collect(),
    }
}

/// Unit vector for a direction word as `(forward, rightward)`
fn direction_vector(token: &str) -> Option<(f64, f64)> {
    match token {
        "front" | "forward" | "ahead" | "north" => Some((1.0, 0.0)),
        "back" | "behind" | "backward" | "backwards" | "south" => Some((-1.0, 0.0)),
        "right" | "east" => Some((0.0, 1.0)),
        "left" | "west" => Some((0.0, -1.0)),
        _ => None,
    }
}

/// Parse a compass phrase into a head yaw in degrees.
///
/// Direction words are summed as unit vectors, the bearing of the resultant is
/// measured clockwise from front and halved into the yaw range. Phrases without
/// a usable direction fall back to front.
#[must_use]
pub fn compass_to_yaw(name: &str) -> f64 {
    let normalized = normalize_name(name);
    let (forward, rightward, matched) = normalized
        .split(' ')
        .filter_map(direction_vector)
        .fold((0.0, 0.0, 0usize), |(f, r, n), (df, dr)| (f + df, r + dr, n + 1));

    if matched == 0 || forward.hypot(rightward) < EPSILON {
        warn!(
            "Direction '{}' does not resolve to a bearing, defaulting to front",
            name
        );
        return 0.0;
    }

    let angle = rightward.atan2(forward).to_degrees();
    (-angle / 2.0).clamp(-COMPASS_YAW_LIMIT, COMPASS_YAW_LIMIT)
}

/// Name of the 45 degree compass sector a yaw falls into
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // sector is 0..8 after rem_euclid
pub fn yaw_to_compass(yaw: f64) -> &'static str {
    let angle = -2.0 * yaw;
    let sector = ((angle / 45.0).round() as i64).rem_euclid(8);
    COMPASS_SECTORS[sector as usize]
}

/// Translate an agent-supplied value into a joint value.
///
/// Numbers and lists pass through untouched, as do numeric strings. The words
/// `return`, `back` and `doa` become deferred markers.
///
/// # Errors
///
/// Returns [`Error::UnknownValue`] when a table parameter gets a name that is
/// not in its table. Compass parameters never fail.
pub fn name_to_value(parameter: Parameter, input: &ParamInput) -> Result<ParamValue> {
    let name = match input {
        ParamInput::Number(value) => return Ok(ParamValue::Numeric(*value)),
        ParamInput::List(values) => return Ok(ParamValue::List(values.clone())),
        ParamInput::Name(name) => name,
    };

    // "nan" and "inf" parse as floats but are not joint values
    if let Ok(value) = name.trim().parse::<f64>() {
        if value.is_finite() {
            return Ok(ParamValue::Numeric(value));
        }
    }

    let normalized = normalize_name(name);
    if let Some(marker) = sentinel(&normalized) {
        return Ok(marker);
    }

    if parameter.is_compass() {
        return Ok(ParamValue::Numeric(compass_to_yaw(&normalized)));
    }

    let key = resolve_alias(&normalized);
    let unknown = || Error::UnknownValue {
        parameter: parameter.to_string(),
        value: normalized.clone(),
    };

    if parameter == Parameter::Antennas {
        return ANTENNA_TABLE
            .iter()
            .find(|(entry, _)| *entry == key)
            .map(|(_, pair)| ParamValue::List(pair.to_vec()))
            .ok_or_else(unknown);
    }

    scalar_table(parameter)
        .iter()
        .find(|(entry, _)| *entry == key)
        .map(|(_, value)| ParamValue::Numeric(*value))
        .ok_or_else(unknown)
}

/// Nearest name for a joint value (lossy inverse of [`name_to_value`]).
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] when the value's shape does not fit the
/// parameter (for example a three-element list for antennas).
pub fn value_to_name(parameter: Parameter, value: &ParamValue) -> Result<&'static str> {
    match value {
        ParamValue::Return => return Ok("return"),
        ParamValue::Back => return Ok("back"),
        ParamValue::Doa => return Ok("doa"),
        ParamValue::Numeric(_) | ParamValue::List(_) => {}
    }

    let shape_error = || Error::InvalidInput(format!("{value:?} is not a valid {parameter} value"));

    if parameter == Parameter::Antennas {
        let [left, right] = value.as_pair().ok_or_else(shape_error)?;
        return nearest(ANTENNA_TABLE, |pair| (pair[0] - left).hypot(pair[1] - right)).ok_or_else(shape_error);
    }

    let scalar = value.as_scalar().ok_or_else(shape_error)?;
    if parameter.is_compass() {
        return Ok(yaw_to_compass(scalar));
    }
    nearest(scalar_table(parameter), |entry| (entry - scalar).abs()).ok_or_else(shape_error)
}

fn nearest<T>(table: &[(&'static str, T)], distance: impl Fn(&T) -> f64) -> Option<&'static str> {
    table
        .iter()
        .map(|(name, entry)| (*name, distance(entry)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(name, _)| name)
}

/// One-line natural-language summary of a pose, for feeding back to the agent
#[must_use]
pub fn describe_pose(pose: &RobotPose) -> String {
    let scalar = |parameter, value| {
        value_to_name(parameter, &ParamValue::Numeric(value)).unwrap_or("unknown")
    };
    let antennas = value_to_name(Parameter::Antennas, &ParamValue::List(pose.antennas.to_vec())).unwrap_or("unknown");
    format!(
        "roll: {}, pitch: {}, yaw: {}, body_yaw: {}, antennas: {}",
        scalar(Parameter::Roll, pose.roll),
        scalar(Parameter::Pitch, pose.pitch),
        scalar(Parameter::Yaw, pose.yaw),
        scalar(Parameter::BodyYaw, pose.body_yaw),
        antennas,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_parsing() {
        assert_eq!("Body-Yaw".parse::<Parameter>().unwrap(), Parameter::BodyYaw);
        assert_eq!("head_pitch".parse::<Parameter>().unwrap(), Parameter::Pitch);
        assert!(matches!("elbow".parse::<Parameter>(), Err(Error::UnknownParameter(_))));
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Front_Right "), "front right");
        assert_eq!(normalize_name("very-slow"), "very slow");
    }

    #[test]
    fn test_compass_cardinal_points() {
        assert_eq!(compass_to_yaw("front"), 0.0);
        assert!((compass_to_yaw("right") + 45.0).abs() < 1e-9);
        assert!((compass_to_yaw("left") - 45.0).abs() < 1e-9);
        assert!((compass_to_yaw("front right") + 22.5).abs() < 1e-9);
        assert!((compass_to_yaw("north-west") - 22.5).abs() < 1e-9);
    }

    #[test]
    fn test_compass_clamps_rear_directions() {
        assert!((compass_to_yaw("back right") + 45.0).abs() < 1e-9);
        assert!((compass_to_yaw("back left") - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_compass_defaults_to_front() {
        assert_eq!(compass_to_yaw("left right"), 0.0);
        assert_eq!(compass_to_yaw("upward spiral"), 0.0);
    }

    #[test]
    fn test_yaw_to_compass_sectors() {
        assert_eq!(yaw_to_compass(0.0), "front");
        assert_eq!(yaw_to_compass(-22.5), "front right");
        assert_eq!(yaw_to_compass(-45.0), "right");
        assert_eq!(yaw_to_compass(45.0), "left");
        assert_eq!(yaw_to_compass(90.0), "back");
        assert_eq!(yaw_to_compass(-90.0), "back");
        assert_eq!(yaw_to_compass(15.0), "front left");
        assert_eq!(yaw_to_compass(5.0), "front");
    }

    #[test]
    fn test_numeric_strings_pass_through() {
        assert_eq!(
            name_to_value(Parameter::Pitch, &"-15".into()).unwrap(),
            ParamValue::Numeric(-15.0)
        );
    }

    #[test]
    fn test_aliases() {
        assert_eq!(
            name_to_value(Parameter::Pitch, &"center".into()).unwrap(),
            ParamValue::Numeric(0.0)
        );
        assert_eq!(
            name_to_value(Parameter::Duration, &"quickly".into()).unwrap(),
            ParamValue::Numeric(0.5)
        );
    }

    #[test]
    fn test_describe_pose() {
        let pose = RobotPose::new(0.0, 20.0, -45.0, [30.0, 30.0], 0.0);
        assert_eq!(
            describe_pose(&pose),
            "roll: neutral, pitch: up, yaw: right, body_yaw: front, antennas: happy"
        );
    }
}
