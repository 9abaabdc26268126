//! Upstream-facing controller.
//!
//! [`RobotController`] bundles the movement loop, the DOA tracker and the
//! hardware handle behind the small API the conversational agent uses. It also
//! turns agent words into poses: [`PoseCommand`] fields go through the name
//! mapping and deferred markers (`return`, `back`, `doa`) are resolved here.

use crate::{
    config::{Config, SafetyConfig},
    doa::{doa_to_yaw, DoaEstimate, DoaSampler, DoaTracker},
    error::{Error, Result},
    hardware::RobotBackend,
    mapping::{describe_pose, name_to_value, ParamInput, ParamValue, Parameter},
    movement_manager::MovementManager,
    pose::RobotPose,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

/// Transition time used when a command does not name one
pub const DEFAULT_COMMAND_DURATION_SECS: f64 = 1.0;

/// Pose request as the agent phrases it; absent fields keep their target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseCommand {
    pub roll: Option<ParamInput>,
    pub pitch: Option<ParamInput>,
    pub yaw: Option<ParamInput>,
    pub body_yaw: Option<ParamInput>,
    pub antennas: Option<ParamInput>,
    pub duration: Option<ParamInput>,
}

/// Facade over the motion core for the upstream agent
pub struct RobotController {
    backend: Arc<dyn RobotBackend>,
    movement: MovementManager,
    doa: Arc<Mutex<DoaTracker>>,
    sampler: Option<DoaSampler>,
    previous_target: Mutex<RobotPose>,
    config: Config,
}

impl RobotController {
    /// Create a stopped controller
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` does not validate.
    pub fn new(backend: Arc<dyn RobotBackend>, config: Config) -> Result<Self> {
        let movement = MovementManager::new(Arc::clone(&backend), &config)?;
        Ok(Self {
            backend,
            movement,
            doa: Arc::new(Mutex::new(DoaTracker::from_config(&config.doa))),
            sampler: None,
            previous_target: Mutex::new(RobotPose::neutral()),
            config,
        })
    }

    /// Start the control loop and the DOA sampler
    ///
    /// # Errors
    ///
    /// Fails if the movement loop cannot read the initial hardware pose.
    pub fn start(&mut self) -> Result<()> {
        self.movement.start()?;
        *self.previous() = self.movement.target_pose();
        if self.sampler.is_none() {
            self.sampler = Some(DoaSampler::spawn(
                Arc::clone(&self.backend),
                Arc::clone(&self.doa),
                self.config.doa.sample_interval(),
            ));
        }
        info!("Robot controller started");
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.sampler.is_none() && !self.movement.is_running() {
            return;
        }
        if let Some(mut sampler) = self.sampler.take() {
            sampler.stop();
        }
        self.movement.stop();
        info!("Robot controller stopped");
    }

    #[must_use]
    pub fn movement(&self) -> &MovementManager {
        &self.movement
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn previous(&self) -> MutexGuard<'_, RobotPose> {
        self.previous_target.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tracker(&self) -> MutexGuard<'_, DoaTracker> {
        self.doa.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move toward `pose` over `duration`, remembering the old target for `back`
    pub fn set_target_pose(&self, pose: RobotPose, duration: Duration) {
        *self.previous() = self.movement.target_pose();
        self.movement.set_target_pose(pose, duration);
    }

    pub fn enable_idle(&self, enabled: bool) {
        self.movement.enable_idle(enabled);
    }

    #[must_use]
    pub fn get_current_pose(&self) -> RobotPose {
        self.movement.get_current_pose()
    }

    /// Natural-language summary of the current pose
    #[must_use]
    pub fn describe_current_pose(&self) -> String {
        describe_pose(&self.get_current_pose())
    }

    /// Swap safety limits and zones on the running loop
    ///
    /// # Errors
    ///
    /// Rejects configurations that do not validate.
    pub fn set_safety_config(&self, config: SafetyConfig) -> Result<()> {
        self.movement.set_safety_config(config)
    }

    pub fn start_speech_segment(&self) {
        self.tracker().start_speech_segment();
    }

    pub fn add_doa_sample(&self, angle: f64, is_speech: bool) {
        self.tracker().add_doa_sample(angle, is_speech);
    }

    #[must_use]
    pub fn get_average_doa(&self) -> Option<DoaEstimate> {
        self.tracker().get_average_doa()
    }

    /// Shared tracker handle, for callers that sample on their own schedule
    #[must_use]
    pub fn doa_tracker(&self) -> Arc<Mutex<DoaTracker>> {
        Arc::clone(&self.doa)
    }

    /// Turn a command into a concrete pose and duration without moving
    ///
    /// # Errors
    ///
    /// Returns mapping errors for unknown names and [`Error::InvalidInput`] for
    /// values of the wrong shape or markers that make no sense for a field.
    pub fn resolve_command(&self, command: &PoseCommand) -> Result<(RobotPose, Duration)> {
        let target = self.movement.target_pose();
        let previous = *self.previous();

        let pose = RobotPose {
            roll: self.resolve_scalar(Parameter::Roll, command.roll.as_ref(), target.roll, previous.roll)?,
            pitch: self.resolve_scalar(Parameter::Pitch, command.pitch.as_ref(), target.pitch, previous.pitch)?,
            yaw: self.resolve_scalar(Parameter::Yaw, command.yaw.as_ref(), target.yaw, previous.yaw)?,
            body_yaw: self.resolve_scalar(
                Parameter::BodyYaw,
                command.body_yaw.as_ref(),
                target.body_yaw,
                previous.body_yaw,
            )?,
            antennas: resolve_antennas(command.antennas.as_ref(), target.antennas, previous.antennas)?,
        };

        Ok((pose, resolve_duration(command.duration.as_ref())?))
    }

    /// Resolve a command and start moving toward it
    ///
    /// # Errors
    ///
    /// Same as [`resolve_command`](Self::resolve_command); nothing moves on error.
    pub fn apply_command(&self, command: &PoseCommand) -> Result<(RobotPose, Duration)> {
        let (pose, duration) = self.resolve_command(command)?;
        self.set_target_pose(pose, duration);
        Ok((pose, duration))
    }

    fn resolve_scalar(&self, parameter: Parameter, input: Option<&ParamInput>, current: f64, previous: f64) -> Result<f64> {
        let Some(input) = input else {
            return Ok(current);
        };

        match name_to_value(parameter, input)? {
            ParamValue::Return => Ok(0.0),
            ParamValue::Back => Ok(previous),
            ParamValue::Doa if parameter.is_compass() => Ok(match self.get_average_doa() {
                Some(estimate) => doa_to_yaw(estimate.angle),
                None => {
                    warn!("No DOA estimate available for {}, looking front", parameter);
                    0.0
                }
            }),
            value => value
                .as_scalar()
                .ok_or_else(|| Error::InvalidInput(format!("{value:?} is not a valid {parameter} value"))),
        }
    }
}

impl Drop for RobotController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn resolve_antennas(input: Option<&ParamInput>, current: [f64; 2], previous: [f64; 2]) -> Result<[f64; 2]> {
    let Some(input) = input else {
        return Ok(current);
    };

    match name_to_value(Parameter::Antennas, input)? {
        ParamValue::Return => Ok([0.0, 0.0]),
        ParamValue::Back => Ok(previous),
        value => value
            .as_pair()
            .ok_or_else(|| Error::InvalidInput(format!("{value:?} is not a valid antennas value"))),
    }
}

fn resolve_duration(input: Option<&ParamInput>) -> Result<Duration> {
    let Some(input) = input else {
        return Ok(Duration::from_secs_f64(DEFAULT_COMMAND_DURATION_SECS));
    };

    let value = name_to_value(Parameter::Duration, input)?;
    match value.as_scalar() {
        Some(secs) if secs.is_finite() && secs >= 0.0 => Ok(Duration::from_secs_f64(secs)),
        _ => Err(Error::InvalidInput(format!("{value:?} is not a valid duration"))),
    }
}
