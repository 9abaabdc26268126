use super::RobotBackend;
use crate::{
    error::{Error, Result},
    pose::{euler_from_matrix, PoseRadians, RobotPose},
};
use log::{debug, info};
use nalgebra::Matrix4;
use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
};

/// Command received by the simulator, already converted back to degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedCommand {
    pub pose: RobotPose,
}

#[derive(Debug, Default)]
struct SimState {
    pose: RobotPose,
    commands: Vec<RecordedCommand>,
    connection_failures: u32,
    other_failures: u32,
    fail_resets: bool,
    reset_count: u32,
    pose_after_reset: Option<RobotPose>,
    doa_script: VecDeque<(f64, bool)>,
    doa_default: (f64, bool),
}

/// Backend that executes commands instantly and can inject failures.
///
/// Commands sent through [`RobotBackend::set_target`] are decoded from the head
/// matrix back into degrees, recorded, and become the live state.
#[derive(Debug, Default)]
pub struct SimulatedRobot {
    state: Mutex<SimState>,
}

impl SimulatedRobot {
    /// Simulator resting at the neutral pose
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulator starting from `pose`
    #[must_use]
    pub fn with_pose(pose: RobotPose) -> Self {
        let robot = Self::new();
        robot.lock().pose = pose;
        robot
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Fail the next `count` hardware calls with a connection error
    pub fn fail_next(&self, count: u32) {
        self.lock().connection_failures = count;
    }

    /// Fail the next `count` hardware calls with a non-connection error
    pub fn fail_other_next(&self, count: u32) {
        self.lock().other_failures = count;
    }

    /// Make every reset attempt fail
    pub fn set_reset_fails(&self, fails: bool) {
        self.lock().fail_resets = fails;
    }

    /// Pose the robot reports after the next successful reset
    pub fn set_pose_after_reset(&self, pose: RobotPose) {
        self.lock().pose_after_reset = Some(pose);
    }

    /// Move the robot as if something external pushed it
    pub fn set_pose(&self, pose: RobotPose) {
        self.lock().pose = pose;
    }

    /// Queue DOA readings; once exhausted `default` is returned
    pub fn script_doa(&self, samples: impl IntoIterator<Item = (f64, bool)>, default: (f64, bool)) {
        let mut state = self.lock();
        state.doa_script = samples.into_iter().collect();
        state.doa_default = default;
    }

    #[must_use]
    pub fn pose(&self) -> RobotPose {
        self.lock().pose
    }

    #[must_use]
    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.lock().commands.clone()
    }

    #[must_use]
    pub fn command_count(&self) -> usize {
        self.lock().commands.len()
    }

    #[must_use]
    pub fn reset_count(&self) -> u32 {
        self.lock().reset_count
    }

    fn check_failures(state: &mut SimState) -> Result<()> {
        if state.connection_failures > 0 {
            state.connection_failures -= 1;
            return Err(Error::Connection("simulated daemon unreachable".to_string()));
        }
        if state.other_failures > 0 {
            state.other_failures -= 1;
            return Err(Error::Hardware("simulated motor fault".to_string()));
        }
        Ok(())
    }
}

impl RobotBackend for SimulatedRobot {
    fn get_current_state(&self) -> Result<RobotPose> {
        let mut state = self.lock();
        Self::check_failures(&mut state)?;
        Ok(state.pose)
    }

    fn set_target(&self, head: &Matrix4<f64>, antennas: [f64; 2], body_yaw: f64) -> Result<()> {
        let mut state = self.lock();
        Self::check_failures(&mut state)?;

        let (roll, pitch, yaw) = euler_from_matrix(head);
        let pose = RobotPose::from_radians(&PoseRadians {
            roll,
            pitch,
            yaw,
            antennas,
            body_yaw,
        });
        debug!("Simulated robot moved to {:?}", pose);
        state.pose = pose;
        state.commands.push(RecordedCommand { pose });
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        let mut state = self.lock();
        state.reset_count += 1;
        if state.fail_resets {
            return Err(Error::Connection("simulated daemon failed to respawn".to_string()));
        }
        state.connection_failures = 0;
        if let Some(pose) = state.pose_after_reset.take() {
            state.pose = pose;
        }
        info!("Simulated daemon reset (#{})", state.reset_count);
        Ok(())
    }

    fn get_doa(&self) -> Result<(f64, bool)> {
        let mut state = self.lock();
        Self::check_failures(&mut state)?;
        Ok(state.doa_script.pop_front().unwrap_or(state.doa_default))
    }
}
