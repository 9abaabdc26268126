//! Upstream commands resolved and applied through the controller

use robot_head_motion::{
    config::Config,
    controller::{PoseCommand, RobotController},
    hardware::{RobotBackend, SimulatedRobot},
    pose::RobotPose,
    Result,
};
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

mod test_helpers;
use test_helpers::assert_close;

fn controller() -> Result<(Arc<SimulatedRobot>, RobotController)> {
    let robot = Arc::new(SimulatedRobot::new());
    let backend: Arc<dyn RobotBackend> = robot.clone();
    Ok((robot, RobotController::new(backend, Config::default())?))
}

#[test]
fn test_apply_command_sets_target() -> Result<()> {
    let (_robot, controller) = controller()?;
    let command = PoseCommand {
        roll: Some("slightly left".into()),
        yaw: Some("right".into()),
        antennas: Some("sad".into()),
        duration: Some("fast".into()),
        ..PoseCommand::default()
    };

    let (pose, duration) = controller.apply_command(&command)?;
    assert_eq!(pose.roll, 10.0);
    assert_close(pose.yaw, -45.0, 1e-9);
    assert_eq!(pose.antennas, [-30.0, -30.0]);
    assert_eq!(duration, Duration::from_millis(500));
    assert_eq!(controller.movement().target_pose(), pose);
    Ok(())
}

#[test]
fn test_return_goes_to_neutral() -> Result<()> {
    let (_robot, controller) = controller()?;
    controller.set_target_pose(RobotPose::new(10.0, 10.0, 30.0, [20.0, 20.0], 15.0), Duration::ZERO);

    let command = PoseCommand {
        yaw: Some("return".into()),
        antennas: Some("return".into()),
        ..PoseCommand::default()
    };
    let (pose, _) = controller.apply_command(&command)?;
    assert_eq!(pose.yaw, 0.0);
    assert_eq!(pose.antennas, [0.0, 0.0]);
    // Untouched fields keep the current target
    assert_eq!(pose.pitch, 10.0);
    assert_eq!(pose.body_yaw, 15.0);
    Ok(())
}

#[test]
fn test_back_restores_previous_target() -> Result<()> {
    let (_robot, controller) = controller()?;
    controller.set_target_pose(RobotPose::new(0.0, 0.0, 20.0, [30.0, 30.0], 0.0), Duration::ZERO);
    controller.set_target_pose(RobotPose::new(0.0, 0.0, -40.0, [-30.0, -30.0], 0.0), Duration::ZERO);

    let command = PoseCommand {
        yaw: Some("back".into()),
        antennas: Some("back".into()),
        ..PoseCommand::default()
    };
    let (pose, _) = controller.apply_command(&command)?;
    assert_eq!(pose.yaw, 20.0);
    assert_eq!(pose.antennas, [30.0, 30.0]);
    Ok(())
}

#[test]
fn test_doa_turns_toward_speaker() -> Result<()> {
    let (_robot, controller) = controller()?;
    controller.start_speech_segment();
    for _ in 0..5 {
        controller.add_doa_sample(60f64.to_radians(), true);
    }
    assert!(controller.get_average_doa().unwrap().is_speech_detected);

    let command = PoseCommand {
        yaw: Some("doa".into()),
        ..PoseCommand::default()
    };
    let (pose, _) = controller.apply_command(&command)?;
    assert_close(pose.yaw, 30.0, 1e-6);
    Ok(())
}

#[test]
fn test_command_from_yaml() -> Result<()> {
    let yaml = "pitch: slightly down\nyaw: front left\nantennas: [10, -10]\nduration: 0.25\n";
    let command: PoseCommand = serde_yaml::from_str(yaml).unwrap();

    let (_robot, controller) = controller()?;
    let (pose, duration) = controller.resolve_command(&command)?;
    assert_eq!(pose.pitch, -10.0);
    assert_close(pose.yaw, 22.5, 1e-9);
    assert_eq!(pose.antennas, [10.0, -10.0]);
    assert_eq!(duration, Duration::from_millis(250));
    Ok(())
}

#[test]
fn test_running_controller_reaches_target() -> Result<()> {
    let (robot, mut controller) = controller()?;
    robot.script_doa(std::iter::empty(), (0.2, true));
    controller.start()?;
    controller.start_speech_segment();

    let command = PoseCommand {
        pitch: Some("up".into()),
        duration: Some(0.1.into()),
        ..PoseCommand::default()
    };
    controller.apply_command(&command)?;

    let deadline = Instant::now() + Duration::from_secs(2);
    while ((robot.pose().pitch - 20.0).abs() > 1e-6 || controller.get_average_doa().is_none())
        && Instant::now() < deadline
    {
        thread::sleep(Duration::from_millis(20));
    }
    controller.stop();

    assert_close(robot.pose().pitch, 20.0, 1e-6);
    assert_close(controller.get_current_pose().pitch, 20.0, 1e-6);
    assert!(controller.describe_current_pose().contains("pitch: up"));
    assert!(controller.get_average_doa().is_some());
    Ok(())
}
