//! Robot head motion demo against a simulated robot.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use robot_head_motion::{
    config::Config,
    controller::{PoseCommand, RobotController},
    hardware::{RobotBackend, SimulatedRobot},
};
use std::{sync::Arc, thread, time::Duration};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Seconds to run each command before applying the next
    #[arg(short, long, default_value = "2.0")]
    seconds: f64,

    /// Enable idle antenna sway
    #[arg(long)]
    idle: bool,

    /// Direction to look (e.g. "left", "front right"); repeatable
    #[arg(short, long)]
    look: Vec<String>,

    /// Antenna expression per command (happy, sad, curious, ...)
    #[arg(short, long)]
    antennas: Vec<String>,

    /// Transition speed per command (instant, fast, normal, slow, very slow)
    #[arg(long)]
    speed: Vec<String>,
}

fn build_commands(args: &Args) -> Vec<PoseCommand> {
    let count = args.look.len().max(args.antennas.len()).max(args.speed.len());
    (0..count)
        .map(|i| PoseCommand {
            yaw: args.look.get(i).map(|name| name.as_str().into()),
            antennas: args.antennas.get(i).map(|name| name.as_str().into()),
            duration: args.speed.get(i).map(|name| name.as_str().into()),
            ..PoseCommand::default()
        })
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Robot head motion demo");

    let config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path);
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    let hold = Duration::try_from_secs_f64(args.seconds).context("--seconds must be a non-negative number")?;

    let robot = Arc::new(SimulatedRobot::new());
    // A talker slightly to the left for the DOA tracker to find
    robot.script_doa(std::iter::empty(), (0.6, true));

    let backend: Arc<dyn RobotBackend> = robot.clone();
    let mut controller = RobotController::new(backend, config).context("Failed to create controller")?;
    controller.start().context("Failed to start controller")?;
    controller.start_speech_segment();
    controller.enable_idle(args.idle);

    for command in build_commands(&args) {
        let (pose, duration) = controller.apply_command(&command).context("Invalid command")?;
        info!(
            "Moving to roll {:.1}, pitch {:.1}, yaw {:.1}, antennas {:?} over {:?}",
            pose.roll, pose.pitch, pose.yaw, pose.antennas, duration
        );
        thread::sleep(hold);
    }

    if args.look.is_empty() && args.antennas.is_empty() && args.speed.is_empty() {
        thread::sleep(hold);
    }

    controller.stop();

    let pose = controller.get_current_pose();
    println!("Final pose: {}", controller.describe_current_pose());
    println!(
        "  roll {:.1}, pitch {:.1}, yaw {:.1}, body_yaw {:.1}, antennas [{:.1}, {:.1}]",
        pose.roll, pose.pitch, pose.yaw, pose.body_yaw, pose.antennas[0], pose.antennas[1]
    );
    println!("Commands sent to hardware: {}", robot.command_count());

    match controller.get_average_doa() {
        Some(estimate) => println!(
            "Average DOA: {:.1}° from {} samples (speech: {})",
            estimate.angle.to_degrees(),
            estimate.sample_count,
            estimate.is_speech_detected
        ),
        None => println!("Average DOA: no speech detected"),
    }

    Ok(())
}
