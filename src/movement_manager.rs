//! Fixed-rate control loop.
//!
//! The [`MovementManager`] owns the layer stack and the safety manager. A
//! dedicated thread composites the layers every tick, validates the result
//! against the live hardware state and sends it to the backend. Connection
//! failures are retried with exponential backoff and, after repeated failures,
//! a daemon reset.
//!
//! Layer state sits behind a single mutex shared with the external mutators
//! ([`set_target_pose`](MovementManager::set_target_pose),
//! [`enable_idle`](MovementManager::enable_idle)). The lock is only held around
//! state access, never across a backend call.

use crate::{
    config::{Config, ControlConfig, SafetyConfig},
    error::Result,
    hardware::RobotBackend,
    layers::LayerStack,
    pose::RobotPose,
    safety::{SafetyManager, SafetyState},
};
use log::{debug, error, info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// What the loop should do after a connection error
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecoveryAction {
    /// Sleep this long, then try again on the next tick
    Backoff(Duration),
    /// Too many consecutive failures: reset the daemon
    Reset,
}

/// Consecutive-error bookkeeping for connection failures
#[derive(Debug, Clone)]
pub struct ErrorRecovery {
    consecutive_errors: u32,
    threshold: u32,
    backoff_base: f64,
    backoff_max: f64,
}

impl ErrorRecovery {
    #[must_use]
    pub fn new(threshold: u32, backoff_base: f64, backoff_max: f64) -> Self {
        Self {
            consecutive_errors: 0,
            threshold,
            backoff_base,
            backoff_max,
        }
    }

    #[must_use]
    pub fn from_config(config: &ControlConfig) -> Self {
        Self::new(config.error_threshold, config.backoff_base_secs, config.backoff_max_secs)
    }

    /// Sleep after `errors` consecutive failures: `min(max, base * 2^errors)`
    #[must_use]
    pub fn backoff_delay(&self, errors: u32) -> Duration {
        let exponent = i32::try_from(errors).unwrap_or(i32::MAX);
        let secs = (self.backoff_base * 2f64.powi(exponent)).min(self.backoff_max);
        // Unrepresentable delays (negative, NaN, infinite) retry on the next tick
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }

    pub fn on_success(&mut self) {
        self.consecutive_errors = 0;
    }

    pub fn on_connection_error(&mut self) -> RecoveryAction {
        self.consecutive_errors += 1;
        if self.consecutive_errors < self.threshold {
            RecoveryAction::Backoff(self.backoff_delay(self.consecutive_errors))
        } else {
            RecoveryAction::Reset
        }
    }

    /// The counter restarts whether or not the reset worked, so a dead daemon
    /// never locks the loop out of further attempts.
    pub fn on_reset_finished(&mut self, succeeded: bool) {
        if !succeeded {
            warn!(
                "Reset failed after {} consecutive errors, counting again from zero",
                self.consecutive_errors
            );
        }
        self.consecutive_errors = 0;
    }

    #[must_use]
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }
}

/// Result of one loop iteration
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A safe pose was sent to the hardware
    Sent(RobotPose),
    /// Connection error; the loop should sleep this long
    BackedOff(Duration),
    /// Connection error threshold reached and a daemon reset was attempted
    Reset { succeeded: bool },
    /// A non-connection error was logged and ignored
    Skipped,
}

struct MotionState {
    layers: LayerStack,
    safety: SafetyManager,
    // The daemon does not report body yaw reliably, so the last commanded value
    // stands in for it.
    body_yaw: f64,
    last_sent: Option<RobotPose>,
}

struct Shared {
    backend: Arc<dyn RobotBackend>,
    state: Mutex<MotionState>,
    running: AtomicBool,
    control: ControlConfig,
    idle_on_start: bool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, MotionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot_from_hardware(&self) -> Result<RobotPose> {
        let live = RobotPose::from_current_state(self.backend.as_ref())?;
        let mut state = self.lock();
        state.layers.reset_base(live);
        state.body_yaw = live.body_yaw;
        Ok(live)
    }

    fn tick(&self, now: Instant) -> Result<RobotPose> {
        // One snapshot per tick so a concurrent safety update applies from the next tick
        let (composite, safety, body_yaw) = {
            let mut state = self.lock();
            (state.layers.compose(now), state.safety.clone(), state.body_yaw)
        };

        let live = self.backend.get_current_state()?;

        let current = SafetyState::from_pose(&live.with_body_yaw(body_yaw));
        let safe_pose = safety
            .validate_movement(&current, &SafetyState::from_pose(&composite))
            .apply_to(&composite);

        let rad = safe_pose.to_radians();
        self.backend
            .set_target(&safe_pose.head_matrix(), rad.antennas, rad.body_yaw)?;

        let mut state = self.lock();
        state.body_yaw = safe_pose.body_yaw;
        state.last_sent = Some(safe_pose);
        Ok(safe_pose)
    }

    fn reset_daemon(&self) -> bool {
        match self.backend.reset() {
            Ok(()) => {
                info!("Hardware daemon reset succeeded");
                // Pick up wherever the robot ended up so the next tick does not jump
                if let Err(e) = self.snapshot_from_hardware() {
                    warn!("Could not re-snapshot pose after reset: {}", e);
                }
                true
            }
            Err(e) => {
                error!("Hardware daemon reset failed: {}", e);
                false
            }
        }
    }

    fn step(&self, recovery: &mut ErrorRecovery, now: Instant) -> TickOutcome {
        match self.tick(now) {
            Ok(pose) => {
                recovery.on_success();
                TickOutcome::Sent(pose)
            }
            Err(e) if e.is_connection() => match recovery.on_connection_error() {
                RecoveryAction::Backoff(delay) => {
                    warn!(
                        "Connection error ({} consecutive): {}, retrying in {:?}",
                        recovery.consecutive_errors(),
                        e,
                        delay
                    );
                    TickOutcome::BackedOff(delay)
                }
                RecoveryAction::Reset => {
                    error!(
                        "Connection error ({} consecutive): {}, resetting daemon",
                        recovery.consecutive_errors(),
                        e
                    );
                    let succeeded = self.reset_daemon();
                    recovery.on_reset_finished(succeeded);
                    TickOutcome::Reset { succeeded }
                }
            },
            Err(e) => {
                error!("Movement tick failed: {}", e);
                TickOutcome::Skipped
            }
        }
    }

    fn run(&self) {
        let period = self.control.period();
        let mut recovery = ErrorRecovery::from_config(&self.control);
        info!("Movement loop running every {:?}", period);

        while self.running.load(Ordering::Acquire) {
            let tick_start = Instant::now();
            if let TickOutcome::BackedOff(delay) = self.step(&mut recovery, tick_start) {
                thread::sleep(delay);
            }
            thread::sleep(period.saturating_sub(tick_start.elapsed()));
        }

        info!("Movement loop stopped");
    }
}

/// Owns the movement layers and runs the control loop
pub struct MovementManager {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl MovementManager {
    /// Create a stopped manager
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` does not validate.
    pub fn new(backend: Arc<dyn RobotBackend>, config: &Config) -> Result<Self> {
        config.validate()?;
        let state = MotionState {
            layers: LayerStack::new(RobotPose::neutral(), &config.idle),
            safety: SafetyManager::new(config.safety.clone()),
            body_yaw: 0.0,
            last_sent: None,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                backend,
                state: Mutex::new(state),
                running: AtomicBool::new(false),
                control: config.control.clone(),
                idle_on_start: config.idle.enabled_on_start,
            }),
            handle: Mutex::new(None),
        })
    }

    /// Snapshot the live pose and spawn the control thread
    ///
    /// # Errors
    ///
    /// Fails if the hardware cannot be read or the thread cannot be spawned.
    pub fn start(&self) -> Result<()> {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if handle.is_some() {
            warn!("Movement loop already running");
            return Ok(());
        }

        let live = self.shared.snapshot_from_hardware()?;
        info!("Starting movement loop from {:?}", live);
        if self.shared.idle_on_start {
            self.shared.lock().layers.enable_idle(true, Instant::now());
        }

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("movement-loop".to_string())
            .spawn(move || shared.run());

        match spawned {
            Ok(join) => {
                *handle = Some(join);
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                Err(e.into())
            }
        }
    }

    /// Ask the loop to exit at the top of its next tick and wait for it
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        let join = self.handle.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(join) = join {
            if join.join().is_err() {
                error!("Movement loop thread panicked");
            }
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Start an eased transition to `pose` over `duration`
    pub fn set_target_pose(&self, pose: RobotPose, duration: Duration) {
        debug!("New target {:?} over {:?}", pose, duration);
        self.shared.lock().layers.set_target(pose, duration, Instant::now());
    }

    /// Fade the idle animation in or out
    pub fn enable_idle(&self, enabled: bool) {
        debug!("Idle animation {}", if enabled { "enabled" } else { "disabled" });
        self.shared.lock().layers.enable_idle(enabled, Instant::now());
    }

    /// Replace limits and collision zones without restarting the loop
    ///
    /// # Errors
    ///
    /// Rejects configurations that do not validate; the old one stays active.
    pub fn set_safety_config(&self, config: SafetyConfig) -> Result<()> {
        config.validate()?;
        self.shared.lock().safety.set_config(config);
        info!("Safety configuration updated");
        Ok(())
    }

    /// Last pose sent to the hardware, or the base pose before the first tick
    #[must_use]
    pub fn get_current_pose(&self) -> RobotPose {
        let state = self.shared.lock();
        state
            .last_sent
            .or_else(|| state.layers.base().map(|base| base.current_pose()))
            .unwrap_or_default()
    }

    /// Pose the base layer is heading toward
    #[must_use]
    pub fn target_pose(&self) -> RobotPose {
        self.shared
            .lock()
            .layers
            .base()
            .map(|base| base.target_pose())
            .unwrap_or_default()
    }

    /// Whether the idle animation currently contributes
    #[must_use]
    pub fn is_idle_active(&self) -> bool {
        self.shared.lock().layers.idle().is_some_and(|idle| idle.is_enabled())
    }

    /// Re-initialize the base layer from the live hardware pose
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn snapshot_from_hardware(&self) -> Result<RobotPose> {
        self.shared.snapshot_from_hardware()
    }

    /// Run one tick synchronously without recovery handling
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn tick_once(&self, now: Instant) -> Result<RobotPose> {
        self.shared.tick(now)
    }

    /// Run one tick including connection recovery, without sleeping
    pub fn step(&self, recovery: &mut ErrorRecovery, now: Instant) -> TickOutcome {
        self.shared.step(recovery, now)
    }

    /// Recovery state configured like the running loop's
    #[must_use]
    pub fn new_recovery(&self) -> ErrorRecovery {
        ErrorRecovery::from_config(&self.shared.control)
    }
}

impl Drop for MovementManager {
    fn drop(&mut self) {
        self.stop();
    }
}
