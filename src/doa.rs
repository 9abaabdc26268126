//! Direction-of-audio tracking.
//!
//! The microphone array reports a bearing and a speech flag for every sample.
//! Single readings are noisy, so during a speech segment the bearings are
//! accumulated as points on the unit circle and smoothed with an exponential
//! moving average. Averaging the Cartesian form keeps readings on either side of
//! the ±180° seam together, which an arithmetic mean of the raw angles does not.

use crate::{
    config::DoaConfig,
    constants::{COMPASS_YAW_LIMIT, DEFAULT_DOA_ALPHA, DEFAULT_SPEECH_CONFIDENCE},
    hardware::RobotBackend,
};
use log::{debug, info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// Averaged bearing for the current speech segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoaEstimate {
    /// Circular mean bearing in radians
    pub angle: f64,
    /// More than the confidence threshold of all samples carried speech
    pub is_speech_detected: bool,
    /// Speech samples folded into the average
    pub sample_count: usize,
}

/// Circular exponential moving average of speech bearings
#[derive(Debug, Clone)]
pub struct DoaTracker {
    alpha: f64,
    speech_threshold: f64,
    avg_x: f64,
    avg_y: f64,
    sample_count: usize,
    total_sample_count: usize,
    speech_detected_count: usize,
}

impl Default for DoaTracker {
    fn default() -> Self {
        Self::new(DEFAULT_DOA_ALPHA, DEFAULT_SPEECH_CONFIDENCE)
    }
}

impl DoaTracker {
    /// Create a tracker with smoothing factor `alpha` in `(0, 1]`
    #[must_use]
    pub fn new(alpha: f64, speech_threshold: f64) -> Self {
        assert!(alpha > 0.0 && alpha <= 1.0, "Alpha must be in (0, 1]");
        Self {
            alpha,
            speech_threshold,
            avg_x: 0.0,
            avg_y: 0.0,
            sample_count: 0,
            total_sample_count: 0,
            speech_detected_count: 0,
        }
    }

    #[must_use]
    pub fn from_config(config: &DoaConfig) -> Self {
        Self::new(config.smoothing_alpha, config.speech_confidence_threshold)
    }

    /// Forget everything; call once per detected speech onset
    pub fn start_speech_segment(&mut self) {
        self.avg_x = 0.0;
        self.avg_y = 0.0;
        self.sample_count = 0;
        self.total_sample_count = 0;
        self.speech_detected_count = 0;
    }

    /// Fold one `(angle, is_speech)` reading into the segment.
    ///
    /// Every reading counts toward the total; only speech readings move the
    /// average.
    pub fn add_doa_sample(&mut self, angle: f64, is_speech: bool) {
        self.total_sample_count += 1;
        if !is_speech || !angle.is_finite() {
            return;
        }

        self.speech_detected_count += 1;
        let (y, x) = angle.sin_cos();
        if self.sample_count == 0 {
            self.avg_x = x;
            self.avg_y = y;
        } else {
            self.avg_x = self.alpha * x + (1.0 - self.alpha) * self.avg_x;
            self.avg_y = self.alpha * y + (1.0 - self.alpha) * self.avg_y;
        }
        self.sample_count += 1;
    }

    /// Segment estimate, or `None` before the first speech sample
    #[must_use]
    pub fn get_average_doa(&self) -> Option<DoaEstimate> {
        if self.sample_count == 0 {
            return None;
        }

        #[allow(clippy::cast_precision_loss)] // sample counts stay far below 2^52
        let speech_ratio = self.speech_detected_count as f64 / self.total_sample_count as f64;
        Some(DoaEstimate {
            angle: self.avg_y.atan2(self.avg_x),
            is_speech_detected: speech_ratio > self.speech_threshold,
            sample_count: self.sample_count,
        })
    }

    /// Running mean as Cartesian components
    #[must_use]
    pub fn average_vector(&self) -> (f64, f64) {
        (self.avg_x, self.avg_y)
    }

    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    #[must_use]
    pub fn total_sample_count(&self) -> usize {
        self.total_sample_count
    }

    #[must_use]
    pub fn speech_detected_count(&self) -> usize {
        self.speech_detected_count
    }
}

/// Head yaw (degrees) that points toward a bearing, within the compass range
#[must_use]
pub fn doa_to_yaw(angle: f64) -> f64 {
    (angle.to_degrees() / 2.0).clamp(-COMPASS_YAW_LIMIT, COMPASS_YAW_LIMIT)
}

fn lock_tracker(tracker: &Mutex<DoaTracker>) -> MutexGuard<'_, DoaTracker> {
    tracker.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Background poller feeding hardware DOA readings into a shared tracker
pub struct DoaSampler {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DoaSampler {
    /// Spawn the sampling thread
    pub fn spawn(backend: Arc<dyn RobotBackend>, tracker: Arc<Mutex<DoaTracker>>, interval: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        info!("Starting DOA sampler every {:?}", interval);

        let handle = thread::Builder::new()
            .name("doa-sampler".to_string())
            .spawn(move || {
                while flag.load(Ordering::Acquire) {
                    let started = Instant::now();
                    match backend.get_doa() {
                        Ok((angle, is_speech)) => lock_tracker(&tracker).add_doa_sample(angle, is_speech),
                        Err(e) => debug!("DOA sample skipped: {}", e),
                    }
                    thread::sleep(interval.saturating_sub(started.elapsed()));
                }
            });

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Failed to spawn DOA sampler thread: {}", e);
                running.store(false, Ordering::Release);
                None
            }
        };

        Self { running, handle }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop polling and wait for the thread to exit
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("DOA sampler thread panicked");
            }
        }
    }
}

impl Drop for DoaSampler {
    fn drop(&mut self) {
        self.stop();
    }
}
