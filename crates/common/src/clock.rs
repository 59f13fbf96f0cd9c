//! Clock and timing utilities for export synchronization.
//!
//! The source playback clock is the authoritative timebase during an
//! export. This module provides utilities for:
//! - Anchoring a session to a monotonic epoch (elapsed time, ETA)
//! - Converting between frame indices and playback seconds at a fixed rate
//! - Measuring drift between the encoded video timeline and the source clock

use std::time::Instant;

/// A session clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment the export session started).
#[derive(Debug, Clone)]
pub struct SessionClock {
    /// The instant the session started.
    epoch: Instant,

    /// Wall-clock time at epoch.
    epoch_wall: chrono::DateTime<chrono::Local>,
}

impl SessionClock {
    /// Create a new session clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Local::now(),
        }
    }

    /// Get seconds elapsed since session start.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at session start (RFC 3339).
    pub fn epoch_wall(&self) -> String {
        self.epoch_wall.to_rfc3339()
    }

    /// Compact timestamp used in artifact file names (`YYYYmmdd-HHMMSS`).
    pub fn artifact_stamp(&self) -> String {
        self.epoch_wall.format("%Y%m%d-%H%M%S").to_string()
    }
}

/// Fixed-rate frame timebase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    fps: u32,
}

impl FrameClock {
    /// Create a frame clock for the given rate. A rate of zero is treated as 1.
    pub fn new(fps: u32) -> Self {
        Self { fps: fps.max(1) }
    }

    /// Frames per second.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Duration of a single frame in seconds.
    pub fn frame_duration_secs(&self) -> f64 {
        1.0 / self.fps as f64
    }

    /// Presentation time of a frame index.
    pub fn frame_to_secs(&self, frame: u64) -> f64 {
        frame as f64 / self.fps as f64
    }

    /// Number of frames needed to cover `secs` (at least one for positive spans).
    pub fn frames_for(&self, secs: f64) -> u64 {
        if secs <= 0.0 {
            return 0;
        }
        (secs * self.fps as f64).ceil() as u64
    }
}

/// Drift measurement between two streams.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeasurement {
    /// Timestamp in the reference stream (seconds).
    pub reference_secs: f64,
    /// Timestamp in the measured stream (seconds).
    pub measured_secs: f64,
}

impl DriftMeasurement {
    /// Drift in milliseconds (positive = measured is ahead).
    pub fn drift_ms(&self) -> f64 {
        (self.measured_secs - self.reference_secs) * 1000.0
    }

    /// Whether drift exceeds an acceptable threshold.
    pub fn exceeds_threshold_ms(&self, threshold_ms: f64) -> bool {
        self.drift_ms().abs() > threshold_ms
    }
}
