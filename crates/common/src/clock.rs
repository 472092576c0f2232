//! Clock and timing utilities for the live session.
//!
//! The render loop and the scroll animator run on independent cadences.
//! This module provides:
//! - A session clock anchored when capture starts (for the on-air timer)
//! - A rate controller that decides when a periodic tick is due
//! - Duration formatting for status displays

use std::time::Instant;

/// A session clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment capture started).
#[derive(Debug, Clone)]
pub struct SessionClock {
    /// The instant capture started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl SessionClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Get nanoseconds elapsed since capture start.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Get seconds elapsed since capture start.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at capture start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

/// Fixed-interval tick gate.
///
/// Used by frame sources to pace playback and by hosts that drive the
/// loops from their own event pump instead of a timer task.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self::with_interval_ns(1_000_000_000 / u64::from(target_hz.max(1)))
    }

    /// Create a controller with an explicit period.
    pub fn with_interval_ms(interval_ms: u64) -> Self {
        Self::with_interval_ns(interval_ms.max(1) * 1_000_000)
    }

    fn with_interval_ns(target_interval_ns: u64) -> Self {
        Self {
            target_interval_ns,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Forget the last tick so the next check fires immediately.
    pub fn reset(&mut self) {
        self.last_tick_ns = None;
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}

/// Format whole seconds as `HH:MM:SS`.
pub fn format_duration(total_secs: u64) -> String {
    let hrs = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{hrs:02}:{mins:02}:{secs:02}")
}
