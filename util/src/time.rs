//! General time utility functions
//!
//! The control clock is a monotonic seconds counter started when a
//! `ControlClock` is created. Each cycle takes a `ClockSample` of it, which
//! also carries the wall-clock epoch so that external timestamps can be moved
//! between the two domains.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::{DateTime, Duration, Utc};
use std::time::Instant;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Monotonic control clock.
pub struct ControlClock {
    epoch_instant: Instant,
    epoch_wall: DateTime<Utc>,
}

/// The control clock read at one instant.
#[derive(Debug, Clone, Copy)]
pub struct ClockSample {
    /// Seconds since the control clock epoch.
    pub now_s: f64,

    /// Wall-clock time of the control clock epoch.
    pub epoch: DateTime<Utc>,
}

/// Rate limiter working in control clock time.
#[derive(Debug, Clone)]
pub struct Throttle {
    period_s: f64,
    last_s: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlClock {
    /// Start a new control clock with the epoch at the current instant.
    pub fn new() -> Self {
        Self {
            epoch_instant: Instant::now(),
            epoch_wall: Utc::now(),
        }
    }

    /// Seconds elapsed since the epoch.
    pub fn now_s(&self) -> f64 {
        self.epoch_instant.elapsed().as_secs_f64()
    }

    /// Read the clock.
    pub fn sample(&self) -> ClockSample {
        ClockSample {
            now_s: self.now_s(),
            epoch: self.epoch_wall,
        }
    }
}

impl Default for ControlClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSample {
    /// Translate a wall-clock timestamp into control clock seconds.
    ///
    /// Returns `None` if the offset cannot be represented in nanoseconds.
    pub fn wall_to_control_s(&self, stamp: DateTime<Utc>) -> Option<f64> {
        duration_to_seconds(stamp.signed_duration_since(self.epoch))
    }

    /// Translate a control clock time into a wall-clock timestamp.
    pub fn control_to_wall(&self, time_s: f64) -> DateTime<Utc> {
        self.epoch + Duration::nanoseconds((time_s * NANOS_PER_SECOND as f64) as i64)
    }
}

impl Throttle {
    /// Create a throttle that becomes ready at most once every `period_s`.
    pub fn new(period_s: f64) -> Self {
        Self {
            period_s,
            last_s: None,
        }
    }

    /// Returns true if at least one period has passed since the last time
    /// this returned true. The first call is always ready.
    pub fn ready(&mut self, now_s: f64) -> bool {
        match self.last_s {
            Some(last) if now_s - last < self.period_s => false,
            _ => {
                self.last_s = Some(now_s);
                true
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_wall_control_translation() {
        let sample = ClockSample {
            now_s: 3.0,
            epoch: Utc.timestamp(1_600_000_000, 0),
        };

        let stamp = Utc.timestamp(1_600_000_002, 500_000_000);
        assert_eq!(sample.wall_to_control_s(stamp), Some(2.5));
        assert_eq!(sample.control_to_wall(2.5), stamp);

        // Stamps before the epoch are negative control times
        let early = Utc.timestamp(1_599_999_999, 0);
        assert_eq!(sample.wall_to_control_s(early), Some(-1.0));
    }

    #[test]
    fn test_throttle() {
        let mut throttle = Throttle::new(0.02);

        assert!(throttle.ready(0.0));
        assert!(!throttle.ready(0.01));
        assert!(throttle.ready(0.02));
        assert!(!throttle.ready(0.03));
        assert!(throttle.ready(0.1));
    }
}
