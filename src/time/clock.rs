//! Monotonic Millisecond Timestamps
//!
//! Location samples carry monotonic millisecond timestamps. Samples read
//! from a track log keep the timestamps they were recorded with; live
//! capture stamps samples with a process-anchored monotonic clock so time
//! never goes backward even if the wall clock is adjusted.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// A monotonic instant in milliseconds.
///
/// The zero point is arbitrary (process start for live capture, recording
/// start for replayed tracks); only differences are meaningful.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a timestamp from milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Create a timestamp from whole seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs * 1_000)
    }

    /// Milliseconds since the (arbitrary) zero point.
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Elapsed time since an earlier timestamp.
    ///
    /// Returns zero if `earlier` is actually later; callers assume
    /// monotonic delivery and a reordered pair must not underflow.
    pub fn elapsed_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// This timestamp shifted forward by a duration.
    pub fn offset(&self, by: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(by.as_millis() as u64))
    }
}

/// Process-anchored monotonic clock for stamping live samples.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock anchored at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Current timestamp, in milliseconds since this clock was created.
    pub fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.origin.elapsed().as_millis() as u64)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_millis_roundtrip() {
        let ts = Timestamp::from_millis(1_500);
        assert_eq!(ts.as_millis(), 1_500);
    }

    #[test]
    fn test_from_secs() {
        assert_eq!(Timestamp::from_secs(3).as_millis(), 3_000);
    }

    #[test]
    fn test_elapsed_since() {
        let a = Timestamp::from_millis(1_000);
        let b = Timestamp::from_millis(4_500);
        assert_eq!(b.elapsed_since(a), Duration::from_millis(3_500));
    }

    #[test]
    fn test_elapsed_since_saturates() {
        let a = Timestamp::from_millis(4_500);
        let b = Timestamp::from_millis(1_000);
        assert_eq!(b.elapsed_since(a), Duration::ZERO);
    }

    #[test]
    fn test_offset() {
        let ts = Timestamp::from_millis(100).offset(Duration::from_secs(2));
        assert_eq!(ts.as_millis(), 2_100);
    }

    #[test]
    fn test_monotonic_clock_never_goes_backward() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_timestamp_ordering() {
        assert!(Timestamp::from_millis(1) < Timestamp::from_millis(2));
        assert_eq!(Timestamp::default().as_millis(), 0);
    }
}
