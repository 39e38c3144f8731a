//! Timing utilities

pub mod clock;

pub use clock::{MonotonicClock, Timestamp};
