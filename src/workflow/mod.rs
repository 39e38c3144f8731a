//! High-level workflows
//!
//! Track log persistence and the monitor that wires provider events
//! through the classifier to the observable signal.

pub mod monitor;
pub mod track;

pub use monitor::{MonitorSummary, MotionMonitor};
pub use track::{TrackLog, TrackMetadata};
