//! # motion-sense
//!
//! Converts a stream of raw location samples into a stable, debounced
//! moving/stationary signal.
//!
//! ## Overview
//!
//! A location provider delivers fixes (position, timestamp, optional
//! speed) on its own schedule. The classifier judges each fix, using the
//! speed reading first and the position delta as the fallback, then
//! applies a decay window so brief pauses do not flicker the state.
//! Consumers watch an observable signal that only ever reports actual
//! transitions.
//!
//! ## Quick Start
//!
//! ```no_run
//! use motion_sense::classify::motion::{MotionClassifier, MotionClassifierConfig};
//! use motion_sense::ingest::types::{GeoPoint, LocationSample};
//! use motion_sense::time::Timestamp;
//!
//! let mut classifier = MotionClassifier::with_config(MotionClassifierConfig::default());
//!
//! let fix = LocationSample::new(
//!     GeoPoint::new(59.3293, 18.0686, 5.0),
//!     Timestamp::from_millis(1_000),
//!     1.2, // m/s
//! );
//!
//! let update = classifier.process(&fix);
//! if update.transition {
//!     println!("now {:?}", update.state);
//! }
//! ```
//!
//! ## Architecture
//!
//! The system is organized into the following modules:
//!
//! - [`ingest`]: Sample types, lock-free SPSC buffer, providers
//! - [`time`]: Monotonic millisecond timestamps
//! - [`classify`]: The motion state machine and the observable signal
//! - [`workflow`]: Track log persistence and the monitor loop
//! - [`app`]: CLI and configuration management
//!
//! ## Sample Pipeline
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │  Provider   │───▶│ Ring Buffer │───▶│  Classifier │───▶│   Signal    │
//! │ (GPS/replay)│    │ (lock-free) │    │  (debounce) │    │ (observers) │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//! ```
//!
//! Authorization changes and provider failures travel through the same
//! buffer as samples; the monitor forces the stationary fail-safe when
//! the signal source goes away.

pub mod app;
pub mod classify;
pub mod ingest;
pub mod time;
pub mod workflow;

// Re-export commonly used types
pub use classify::motion::{MotionClassifier, MotionClassifierConfig, MotionState, MotionUpdate};
pub use classify::signal::MotionSignal;
pub use ingest::ring_buffer::SampleRingBuffer;
pub use ingest::types::{AuthorizationStatus, GeoPoint, LocationSample, ProviderEvent};
pub use time::Timestamp;
pub use workflow::monitor::MotionMonitor;
pub use workflow::track::TrackLog;

/// Result type alias for motion-sense
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for motion-sense
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
