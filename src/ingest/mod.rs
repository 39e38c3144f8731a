//! Location sample ingestion
//!
//! Types and plumbing for getting location samples from a provider into
//! the classifier: the sample/event model, a lock-free SPSC buffer, and
//! the provider abstraction with its authorization lifecycle.

pub mod provider;
pub mod ring_buffer;
pub mod types;

pub use provider::{LocationProvider, ReplayPacing, ReplayProvider};
pub use ring_buffer::{SampleConsumer, SampleProducer, SampleRingBuffer};
pub use types::{AuthorizationStatus, GeoPoint, LocationSample, ProviderEvent};
