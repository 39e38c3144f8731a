//! Location Providers
//!
//! A provider owns the upstream source of location fixes and pushes
//! `ProviderEvent`s into the sample buffer from its own thread. The
//! consumer side never talks to the source directly; authorization
//! changes and failures arrive through the buffer, in stream order.
//!
//! # Authorization
//!
//! Providers follow the platform lifecycle: `request_authorization()` is
//! a no-op once the user has answered, `start()` fails unless access is
//! granted, and a downgrade mid-stream surfaces as an
//! `AuthorizationChanged` event for the consumer to fail safe on.

use super::ring_buffer::SampleProducer;
use super::types::{AuthorizationStatus, GeoPoint, LocationSample, ProviderEvent};
use crate::time::Timestamp;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, trace};

/// Control surface of a location source.
pub trait LocationProvider {
    /// Ask the user for location access. No-op once the answer is known.
    fn request_authorization(&mut self);

    /// Current authorization state.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Begin delivering events into `producer`.
    ///
    /// # Errors
    /// Fails if access is not authorized or the provider is already
    /// running.
    fn start(&mut self, producer: SampleProducer) -> crate::Result<()>;

    /// Stop delivering events. The last published state persists.
    fn stop(&mut self);

    /// Whether the provider is currently delivering.
    fn is_running(&self) -> bool;
}

/// How a replayed track is paced onto the buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplayPacing {
    /// Sleep the recorded inter-sample gaps, scaled by `rate`
    /// (2.0 = twice as fast as recorded).
    Recorded { rate: f64 },
    /// Push everything as fast as the buffer accepts it.
    Fast,
}

/// Feeds a recorded sample stream through the buffer on a worker thread.
///
/// Simulates the full provider lifecycle, including an optional
/// authorization revocation partway through the stream, which makes it
/// the test double for the fail-safe path as well as the engine behind
/// the `replay` command.
pub struct ReplayProvider {
    samples: Arc<Vec<LocationSample>>,
    pacing: ReplayPacing,
    distance_filter_m: f64,
    revoke_after: Option<usize>,
    status: AuthorizationStatus,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ReplayProvider {
    /// Create a provider over a recorded sample stream, paced as
    /// recorded, authorization not yet determined.
    pub fn new(samples: Vec<LocationSample>) -> Self {
        Self {
            samples: Arc::new(samples),
            pacing: ReplayPacing::Recorded { rate: 1.0 },
            distance_filter_m: 0.0,
            revoke_after: None,
            status: AuthorizationStatus::NotDetermined,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Set the pacing mode.
    pub fn with_pacing(mut self, pacing: ReplayPacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Suppress fixes closer than `meters` to the last emitted fix
    /// (0.0 disables the filter).
    pub fn with_distance_filter(mut self, meters: f64) -> Self {
        self.distance_filter_m = meters;
        self
    }

    /// Inject an authorization revocation after `n` emitted samples and
    /// stop the stream there.
    pub fn with_revocation_after(mut self, n: usize) -> Self {
        self.revoke_after = Some(n);
        self
    }

    /// Start from an explicit authorization state.
    pub fn with_status(mut self, status: AuthorizationStatus) -> Self {
        self.status = status;
        self
    }

    /// Number of samples in the backing stream.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the backing stream is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl LocationProvider for ReplayProvider {
    fn request_authorization(&mut self) {
        if !self.status.is_determined() {
            debug!("authorization requested, granting");
            self.status = AuthorizationStatus::Authorized;
        }
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        self.status
    }

    fn start(&mut self, mut producer: SampleProducer) -> crate::Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(crate::Error::Provider("provider already running".into()));
        }
        if !self.status.is_authorized() {
            self.running.store(false, Ordering::SeqCst);
            return Err(crate::Error::Provider(
                "location access not authorized".into(),
            ));
        }

        let samples = Arc::clone(&self.samples);
        let running = Arc::clone(&self.running);
        let pacing = self.pacing;
        let filter = self.distance_filter_m;
        let revoke_after = self.revoke_after;

        let handle = thread::Builder::new()
            .name("replay-provider".into())
            .spawn(move || {
                let mut last_emitted: Option<GeoPoint> = None;
                let mut prev_ts: Option<Timestamp> = None;
                let mut emitted = 0usize;

                for sample in samples.iter() {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }

                    if revoke_after == Some(emitted) {
                        info!("authorization revoked mid-stream");
                        producer.push(ProviderEvent::AuthorizationChanged(
                            AuthorizationStatus::Denied,
                        ));
                        break;
                    }

                    if let ReplayPacing::Recorded { rate } = pacing {
                        if let Some(prev) = prev_ts {
                            let gap = sample.timestamp.elapsed_since(prev);
                            if !gap.is_zero() && rate > 0.0 {
                                thread::sleep(gap.div_f64(rate));
                            }
                        }
                    }
                    prev_ts = Some(sample.timestamp);

                    if filter > 0.0 {
                        if let Some(last) = &last_emitted {
                            if sample.position.distance_m(last) < filter {
                                trace!("fix within distance filter, skipping");
                                continue;
                            }
                        }
                    }
                    last_emitted = Some(sample.position);

                    if producer.push(ProviderEvent::Sample(*sample)) {
                        emitted += 1;
                    } else {
                        trace!("sample buffer full, dropping fix");
                    }
                }

                running.store(false, Ordering::SeqCst);
                debug!(emitted, "replay stream finished");
            })
            .map_err(|e| crate::Error::Provider(format!("failed to spawn replay thread: {}", e)))?;

        self.handle = Some(handle);
        info!(samples = self.samples.len(), "replay provider started");
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for ReplayProvider {
    fn drop(&mut self) {
        self.stop();
    }
}
