//! Motion Monitor
//!
//! Routes provider events through the classifier and publishes the
//! resulting state to the observable signal. This is the consumer side
//! of the sample buffer: samples are classified, failures and
//! authorization downgrades force the stationary fail-safe, and every
//! transition is recorded for reporting.

use crate::classify::motion::{MotionClassifier, MotionClassifierConfig, MotionState};
use crate::classify::signal::MotionSignal;
use crate::ingest::ring_buffer::SampleConsumer;
use crate::ingest::types::ProviderEvent;
use crate::time::Timestamp;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Aggregate results of a monitoring run.
#[derive(Debug, Clone, Copy)]
pub struct MonitorSummary {
    /// Samples classified.
    pub samples_processed: u64,
    /// Provider failures observed.
    pub failures: u64,
    /// State transitions published.
    pub transitions: usize,
    /// Total time spent in the `Moving` state, by sample timestamps.
    pub moving_time: Duration,
    /// State at the end of the run.
    pub final_state: MotionState,
}

/// Consumer-side driver: classifier + signal + bookkeeping.
pub struct MotionMonitor {
    classifier: MotionClassifier,
    signal: Arc<MotionSignal>,
    transitions: Vec<(Timestamp, MotionState)>,
    samples_processed: u64,
    failures: u64,
    moving_since: Option<Timestamp>,
    moving_total: Duration,
    last_timestamp: Option<Timestamp>,
}

impl MotionMonitor {
    /// Create a monitor with the given classifier tunables.
    pub fn new(config: MotionClassifierConfig) -> Self {
        Self {
            classifier: MotionClassifier::with_config(config),
            signal: Arc::new(MotionSignal::new()),
            transitions: Vec::new(),
            samples_processed: 0,
            failures: 0,
            moving_since: None,
            moving_total: Duration::ZERO,
            last_timestamp: None,
        }
    }

    /// The observable signal consumers subscribe to.
    pub fn signal(&self) -> Arc<MotionSignal> {
        Arc::clone(&self.signal)
    }

    /// Current motion state.
    pub fn state(&self) -> MotionState {
        self.classifier.state()
    }

    /// Recorded transitions, in order.
    pub fn transitions(&self) -> &[(Timestamp, MotionState)] {
        &self.transitions
    }

    /// Handle one provider event.
    pub fn handle_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::Sample(sample) => {
                self.last_timestamp = Some(sample.timestamp);
                let update = self.classifier.process(&sample);
                self.samples_processed += 1;
                if update.transition {
                    self.record_transition(sample.timestamp, update.state);
                }
            }
            ProviderEvent::Failure(message) => {
                self.failures += 1;
                warn!(%message, "provider failure, assuming stationary");
                self.fail_safe();
            }
            ProviderEvent::AuthorizationChanged(status) => {
                if status.is_authorized() {
                    debug!("location access authorized");
                } else {
                    info!(?status, "authorization downgraded, assuming stationary");
                    self.fail_safe();
                }
            }
        }
    }

    /// Drain all currently buffered events through the classifier.
    ///
    /// Returns the number of events processed.
    pub fn drain(&mut self, consumer: &mut SampleConsumer) -> usize {
        let mut processed = 0;
        loop {
            let batch = consumer.pop_batch(64);
            if batch.is_empty() {
                break;
            }
            for slot in batch {
                self.handle_event(slot.event);
                processed += 1;
            }
        }
        processed
    }

    /// Summary of the run so far.
    pub fn summary(&self) -> MonitorSummary {
        // Include the still-open moving interval, if any.
        let open = match (self.moving_since, self.last_timestamp) {
            (Some(since), Some(last)) => last.elapsed_since(since),
            _ => Duration::ZERO,
        };

        MonitorSummary {
            samples_processed: self.samples_processed,
            failures: self.failures,
            transitions: self.transitions.len(),
            moving_time: self.moving_total + open,
            final_state: self.classifier.state(),
        }
    }

    fn fail_safe(&mut self) {
        if self.classifier.force_stationary() {
            let at = self.last_timestamp.unwrap_or_default();
            self.record_transition(at, MotionState::Stationary);
        }
    }

    fn record_transition(&mut self, at: Timestamp, state: MotionState) {
        info!(?state, at_ms = at.as_millis(), "motion transition");
        self.transitions.push((at, state));
        self.signal.publish(state);

        match state {
            MotionState::Moving => {
                self.moving_since = Some(at);
            }
            MotionState::Stationary => {
                if let Some(since) = self.moving_since.take() {
                    self.moving_total += at.elapsed_since(since);
                }
            }
        }
    }
}
