//! Moving/Stationary Classification
//!
//! Smooths noisy location fixes into a debounced boolean motion state.
//! Movement is detected from the reported speed when the receiver
//! provides one, falling back to the position delta against the previous
//! fix. Once movement is detected, the classifier keeps reporting
//! `Moving` for a decay window after the last detection so that brief
//! pauses (a red light, a GPS hiccup) do not flicker the state.

use crate::ingest::types::{GeoPoint, LocationSample};
use crate::time::Timestamp;
use std::time::Duration;

/// Tunables for motion detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionClassifierConfig {
    /// Speed above which a valid speed reading alone indicates movement
    /// (m/s). 0.7 m/s is roughly a slow walk.
    pub speed_threshold_mps: f64,
    /// Position delta between consecutive fixes above which movement is
    /// inferred when speed is unavailable or below threshold (meters).
    pub distance_threshold_m: f64,
    /// How long to keep reporting `Moving` after the last detected
    /// movement.
    pub decay: Duration,
}

impl Default for MotionClassifierConfig {
    fn default() -> Self {
        Self {
            speed_threshold_mps: 0.7,
            distance_threshold_m: 3.0,
            decay: Duration::from_secs(3),
        }
    }
}

/// The two observable motion states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionState {
    /// Movement detected within the decay window.
    Moving,
    /// No movement detected for at least the decay window.
    Stationary,
}

impl MotionState {
    /// Whether this state reports movement.
    pub fn is_moving(&self) -> bool {
        matches!(self, MotionState::Moving)
    }
}

impl std::fmt::Display for MotionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MotionState::Moving => write!(f, "moving"),
            MotionState::Stationary => write!(f, "stationary"),
        }
    }
}

/// Outcome of classifying one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionUpdate {
    /// State after processing the sample.
    pub state: MotionState,
    /// Whether the state changed with this sample.
    pub transition: bool,
    /// Whether this sample itself was judged as movement (before decay).
    pub movement_detected: bool,
}

/// Debounced motion state machine.
///
/// Owns its state exclusively; callers feed samples in arrival order and
/// read the resulting state. Decay is evaluated against sample
/// timestamps, so a replayed track classifies identically to the live
/// run it was recorded from.
#[derive(Debug)]
pub struct MotionClassifier {
    config: MotionClassifierConfig,
    last_position: Option<GeoPoint>,
    last_moving_at: Option<Timestamp>,
    state: MotionState,
}

impl MotionClassifier {
    /// Create a classifier with default tunables.
    pub fn new() -> Self {
        Self::with_config(MotionClassifierConfig::default())
    }

    /// Create a classifier with explicit tunables.
    pub fn with_config(config: MotionClassifierConfig) -> Self {
        Self {
            config,
            last_position: None,
            last_moving_at: None,
            state: MotionState::Stationary,
        }
    }

    /// Classify one incoming sample.
    pub fn process(&mut self, sample: &LocationSample) -> MotionUpdate {
        let mut detected = false;

        // Speed reading wins when the receiver provides a valid one.
        if let Some(speed) = sample.speed() {
            detected = speed > self.config.speed_threshold_mps;
        }

        // Fall back to the position delta against the previous fix.
        // Nothing to compare on the very first sample.
        if !detected {
            if let Some(last) = &self.last_position {
                detected = sample.position.distance_m(last) > self.config.distance_threshold_m;
            }
        }

        self.last_position = Some(sample.position);

        let transition = if detected {
            self.last_moving_at = Some(sample.timestamp);
            self.set_state(MotionState::Moving)
        } else if self.within_decay(sample.timestamp) {
            // Hold the current state to suppress flicker.
            false
        } else {
            self.set_state(MotionState::Stationary)
        };

        MotionUpdate {
            state: self.state,
            transition,
            movement_detected: detected,
        }
    }

    /// Force the stationary state immediately, bypassing the decay
    /// window. Used when the signal source fails or loses authorization.
    ///
    /// Returns true if the state actually changed.
    pub fn force_stationary(&mut self) -> bool {
        self.last_moving_at = None;
        self.set_state(MotionState::Stationary)
    }

    /// Reset to the initial state, forgetting all history.
    pub fn reset(&mut self) {
        self.last_position = None;
        self.last_moving_at = None;
        self.state = MotionState::Stationary;
    }

    /// Current state.
    pub fn state(&self) -> MotionState {
        self.state
    }

    /// Whether the current state is `Moving`.
    pub fn is_moving(&self) -> bool {
        self.state.is_moving()
    }

    /// The tunables in effect.
    pub fn config(&self) -> &MotionClassifierConfig {
        &self.config
    }

    fn within_decay(&self, now: Timestamp) -> bool {
        match self.last_moving_at {
            Some(at) => now.elapsed_since(at) < self.config.decay,
            None => false,
        }
    }

    fn set_state(&mut self, next: MotionState) -> bool {
        if self.state != next {
            self.state = next;
            true
        } else {
            false
        }
    }
}

impl Default for MotionClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: f64) -> Timestamp {
        Timestamp::from_millis((secs * 1_000.0) as u64)
    }

    fn here() -> GeoPoint {
        GeoPoint::new(59.3293, 18.0686, 5.0)
    }

    /// A point `meters` north of `here()` (1 deg latitude ~ 111.2 km).
    fn north_of_here(meters: f64) -> GeoPoint {
        GeoPoint::new(59.3293 + meters / 111_195.0, 18.0686, 5.0)
    }

    fn speed_sample(secs: f64, speed: f64) -> LocationSample {
        LocationSample::new(here(), at(secs), speed)
    }

    #[test]
    fn test_initial_state_is_stationary() {
        let classifier = MotionClassifier::new();
        assert_eq!(classifier.state(), MotionState::Stationary);
        assert!(!classifier.is_moving());
    }

    #[test]
    fn test_speed_above_threshold_moves_immediately() {
        let mut classifier = MotionClassifier::new();
        let update = classifier.process(&speed_sample(0.0, 1.0));

        assert_eq!(update.state, MotionState::Moving);
        assert!(update.transition);
        assert!(update.movement_detected);
    }

    #[test]
    fn test_speed_at_threshold_is_not_movement() {
        // Strictly greater-than: 0.7 exactly does not trip the threshold.
        let mut classifier = MotionClassifier::new();
        let update = classifier.process(&speed_sample(0.0, 0.7));
        assert_eq!(update.state, MotionState::Stationary);
        assert!(!update.movement_detected);
    }

    #[test]
    fn test_first_sample_without_speed_stays_stationary() {
        let mut classifier = MotionClassifier::new();
        let update =
            classifier.process(&LocationSample::without_speed(here(), at(0.0)));

        assert_eq!(update.state, MotionState::Stationary);
        assert!(!update.transition);
        assert!(!update.movement_detected);
    }

    #[test]
    fn test_distance_fallback_detects_movement() {
        let mut classifier = MotionClassifier::new();

        classifier.process(&LocationSample::without_speed(here(), at(0.0)));
        let update =
            classifier.process(&LocationSample::without_speed(north_of_here(5.0), at(1.0)));

        assert_eq!(update.state, MotionState::Moving);
        assert!(update.movement_detected);
    }

    #[test]
    fn test_distance_below_threshold_is_not_movement() {
        let mut classifier = MotionClassifier::new();

        classifier.process(&LocationSample::without_speed(here(), at(0.0)));
        let update =
            classifier.process(&LocationSample::without_speed(north_of_here(2.0), at(1.0)));

        assert_eq!(update.state, MotionState::Stationary);
        assert!(!update.movement_detected);
    }

    #[test]
    fn test_low_speed_does_not_suppress_distance_fallback() {
        // A valid but sub-threshold speed still allows the position delta
        // to indicate movement.
        let mut classifier = MotionClassifier::new();

        classifier.process(&LocationSample::new(here(), at(0.0), 0.1));
        let update =
            classifier.process(&LocationSample::new(north_of_here(10.0), at(1.0), 0.1));

        assert_eq!(update.state, MotionState::Moving);
    }

    #[test]
    fn test_decay_holds_moving_state() {
        let mut classifier = MotionClassifier::new();

        classifier.process(&speed_sample(0.0, 1.5));
        let update = classifier.process(&speed_sample(2.0, 0.0));

        assert_eq!(update.state, MotionState::Moving);
        assert!(!update.transition);
        assert!(!update.movement_detected);
    }

    #[test]
    fn test_decay_expiry_flips_to_stationary() {
        let mut classifier = MotionClassifier::new();

        classifier.process(&speed_sample(0.0, 1.5));
        let update = classifier.process(&speed_sample(3.0, 0.0));

        // Exactly the decay window has elapsed: no longer within decay.
        assert_eq!(update.state, MotionState::Stationary);
        assert!(update.transition);
    }

    #[test]
    fn test_movement_refreshes_decay_window() {
        let mut classifier = MotionClassifier::new();

        classifier.process(&speed_sample(0.0, 1.5));
        classifier.process(&speed_sample(2.5, 1.5));
        // 2.5s after the *second* detection: still within decay.
        let update = classifier.process(&speed_sample(5.0, 0.0));

        assert_eq!(update.state, MotionState::Moving);
    }

    #[test]
    fn test_walk_pause_timeline() {
        // t=0 first sample, speed 0      -> stationary
        // t=1 speed 1.0 > 0.7            -> moving
        // t=2 speed 0, 1s since movement -> still moving (decay)
        // t=6 speed 0, 5s since movement -> stationary
        let mut classifier = MotionClassifier::new();

        let u0 = classifier.process(&speed_sample(0.0, 0.0));
        assert_eq!(u0.state, MotionState::Stationary);

        let u1 = classifier.process(&speed_sample(1.0, 1.0));
        assert_eq!(u1.state, MotionState::Moving);
        assert!(u1.transition);

        let u2 = classifier.process(&speed_sample(2.0, 0.0));
        assert_eq!(u2.state, MotionState::Moving);
        assert!(!u2.transition);

        let u3 = classifier.process(&speed_sample(6.0, 0.0));
        assert_eq!(u3.state, MotionState::Stationary);
        assert!(u3.transition);
    }

    #[test]
    fn test_force_stationary_bypasses_decay() {
        let mut classifier = MotionClassifier::new();

        classifier.process(&speed_sample(0.0, 2.0));
        assert!(classifier.is_moving());

        assert!(classifier.force_stationary());
        assert_eq!(classifier.state(), MotionState::Stationary);

        // Next quiet sample must not resurrect the old decay window.
        let update = classifier.process(&speed_sample(0.5, 0.0));
        assert_eq!(update.state, MotionState::Stationary);
    }

    #[test]
    fn test_force_stationary_when_already_stationary() {
        let mut classifier = MotionClassifier::new();
        assert!(!classifier.force_stationary());
    }

    #[test]
    fn test_reset_forgets_last_position() {
        let mut classifier = MotionClassifier::new();

        classifier.process(&LocationSample::without_speed(here(), at(0.0)));
        classifier.reset();

        // After reset this is a "first" sample again: no previous
        // position, so a big jump is not movement.
        let update =
            classifier.process(&LocationSample::without_speed(north_of_here(100.0), at(1.0)));
        assert_eq!(update.state, MotionState::Stationary);
    }

    #[test]
    fn test_custom_config() {
        let config = MotionClassifierConfig {
            speed_threshold_mps: 2.0,
            distance_threshold_m: 50.0,
            decay: Duration::from_secs(10),
        };
        let mut classifier = MotionClassifier::with_config(config);

        // 1.0 m/s is below the raised threshold
        let update = classifier.process(&speed_sample(0.0, 1.0));
        assert_eq!(update.state, MotionState::Stationary);

        classifier.process(&speed_sample(1.0, 3.0));
        // 9s later: still within the 10s decay
        let update = classifier.process(&speed_sample(10.0, 0.0));
        assert_eq!(update.state, MotionState::Moving);
    }
}
