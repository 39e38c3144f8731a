//! Core types for location ingestion
//!
//! Defines the sample model shared by providers, the buffer, and the
//! classifier.

use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Mean earth radius in meters, for haversine distance.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic position with reported horizontal accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, positive north.
    pub latitude_deg: f64,
    /// Longitude in degrees, positive east.
    pub longitude_deg: f64,
    /// Horizontal accuracy radius in meters, as reported by the provider.
    pub horizontal_accuracy_m: f64,
}

impl GeoPoint {
    /// Create a point with the given accuracy.
    pub fn new(latitude_deg: f64, longitude_deg: f64, horizontal_accuracy_m: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            horizontal_accuracy_m,
        }
    }

    /// Great-circle distance to another point in meters (haversine,
    /// spherical earth). Accurate to well under the accuracy radius of
    /// any consumer-grade receiver over the distances involved here.
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude_deg.to_radians();
        let lat2 = other.latitude_deg.to_radians();
        let dlat = (other.latitude_deg - self.latitude_deg).to_radians();
        let dlon = (other.longitude_deg - self.longitude_deg).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// One location reading: position, monotonic timestamp, optional speed.
///
/// Follows the platform convention that a negative `speed_mps` means the
/// receiver could not produce a speed estimate for this fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Position of the fix.
    pub position: GeoPoint,
    /// Monotonic timestamp of the fix.
    pub timestamp: Timestamp,
    /// Reported ground speed in m/s; negative when unavailable.
    pub speed_mps: f64,
}

impl LocationSample {
    /// Create a sample with a speed reading.
    pub fn new(position: GeoPoint, timestamp: Timestamp, speed_mps: f64) -> Self {
        Self {
            position,
            timestamp,
            speed_mps,
        }
    }

    /// Create a sample with no usable speed reading.
    pub fn without_speed(position: GeoPoint, timestamp: Timestamp) -> Self {
        Self {
            position,
            timestamp,
            speed_mps: -1.0,
        }
    }

    /// The speed reading, if the receiver produced a valid one.
    pub fn speed(&self) -> Option<f64> {
        if self.speed_mps >= 0.0 {
            Some(self.speed_mps)
        } else {
            None
        }
    }
}

/// Authorization state of the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    NotDetermined,
    /// Access blocked by policy (parental controls, MDM, etc.).
    Restricted,
    /// The user explicitly declined.
    Denied,
    /// Location access granted.
    Authorized,
}

impl AuthorizationStatus {
    /// Whether the provider may deliver samples in this state.
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthorizationStatus::Authorized)
    }

    /// Whether the user has already answered the authorization prompt.
    pub fn is_determined(&self) -> bool {
        !matches!(self, AuthorizationStatus::NotDetermined)
    }
}

/// Events delivered by a location provider, in arrival order.
///
/// Control events travel through the same buffer as samples so that an
/// authorization downgrade is observed at the right point in the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProviderEvent {
    /// A new location fix.
    Sample(LocationSample),
    /// The authorization state changed.
    AuthorizationChanged(AuthorizationStatus),
    /// The provider failed to produce fixes.
    Failure(String),
}

impl ProviderEvent {
    /// The contained sample, if this is a sample event.
    pub fn as_sample(&self) -> Option<&LocationSample> {
        match self {
            ProviderEvent::Sample(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon, 5.0)
    }

    #[test]
    fn test_distance_same_point_is_zero() {
        let p = point(48.8584, 2.2945);
        assert!(p.distance_m(&p) < 1e-6);
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        // One degree of latitude is ~111.2 km on a spherical earth.
        let a = point(0.0, 0.0);
        let b = point(1.0, 0.0);
        let d = a.distance_m(&b);
        assert!((d - 111_195.0).abs() < 100.0, "got {}", d);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = point(59.3293, 18.0686);
        let b = point(59.3294, 18.0690);
        assert!((a.distance_m(&b) - b.distance_m(&a)).abs() < 1e-9);
    }

    #[test]
    fn test_distance_small_step() {
        // ~0.00003 degrees latitude is roughly 3.3 m.
        let a = point(59.32930, 18.0686);
        let b = point(59.32933, 18.0686);
        let d = a.distance_m(&b);
        assert!(d > 3.0 && d < 3.7, "got {}", d);
    }

    #[test]
    fn test_speed_validity() {
        let ts = Timestamp::from_millis(0);
        let with = LocationSample::new(point(0.0, 0.0), ts, 1.25);
        let without = LocationSample::without_speed(point(0.0, 0.0), ts);

        assert_eq!(with.speed(), Some(1.25));
        assert_eq!(without.speed(), None);
        assert_eq!(LocationSample::new(point(0.0, 0.0), ts, -0.5).speed(), None);
    }

    #[test]
    fn test_zero_speed_is_valid() {
        let s = LocationSample::new(point(0.0, 0.0), Timestamp::from_millis(0), 0.0);
        assert_eq!(s.speed(), Some(0.0));
    }

    #[test]
    fn test_authorization_predicates() {
        assert!(AuthorizationStatus::Authorized.is_authorized());
        assert!(!AuthorizationStatus::Denied.is_authorized());
        assert!(!AuthorizationStatus::Restricted.is_authorized());
        assert!(!AuthorizationStatus::NotDetermined.is_authorized());

        assert!(!AuthorizationStatus::NotDetermined.is_determined());
        assert!(AuthorizationStatus::Denied.is_determined());
    }

    #[test]
    fn test_sample_serialization_roundtrip() {
        let s = LocationSample::new(point(48.8584, 2.2945), Timestamp::from_millis(1_500), 0.9);
        let json = serde_json::to_string(&s).unwrap();
        let back: LocationSample = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }

    #[test]
    fn test_provider_event_as_sample() {
        let s = LocationSample::without_speed(point(0.0, 0.0), Timestamp::from_millis(0));
        assert!(ProviderEvent::Sample(s).as_sample().is_some());
        assert!(ProviderEvent::Failure("gps lost".into()).as_sample().is_none());
        assert!(
            ProviderEvent::AuthorizationChanged(AuthorizationStatus::Denied)
                .as_sample()
                .is_none()
        );
    }
}
