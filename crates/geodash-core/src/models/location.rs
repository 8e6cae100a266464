//! Validated positions and geolocation diagnostics.

use crate::error::{GeodashError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A WGS 84 position with `lng ∈ [-180, 180]` and `lat ∈ [-90, 90]`.
///
/// Only constructible through [`LngLat::new`], so holding one means the
/// coordinates are finite and in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LngLat {
    lng: f64,
    lat: f64,
}

impl LngLat {
    /// Fallback map center used when nothing better is known
    pub const DEFAULT_CENTER: LngLat = LngLat { lng: 120.65, lat: 28.01 };

    pub fn new(lng: f64, lat: f64) -> Result<Self> {
        if Self::is_valid(lng, lat) {
            // Collapse -0.0 so equal positions share one bit pattern
            Ok(Self { lng: lng + 0.0, lat: lat + 0.0 })
        } else {
            Err(GeodashError::InvalidCoordinates { lng, lat })
        }
    }

    /// Check a raw coordinate pair without constructing a position
    pub fn is_valid(lng: f64, lat: f64) -> bool {
        lng.is_finite()
            && lat.is_finite()
            && (-180.0..=180.0).contains(&lng)
            && (-90.0..=90.0).contains(&lat)
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }
}

impl fmt::Display for LngLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lng, self.lat)
    }
}

impl<'de> Deserialize<'de> for LngLat {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            lng: f64,
            lat: f64,
        }

        let raw = Raw::deserialize(deserializer)?;
        LngLat::new(raw.lng, raw.lat).map_err(serde::de::Error::custom)
    }
}

/// Which geolocation tier produced a fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocateMethod {
    /// Device or browser positioning
    Precise,
    /// Network / IP based city lookup
    Coarse,
}

/// Resolution state machine: `Idle → Locating → {Success, Error}`, and on
/// `Error` a second pass `FallbackLocating → {FallbackSuccess, FallbackError}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LocateStatus {
    #[default]
    Idle,
    Locating,
    Success,
    Error,
    FallbackLocating,
    FallbackSuccess,
    FallbackError,
}

/// Raw answer from a location provider, before validation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PositionFix {
    pub lng: f64,
    pub lat: f64,
    /// Accuracy radius in meters, when the provider reports one
    pub accuracy: Option<f64>,
    pub location_type: Option<String>,
    pub message: Option<String>,
}

impl PositionFix {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat, ..Self::default() }
    }
}

/// Observability record for geolocation. Never drives logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoDiagnostics {
    pub status: LocateStatus,
    pub method: Option<LocateMethod>,
    pub location_type: Option<String>,
    pub accuracy: Option<f64>,
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for GeoDiagnostics {
    fn default() -> Self {
        Self {
            status: LocateStatus::Idle,
            method: None,
            location_type: None,
            accuracy: None,
            message: None,
            updated_at: Utc::now(),
        }
    }
}

impl GeoDiagnostics {
    /// Diagnostics for a transition that has no fix attached
    pub fn transition(status: LocateStatus, method: LocateMethod, message: Option<String>) -> Self {
        Self {
            status,
            method: Some(method),
            location_type: None,
            accuracy: None,
            message,
            updated_at: Utc::now(),
        }
    }

    /// Diagnostics for a successful fix
    pub fn resolved(status: LocateStatus, method: LocateMethod, fix: &PositionFix) -> Self {
        Self {
            status,
            method: Some(method),
            location_type: fix.location_type.clone(),
            accuracy: fix.accuracy,
            message: fix.message.clone(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_position() {
        let p = LngLat::new(120.65, 28.01).unwrap();
        assert_eq!(p.lng(), 120.65);
        assert_eq!(p.lat(), 28.01);
        assert_eq!(p.to_string(), "120.65,28.01");
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(LngLat::new(181.0, 0.0).is_err());
        assert!(LngLat::new(0.0, -90.5).is_err());
        assert!(LngLat::new(f64::NAN, 0.0).is_err());
        assert!(LngLat::new(0.0, f64::INFINITY).is_err());
        assert!(LngLat::new(180.0, -90.0).is_ok());
    }

    #[test]
    fn test_negative_zero_normalized() {
        let a = LngLat::new(-0.0, 0.0).unwrap();
        let b = LngLat::new(0.0, 0.0).unwrap();
        assert_eq!(a.lng().to_bits(), b.lng().to_bits());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: LngLat = serde_json::from_str(r#"{"lng": 120.0, "lat": 28.0}"#).unwrap();
        assert_eq!(ok.lat(), 28.0);
        assert!(serde_json::from_str::<LngLat>(r#"{"lng": 220.0, "lat": 28.0}"#).is_err());
    }
}
