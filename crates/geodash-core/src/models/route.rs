//! Route planning requests and results.

use crate::models::location::LngLat;
use serde::{Deserialize, Serialize};

/// Request handed to the routing service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteQuery {
    pub origin: LngLat,
    pub destination: LngLat,
    /// Ordered via points between origin and destination
    pub waypoints: Vec<LngLat>,
}

/// One candidate route returned by the service
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    pub distance_m: f64,
    pub duration_s: f64,
}

impl RouteCandidate {
    /// Human readable summary, e.g. `12.3 km · 25 min`
    pub fn summary(&self) -> String {
        let distance = if self.distance_m >= 1000.0 {
            format!("{:.1} km", self.distance_m / 1000.0)
        } else {
            format!("{:.0} m", self.distance_m)
        };

        let minutes = (self.duration_s / 60.0).round() as u64;
        let duration = if minutes >= 60 {
            format!("{} h {} min", minutes / 60, minutes % 60)
        } else {
            format!("{} min", minutes.max(1))
        };

        format!("{distance} · {duration}")
    }
}

/// Service answer; an empty `routes` list means the service had no data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub routes: Vec<RouteCandidate>,
}

/// Where the route origin came from, in fallback order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginSource {
    Geolocation,
    CachedGeolocation,
    MapCenter,
    PreviewMapCenter,
    DefaultCenter,
}

/// What the route panel shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RouteStatus {
    Planning,
    Summary {
        route: RouteCandidate,
        origin_source: OriginSource,
    },
    NoRoute,
    Failed(String),
    MissingDestination,
}

impl RouteStatus {
    pub fn text(&self) -> String {
        match self {
            RouteStatus::Planning => "Planning route…".to_string(),
            RouteStatus::Summary { route, .. } => route.summary(),
            RouteStatus::NoRoute => "No route found".to_string(),
            RouteStatus::Failed(reason) => format!("Route planning failed: {reason}"),
            RouteStatus::MissingDestination => "Add a destination to plan a route".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_formats() {
        let short = RouteCandidate { distance_m: 850.0, duration_s: 20.0 };
        assert_eq!(short.summary(), "850 m · 1 min");

        let long = RouteCandidate { distance_m: 12_345.0, duration_s: 4_500.0 };
        assert_eq!(long.summary(), "12.3 km · 1 h 15 min");
    }
}
