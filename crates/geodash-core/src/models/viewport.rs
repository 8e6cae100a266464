use crate::models::location::LngLat;
use serde::{Deserialize, Serialize};

/// Rectangular map viewport in WGS 84.
///
/// `south_west.lng > north_east.lng` denotes a viewport crossing the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub south_west: LngLat,
    pub north_east: LngLat,
}

impl ViewportBounds {
    pub fn new(south_west: LngLat, north_east: LngLat) -> Self {
        Self { south_west, north_east }
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.south_west.lng() > self.north_east.lng()
    }
}

/// What the map currently shows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub bounds: ViewportBounds,
    pub zoom: f64,
}
