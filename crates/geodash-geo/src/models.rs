//! Conversions between dashboard positions and `geo` types.

use geo::{Coord, Point, Rect};

pub use geodash_core::models::{LngLat, ViewportBounds};

/// Extension trait for positions
pub trait LngLatExt {
    /// Convert to a `geo::Point` with `x = lng`, `y = lat`
    fn to_point(&self) -> Point;
}

impl LngLatExt for LngLat {
    fn to_point(&self) -> Point {
        Point::new(self.lng(), self.lat())
    }
}

/// Extension trait for viewport bounds
pub trait BoundsExt {
    /// The bounds as one rectangle, or two when crossing the antimeridian
    fn to_rects(&self) -> Vec<Rect>;

    /// Inclusive containment; edges count as inside
    fn contains_position(&self, position: LngLat) -> bool;
}

impl BoundsExt for ViewportBounds {
    fn to_rects(&self) -> Vec<Rect> {
        let sw = self.south_west;
        let ne = self.north_east;
        let rect = |west: f64, east: f64| {
            Rect::new(Coord { x: west, y: sw.lat() }, Coord { x: east, y: ne.lat() })
        };

        if self.crosses_antimeridian() {
            vec![rect(sw.lng(), 180.0), rect(-180.0, ne.lng())]
        } else {
            vec![rect(sw.lng(), ne.lng())]
        }
    }

    fn contains_position(&self, position: LngLat) -> bool {
        use geo::algorithm::intersects::Intersects;

        let point = position.to_point();
        self.to_rects().iter().any(|rect| rect.intersects(&point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(lng: f64, lat: f64) -> LngLat {
        LngLat::new(lng, lat).unwrap()
    }

    #[test]
    fn test_contains_is_inclusive() {
        let bounds = ViewportBounds::new(pos(120.0, 27.0), pos(121.0, 28.0));
        assert!(bounds.contains_position(pos(120.5, 27.5)));
        assert!(bounds.contains_position(pos(120.0, 27.0)));
        assert!(bounds.contains_position(pos(121.0, 28.0)));
        assert!(!bounds.contains_position(pos(121.01, 27.5)));
        assert!(!bounds.contains_position(pos(120.5, 26.99)));
    }

    #[test]
    fn test_antimeridian_bounds() {
        let bounds = ViewportBounds::new(pos(179.0, -1.0), pos(-179.0, 1.0));
        assert_eq!(bounds.to_rects().len(), 2);
        assert!(bounds.contains_position(pos(179.5, 0.0)));
        assert!(bounds.contains_position(pos(-179.5, 0.0)));
        assert!(!bounds.contains_position(pos(0.0, 0.0)));
    }
}
