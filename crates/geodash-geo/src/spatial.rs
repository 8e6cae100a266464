use crate::models::{BoundsExt, ViewportBounds};
use geodash_core::models::PointRef;

/// First `limit` points inside `bounds`, in input order.
///
/// Points without a valid position are never visible.
pub fn visible_points(points: &[PointRef], bounds: &ViewportBounds, limit: usize) -> Vec<PointRef> {
    points
        .iter()
        .filter(|p| p.position.is_some_and(|pos| bounds.contains_position(pos)))
        .take(limit)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodash_core::models::{CustomerPoint, LngLat};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn point(name: &str, lng: f64, lat: f64) -> PointRef {
        Arc::new(CustomerPoint::new(name, LngLat::new(lng, lat).unwrap()))
    }

    fn bounds() -> ViewportBounds {
        ViewportBounds::new(LngLat::new(120.0, 27.0).unwrap(), LngLat::new(121.0, 28.0).unwrap())
    }

    #[test]
    fn test_visible_points_first_n_in_order() {
        let points = vec![
            point("a", 120.1, 27.1),
            point("outside", 100.0, 10.0),
            point("b", 120.2, 27.2),
            point("c", 120.3, 27.3),
        ];

        let visible = visible_points(&points, &bounds(), 2);
        let names: Vec<_> = visible.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_unlocatable_points_never_visible() {
        let mut unlocatable = CustomerPoint::new("x", LngLat::new(120.5, 27.5).unwrap());
        unlocatable.position = None;
        let points = vec![Arc::new(unlocatable)];

        assert!(visible_points(&points, &bounds(), 10).is_empty());
    }

    proptest! {
        #[test]
        fn visible_never_exceeds_limit(
            coords in prop::collection::vec((119.0f64..122.0, 26.0f64..29.0), 0..50),
            limit in 0usize..20,
        ) {
            let points: Vec<PointRef> = coords
                .iter()
                .enumerate()
                .map(|(i, (lng, lat))| point(&i.to_string(), *lng, *lat))
                .collect();

            let visible = visible_points(&points, &bounds(), limit);
            prop_assert!(visible.len() <= limit);
            for p in &visible {
                prop_assert!(bounds().contains_position(p.position.unwrap()));
            }
        }
    }
}
