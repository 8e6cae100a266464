//! Pure dataset filtering.

use crate::models::{CustomerPoint, FilterCriteria, PointRef};

/// Whether a single point satisfies every criterion
pub fn matches(point: &CustomerPoint, criteria: &FilterCriteria) -> bool {
    if !point.is_locatable() {
        return false;
    }

    if let Some(scope) = &criteria.dep_scope {
        if !point.dep.contains(scope.as_str()) {
            return false;
        }
    }

    criteria.demand_in_range(point.demand)
        && criteria.customer_types.accepts(&point.customer_type)
        && criteria.delivery_types.accepts(&point.delivery_type)
}

/// Stable filter: the result keeps the input order
pub fn apply_filters(points: &[PointRef], criteria: &FilterCriteria) -> Vec<PointRef> {
    points.iter().filter(|p| matches(p, criteria)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomerType, DeliveryType, LngLat, TypeSelection};
    use std::sync::Arc;

    fn point(name: &str, dep: &str, demand: f64, ct: CustomerType, dt: DeliveryType) -> PointRef {
        Arc::new(
            CustomerPoint::new(name, LngLat::new(120.6, 28.0).unwrap())
                .with_dep(dep)
                .with_demand(demand)
                .with_types(ct, dt),
        )
    }

    fn dataset() -> Vec<PointRef> {
        vec![
            point("a", "Ruian branch", 10.0, CustomerType::Existing, DeliveryType::Delivery),
            point("b", "Yueqing branch", 50.0, CustomerType::Churned, DeliveryType::Pickup),
            point("c", "Ruian branch", 500.0, CustomerType::Potential, DeliveryType::Pickup),
        ]
    }

    fn names(points: &[PointRef]) -> Vec<&str> {
        points.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_default_criteria_keeps_everything() {
        assert_eq!(names(&apply_filters(&dataset(), &FilterCriteria::default())), ["a", "b", "c"]);
    }

    #[test]
    fn test_department_substring() {
        let criteria = FilterCriteria::for_scope(Some("Ruian".to_string()));
        assert_eq!(names(&apply_filters(&dataset(), &criteria)), ["a", "c"]);
    }

    #[test]
    fn test_demand_range() {
        let criteria = FilterCriteria::default().with_demand_range(10.0, Some(50.0));
        assert_eq!(names(&apply_filters(&dataset(), &criteria)), ["a", "b"]);
    }

    #[test]
    fn test_type_sets() {
        let criteria = FilterCriteria {
            customer_types: TypeSelection::only([CustomerType::Churned, CustomerType::Potential]),
            delivery_types: TypeSelection::only([DeliveryType::Pickup]),
            ..FilterCriteria::default()
        };
        assert_eq!(names(&apply_filters(&dataset(), &criteria)), ["b", "c"]);
    }

    #[test]
    fn test_unlocatable_points_excluded() {
        let mut raw = CustomerPoint::new("ghost", LngLat::new(0.0, 0.0).unwrap());
        raw.position = None;
        let points = vec![Arc::new(raw)];
        assert!(apply_filters(&points, &FilterCriteria::default()).is_empty());
    }
}
