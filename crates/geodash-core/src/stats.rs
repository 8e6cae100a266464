//! Aggregate statistics over the filtered view.

use crate::models::{CustomerType, DeliveryType, PointRef};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Tally {
    pub count: usize,
    pub demand: f64,
}

impl Tally {
    fn add(&mut self, demand: f64) {
        self.count += 1;
        self.demand += demand;
    }
}

/// Totals plus per-category breakdowns. Known categories are always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub total: Tally,
    pub by_customer_type: BTreeMap<CustomerType, Tally>,
    pub by_delivery_type: BTreeMap<DeliveryType, Tally>,
}

impl DatasetStats {
    pub fn customer(&self, customer_type: &CustomerType) -> Tally {
        self.by_customer_type.get(customer_type).copied().unwrap_or_default()
    }

    pub fn delivery(&self, delivery_type: &DeliveryType) -> Tally {
        self.by_delivery_type.get(delivery_type).copied().unwrap_or_default()
    }

    /// Sum over the known customer types only
    pub fn known_customer_total(&self) -> Tally {
        CustomerType::KNOWN.iter().fold(Tally::default(), |mut acc, t| {
            let tally = self.customer(t);
            acc.count += tally.count;
            acc.demand += tally.demand;
            acc
        })
    }
}

pub fn compute_stats(points: &[PointRef]) -> DatasetStats {
    let mut stats = DatasetStats {
        total: Tally::default(),
        by_customer_type: CustomerType::KNOWN
            .iter()
            .map(|t| (t.clone(), Tally::default()))
            .collect(),
        by_delivery_type: DeliveryType::KNOWN
            .iter()
            .map(|t| (t.clone(), Tally::default()))
            .collect(),
    };

    for point in points {
        stats.total.add(point.demand);
        // Unrecognized categories count toward the total only
        if let Some(tally) = stats.by_customer_type.get_mut(&point.customer_type) {
            tally.add(point.demand);
        }
        if let Some(tally) = stats.by_delivery_type.get_mut(&point.delivery_type) {
            tally.add(point.demand);
        }
    }

    stats
}

/// `"<count> customers, <demand in 10k t> × 10k t"`
pub fn format_tonnage(tally: Tally) -> String {
    format!("{} customers, {:.2} × 10k t", tally.count, tally.demand / 10_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomerPoint, LngLat};
    use std::sync::Arc;

    fn point(demand: f64, ct: CustomerType, dt: DeliveryType) -> PointRef {
        Arc::new(
            CustomerPoint::new("p", LngLat::new(120.0, 28.0).unwrap())
                .with_demand(demand)
                .with_types(ct, dt),
        )
    }

    #[test]
    fn test_breakdowns() {
        let points = vec![
            point(100.0, CustomerType::Existing, DeliveryType::Delivery),
            point(50.0, CustomerType::Existing, DeliveryType::Pickup),
            point(25.0, CustomerType::Other("vip".into()), DeliveryType::Pickup),
        ];
        let stats = compute_stats(&points);

        assert_eq!(stats.total, Tally { count: 3, demand: 175.0 });
        assert_eq!(stats.customer(&CustomerType::Existing), Tally { count: 2, demand: 150.0 });
        assert_eq!(stats.customer(&CustomerType::Churned), Tally::default());
        assert_eq!(stats.delivery(&DeliveryType::Pickup), Tally { count: 2, demand: 75.0 });
        assert_eq!(stats.known_customer_total().count, 2);
        assert!(!stats.by_customer_type.contains_key(&CustomerType::Other("vip".into())));
    }

    #[test]
    fn test_format_tonnage() {
        assert_eq!(
            format_tonnage(Tally { count: 12, demand: 34_567.0 }),
            "12 customers, 3.46 × 10k t"
        );
    }
}
