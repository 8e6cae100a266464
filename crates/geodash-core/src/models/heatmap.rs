//! Density layer input.

use crate::models::customer::PointRef;
use crate::models::location::LngLat;
use serde::Serialize;

/// One weighted sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatPoint {
    pub position: LngLat,
    /// Customer demand used as the sample weight
    pub count: f64,
}

/// Dataset handed to the heatmap layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapData {
    pub points: Vec<HeatPoint>,
    /// Weight rendered at full intensity
    pub max: f64,
}

impl HeatmapData {
    /// Samples for every locatable point, in input order
    pub fn from_points(points: &[PointRef], max: f64) -> Self {
        let points = points
            .iter()
            .filter_map(|p| p.position.map(|position| HeatPoint { position, count: p.demand }))
            .collect();
        Self { points, max }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CustomerPoint;
    use std::sync::Arc;

    #[test]
    fn test_unlocatable_points_skipped() {
        let located = CustomerPoint::new("a", LngLat::new(120.0, 28.0).unwrap()).with_demand(40.0);
        let mut lost = located.clone();
        lost.position = None;

        let data = HeatmapData::from_points(&[Arc::new(located), Arc::new(lost)], 100.0);

        assert_eq!(data.len(), 1);
        assert_eq!(data.points[0].count, 40.0);
        assert_eq!(data.max, 100.0);
    }
}
