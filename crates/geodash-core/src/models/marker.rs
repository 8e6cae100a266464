use crate::models::customer::{CustomerPoint, CustomerType};
use crate::models::location::LngLat;
use serde::{Deserialize, Serialize};

/// Label styling hook, one per customer category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerStyle {
    Existing,
    Churned,
    Potential,
    Plain,
}

/// What a marker displays. Turning this into markup is the host's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerContent {
    pub label: String,
    pub style: MarkerStyle,
}

impl MarkerContent {
    pub fn for_point(point: &CustomerPoint) -> Self {
        let style = match point.customer_type {
            CustomerType::Existing => MarkerStyle::Existing,
            CustomerType::Churned => MarkerStyle::Churned,
            CustomerType::Potential => MarkerStyle::Potential,
            CustomerType::Other(_) => MarkerStyle::Plain,
        };
        Self { label: point.name.clone(), style }
    }
}

/// Construction parameters for a map marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerOptions {
    pub position: LngLat,
    pub content: MarkerContent,
    /// Pixel offset of the label anchor
    pub offset: (i32, i32),
    pub z_index: i32,
}

impl MarkerOptions {
    pub const LABEL_OFFSET: (i32, i32) = (0, -15);
    pub const LABEL_Z_INDEX: i32 = 100;

    pub fn label(position: LngLat, content: MarkerContent) -> Self {
        Self {
            position,
            content,
            offset: Self::LABEL_OFFSET,
            z_index: Self::LABEL_Z_INDEX,
        }
    }
}
