//! Customer records and the normalization boundary.
//!
//! The dataset arrives as loosely typed JSON: any field may be missing and
//! numbers are sometimes encoded as strings. [`CustomerPoint::normalize`]
//! coerces a [`RawCustomer`] into a fully typed record once, so everything
//! downstream can trust the shape.

use crate::error::Result;
use crate::models::location::LngLat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Shared, immutable handle to a normalized customer
pub type PointRef = Arc<CustomerPoint>;

/// Customer relationship category
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CustomerType {
    Existing,
    Churned,
    Potential,
    /// Unrecognized label, only matched by the "all" selection
    Other(String),
}

impl CustomerType {
    pub const KNOWN: [CustomerType; 3] =
        [CustomerType::Existing, CustomerType::Churned, CustomerType::Potential];

    /// Parse an English or original dataset label
    pub fn parse(label: &str) -> Self {
        match label.trim() {
            "existing" | "Existing" | "存量客户" => CustomerType::Existing,
            "churned" | "Churned" | "流失客户" => CustomerType::Churned,
            "potential" | "Potential" | "潜在客户" => CustomerType::Potential,
            other => CustomerType::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CustomerType::Existing => "existing",
            CustomerType::Churned => "churned",
            CustomerType::Potential => "potential",
            CustomerType::Other(label) => label,
        }
    }
}

/// How goods reach the customer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeliveryType {
    Delivery,
    Pickup,
    Other(String),
}

impl DeliveryType {
    pub const KNOWN: [DeliveryType; 2] = [DeliveryType::Delivery, DeliveryType::Pickup];

    pub fn parse(label: &str) -> Self {
        match label.trim() {
            "delivery" | "Delivery" | "配送客户" => DeliveryType::Delivery,
            "pickup" | "Pickup" | "自提客户" => DeliveryType::Pickup,
            other => DeliveryType::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            DeliveryType::Delivery => "delivery",
            DeliveryType::Pickup => "pickup",
            DeliveryType::Other(label) => label,
        }
    }
}

/// A named contribution to the customer's demand profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub value: f64,
}

/// Normalized customer record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerPoint {
    pub name: String,
    pub dep: String,
    pub address: String,
    pub profile: String,
    pub customer_type: CustomerType,
    pub delivery_type: DeliveryType,
    /// `None` when the source coordinates were missing or out of range
    pub position: Option<LngLat>,
    pub demand: f64,
    pub factors: Vec<Factor>,
}

impl CustomerPoint {
    /// Minimal locatable customer, mostly useful for fixtures
    pub fn new(name: impl Into<String>, position: LngLat) -> Self {
        Self {
            name: name.into(),
            dep: String::new(),
            address: String::new(),
            profile: String::new(),
            customer_type: CustomerType::Existing,
            delivery_type: DeliveryType::Delivery,
            position: Some(position),
            demand: 0.0,
            factors: Vec::new(),
        }
    }

    pub fn with_dep(mut self, dep: impl Into<String>) -> Self {
        self.dep = dep.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_demand(mut self, demand: f64) -> Self {
        self.demand = demand;
        self
    }

    pub fn with_types(mut self, customer_type: CustomerType, delivery_type: DeliveryType) -> Self {
        self.customer_type = customer_type;
        self.delivery_type = delivery_type;
        self
    }

    /// Coerce a raw record. Never fails: malformed fields fall back to
    /// empty text, zero demand or an unlocatable position.
    pub fn normalize(raw: RawCustomer) -> Self {
        let lng = raw.lng.as_ref().and_then(to_number);
        let lat = raw.lat.as_ref().and_then(to_number);
        let position = match (lng, lat) {
            (Some(lng), Some(lat)) => LngLat::new(lng, lat).ok(),
            _ => None,
        };

        let demand = raw
            .count
            .as_ref()
            .and_then(to_number)
            .filter(|d| *d >= 0.0)
            .unwrap_or(0.0);

        let factors = raw
            .factors
            .unwrap_or_default()
            .into_iter()
            .map(|f| Factor {
                name: to_text(f.name.as_ref()),
                value: f.value.as_ref().and_then(to_number).unwrap_or(0.0),
            })
            .collect();

        Self {
            name: to_text(raw.name.as_ref()),
            dep: to_text(raw.dep.as_ref()),
            address: to_text(raw.address.as_ref()),
            profile: to_text(raw.profile.as_ref()),
            customer_type: CustomerType::parse(&to_text(raw.customer_type.as_ref())),
            delivery_type: DeliveryType::parse(&to_text(raw.delivery_type.as_ref())),
            position,
            demand,
            factors,
        }
    }

    /// Whether the point takes part in spatial operations
    pub fn is_locatable(&self) -> bool {
        self.position.is_some()
    }
}

/// Dataset record as supplied by the host page
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCustomer {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub dep: Option<Value>,
    #[serde(default, alias = "add")]
    pub address: Option<Value>,
    #[serde(default)]
    pub profile: Option<Value>,
    #[serde(default)]
    pub customer_type: Option<Value>,
    #[serde(default)]
    pub delivery_type: Option<Value>,
    #[serde(default)]
    pub lng: Option<Value>,
    #[serde(default)]
    pub lat: Option<Value>,
    #[serde(default, alias = "demand")]
    pub count: Option<Value>,
    #[serde(default)]
    pub factors: Option<Vec<RawFactor>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFactor {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub value: Option<Value>,
}

/// Normalize a whole snapshot, preserving input order
pub fn normalize_dataset(records: Vec<RawCustomer>) -> Vec<PointRef> {
    let points: Vec<PointRef> =
        records.into_iter().map(|r| Arc::new(CustomerPoint::normalize(r))).collect();

    let unlocatable = points.iter().filter(|p| !p.is_locatable()).count();
    if unlocatable > 0 {
        tracing::warn!(
            unlocatable,
            total = points.len(),
            "Dataset contains records without valid coordinates; they are excluded from the map"
        );
    }

    points
}

/// Parse and normalize a JSON dataset snapshot.
///
/// A document that is valid JSON but not an array yields an empty dataset.
pub fn parse_dataset(json: &str) -> Result<Vec<PointRef>> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(items) = value else {
        tracing::warn!("Dataset is not a JSON array; treating it as empty");
        return Ok(Vec::new());
    };

    let records = items
        .into_iter()
        .map(|item| serde_json::from_value::<RawCustomer>(item).unwrap_or_default())
        .collect();

    Ok(normalize_dataset(records))
}

fn to_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn to_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
