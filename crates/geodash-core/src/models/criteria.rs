//! Filter criteria applied to the customer dataset.

use crate::models::customer::{CustomerType, DeliveryType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Selection over one categorical dimension.
///
/// Either the `All` sentinel or a non-empty explicit subset. There is no
/// way to hold an empty subset: clearing the last member yields `All`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeSelection<T: Ord> {
    All,
    Only(BTreeSet<T>),
}

impl<T: Ord> Default for TypeSelection<T> {
    fn default() -> Self {
        TypeSelection::All
    }
}

impl<T: Ord + Clone> TypeSelection<T> {
    /// Build from explicit members; an empty iterator gives `All`
    pub fn only(members: impl IntoIterator<Item = T>) -> Self {
        let set: BTreeSet<T> = members.into_iter().collect();
        if set.is_empty() {
            TypeSelection::All
        } else {
            TypeSelection::Only(set)
        }
    }

    pub fn accepts(&self, value: &T) -> bool {
        match self {
            TypeSelection::All => true,
            TypeSelection::Only(set) => set.contains(value),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, TypeSelection::All)
    }

    /// Whether `value` is explicitly selected (the sentinel selects nothing explicitly)
    pub fn contains(&self, value: &T) -> bool {
        matches!(self, TypeSelection::Only(set) if set.contains(value))
    }

    /// Flip one member: adding it replaces the sentinel, removing the
    /// last member falls back to the sentinel.
    pub fn toggle(&self, value: &T) -> Self {
        match self {
            TypeSelection::All => TypeSelection::only([value.clone()]),
            TypeSelection::Only(set) => {
                let mut next = set.clone();
                if !next.remove(value) {
                    next.insert(value.clone());
                }
                TypeSelection::only(next)
            }
        }
    }
}

/// Criteria a customer must satisfy to be part of the filtered view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Substring the department must contain
    pub dep_scope: Option<String>,
    pub min_demand: f64,
    /// Inclusive upper bound; `None` is unbounded
    pub max_demand: Option<f64>,
    pub customer_types: TypeSelection<CustomerType>,
    pub delivery_types: TypeSelection<DeliveryType>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self::for_scope(None)
    }
}

impl FilterCriteria {
    /// Default criteria for a department scope
    pub fn for_scope(dep_scope: Option<String>) -> Self {
        Self {
            dep_scope: dep_scope.filter(|d| !d.is_empty()),
            min_demand: 0.0,
            max_demand: None,
            customer_types: TypeSelection::All,
            delivery_types: TypeSelection::All,
        }
    }

    pub fn with_demand_range(mut self, min_demand: f64, max_demand: Option<f64>) -> Self {
        self.min_demand = min_demand;
        self.max_demand = max_demand;
        self
    }

    /// Toggle a customer type; `None` selects the sentinel
    pub fn toggle_customer_type(&self, value: Option<&CustomerType>) -> Self {
        let mut next = self.clone();
        next.customer_types = match value {
            None => TypeSelection::All,
            Some(t) => self.customer_types.toggle(t),
        };
        next
    }

    /// Toggle a delivery type; `None` selects the sentinel
    pub fn toggle_delivery_type(&self, value: Option<&DeliveryType>) -> Self {
        let mut next = self.clone();
        next.delivery_types = match value {
            None => TypeSelection::All,
            Some(t) => self.delivery_types.toggle(t),
        };
        next
    }

    pub fn demand_in_range(&self, demand: f64) -> bool {
        demand >= self.min_demand && self.max_demand.is_none_or(|max| demand <= max)
    }
}
