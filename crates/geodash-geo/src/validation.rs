use geodash_core::models::PointRef;

/// Dataset validation report
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// One invalid record with its location in the dataset
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }

    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }
}

/// Report every record that cannot take part in spatial operations
pub fn validate_dataset(points: &[PointRef]) -> ValidationResult {
    let mut result = ValidationResult::valid();

    for (i, point) in points.iter().enumerate() {
        match point.position {
            None => result.add_error(
                format!("record[{}] {}", i, point.name),
                "Coordinates missing or out of range".to_string(),
            ),
            Some(pos) if pos.lng() == 0.0 && pos.lat() == 0.0 => result.add_error(
                format!("record[{}] {}", i, point.name),
                "Coordinates at null island".to_string(),
            ),
            Some(_) => {}
        }

        if point.name.trim().is_empty() {
            result.add_error(format!("record[{}]", i), "Missing customer name".to_string());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodash_core::models::{CustomerPoint, LngLat};
    use std::sync::Arc;

    #[test]
    fn test_validate_dataset_reports_unlocatable() {
        let mut broken = CustomerPoint::new("Broken", LngLat::new(1.0, 1.0).unwrap());
        broken.position = None;
        let points = vec![
            Arc::new(CustomerPoint::new("Fine", LngLat::new(120.0, 28.0).unwrap())),
            Arc::new(broken),
            Arc::new(CustomerPoint::new("Null", LngLat::new(0.0, 0.0).unwrap())),
        ];

        let result = validate_dataset(&points);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].location, "record[1] Broken");
    }
}
