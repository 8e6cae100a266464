use super::AmapService;
use async_trait::async_trait;
use geodash_core::config::ServiceConfig;
use geodash_core::error::{GeodashError, Result};
use geodash_core::models::PositionFix;
use geodash_core::ports::LocationProvider;
use serde::Deserialize;
use serde_json::Value;

/// Coarse location tier: city-level lookup from the caller's IP address
pub struct AmapIpLocator {
    service: AmapService,
}

impl AmapIpLocator {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        Ok(Self { service: AmapService::from_config(config)? })
    }
}

#[async_trait]
impl LocationProvider for AmapIpLocator {
    async fn locate(&self) -> Result<PositionFix> {
        let response: IpResponse = self.service.get_json("/v3/ip", &[]).await?;
        parse_ip_response(response)
    }

    fn name(&self) -> &str {
        "amap-ip"
    }
}

/// Response from the IP location API. Unknown fields come back as `[]`.
#[derive(Debug, Deserialize)]
struct IpResponse {
    status: String,
    #[serde(default)]
    info: Option<String>,
    #[serde(default)]
    city: Value,
    #[serde(default)]
    rectangle: Value,
}

fn parse_ip_response(response: IpResponse) -> Result<PositionFix> {
    if response.status != "1" {
        return Err(GeodashError::LocationUnavailable {
            reason: response.info.unwrap_or_else(|| "IP location failed".to_string()),
        });
    }

    let rectangle = response.rectangle.as_str().unwrap_or_default();
    let (lng, lat) = rectangle_center(rectangle).ok_or_else(|| GeodashError::LocationUnavailable {
        reason: "IP location returned no city bounds".to_string(),
    })?;

    Ok(PositionFix {
        lng,
        lat,
        accuracy: None,
        location_type: Some("ip".to_string()),
        message: response.city.as_str().map(str::to_string),
    })
}

/// Center of `"lng1,lat1;lng2,lat2"`
fn rectangle_center(rectangle: &str) -> Option<(f64, f64)> {
    let (a, b) = rectangle.split_once(';')?;
    let corner = |s: &str| -> Option<(f64, f64)> {
        let (lng, lat) = s.split_once(',')?;
        Some((lng.trim().parse().ok()?, lat.trim().parse().ok()?))
    };
    let (lng1, lat1) = corner(a)?;
    let (lng2, lat2) = corner(b)?;
    Some(((lng1 + lng2) / 2.0, (lat1 + lat2) / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<PositionFix> {
        parse_ip_response(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_rectangle_to_center() {
        let fix = parse(
            r#"{"status":"1","info":"OK","city":"Wenzhou","rectangle":"120.5,27.9;120.8,28.1"}"#,
        )
        .unwrap();
        assert!((fix.lng - 120.65).abs() < 1e-9);
        assert!((fix.lat - 28.0).abs() < 1e-9);
        assert_eq!(fix.location_type.as_deref(), Some("ip"));
        assert_eq!(fix.message.as_deref(), Some("Wenzhou"));
    }

    #[test]
    fn test_unknown_city_is_unavailable() {
        let err = parse(r#"{"status":"1","info":"OK","city":[],"rectangle":[]}"#).unwrap_err();
        assert!(matches!(err, GeodashError::LocationUnavailable { .. }));
    }

    #[test]
    fn test_error_status_carries_info() {
        let err = parse(r#"{"status":"0","info":"INVALID_USER_KEY"}"#).unwrap_err();
        assert!(err.to_string().contains("INVALID_USER_KEY"));
    }
}
