use super::AmapService;
use async_trait::async_trait;
use geodash_core::config::ServiceConfig;
use geodash_core::error::{GeodashError, Result};
use geodash_core::models::{LngLat, RouteCandidate, RoutePlan, RouteQuery};
use geodash_core::ports::RoutePlanner;
use serde::Deserialize;

/// Driving-route planner backed by the AMap direction API
pub struct AmapDrivingPlanner {
    service: AmapService,
}

impl AmapDrivingPlanner {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        Ok(Self { service: AmapService::from_config(config)? })
    }
}

#[async_trait]
impl RoutePlanner for AmapDrivingPlanner {
    async fn plan(&self, query: &RouteQuery) -> Result<RoutePlan> {
        let response: DrivingResponse =
            self.service.get_json("/v3/direction/driving", &query_params(query)).await?;
        let plan = parse_driving_response(response)?;
        tracing::debug!(routes = plan.routes.len(), "Driving plan received");
        Ok(plan)
    }
}

fn coordinate(position: &LngLat) -> String {
    format!("{:.6},{:.6}", position.lng(), position.lat())
}

fn query_params(query: &RouteQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("origin", coordinate(&query.origin)),
        ("destination", coordinate(&query.destination)),
    ];
    if !query.waypoints.is_empty() {
        let waypoints: Vec<String> = query.waypoints.iter().map(coordinate).collect();
        params.push(("waypoints", waypoints.join(";")));
    }
    params
}

#[derive(Debug, Deserialize)]
struct DrivingResponse {
    status: String,
    #[serde(default)]
    info: Option<String>,
    #[serde(default)]
    route: Option<DrivingRoute>,
}

#[derive(Debug, Deserialize)]
struct DrivingRoute {
    #[serde(default)]
    paths: Vec<DrivingPath>,
}

/// Distances and durations arrive as decimal strings
#[derive(Debug, Deserialize)]
struct DrivingPath {
    distance: String,
    duration: String,
}

fn parse_driving_response(response: DrivingResponse) -> Result<RoutePlan> {
    if response.status != "1" {
        return Err(GeodashError::RoutePlanning {
            reason: response.info.unwrap_or_else(|| "Routing service error".to_string()),
        });
    }

    let paths = response.route.map(|r| r.paths).unwrap_or_default();
    let routes = paths
        .into_iter()
        .map(|path| {
            let distance_m = path.distance.trim().parse::<f64>();
            let duration_s = path.duration.trim().parse::<f64>();
            match (distance_m, duration_s) {
                (Ok(distance_m), Ok(duration_s)) => Ok(RouteCandidate { distance_m, duration_s }),
                _ => Err(GeodashError::RoutePlanning {
                    reason: format!(
                        "Malformed path distance/duration: {}/{}",
                        path.distance, path.duration
                    ),
                }),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RoutePlan { routes })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<RoutePlan> {
        parse_driving_response(serde_json::from_str(json).unwrap())
    }

    fn pos(lng: f64, lat: f64) -> LngLat {
        LngLat::new(lng, lat).unwrap()
    }

    #[test]
    fn test_parse_paths() {
        let plan = parse(
            r#"{"status":"1","info":"OK","route":{"paths":[
                {"distance":"12345","duration":"1500"},
                {"distance":"13000","duration":"1400"}]}}"#,
        )
        .unwrap();
        assert_eq!(plan.routes.len(), 2);
        assert_eq!(plan.routes[0], RouteCandidate { distance_m: 12345.0, duration_s: 1500.0 });
    }

    #[test]
    fn test_no_paths_is_empty_plan() {
        let plan = parse(r#"{"status":"1","info":"OK","route":{"paths":[]}}"#).unwrap();
        assert!(plan.routes.is_empty());
    }

    #[test]
    fn test_error_status_is_failure() {
        let err = parse(r#"{"status":"0","info":"DAILY_QUERY_OVER_LIMIT"}"#).unwrap_err();
        assert!(matches!(err, GeodashError::RoutePlanning { .. }));
    }

    #[test]
    fn test_query_params_include_waypoints() {
        let query = RouteQuery {
            origin: pos(120.0, 28.0),
            destination: pos(121.0, 29.0),
            waypoints: vec![pos(120.3, 28.3), pos(120.6, 28.6)],
        };
        let params = query_params(&query);
        assert_eq!(params[0], ("origin", "120.000000,28.000000".to_string()));
        assert_eq!(
            params[2],
            ("waypoints", "120.300000,28.300000;120.600000,28.600000".to_string())
        );

        let direct = RouteQuery { waypoints: Vec::new(), ..query };
        assert_eq!(query_params(&direct).len(), 2);
    }
}
