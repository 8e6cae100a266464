use crate::error::Result;
use crate::models::{RoutePlan, RouteQuery};
use async_trait::async_trait;

/// Port for the external driving-route service
#[async_trait]
pub trait RoutePlanner: Send + Sync {
    /// Plan a route. An empty plan means the service had no data for the query.
    async fn plan(&self, query: &RouteQuery) -> Result<RoutePlan>;
}
