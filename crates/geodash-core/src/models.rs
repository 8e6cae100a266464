pub mod criteria;
pub mod customer;
pub mod heatmap;
pub mod location;
pub mod marker;
pub mod route;
pub mod state;
pub mod viewport;
pub mod waypoint;

pub use criteria::{FilterCriteria, TypeSelection};
pub use customer::{
    normalize_dataset, parse_dataset, CustomerPoint, CustomerType, DeliveryType, Factor, PointRef,
    RawCustomer, RawFactor,
};
pub use heatmap::{HeatPoint, HeatmapData};
pub use location::{GeoDiagnostics, LngLat, LocateMethod, LocateStatus, PositionFix};
pub use marker::{MarkerContent, MarkerOptions, MarkerStyle};
pub use route::{OriginSource, RouteCandidate, RoutePlan, RouteQuery, RouteStatus};
pub use state::{DashboardState, SearchState, StatePatch};
pub use viewport::{Viewport, ViewportBounds};
pub use waypoint::{Waypoint, WaypointId};
