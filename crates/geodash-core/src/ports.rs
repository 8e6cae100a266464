//! Port trait definitions
//!
//! These traits define the platform capabilities (map surface, location
//! providers, routing service, navigation host and UI panels) that adapters
//! must implement. The core never talks to an SDK directly.

pub mod location;
pub mod map;
pub mod navigation;
pub mod presenter;
pub mod routing;

pub use location::LocationProvider;
pub use map::{ActivationHandler, HeatmapLayer, MapMarker, MapSurface};
pub use navigation::{NavigationHost, PageEvent};
pub use presenter::{DashboardView, DetailPresenter, Notifier, RoutePanel};
pub use routing::RoutePlanner;
