use crate::models::{HeatmapData, LngLat, MarkerContent, MarkerOptions, Viewport};
use std::sync::Arc;

/// Callback run when a marker is clicked or tapped
pub type ActivationHandler = Arc<dyn Fn() + Send + Sync>;

/// A rendered marker owned by the map SDK
pub trait MapMarker: Send + Sync {
    fn position(&self) -> LngLat;

    fn content(&self) -> MarkerContent;

    fn set_position(&self, position: LngLat);

    fn set_content(&self, content: MarkerContent);

    /// Add the marker to its map
    fn attach(&self);

    /// Remove the marker from its map without destroying it
    fn detach(&self);

    fn is_attached(&self) -> bool;

    /// Bind the click/touch handler, replacing any previous one
    fn on_activate(&self, handler: ActivationHandler);
}

/// Port for an interactive map
pub trait MapSurface: Send + Sync {
    /// Current bounds and zoom level
    fn viewport(&self) -> Viewport;

    /// Current center, if the map has been laid out
    fn center(&self) -> Option<LngLat>;

    fn set_center(&self, center: LngLat);

    fn set_zoom_and_center(&self, zoom: f64, center: LngLat);

    /// Create a detached marker
    fn create_marker(&self, options: MarkerOptions) -> Arc<dyn MapMarker>;
}

/// Density layer drawn over the map
pub trait HeatmapLayer: Send + Sync {
    /// Replace the whole dataset
    fn set_data(&self, data: &HeatmapData);
}
