//! The explicit dashboard context.
//!
//! One `DashboardContext` owns the store and every stateful component for a
//! single dashboard instance. Nothing is process-global, so several
//! instances can run side by side.

use crate::deeplink::{DeepLinkNavigator, NavigationOutcome};
use crate::geolocation::{GeolocationResolver, ResolveOptions};
use crate::lock;
use crate::markers::{MarkerReconciler, ReconcileReport};
use crate::route::{RouteOrchestrator, RouteSetup};
use geodash_core::config::DashboardConfig;
use geodash_core::error::{LocationError, Result};
use geodash_core::filter::apply_filters;
use geodash_core::models::{
    parse_dataset, CustomerType, DashboardState, DeliveryType, FilterCriteria, HeatmapData, LngLat,
    PointRef, RouteStatus, SearchState, StatePatch,
};
use geodash_core::ports::{
    DashboardView, DetailPresenter, HeatmapLayer, LocationProvider, MapSurface, NavigationHost,
    Notifier, PageEvent, RoutePanel, RoutePlanner,
};
use geodash_core::search::{SearchCycler, SearchOutcome};
use geodash_core::stats::{compute_stats, DatasetStats};
use geodash_core::{ReactiveStore, Subscription};
use geodash_geo::validation::validate_dataset;
use std::sync::{Arc, Mutex, Weak};

/// Capabilities supplied by the host platform
#[derive(Clone)]
pub struct Platform {
    pub map: Arc<dyn MapSurface>,
    /// Demand heatmap drawn under the labels
    pub heatmap: Arc<dyn HeatmapLayer>,
    /// Secondary map inside the route preview, when the host has one
    pub preview_map: Option<Arc<dyn MapSurface>>,
    pub precise_locator: Arc<dyn LocationProvider>,
    pub coarse_locator: Option<Arc<dyn LocationProvider>>,
    pub planner: Arc<dyn RoutePlanner>,
    pub navigation: Arc<dyn NavigationHost>,
    pub detail: Arc<dyn DetailPresenter>,
    pub route_panel: Arc<dyn RoutePanel>,
    pub view: Arc<dyn DashboardView>,
    pub notifier: Arc<dyn Notifier>,
}

/// One dashboard instance
pub struct DashboardContext {
    config: DashboardConfig,
    dep_scope: Option<String>,
    store: ReactiveStore<DashboardState>,
    search: SearchCycler,
    resolver: GeolocationResolver,
    markers: Arc<MarkerReconciler>,
    route: RouteOrchestrator,
    navigator: DeepLinkNavigator,
    platform: Platform,
    _listener: Subscription,
}

impl DashboardContext {
    /// Build a context scoped to a department (`None` shows every department)
    pub fn new(
        config: DashboardConfig,
        platform: Platform,
        dep_scope: Option<String>,
    ) -> Result<Self> {
        config.validate()?;

        let store = ReactiveStore::new(DashboardState {
            filters: FilterCriteria::for_scope(dep_scope.clone()),
            ..DashboardState::default()
        });

        let markers = Arc::new(MarkerReconciler::new(
            Arc::clone(&platform.map),
            Arc::clone(&platform.detail),
            &config.labels,
        ));

        let resolver = GeolocationResolver::new(
            Arc::clone(&platform.precise_locator),
            platform.coarse_locator.clone(),
            Some(Arc::clone(&platform.map)),
        );

        let route = RouteOrchestrator::new(RouteSetup {
            planner: Arc::clone(&platform.planner),
            resolver: resolver.clone(),
            map: Arc::clone(&platform.map),
            preview_map: platform.preview_map.clone(),
            panel: Arc::clone(&platform.route_panel),
            notifier: Arc::clone(&platform.notifier),
            default_center: config.map.center,
            max_waypoints: config.route.max_waypoints,
        });

        let navigator = DeepLinkNavigator::new(
            Arc::clone(&platform.navigation),
            Arc::clone(&platform.notifier),
            &config.navigation,
        );

        let listener = store.subscribe(filtered_view_listener(
            Arc::clone(&markers),
            Arc::clone(&platform.heatmap),
            config.heatmap.max,
            Arc::clone(&platform.view),
        ));

        Ok(Self {
            search: SearchCycler::new(store.clone(), config.search.debounce),
            config,
            dep_scope: dep_scope.filter(|d| !d.is_empty()),
            store,
            resolver,
            markers,
            route,
            navigator,
            platform,
            _listener: listener,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn state(&self) -> Arc<DashboardState> {
        self.store.get_state()
    }

    pub fn store(&self) -> &ReactiveStore<DashboardState> {
        &self.store
    }

    pub fn route(&self) -> &RouteOrchestrator {
        &self.route
    }

    pub fn resolver(&self) -> &GeolocationResolver {
        &self.resolver
    }

    pub fn markers(&self) -> &MarkerReconciler {
        &self.markers
    }

    pub fn stats(&self) -> DatasetStats {
        compute_stats(&self.state().filtered_data)
    }

    /// Replace the dataset snapshot and recompute the filtered view
    pub fn load_dataset(&self, points: Vec<PointRef>) {
        let report = validate_dataset(&points);
        if !report.is_valid {
            tracing::warn!(
                invalid = report.errors.len(),
                total = points.len(),
                "Dataset has records that cannot be mapped"
            );
        }

        let state = self.state();
        let filtered = apply_filters(&points, &state.filters);
        tracing::info!(total = points.len(), filtered = filtered.len(), "Dataset loaded");

        self.search.cancel_pending();
        self.store.set_state(StatePatch {
            all_data: Some(Arc::new(points)),
            filtered_data: Some(Arc::new(filtered)),
            search: Some(SearchState::reset(state.search.keyword.clone())),
            ..StatePatch::default()
        });
    }

    /// Parse a JSON array of raw records and load it. Returns the record count.
    pub fn load_json(&self, json: &str) -> Result<usize> {
        let points = parse_dataset(json)?;
        let count = points.len();
        self.load_dataset(points);
        Ok(count)
    }

    /// Apply new criteria; the search cycle restarts with the same keyword
    pub fn set_filters(&self, criteria: FilterCriteria) {
        let state = self.state();
        let filtered = apply_filters(&state.all_data, &criteria);
        tracing::debug!(filtered = filtered.len(), "Filters applied");

        self.search.cancel_pending();
        self.store.set_state(StatePatch {
            filters: Some(criteria),
            filtered_data: Some(Arc::new(filtered)),
            search: Some(SearchState::reset(state.search.keyword.clone())),
            ..StatePatch::default()
        });
        self.platform.view.show_search_position(None);
    }

    /// Toggle a customer type; `None` is the "all" sentinel
    pub fn toggle_customer_type(&self, customer_type: Option<&CustomerType>) {
        let next = self.state().filters.toggle_customer_type(customer_type);
        self.set_filters(next);
    }

    /// Toggle a delivery type; `None` is the "all" sentinel
    pub fn toggle_delivery_type(&self, delivery_type: Option<&DeliveryType>) {
        let next = self.state().filters.toggle_delivery_type(delivery_type);
        self.set_filters(next);
    }

    /// Back to the scope defaults, keeping the search keyword
    pub fn clear_filters(&self) {
        self.set_filters(FilterCriteria::for_scope(self.dep_scope.clone()));
    }

    /// Live keyword edit
    pub fn search_input(&self, keyword: &str) {
        self.search.input(keyword);
        if keyword.trim().is_empty() {
            self.platform.view.show_search_position(None);
        }
    }

    /// Submit a search, optionally with a demand range `(min, max)`.
    ///
    /// A changed demand range is applied as a filter change first.
    pub fn submit_search(
        &self,
        keyword: &str,
        demand: Option<(f64, Option<f64>)>,
    ) -> SearchOutcome {
        if let Some((min, max)) = demand {
            let state = self.state();
            if state.filters.min_demand != min || state.filters.max_demand != max {
                self.set_filters(state.filters.clone().with_demand_range(min, max));
            }
        }

        let outcome = self.search.advance(keyword);
        self.platform.view.show_search_position(outcome.position());

        match &outcome {
            SearchOutcome::Advanced { target, .. } => self.focus(target),
            SearchOutcome::NoMatches(_) => self.platform.notifier.notify("No matching customers"),
            SearchOutcome::Cleared => {}
        }
        outcome
    }

    /// The map moved or zoomed
    pub fn on_viewport_changed(&self) -> ReconcileReport {
        self.markers.refresh(&self.state().filtered_data)
    }

    /// A marker or list entry was activated
    pub fn activate_point(&self, point: &PointRef) {
        self.platform.detail.open(point);
        self.route.set_active_customer(Some(Arc::clone(point)));
    }

    /// Clicking the bare map closes the detail view
    pub fn on_map_click(&self) {
        self.platform.detail.close();
        self.route.set_active_customer(None);
    }

    pub async fn navigate(&self, point: &PointRef) -> NavigationOutcome {
        self.navigator.navigate(point).await
    }

    /// Hand the planned route to the navigation app or web page
    pub async fn navigate_route(&self) -> NavigationOutcome {
        match self.route.navigation_request() {
            Some(navigation) => self.navigator.navigate_route(navigation).await,
            None => {
                self.platform.notifier.notify(&RouteStatus::MissingDestination.text());
                NavigationOutcome::Rejected
            }
        }
    }

    pub fn page_event(&self, event: PageEvent) {
        self.navigator.page_event(event);
    }

    /// Resolve the user's location, using the cache when possible
    pub async fn resolve_location(
        &self,
        center_on_success: bool,
    ) -> std::result::Result<LngLat, LocationError> {
        self.resolver.resolve(ResolveOptions { force: false, center_on_success }).await
    }

    /// "Locate me": always a fresh lookup, map re-centered on success
    pub async fn locate_me(&self) -> std::result::Result<LngLat, LocationError> {
        let result = self.resolver.resolve(ResolveOptions::forced().centering()).await;
        if let Err(e) = &result {
            self.platform.notifier.notify(&format!("Unable to determine your location: {}", e));
        }
        result
    }

    fn focus(&self, target: &PointRef) {
        if let Some(position) = target.position {
            self.platform.map.set_zoom_and_center(self.config.map.search_zoom, position);
        }
        self.activate_point(target);
        self.on_viewport_changed();
    }
}

/// Store listener: reconcile markers, feed the heatmap and publish stats when the
/// filtered view changes
fn filtered_view_listener(
    markers: Arc<MarkerReconciler>,
    heatmap: Arc<dyn HeatmapLayer>,
    heatmap_max: f64,
    view: Arc<dyn DashboardView>,
) -> impl Fn(&DashboardState) + Send + Sync + 'static {
    let last: Mutex<Weak<Vec<PointRef>>> = Mutex::new(Weak::new());
    move |state: &DashboardState| {
        {
            let mut last = lock(&last);
            if last.upgrade().is_some_and(|seen| Arc::ptr_eq(&seen, &state.filtered_data)) {
                return;
            }
            *last = Arc::downgrade(&state.filtered_data);
        }
        markers.refresh(&state.filtered_data);
        heatmap.set_data(&HeatmapData::from_points(&state.filtered_data, heatmap_max));
        view.show_stats(&compute_stats(&state.filtered_data));
    }
}
