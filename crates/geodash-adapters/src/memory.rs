//! In-memory implementations of the platform ports for development and testing.
//!
//! Every adapter records what it was asked to do so tests can assert on the
//! side effects. Poisoned locks are recovered rather than propagated.

use async_trait::async_trait;
use geodash_core::error::{GeodashError, Result};
use geodash_core::models::{
    CustomerPoint, HeatmapData, LngLat, MarkerContent, MarkerOptions, PositionFix, RouteCandidate,
    RoutePlan, RouteQuery, RouteStatus, Viewport, ViewportBounds,
};
use geodash_core::ports::{
    ActivationHandler, DashboardView, DetailPresenter, HeatmapLayer, LocationProvider, MapMarker,
    MapSurface, NavigationHost, Notifier, RoutePanel, RoutePlanner,
};
use geodash_core::search::SearchPosition;
use geodash_core::stats::DatasetStats;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{oneshot, Notify};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Callback fired after a marker is attached, outside the marker's lock
pub type AttachHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct MarkerState {
    position: Option<LngLat>,
    content: Option<MarkerContent>,
    attached: bool,
    handler: Option<ActivationHandler>,
}

/// In-memory marker
#[derive(Default)]
pub struct MemoryMarker {
    state: Mutex<MarkerState>,
    options: Mutex<Option<MarkerOptions>>,
    updates: AtomicUsize,
    attach_hook: Option<AttachHook>,
}

impl MemoryMarker {
    fn from_options(options: MarkerOptions, attach_hook: Option<AttachHook>) -> Self {
        let marker = Self { attach_hook, ..Self::default() };
        {
            let mut state = lock(&marker.state);
            state.position = Some(options.position);
            state.content = Some(options.content.clone());
        }
        *lock(&marker.options) = Some(options);
        marker
    }

    /// Number of in-place position/content updates
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Options the marker was created with
    pub fn options(&self) -> Option<MarkerOptions> {
        lock(&self.options).clone()
    }

    /// Simulate a click or tap. Returns `false` when no handler is bound.
    pub fn activate(&self) -> bool {
        let handler = lock(&self.state).handler.clone();
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }
}

impl MapMarker for MemoryMarker {
    fn position(&self) -> LngLat {
        lock(&self.state).position.unwrap_or(LngLat::DEFAULT_CENTER)
    }

    fn content(&self) -> MarkerContent {
        lock(&self.state).content.clone().unwrap_or_else(|| MarkerContent {
            label: String::new(),
            style: geodash_core::models::MarkerStyle::Plain,
        })
    }

    fn set_position(&self, position: LngLat) {
        lock(&self.state).position = Some(position);
        self.updates.fetch_add(1, Ordering::SeqCst);
    }

    fn set_content(&self, content: MarkerContent) {
        lock(&self.state).content = Some(content);
        self.updates.fetch_add(1, Ordering::SeqCst);
    }

    fn attach(&self) {
        lock(&self.state).attached = true;
        if let Some(hook) = &self.attach_hook {
            hook();
        }
    }

    fn detach(&self) {
        lock(&self.state).attached = false;
    }

    fn is_attached(&self) -> bool {
        lock(&self.state).attached
    }

    fn on_activate(&self, handler: ActivationHandler) {
        lock(&self.state).handler = Some(handler);
    }
}

struct SurfaceState {
    viewport: Viewport,
    center: Option<LngLat>,
    zoom_and_center_calls: Vec<(f64, LngLat)>,
}

/// In-memory map with a settable viewport
pub struct MemoryMapSurface {
    state: Mutex<SurfaceState>,
    markers: Mutex<Vec<Arc<MemoryMarker>>>,
    attach_hook: Mutex<Option<AttachHook>>,
    heatmap: Mutex<Vec<HeatmapData>>,
}

impl MemoryMapSurface {
    pub fn new(viewport: Viewport) -> Self {
        let center = Some(midpoint(&viewport.bounds));
        Self {
            state: Mutex::new(SurfaceState {
                viewport,
                center,
                zoom_and_center_calls: Vec::new(),
            }),
            markers: Mutex::new(Vec::new()),
            attach_hook: Mutex::new(None),
            heatmap: Mutex::new(Vec::new()),
        }
    }

    /// Map that has not been laid out yet: no center available
    pub fn unplaced(viewport: Viewport) -> Self {
        let surface = Self::new(viewport);
        lock(&surface.state).center = None;
        surface
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        let mut state = lock(&self.state);
        state.center = Some(midpoint(&viewport.bounds));
        state.viewport = viewport;
    }

    pub fn set_zoom(&self, zoom: f64) {
        lock(&self.state).viewport.zoom = zoom;
    }

    /// Every marker ever created, in creation order
    pub fn markers(&self) -> Vec<Arc<MemoryMarker>> {
        lock(&self.markers).clone()
    }

    pub fn markers_created(&self) -> usize {
        lock(&self.markers).len()
    }

    /// Markers currently on the map
    pub fn attached_markers(&self) -> Vec<Arc<MemoryMarker>> {
        lock(&self.markers).iter().filter(|m| m.is_attached()).cloned().collect()
    }

    /// Attached marker showing `label`, if any
    pub fn attached_marker(&self, label: &str) -> Option<Arc<MemoryMarker>> {
        self.attached_markers().into_iter().find(|m| m.content().label == label)
    }

    pub fn zoom_and_center_calls(&self) -> Vec<(f64, LngLat)> {
        lock(&self.state).zoom_and_center_calls.clone()
    }

    /// Run `hook` whenever a marker created from now on is attached, the
    /// way an SDK fires layout events synchronously
    pub fn on_attach(&self, hook: AttachHook) {
        *lock(&self.attach_hook) = Some(hook);
    }

    /// Every heatmap dataset published, oldest first
    pub fn heatmap_sets(&self) -> Vec<HeatmapData> {
        lock(&self.heatmap).clone()
    }

    pub fn last_heatmap(&self) -> Option<HeatmapData> {
        lock(&self.heatmap).last().cloned()
    }
}

fn midpoint(bounds: &ViewportBounds) -> LngLat {
    let lng = (bounds.south_west.lng() + bounds.north_east.lng()) / 2.0;
    let lat = (bounds.south_west.lat() + bounds.north_east.lat()) / 2.0;
    LngLat::new(lng, lat).unwrap_or(bounds.south_west)
}

impl MapSurface for MemoryMapSurface {
    fn viewport(&self) -> Viewport {
        lock(&self.state).viewport
    }

    fn center(&self) -> Option<LngLat> {
        lock(&self.state).center
    }

    fn set_center(&self, center: LngLat) {
        lock(&self.state).center = Some(center);
    }

    fn set_zoom_and_center(&self, zoom: f64, center: LngLat) {
        let mut state = lock(&self.state);
        state.viewport.zoom = zoom;
        state.center = Some(center);
        state.zoom_and_center_calls.push((zoom, center));
    }

    fn create_marker(&self, options: MarkerOptions) -> Arc<dyn MapMarker> {
        let hook = lock(&self.attach_hook).clone();
        let marker = Arc::new(MemoryMarker::from_options(options, hook));
        lock(&self.markers).push(Arc::clone(&marker));
        marker
    }
}

impl HeatmapLayer for MemoryMapSurface {
    fn set_data(&self, data: &HeatmapData) {
        lock(&self.heatmap).push(data.clone());
    }
}

/// Location tier with a fixed answer
pub struct StaticLocator {
    name: String,
    result: std::result::Result<PositionFix, String>,
    delay: Option<Duration>,
    successes: Option<usize>,
    calls: AtomicUsize,
}

impl StaticLocator {
    pub fn ok(name: impl Into<String>, fix: PositionFix) -> Self {
        Self {
            name: name.into(),
            result: Ok(fix),
            delay: None,
            successes: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: Err(reason.into()),
            delay: None,
            successes: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer only after `delay` (tokio time)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call after the first `count`
    pub fn fail_after(mut self, count: usize) -> Self {
        self.successes = Some(count);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationProvider for StaticLocator {
    async fn locate(&self) -> Result<PositionFix> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.successes.is_some_and(|count| call >= count) {
            return Err(GeodashError::LocationUnavailable { reason: "signal lost".to_string() });
        }
        self.result
            .clone()
            .map_err(|reason| GeodashError::LocationUnavailable { reason })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Route planner with a fixed answer that records every query
pub struct StaticRoutePlanner {
    result: std::result::Result<RoutePlan, String>,
    queries: Mutex<Vec<RouteQuery>>,
}

impl StaticRoutePlanner {
    pub fn ok(plan: RoutePlan) -> Self {
        Self { result: Ok(plan), queries: Mutex::new(Vec::new()) }
    }

    /// A planner that always returns a single route
    pub fn single(distance_m: f64, duration_s: f64) -> Self {
        Self::ok(RoutePlan { routes: vec![RouteCandidate { distance_m, duration_s }] })
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self { result: Err(reason.into()), queries: Mutex::new(Vec::new()) }
    }

    pub fn queries(&self) -> Vec<RouteQuery> {
        lock(&self.queries).clone()
    }
}

#[async_trait]
impl RoutePlanner for StaticRoutePlanner {
    async fn plan(&self, query: &RouteQuery) -> Result<RoutePlan> {
        lock(&self.queries).push(query.clone());
        self.result.clone().map_err(|reason| GeodashError::RoutePlanning { reason })
    }
}

/// Route planner whose answers are released by the test, in any order
#[derive(Default)]
pub struct ManualRoutePlanner {
    calls: Mutex<Vec<(RouteQuery, Option<oneshot::Sender<Result<RoutePlan>>>)>>,
    arrived: Notify,
}

impl ManualRoutePlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn query(&self, index: usize) -> Option<RouteQuery> {
        lock(&self.calls).get(index).map(|(query, _)| query.clone())
    }

    /// Wait until at least `count` plan calls have arrived
    pub async fn wait_for_calls(&self, count: usize) {
        loop {
            let notified = self.arrived.notified();
            if self.call_count() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Answer call `index`. Returns `false` if it was already answered or never made.
    pub fn respond(&self, index: usize, result: Result<RoutePlan>) -> bool {
        let sender = lock(&self.calls).get_mut(index).and_then(|(_, sender)| sender.take());
        match sender {
            Some(sender) => sender.send(result).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl RoutePlanner for ManualRoutePlanner {
    async fn plan(&self, query: &RouteQuery) -> Result<RoutePlan> {
        let (tx, rx) = oneshot::channel();
        lock(&self.calls).push((query.clone(), Some(tx)));
        self.arrived.notify_waiters();

        rx.await.unwrap_or_else(|_| {
            Err(GeodashError::RoutePlanning { reason: "planner dropped".to_string() })
        })
    }
}

/// Navigation host that records launches and page opens
#[derive(Default)]
pub struct RecordingNavigationHost {
    launched: Mutex<Vec<String>>,
    opened: Mutex<Vec<String>>,
    navigated: Mutex<Vec<String>>,
    fail_launch: AtomicBool,
    block_new_context: AtomicBool,
}

impl RecordingNavigationHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `launch_app` return an error
    pub fn fail_launches(self) -> Self {
        self.fail_launch.store(true, Ordering::SeqCst);
        self
    }

    /// Make `open_new_context` report a blocked popup
    pub fn block_new_contexts(self) -> Self {
        self.block_new_context.store(true, Ordering::SeqCst);
        self
    }

    pub fn launched(&self) -> Vec<String> {
        lock(&self.launched).clone()
    }

    pub fn opened(&self) -> Vec<String> {
        lock(&self.opened).clone()
    }

    pub fn navigated(&self) -> Vec<String> {
        lock(&self.navigated).clone()
    }
}

impl NavigationHost for RecordingNavigationHost {
    fn launch_app(&self, uri: &str) -> Result<()> {
        lock(&self.launched).push(uri.to_string());
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(GeodashError::Launch { reason: "scheme not handled".to_string() });
        }
        Ok(())
    }

    fn open_new_context(&self, url: &str) -> bool {
        if self.block_new_context.load(Ordering::SeqCst) {
            return false;
        }
        lock(&self.opened).push(url.to_string());
        true
    }

    fn navigate_current(&self, url: &str) {
        lock(&self.navigated).push(url.to_string());
    }
}

/// Something the dashboard asked the UI to show
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    DetailOpened(String),
    DetailClosed,
    RouteStatus(RouteStatus),
    RouteDrawn(RouteCandidate),
    RouteCleared,
    Stats(DatasetStats),
    SearchPosition(Option<SearchPosition>),
    Notice(String),
}

/// Records every presenter call in order
#[derive(Default)]
pub struct RecordingUi {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UiEvent> {
        lock(&self.events).clone()
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
    }

    pub fn notices(&self) -> Vec<String> {
        self.filter(|e| match e {
            UiEvent::Notice(message) => Some(message.clone()),
            _ => None,
        })
    }

    pub fn opened_details(&self) -> Vec<String> {
        self.filter(|e| match e {
            UiEvent::DetailOpened(name) => Some(name.clone()),
            _ => None,
        })
    }

    pub fn route_statuses(&self) -> Vec<RouteStatus> {
        self.filter(|e| match e {
            UiEvent::RouteStatus(status) => Some(status.clone()),
            _ => None,
        })
    }

    pub fn last_route_status(&self) -> Option<RouteStatus> {
        self.route_statuses().pop()
    }

    pub fn last_stats(&self) -> Option<DatasetStats> {
        self.filter(|e| match e {
            UiEvent::Stats(stats) => Some(stats.clone()),
            _ => None,
        })
        .pop()
    }

    pub fn count(&self, event: &UiEvent) -> usize {
        lock(&self.events).iter().filter(|e| *e == event).count()
    }

    fn filter<T>(&self, f: impl Fn(&UiEvent) -> Option<T>) -> Vec<T> {
        lock(&self.events).iter().filter_map(f).collect()
    }

    fn push(&self, event: UiEvent) {
        lock(&self.events).push(event);
    }
}

impl DetailPresenter for RecordingUi {
    fn open(&self, point: &CustomerPoint) {
        self.push(UiEvent::DetailOpened(point.name.clone()));
    }

    fn close(&self) {
        self.push(UiEvent::DetailClosed);
    }
}

impl RoutePanel for RecordingUi {
    fn show_status(&self, status: &RouteStatus) {
        self.push(UiEvent::RouteStatus(status.clone()));
    }

    fn draw_route(&self, route: &RouteCandidate) {
        self.push(UiEvent::RouteDrawn(*route));
    }

    fn clear_route(&self) {
        self.push(UiEvent::RouteCleared);
    }
}

impl DashboardView for RecordingUi {
    fn show_stats(&self, stats: &DatasetStats) {
        self.push(UiEvent::Stats(stats.clone()));
    }

    fn show_search_position(&self, position: Option<SearchPosition>) {
        self.push(UiEvent::SearchPosition(position));
    }
}

impl Notifier for RecordingUi {
    fn notify(&self, message: &str) {
        self.push(UiEvent::Notice(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodash_core::models::MarkerStyle;

    fn viewport() -> Viewport {
        Viewport {
            bounds: ViewportBounds::new(
                LngLat::new(120.0, 27.0).unwrap(),
                LngLat::new(121.0, 29.0).unwrap(),
            ),
            zoom: 15.0,
        }
    }

    #[test]
    fn test_surface_tracks_markers() {
        let surface = MemoryMapSurface::new(viewport());
        assert_eq!(surface.center(), Some(LngLat::new(120.5, 28.0).unwrap()));

        let content = MarkerContent { label: "Acme".to_string(), style: MarkerStyle::Existing };
        let position = LngLat::new(120.1, 27.1).unwrap();
        let marker = surface.create_marker(MarkerOptions::label(position, content));
        assert!(!marker.is_attached());

        marker.attach();
        assert_eq!(surface.attached_markers().len(), 1);
        assert!(surface.attached_marker("Acme").is_some());

        marker.detach();
        assert!(surface.attached_markers().is_empty());
        assert_eq!(surface.markers_created(), 1);
    }

    #[test]
    fn test_marker_activation() {
        let surface = MemoryMapSurface::new(viewport());
        let content = MarkerContent { label: "A".to_string(), style: MarkerStyle::Plain };
        surface.create_marker(MarkerOptions::label(LngLat::new(120.1, 27.1).unwrap(), content));
        let marker = &surface.markers()[0];
        assert!(!marker.activate());

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        marker.on_activate(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(marker.activate());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_manual_planner_answers_out_of_order() {
        let planner = Arc::new(ManualRoutePlanner::new());
        let query = RouteQuery {
            origin: LngLat::new(120.0, 28.0).unwrap(),
            destination: LngLat::new(120.5, 28.5).unwrap(),
            waypoints: Vec::new(),
        };

        let first = tokio::spawn({
            let planner = Arc::clone(&planner);
            let query = query.clone();
            async move { planner.plan(&query).await }
        });
        planner.wait_for_calls(1).await;
        let second = tokio::spawn({
            let planner = Arc::clone(&planner);
            async move { planner.plan(&query).await }
        });
        planner.wait_for_calls(2).await;

        assert!(planner.respond(1, Ok(RoutePlan::default())));
        assert!(planner.respond(0, Err(GeodashError::NoRoute)));
        assert!(!planner.respond(0, Ok(RoutePlan::default())));

        assert!(second.await.unwrap().unwrap().routes.is_empty());
        assert!(first.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_static_locator_counts_calls() {
        let locator = StaticLocator::failing("device", "denied");
        assert!(locator.locate().await.is_err());
        assert!(locator.locate().await.is_err());
        assert_eq!(locator.call_count(), 2);
    }

    #[test]
    fn test_navigation_host_records() {
        let host = RecordingNavigationHost::new().block_new_contexts();
        assert!(host.launch_app("app://x").is_ok());
        assert!(!host.open_new_context("https://x"));
        host.navigate_current("https://x");
        assert_eq!(host.launched(), vec!["app://x"]);
        assert!(host.opened().is_empty());
        assert_eq!(host.navigated(), vec!["https://x"]);
    }
}
