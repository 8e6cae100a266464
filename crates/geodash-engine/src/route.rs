//! Waypoint management and versioned route previews.
//!
//! Every preview render takes the next sequence number. A planner response
//! is applied only if its sequence is still the latest one issued when it
//! arrives; anything older is dropped. Waypoint edits while the preview is
//! open start a new render, which invalidates the one in flight.

use crate::deeplink::{NavTarget, WebNavigation};
use crate::geolocation::{GeolocationResolver, ResolveOptions};
use crate::lock;
use geodash_core::error::{GeodashError, Result};
use geodash_core::models::{
    CustomerPoint, LngLat, OriginSource, PointRef, RouteQuery, RouteStatus, Waypoint, WaypointId,
};
use geodash_core::ports::{MapSurface, Notifier, RoutePanel, RoutePlanner};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

const ORIGIN_LABEL: &str = "My location";

/// Result of one preview render
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewOutcome {
    /// The status was shown on the route panel
    Applied(RouteStatus),
    /// A newer render superseded this one; nothing was shown
    Discarded { sequence: u64 },
}

struct RouteInner {
    planner: Arc<dyn RoutePlanner>,
    resolver: GeolocationResolver,
    map: Arc<dyn MapSurface>,
    preview_map: Option<Arc<dyn MapSurface>>,
    panel: Arc<dyn RoutePanel>,
    notifier: Arc<dyn Notifier>,
    default_center: LngLat,
    max_waypoints: usize,
    waypoints: Mutex<Vec<Waypoint>>,
    active_customer: Mutex<Option<PointRef>>,
    last_origin: Mutex<Option<(LngLat, OriginSource)>>,
    sequence: AtomicU64,
    preview_open: AtomicBool,
}

/// Owns the waypoint list and the route preview
#[derive(Clone)]
pub struct RouteOrchestrator {
    inner: Arc<RouteInner>,
}

/// Construction parameters for [`RouteOrchestrator`]
pub struct RouteSetup {
    pub planner: Arc<dyn RoutePlanner>,
    pub resolver: GeolocationResolver,
    pub map: Arc<dyn MapSurface>,
    pub preview_map: Option<Arc<dyn MapSurface>>,
    pub panel: Arc<dyn RoutePanel>,
    pub notifier: Arc<dyn Notifier>,
    pub default_center: LngLat,
    pub max_waypoints: usize,
}

impl RouteOrchestrator {
    pub fn new(setup: RouteSetup) -> Self {
        Self {
            inner: Arc::new(RouteInner {
                planner: setup.planner,
                resolver: setup.resolver,
                map: setup.map,
                preview_map: setup.preview_map,
                panel: setup.panel,
                notifier: setup.notifier,
                default_center: setup.default_center,
                max_waypoints: setup.max_waypoints,
                waypoints: Mutex::new(Vec::new()),
                active_customer: Mutex::new(None),
                last_origin: Mutex::new(None),
                sequence: AtomicU64::new(0),
                preview_open: AtomicBool::new(false),
            }),
        }
    }

    pub fn waypoints(&self) -> Vec<Waypoint> {
        lock(&self.inner.waypoints).clone()
    }

    /// Last waypoint, if any
    pub fn destination(&self) -> Option<Waypoint> {
        lock(&self.inner.waypoints).last().cloned()
    }

    /// Append a waypoint. Duplicates and a full list are rejected and reported.
    pub fn add(&self, waypoint: Waypoint) -> Result<()> {
        let added = {
            let mut waypoints = lock(&self.inner.waypoints);
            if waypoints.iter().any(|w| w.id == waypoint.id) {
                Err(GeodashError::DuplicateWaypoint { id: waypoint.id.to_string() })
            } else if waypoints.len() >= self.inner.max_waypoints {
                Err(GeodashError::WaypointLimit { limit: self.inner.max_waypoints })
            } else {
                tracing::debug!(id = %waypoint.id, "Waypoint added");
                waypoints.push(waypoint);
                Ok(())
            }
        };
        self.report(added)?;
        self.edited();
        Ok(())
    }

    /// Append a customer as a waypoint
    pub fn add_point(&self, point: &CustomerPoint) -> Result<()> {
        let waypoint = self.report(Waypoint::from_point(point))?;
        self.add(waypoint)
    }

    /// Remove by identity; `false` when no such waypoint exists
    pub fn remove(&self, id: &WaypointId) -> bool {
        let removed = {
            let mut waypoints = lock(&self.inner.waypoints);
            let before = waypoints.len();
            waypoints.retain(|w| &w.id != id);
            waypoints.len() != before
        };
        if removed {
            self.edited();
        }
        removed
    }

    pub fn clear(&self) {
        lock(&self.inner.waypoints).clear();
        self.edited();
    }

    /// Make `point` the destination. A prior entry for the same point is
    /// moved to the end; on a full list the current destination is replaced.
    pub fn set_destination(&self, point: &CustomerPoint) -> Result<()> {
        let waypoint = self.report(Waypoint::from_point(point))?;
        {
            let mut waypoints = lock(&self.inner.waypoints);
            waypoints.retain(|w| w.id != waypoint.id);
            if waypoints.len() >= self.inner.max_waypoints {
                waypoints.pop();
            }
            waypoints.push(waypoint);
        }
        self.edited();
        Ok(())
    }

    /// Customer whose detail view is open; seeds the destination of an empty route
    pub fn set_active_customer(&self, point: Option<PointRef>) {
        *lock(&self.inner.active_customer) = point;
    }

    pub fn is_preview_open(&self) -> bool {
        self.inner.preview_open.load(Ordering::SeqCst)
    }

    /// Open the preview panel and render it
    pub async fn open_preview(&self) -> PreviewOutcome {
        self.inner.preview_open.store(true, Ordering::SeqCst);
        self.render_preview().await
    }

    /// Close the panel; a render still in flight is invalidated
    pub fn close_preview(&self) {
        self.inner.preview_open.store(false, Ordering::SeqCst);
        self.inner.sequence.fetch_add(1, Ordering::SeqCst);
        self.inner.panel.clear_route();
    }

    /// Latest sequence number issued
    pub fn sequence(&self) -> u64 {
        self.inner.sequence.load(Ordering::SeqCst)
    }

    /// Plan the current route and show the result unless a newer render started meanwhile
    pub async fn render_preview(&self) -> PreviewOutcome {
        self.seed_destination();
        // Every render supersedes the ones in flight, including an empty one
        let sequence = self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let waypoints = self.waypoints();
        let Some((destination, vias)) = waypoints.split_last() else {
            let status = RouteStatus::MissingDestination;
            self.inner.panel.clear_route();
            self.inner.panel.show_status(&status);
            return PreviewOutcome::Applied(status);
        };

        self.inner.panel.show_status(&RouteStatus::Planning);

        let (origin, origin_source) = self.resolve_origin().await;
        let query = RouteQuery {
            origin,
            destination: destination.position,
            waypoints: vias.iter().map(|w| w.position).collect(),
        };
        let result = self.inner.planner.plan(&query).await;

        if self.inner.sequence.load(Ordering::SeqCst) != sequence {
            tracing::debug!(sequence, latest = self.sequence(), "Discarding stale route response");
            return PreviewOutcome::Discarded { sequence };
        }

        let panel = &self.inner.panel;
        let status = match result {
            Ok(plan) => match plan.routes.first() {
                Some(route) => {
                    panel.draw_route(route);
                    tracing::info!(summary = %route.summary(), ?origin_source, "Route planned");
                    RouteStatus::Summary { route: *route, origin_source }
                }
                None => {
                    panel.clear_route();
                    RouteStatus::NoRoute
                }
            },
            Err(GeodashError::NoRoute) => {
                panel.clear_route();
                RouteStatus::NoRoute
            }
            Err(e) => {
                tracing::warn!(error = %e, "Route planning failed");
                panel.clear_route();
                RouteStatus::Failed(match e {
                    GeodashError::RoutePlanning { reason } => reason,
                    other => other.to_string(),
                })
            }
        };
        panel.show_status(&status);
        PreviewOutcome::Applied(status)
    }

    /// Web navigation for the current route: destination, via points and origin
    pub fn navigation_request(&self) -> Option<WebNavigation> {
        let waypoints = self.waypoints();
        let (destination, vias) = waypoints.split_last()?;

        let from = lock(&self.inner.last_origin)
            .map(|(position, _)| position)
            .or_else(|| self.inner.resolver.cached())
            .map(|position| (position, ORIGIN_LABEL.to_string()));

        Some(WebNavigation {
            to: NavTarget::Position {
                position: destination.position,
                name: destination.name.clone(),
            },
            from,
            via: vias.iter().map(|w| w.position).collect(),
        })
    }

    /// Origin used by the most recent render
    pub fn last_origin(&self) -> Option<(LngLat, OriginSource)> {
        *lock(&self.inner.last_origin)
    }

    fn seed_destination(&self) {
        let active = lock(&self.inner.active_customer).clone();
        let Some(point) = active else {
            return;
        };
        let mut waypoints = lock(&self.inner.waypoints);
        if waypoints.is_empty() {
            if let Ok(waypoint) = Waypoint::from_point(&point) {
                waypoints.push(waypoint);
            }
        }
    }

    /// First success wins: fresh location, cached location, map center,
    /// preview map center, configured default
    async fn resolve_origin(&self) -> (LngLat, OriginSource) {
        let inner = &self.inner;
        let origin = match inner.resolver.resolve(ResolveOptions::forced()).await {
            Ok(position) => (position, OriginSource::Geolocation),
            Err(e) => {
                tracing::warn!(error = %e, "Location unavailable, falling back for route origin");
                if let Some(position) = inner.resolver.cached() {
                    (position, OriginSource::CachedGeolocation)
                } else if let Some(position) = inner.map.center() {
                    (position, OriginSource::MapCenter)
                } else if let Some(position) = inner.preview_map.as_ref().and_then(|m| m.center()) {
                    (position, OriginSource::PreviewMapCenter)
                } else {
                    (inner.default_center, OriginSource::DefaultCenter)
                }
            }
        };
        *lock(&inner.last_origin) = Some(origin);
        origin
    }

    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.inner.notifier.notify(&e.to_string());
        }
        result
    }

    /// Re-render an open preview in the background
    fn edited(&self) {
        if !self.is_preview_open() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let this = self.clone();
                handle.spawn(async move {
                    this.render_preview().await;
                });
            }
            Err(_) => tracing::debug!("No runtime; preview refresh skipped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodash_adapters::{MemoryMapSurface, RecordingUi, StaticLocator, StaticRoutePlanner};
    use geodash_core::models::{Viewport, ViewportBounds};

    fn pos(lng: f64, lat: f64) -> LngLat {
        LngLat::new(lng, lat).unwrap()
    }

    fn orchestrator(ui: Arc<RecordingUi>, max_waypoints: usize) -> RouteOrchestrator {
        let map = Arc::new(MemoryMapSurface::new(Viewport {
            bounds: ViewportBounds::new(pos(120.0, 27.0), pos(121.0, 29.0)),
            zoom: 12.0,
        }));
        let resolver = GeolocationResolver::new(
            Arc::new(StaticLocator::failing("device", "denied")),
            None,
            None,
        );
        RouteOrchestrator::new(RouteSetup {
            planner: Arc::new(StaticRoutePlanner::single(1000.0, 120.0)),
            resolver,
            map,
            preview_map: None,
            panel: ui.clone(),
            notifier: ui,
            default_center: LngLat::DEFAULT_CENTER,
            max_waypoints,
        })
    }

    fn point(name: &str, lng: f64) -> CustomerPoint {
        CustomerPoint::new(name, pos(lng, 28.0))
    }

    #[test]
    fn test_duplicate_rejected_with_notice() {
        let ui = Arc::new(RecordingUi::new());
        let route = orchestrator(ui.clone(), 16);

        route.add_point(&point("a", 120.1)).unwrap();
        let err = route.add_point(&point("a", 120.1)).unwrap_err();
        assert!(matches!(err, GeodashError::DuplicateWaypoint { .. }));
        assert_eq!(route.waypoints().len(), 1);
        assert_eq!(ui.notices().len(), 1);
    }

    #[test]
    fn test_set_destination_moves_existing_entry() {
        let ui = Arc::new(RecordingUi::new());
        let route = orchestrator(ui, 3);
        for (name, lng) in [("a", 120.1), ("b", 120.2), ("c", 120.3)] {
            route.add_point(&point(name, lng)).unwrap();
        }

        route.set_destination(&point("a", 120.1)).unwrap();
        let names: Vec<_> = route.waypoints().into_iter().map(|w| w.name).collect();
        assert_eq!(names, vec!["b", "c", "a"]);

        // Full list: the current destination is replaced
        route.set_destination(&point("d", 120.4)).unwrap();
        let names: Vec<_> = route.waypoints().into_iter().map(|w| w.name).collect();
        assert_eq!(names, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let ui = Arc::new(RecordingUi::new());
        let route = orchestrator(ui, 16);
        route.add_point(&point("a", 120.1)).unwrap();
        route.add_point(&point("b", 120.2)).unwrap();

        let id = route.waypoints()[0].id.clone();
        assert!(route.remove(&id));
        assert!(!route.remove(&id));
        assert_eq!(route.destination().unwrap().name, "b");

        route.clear();
        assert!(route.waypoints().is_empty());
    }

    #[tokio::test]
    async fn test_empty_route_reports_missing_destination() {
        let ui = Arc::new(RecordingUi::new());
        let route = orchestrator(ui.clone(), 16);

        let outcome = route.render_preview().await;
        assert_eq!(outcome, PreviewOutcome::Applied(RouteStatus::MissingDestination));
        assert_eq!(route.sequence(), 1);
    }

    #[tokio::test]
    async fn test_active_customer_seeds_destination() {
        let ui = Arc::new(RecordingUi::new());
        let route = orchestrator(ui.clone(), 16);
        route.set_active_customer(Some(Arc::new(point("a", 120.1))));

        let outcome = route.render_preview().await;
        assert!(matches!(
            outcome,
            PreviewOutcome::Applied(RouteStatus::Summary {
                origin_source: OriginSource::MapCenter,
                ..
            })
        ));
        assert_eq!(route.waypoints().len(), 1);
        assert_eq!(route.navigation_request().unwrap().from.unwrap().0, pos(120.5, 28.0));
    }
}
