//! Integration tests for incremental marker reconciliation

use geodash_adapters::{AttachHook, MemoryMapSurface, RecordingUi};
use geodash_core::config::LabelConfig;
use geodash_core::models::{
    CustomerPoint, CustomerType, DeliveryType, LngLat, PointRef, Viewport, ViewportBounds,
};
use geodash_core::ports::MapMarker;
use geodash_engine::MarkerReconciler;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn point(name: &str, lng: f64, lat: f64) -> PointRef {
    Arc::new(CustomerPoint::new(name, LngLat::new(lng, lat).unwrap()))
}

fn viewport(west: f64, east: f64) -> Viewport {
    Viewport {
        bounds: ViewportBounds::new(
            LngLat::new(west, 27.0).unwrap(),
            LngLat::new(east, 28.0).unwrap(),
        ),
        zoom: 15.0,
    }
}

fn setup(limit: usize) -> (Arc<MemoryMapSurface>, Arc<RecordingUi>, MarkerReconciler) {
    let map = Arc::new(MemoryMapSurface::new(viewport(120.0, 121.0)));
    let ui = Arc::new(RecordingUi::new());
    let labels = LabelConfig { min_zoom: 14.0, limit, cache_factor: 3 };
    let reconciler = MarkerReconciler::new(map.clone(), ui.clone(), &labels);
    (map, ui, reconciler)
}

#[test]
fn test_unchanged_pass_preserves_marker_identity() {
    let (map, _, reconciler) = setup(100);
    let points = vec![point("a", 120.1, 27.1), point("b", 120.2, 27.2)];

    let first = reconciler.reconcile(&points, viewport(120.0, 121.0));
    assert_eq!(first.created, 2);
    let before = map.attached_markers();

    let second = reconciler.reconcile(&points, viewport(120.0, 121.0));
    assert_eq!(second.created, 0);
    assert_eq!(second.reused, 2);
    assert_eq!(second.updated, 0);

    let after = map.attached_markers();
    assert_eq!(map.markers_created(), 2);
    for (a, b) in before.iter().zip(&after) {
        assert!(Arc::ptr_eq(a, b));
        assert_eq!(b.update_count(), 0);
    }
}

#[test]
fn test_leaving_and_reentering_viewport() {
    let (map, _, reconciler) = setup(100);
    let points = vec![point("west", 120.1, 27.5), point("east", 121.4, 27.5)];

    reconciler.reconcile(&points, viewport(120.0, 121.0));
    let west = map.attached_marker("west").unwrap();
    assert!(map.attached_marker("east").is_none());

    // Pan east: "west" leaves, "east" enters
    let report = reconciler.reconcile(&points, viewport(121.0, 122.0));
    assert_eq!(report.removed, 1);
    assert_eq!(report.created, 1);
    assert!(!west.is_attached());
    assert!(map.attached_marker("east").is_some());
    assert_eq!(reconciler.cache_len(), 2);

    // Pan back: the cached "west" marker is re-attached, not rebuilt
    let report = reconciler.reconcile(&points, viewport(120.0, 121.0));
    assert_eq!(report.created, 0);
    assert_eq!(map.markers_created(), 2);
    assert!(Arc::ptr_eq(&west, &map.attached_marker("west").unwrap()));
}

#[test]
fn test_content_change_updates_in_place() {
    let (map, _, reconciler) = setup(100);
    let original = point("a", 120.1, 27.1);
    reconciler.reconcile(&[original], viewport(120.0, 121.0));

    let churned = Arc::new(
        CustomerPoint::new("a", LngLat::new(120.1, 27.1).unwrap())
            .with_types(CustomerType::Churned, DeliveryType::Delivery),
    );
    let report = reconciler.reconcile(&[churned], viewport(120.0, 121.0));

    assert_eq!(report.updated, 1);
    assert_eq!(map.markers_created(), 1);
    assert_eq!(map.markers()[0].update_count(), 1);
}

#[test]
fn test_activation_opens_latest_point() {
    let (map, ui, reconciler) = setup(100);
    reconciler.reconcile(&[point("a", 120.1, 27.1)], viewport(120.0, 121.0));

    let refreshed = Arc::new(
        CustomerPoint::new("a", LngLat::new(120.1, 27.1).unwrap()).with_demand(42.0),
    );
    reconciler.reconcile(&[refreshed], viewport(120.0, 121.0));

    assert!(map.attached_marker("a").unwrap().activate());
    assert_eq!(ui.opened_details(), vec!["a"]);
}

#[test]
fn test_eviction_respects_soft_bound() {
    // limit 2, soft bound 6
    let (map, _, reconciler) = setup(2);

    for step in 0..5 {
        let lng = 120.0 + step as f64;
        let points = vec![
            point(&format!("p{step}a"), lng + 0.1, 27.5),
            point(&format!("p{step}b"), lng + 0.2, 27.5),
        ];
        reconciler.reconcile(&points, viewport(lng, lng + 1.0));
    }

    assert_eq!(map.markers_created(), 10);
    assert_eq!(reconciler.cache_len(), 6);
    assert_eq!(reconciler.displayed_count(), 2);
    assert!(map.attached_marker("p4a").is_some());
}

#[test]
fn test_evicted_entry_is_rebuilt() {
    let (map, _, reconciler) = setup(1);
    // soft bound 3
    for step in 0..5 {
        let lng = 120.0 + step as f64;
        let points = [point(&format!("p{step}"), lng + 0.5, 27.5)];
        reconciler.reconcile(&points, viewport(lng, lng + 1.0));
    }
    assert_eq!(reconciler.cache_len(), 3);

    // p0 was the least recently displayed, so it was evicted
    reconciler.reconcile(&[point("p0", 120.5, 27.5)], viewport(120.0, 121.0));
    assert_eq!(map.markers_created(), 6);
}

#[test]
fn test_below_threshold_then_back() {
    let (map, _, reconciler) = setup(100);
    let points = vec![point("a", 120.1, 27.1)];
    reconciler.reconcile(&points, viewport(120.0, 121.0));

    let mut zoomed_out = viewport(120.0, 121.0);
    zoomed_out.zoom = 10.0;
    assert!(reconciler.reconcile(&points, zoomed_out).gated);
    assert!(map.attached_markers().is_empty());

    let report = reconciler.reconcile(&points, viewport(120.0, 121.0));
    assert_eq!(report.created, 0);
    assert_eq!(map.attached_markers().len(), 1);
}

#[test]
fn test_reentrant_pass_from_attach_callback() {
    let (map, _, reconciler) = setup(100);
    let reconciler = Arc::new(reconciler);
    let points = vec![point("a", 120.1, 27.1), point("b", 120.2, 27.2)];

    let fired = Arc::new(AtomicBool::new(false));
    let hook: AttachHook = {
        let reconciler = Arc::clone(&reconciler);
        let fired = Arc::clone(&fired);
        let points = points.clone();
        Arc::new(move || {
            if !fired.swap(true, Ordering::SeqCst) {
                reconciler.refresh(&points);
            }
        })
    };
    map.on_attach(hook);

    let report = reconciler.reconcile(&points, viewport(120.0, 121.0));

    assert!(fired.load(Ordering::SeqCst));
    // The nested pass placed both labels first; the outer copies were dropped
    assert_eq!(report.created, 0);
    assert_eq!(map.markers_created(), 4);
    assert_eq!(map.attached_markers().len(), 2);
    assert_eq!(reconciler.cache_len(), 2);
    assert_eq!(reconciler.displayed_count(), 2);
}
