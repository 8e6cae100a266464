//! Incremental marker reconciliation.
//!
//! Each pass diffs the desired label set (visible points, first N in
//! filtered order) against the markers already on the map. Markers are
//! cached by [`MarkerKey`] and reused across passes; a marker is only
//! touched when its position or content actually changed.

use crate::lock;
use geodash_core::config::LabelConfig;
use geodash_core::models::{LngLat, MarkerContent, MarkerOptions, PointRef, Viewport};
use geodash_core::ports::{ActivationHandler, DetailPresenter, MapMarker, MapSurface};
use geodash_geo::spatial::visible_points;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Composite marker identity: name plus exact coordinates
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkerKey {
    name: String,
    lng_bits: u64,
    lat_bits: u64,
}

impl MarkerKey {
    /// `None` for points without a valid position
    pub fn for_point(point: &PointRef) -> Option<Self> {
        let position = point.position?;
        Some(Self {
            name: point.name.clone(),
            lng_bits: position.lng().to_bits(),
            lat_bits: position.lat().to_bits(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

struct CacheEntry {
    marker: Arc<dyn MapMarker>,
    /// Point the activation handler opens; refreshed on every reuse
    point: Arc<Mutex<PointRef>>,
    /// Last position and content pushed to the marker
    position: LngLat,
    content: MarkerContent,
    displayed: bool,
    last_used: u64,
}

#[derive(Default)]
struct ReconcilerState {
    cache: HashMap<MarkerKey, CacheEntry>,
    pass: u64,
}

/// Host call decided under the state lock and applied after releasing it
enum MarkerOp {
    Update {
        marker: Arc<dyn MapMarker>,
        position: Option<LngLat>,
        content: Option<MarkerContent>,
        attach: bool,
    },
    Detach(Arc<dyn MapMarker>),
}

impl MarkerOp {
    fn apply(self) {
        match self {
            MarkerOp::Update { marker, position, content, attach } => {
                if let Some(position) = position {
                    marker.set_position(position);
                }
                if let Some(content) = content {
                    marker.set_content(content);
                }
                if attach {
                    marker.attach();
                }
            }
            MarkerOp::Detach(marker) => marker.detach(),
        }
    }
}

/// Visible point with no cached marker yet
struct PendingMarker {
    key: MarkerKey,
    position: LngLat,
    content: MarkerContent,
    point: PointRef,
}

/// What one reconciliation pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    /// Reused markers whose position or content changed
    pub updated: usize,
    /// Reused markers left untouched
    pub reused: usize,
    pub removed: usize,
    pub evicted: usize,
    pub visible: usize,
    /// Zoom was below the label threshold
    pub gated: bool,
}

/// Owns the marker cache for one map.
///
/// The cache lock is never held while the map SDK is called, so a host that
/// reports a viewport change from inside `attach` or `create_marker` may
/// reconcile again synchronously.
pub struct MarkerReconciler {
    map: Arc<dyn MapSurface>,
    detail: Arc<dyn DetailPresenter>,
    min_zoom: f64,
    limit: usize,
    soft_bound: usize,
    state: Mutex<ReconcilerState>,
}

impl MarkerReconciler {
    pub fn new(
        map: Arc<dyn MapSurface>,
        detail: Arc<dyn DetailPresenter>,
        labels: &LabelConfig,
    ) -> Self {
        Self {
            map,
            detail,
            min_zoom: labels.min_zoom,
            limit: labels.limit,
            soft_bound: labels.cache_bound(),
            state: Mutex::new(ReconcilerState::default()),
        }
    }

    /// Reconcile against the map's current viewport
    pub fn refresh(&self, filtered: &[PointRef]) -> ReconcileReport {
        self.reconcile(filtered, self.map.viewport())
    }

    pub fn reconcile(&self, filtered: &[PointRef], viewport: Viewport) -> ReconcileReport {
        let mut plan = Plan::default();
        let gated = viewport.zoom < self.min_zoom;

        let pass = {
            let mut guard = lock(&self.state);
            let state = &mut *guard;
            if gated {
                plan.report.gated = true;
                plan.report.removed = detach_all(&mut state.cache, &mut plan.ops);
                plan.report.evicted = self.evict(&mut state.cache);
            } else {
                state.pass += 1;
                plan.diff(state, filtered, &viewport, self.limit);
            }
            state.pass
        };

        let Plan { mut report, ops, pending } = plan;
        ops.into_iter().for_each(MarkerOp::apply);

        if gated {
            tracing::debug!(
                zoom = viewport.zoom,
                removed = report.removed,
                "Labels hidden below zoom threshold"
            );
            return report;
        }

        let built: Vec<(MarkerKey, CacheEntry)> = pending
            .into_iter()
            .map(|pending| {
                let marker = self
                    .map
                    .create_marker(MarkerOptions::label(pending.position, pending.content.clone()));
                let slot = Arc::new(Mutex::new(pending.point));
                marker.on_activate(self.activation_handler(Arc::clone(&slot)));
                marker.attach();
                let entry = CacheEntry {
                    marker,
                    point: slot,
                    position: pending.position,
                    content: pending.content,
                    displayed: true,
                    last_used: pass,
                };
                (pending.key, entry)
            })
            .collect();

        let mut superseded = Vec::new();
        {
            let mut state = lock(&self.state);
            for (key, entry) in built {
                // A nested pass may have placed the same key meanwhile
                match state.cache.entry(key) {
                    Entry::Vacant(slot) => {
                        slot.insert(entry);
                        report.created += 1;
                    }
                    Entry::Occupied(_) => superseded.push(MarkerOp::Detach(entry.marker)),
                }
            }
            report.evicted = self.evict(&mut state.cache);
        }
        superseded.into_iter().for_each(MarkerOp::apply);

        tracing::debug!(
            visible = report.visible,
            created = report.created,
            updated = report.updated,
            removed = report.removed,
            evicted = report.evicted,
            "Markers reconciled"
        );
        report
    }

    /// Detach every marker and drop the cache
    pub fn clear(&self) {
        let mut ops = Vec::new();
        {
            let mut state = lock(&self.state);
            detach_all(&mut state.cache, &mut ops);
            state.cache.clear();
        }
        ops.into_iter().for_each(MarkerOp::apply);
    }

    pub fn displayed_count(&self) -> usize {
        lock(&self.state).cache.values().filter(|e| e.displayed).count()
    }

    pub fn cache_len(&self) -> usize {
        lock(&self.state).cache.len()
    }

    fn activation_handler(&self, slot: Arc<Mutex<PointRef>>) -> ActivationHandler {
        let detail = Arc::clone(&self.detail);
        Arc::new(move || {
            let point = Arc::clone(&lock(&slot));
            detail.open(&point);
        })
    }

    /// Drop detached entries, least recently displayed first, down to the soft bound
    fn evict(&self, cache: &mut HashMap<MarkerKey, CacheEntry>) -> usize {
        if cache.len() <= self.soft_bound {
            return 0;
        }

        let mut detached: Vec<(u64, MarkerKey)> = cache
            .iter()
            .filter(|(_, entry)| !entry.displayed)
            .map(|(key, entry)| (entry.last_used, key.clone()))
            .collect();
        detached.sort_by_key(|(last_used, _)| *last_used);

        let excess = cache.len() - self.soft_bound;
        let mut evicted = 0;
        for (_, key) in detached.into_iter().take(excess) {
            cache.remove(&key);
            evicted += 1;
        }
        evicted
    }
}

#[derive(Default)]
struct Plan {
    report: ReconcileReport,
    ops: Vec<MarkerOp>,
    pending: Vec<PendingMarker>,
}

impl Plan {
    /// Diff the visible set against the cache without touching the map
    fn diff(
        &mut self,
        state: &mut ReconcilerState,
        filtered: &[PointRef],
        viewport: &Viewport,
        limit: usize,
    ) {
        let pass = state.pass;
        let mut wanted = HashSet::new();

        for point in visible_points(filtered, &viewport.bounds, limit) {
            let (Some(key), Some(position)) = (MarkerKey::for_point(&point), point.position) else {
                continue;
            };
            if !wanted.insert(key.clone()) {
                continue;
            }
            let content = MarkerContent::for_point(&point);

            match state.cache.get_mut(&key) {
                Some(entry) => {
                    *lock(&entry.point) = Arc::clone(&point);
                    let moved = (entry.position != position).then_some(position);
                    let restyled = (entry.content != content).then(|| content.clone());
                    let changed = moved.is_some() || restyled.is_some();
                    if changed {
                        self.report.updated += 1;
                    } else {
                        self.report.reused += 1;
                    }
                    if changed || !entry.displayed {
                        self.ops.push(MarkerOp::Update {
                            marker: Arc::clone(&entry.marker),
                            position: moved,
                            content: restyled,
                            attach: !entry.displayed,
                        });
                    }
                    entry.position = position;
                    entry.content = content;
                    entry.displayed = true;
                    entry.last_used = pass;
                }
                None => self.pending.push(PendingMarker { key, position, content, point }),
            }
        }

        for (key, entry) in state.cache.iter_mut() {
            if entry.displayed && !wanted.contains(key) {
                entry.displayed = false;
                self.ops.push(MarkerOp::Detach(Arc::clone(&entry.marker)));
                self.report.removed += 1;
            }
        }

        self.report.visible = wanted.len();
    }
}

fn detach_all(cache: &mut HashMap<MarkerKey, CacheEntry>, ops: &mut Vec<MarkerOp>) -> usize {
    let mut removed = 0;
    for entry in cache.values_mut().filter(|e| e.displayed) {
        entry.displayed = false;
        ops.push(MarkerOp::Detach(Arc::clone(&entry.marker)));
        removed += 1;
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodash_adapters::{MemoryMapSurface, RecordingUi};
    use geodash_core::models::{CustomerPoint, LngLat, ViewportBounds};

    fn point(name: &str, lng: f64, lat: f64) -> PointRef {
        Arc::new(CustomerPoint::new(name, LngLat::new(lng, lat).unwrap()))
    }

    fn viewport(zoom: f64) -> Viewport {
        Viewport {
            bounds: ViewportBounds::new(
                LngLat::new(120.0, 27.0).unwrap(),
                LngLat::new(121.0, 28.0).unwrap(),
            ),
            zoom,
        }
    }

    fn labels(limit: usize) -> LabelConfig {
        LabelConfig { min_zoom: 14.0, limit, cache_factor: 3 }
    }

    #[test]
    fn test_key_distinguishes_fields() {
        let a = MarkerKey::for_point(&point("a,1", 120.0, 27.0)).unwrap();
        let b = MarkerKey::for_point(&point("a", 120.0, 27.0)).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.name(), "a,1");
    }

    #[test]
    fn test_display_limit_is_first_n() {
        let map = Arc::new(MemoryMapSurface::new(viewport(15.0)));
        let reconciler =
            MarkerReconciler::new(map.clone(), Arc::new(RecordingUi::new()), &labels(2));
        let points =
            vec![point("a", 120.1, 27.1), point("b", 120.2, 27.2), point("c", 120.3, 27.3)];

        let report = reconciler.reconcile(&points, viewport(15.0));
        assert_eq!(report.visible, 2);
        assert!(map.attached_marker("a").is_some());
        assert!(map.attached_marker("b").is_some());
        assert!(map.attached_marker("c").is_none());
    }

    #[test]
    fn test_zoom_gate_detaches_everything() {
        let map = Arc::new(MemoryMapSurface::new(viewport(15.0)));
        let reconciler =
            MarkerReconciler::new(map.clone(), Arc::new(RecordingUi::new()), &labels(10));
        let points = vec![point("a", 120.1, 27.1)];

        reconciler.reconcile(&points, viewport(15.0));
        let report = reconciler.reconcile(&points, viewport(12.0));
        assert!(report.gated);
        assert_eq!(report.removed, 1);
        assert!(map.attached_markers().is_empty());
        assert_eq!(reconciler.cache_len(), 1);
    }
}
