//! Tiered, cached and coalesced geolocation.
//!
//! A resolution tries the precise tier first and falls back to the coarse
//! tier. At most one resolution is in flight at any time; every caller that
//! arrives while it runs awaits the same shared future and receives the same
//! outcome. Diagnostics are published on a watch channel at every transition.

use crate::lock;
use futures::future::{BoxFuture, FutureExt, Shared};
use geodash_core::error::{GeodashError, LocationError};
use geodash_core::models::{GeoDiagnostics, LngLat, LocateMethod, LocateStatus, PositionFix};
use geodash_core::ports::{LocationProvider, MapSurface};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

type Lookup = Shared<BoxFuture<'static, Result<LngLat, LocationError>>>;

/// Options for [`GeolocationResolver::resolve`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Ignore the cached location
    pub force: bool,
    /// Re-center the map on the resolved location
    pub center_on_success: bool,
}

impl ResolveOptions {
    pub fn forced() -> Self {
        Self { force: true, center_on_success: false }
    }

    pub fn centering(mut self) -> Self {
        self.center_on_success = true;
        self
    }
}

#[derive(Default)]
struct ResolverState {
    cached: Option<LngLat>,
    in_flight: Option<(u64, Lookup)>,
    next_id: u64,
}

struct Tiers {
    precise: Arc<dyn LocationProvider>,
    coarse: Option<Arc<dyn LocationProvider>>,
    state: Mutex<ResolverState>,
    diagnostics: watch::Sender<GeoDiagnostics>,
}

/// Geolocation with a precise tier, an optional coarse tier and a cache
#[derive(Clone)]
pub struct GeolocationResolver {
    tiers: Arc<Tiers>,
    map: Option<Arc<dyn MapSurface>>,
}

impl GeolocationResolver {
    pub fn new(
        precise: Arc<dyn LocationProvider>,
        coarse: Option<Arc<dyn LocationProvider>>,
        map: Option<Arc<dyn MapSurface>>,
    ) -> Self {
        let (diagnostics, _) = watch::channel(GeoDiagnostics::default());
        Self {
            tiers: Arc::new(Tiers {
                precise,
                coarse,
                state: Mutex::new(ResolverState::default()),
                diagnostics,
            }),
            map,
        }
    }

    /// Resolve the user's location.
    ///
    /// Unforced calls return the cached location when there is one. A call
    /// arriving while a lookup runs joins it, forced or not.
    pub async fn resolve(&self, options: ResolveOptions) -> Result<LngLat, LocationError> {
        let lookup = {
            let mut state = lock(&self.tiers.state);
            let cached = state.cached;
            if let (Some(cached), false) = (cached, options.force) {
                drop(state);
                tracing::debug!(%cached, "Using cached location");
                self.center(options, cached);
                return Ok(cached);
            }

            let joined = state.in_flight.as_ref().map(|(_, lookup)| lookup.clone());
            match joined {
                Some(lookup) => lookup,
                None => {
                    state.next_id += 1;
                    let id = state.next_id;
                    let lookup = run_lookup(Arc::clone(&self.tiers), id).boxed().shared();
                    state.in_flight = Some((id, lookup.clone()));
                    lookup
                }
            }
        };

        let result = lookup.await;
        if let Ok(position) = result {
            self.center(options, position);
        }
        result
    }

    /// Last successfully resolved location
    pub fn cached(&self) -> Option<LngLat> {
        lock(&self.tiers.state).cached
    }

    pub fn is_resolving(&self) -> bool {
        lock(&self.tiers.state).in_flight.is_some()
    }

    /// Current diagnostics record
    pub fn diagnostics(&self) -> GeoDiagnostics {
        self.tiers.diagnostics.borrow().clone()
    }

    /// Receiver that observes every diagnostics transition
    pub fn watch_diagnostics(&self) -> watch::Receiver<GeoDiagnostics> {
        self.tiers.diagnostics.subscribe()
    }

    fn center(&self, options: ResolveOptions, position: LngLat) {
        if options.center_on_success {
            if let Some(map) = &self.map {
                map.set_center(position);
            }
        }
    }
}

impl Tiers {
    fn publish(&self, diagnostics: GeoDiagnostics) {
        self.diagnostics.send_replace(diagnostics);
    }

    fn finish(&self, id: u64, result: &Result<LngLat, LocationError>) {
        let mut state = lock(&self.state);
        if let Ok(position) = result {
            state.cached = Some(*position);
        }
        if matches!(state.in_flight, Some((current, _)) if current == id) {
            state.in_flight = None;
        }
    }
}

async fn run_lookup(tiers: Arc<Tiers>, id: u64) -> Result<LngLat, LocationError> {
    let result = locate_with_fallback(&tiers).await;
    tiers.finish(id, &result);
    result
}

async fn locate_with_fallback(tiers: &Tiers) -> Result<LngLat, LocationError> {
    tiers.publish(GeoDiagnostics::transition(LocateStatus::Locating, LocateMethod::Precise, None));

    let precise_error = match attempt(tiers.precise.as_ref()).await {
        Ok((position, fix)) => {
            tiers.publish(GeoDiagnostics::resolved(
                LocateStatus::Success,
                LocateMethod::Precise,
                &fix,
            ));
            tracing::info!(%position, provider = tiers.precise.name(), "Location resolved");
            return Ok(position);
        }
        Err(message) => message,
    };

    tracing::warn!(
        provider = tiers.precise.name(),
        error = %precise_error,
        "Precise location failed, trying coarse tier"
    );
    tiers.publish(GeoDiagnostics::transition(
        LocateStatus::Error,
        LocateMethod::Precise,
        Some(precise_error.clone()),
    ));

    let Some(coarse) = &tiers.coarse else {
        tiers.publish(GeoDiagnostics::transition(
            LocateStatus::FallbackError,
            LocateMethod::Precise,
            Some(precise_error.clone()),
        ));
        return Err(LocationError { method: LocateMethod::Precise, message: precise_error });
    };

    tiers.publish(GeoDiagnostics::transition(
        LocateStatus::FallbackLocating,
        LocateMethod::Coarse,
        None,
    ));

    match attempt(coarse.as_ref()).await {
        Ok((position, fix)) => {
            tiers.publish(GeoDiagnostics::resolved(
                LocateStatus::FallbackSuccess,
                LocateMethod::Coarse,
                &fix,
            ));
            tracing::info!(%position, provider = coarse.name(), "Location resolved by coarse tier");
            Ok(position)
        }
        Err(coarse_error) => {
            // The coarse message wins unless it carries nothing
            let error = if coarse_error.trim().is_empty() {
                LocationError { method: LocateMethod::Precise, message: precise_error }
            } else {
                LocationError { method: LocateMethod::Coarse, message: coarse_error }
            };
            tracing::warn!(error = %error, "All location tiers failed");
            tiers.publish(GeoDiagnostics::transition(
                LocateStatus::FallbackError,
                error.method,
                Some(error.message.clone()),
            ));
            Err(error)
        }
    }
}

/// One tier: locate and validate the fix
async fn attempt(provider: &dyn LocationProvider) -> Result<(LngLat, PositionFix), String> {
    let fix = provider.locate().await.map_err(|e| match e {
        GeodashError::LocationUnavailable { reason } => reason,
        other => other.to_string(),
    })?;

    match LngLat::new(fix.lng, fix.lat) {
        Ok(position) => Ok((position, fix)),
        Err(e) => Err(e.to_string()),
    }
}
