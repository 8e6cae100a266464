//! Geodash Engine - Stateful orchestration for the dashboard
//!
//! Everything that owns mutable state or races asynchronous work lives here:
//! tiered geolocation with coalescing, incremental marker reconciliation,
//! versioned route planning and the app-launch/web-fallback race. The
//! [`DashboardContext`] wires them together around one reactive store.

pub mod context;
pub mod deeplink;
pub mod geolocation;
pub mod markers;
pub mod route;

pub use context::{DashboardContext, Platform};
pub use deeplink::{
    CleanupTrigger, DeepLinkBuilder, DeepLinkNavigator, NavTarget, NavigationOutcome,
    WebNavigation,
};
pub use geolocation::{GeolocationResolver, ResolveOptions};
pub use markers::{MarkerKey, MarkerReconciler, ReconcileReport};
pub use route::{PreviewOutcome, RouteOrchestrator, RouteSetup};

use std::sync::{Mutex, MutexGuard, PoisonError};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
