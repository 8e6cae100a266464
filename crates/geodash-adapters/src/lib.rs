//! Geodash Adapters - Implementations of the platform ports
//!
//! `memory` holds in-process stand-ins for the map SDK, location tiers,
//! routing service, navigation host and UI, used for development and tests.
//! `amap` talks to the AMap web services over HTTP.

pub mod amap;
pub mod memory;

pub use amap::{AmapDrivingPlanner, AmapIpLocator};
pub use memory::{
    AttachHook, ManualRoutePlanner, MemoryMapSurface, MemoryMarker, RecordingNavigationHost,
    RecordingUi, StaticLocator, StaticRoutePlanner, UiEvent,
};
