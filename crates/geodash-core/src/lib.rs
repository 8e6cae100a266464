//! Geodash Core - Domain models, reactive state and configuration
//!
//! This crate contains the dataset-side logic (normalization, filtering,
//! search, statistics) and the port definitions that the mapping,
//! geolocation, routing and navigation adapters must implement.

pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod ports;
pub mod search;
pub mod stats;
pub mod store;
pub mod telemetry;

pub use error::{ErrorKind, GeodashError, LocationError, Result};
pub use store::{Mergeable, ReactiveStore, Subscription};
