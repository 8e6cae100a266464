//! Geodash Geo - Viewport geometry and coordinate checks
//!
//! Thin layer over the `geo` crate: viewport containment (including
//! antimeridian-crossing viewports), viewport culling of the filtered
//! dataset and dataset validation.

pub mod models;
pub mod spatial;
pub mod validation;
