//! Integration and property tests for the modeling layer.
//!
//! - `integration.rs`: end-to-end scenarios across contexts, targeting,
//!   fleets, and bulk result correlation
//! - `properties.rs`: property tests for slot recycling and targeting
//!   symmetry
//! - `helpers.rs`: the scripted catalog and scenario builders

mod helpers;
mod integration;
mod properties;

pub use helpers::*;
