//! # Tenet
//!
//! Attribute engine interface substrate for Drydock fitting contexts.
//!
//! Tenet defines the boundary between the fitting model and the rules
//! engine that actually computes attribute values: typed identifiers, the
//! [`Location`] addressing scheme, the result record types, the tri-state
//! status model, and the [`AttributeEngine`] capability trait itself. The
//! crate contains no game-rules math — implementations of the trait do.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use tenet::AttributeEngine;
//!
//! // Obtain an engine implementation (here: the scripted test double).
//! let engine: Rc<dyn AttributeEngine> = Rc::new(my_engine);
//!
//! let ctx = engine.create_context()?;
//! engine.set_ship(ctx, hull_type)?;
//! let agility = engine.location_attribute(ctx, Location::Ship, agility_attr)?;
//! ```
//!
//! The `test-utils` feature exposes [`scripted::ScriptedEngine`], an
//! in-memory engine driven by a scripted type catalog, for downstream test
//! suites.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod engine;
pub mod ids;
pub mod location;
pub mod records;
#[cfg(any(test, feature = "test-utils"))]
pub mod scripted;

// Re-exports for convenience
pub use engine::{AttributeEngine, BufferLease, EngineResult, EngineStatus, RawBuffer};
pub use ids::{AttributeId, BufferId, EffectId, EngineHandle, FleetHandle, SlotKey, TypeId};
pub use location::{Location, State};
pub use records::{AffectorFlags, AffectorRecord, CapacitorRecord, EffectAttributes, Stability};
