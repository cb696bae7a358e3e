//! # Drydock Core
//!
//! Fitting context modeling layer for Drydock.
//!
//! This crate owns the object-lifecycle, addressing, and relationship
//! bookkeeping of a ship-fitting simulation: slot allocation for fitted
//! items, the per-pilot [`SimContext`] aggregate, the targeting graph
//! between contexts, the fleet command hierarchy, and the correlation of
//! anonymous bulk engine results back to the contexts that produced them.
//! All game-rules math lives behind the injected
//! [`AttributeEngine`](tenet::AttributeEngine) capability from [`tenet`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use drydock_core::SimContext;
//!
//! let engine: Rc<dyn tenet::AttributeEngine> = acquire_engine();
//! let mut attacker = SimContext::new(engine.clone())?;
//! let mut victim = SimContext::new(engine)?;
//!
//! attacker.set_ship(hull)?;
//! let gun = attacker.add_module_with_state(autocannon, State::Active)?;
//! attacker.target(Location::Module(gun), &victim)?;
//!
//! let report = attacker.get_capacitor_all(true)?;
//! assert!(report.contains(victim.id()));
//! ```
//!
//! ## Concurrency
//!
//! Single-threaded by design: one logical thread of control manipulates a
//! context and its relationships at a time. Nothing here is `Send` or
//! `Sync`, and no operation suspends — each call completes or fails before
//! returning.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// Re-export the engine interface substrate
pub use tenet;

pub mod capacitor;
pub mod catalog;
pub mod context;
pub mod error;
pub mod fleet;
pub mod slots;

mod targeting;

// Re-exports for convenience
pub use capacitor::CapacitorReport;
pub use catalog::{
    nth_type_effect_with_attributes, type_base_attribute, type_has_active_effects,
    type_has_effect, type_has_overload_effects, type_has_projectable_effects,
};
pub use context::{ContextId, ModuleFit, SimContext, DEFAULT_SKILL_LEVEL};
pub use error::{EngineFault, Error, Result};
pub use fleet::FleetContext;
pub use slots::SlotArena;

#[cfg(test)]
mod tests;
