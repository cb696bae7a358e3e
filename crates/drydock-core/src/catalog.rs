//! Context-independent type queries.
//!
//! These wrap the engine's global catalog lookups — properties of a type
//! itself, independent of any fitting. They take the engine capability
//! explicitly, translating statuses like every other call in this crate.

use tenet::{AttributeEngine, AttributeId, EffectId, State, TypeId};

use crate::error::Result;

/// Whether a type carries `effect` within the categories of `state`.
pub fn type_has_effect(
    engine: &dyn AttributeEngine,
    type_id: TypeId,
    state: State,
    effect: EffectId,
) -> Result<bool> {
    Ok(engine.type_has_effect(type_id, state, effect)?)
}

/// Whether a type carries any active-state effects.
pub fn type_has_active_effects(engine: &dyn AttributeEngine, type_id: TypeId) -> Result<bool> {
    Ok(engine.type_has_active_effects(type_id)?)
}

/// Whether a type carries any overload-state effects.
pub fn type_has_overload_effects(engine: &dyn AttributeEngine, type_id: TypeId) -> Result<bool> {
    Ok(engine.type_has_overload_effects(type_id)?)
}

/// Whether a type carries any effects projectable onto a target.
pub fn type_has_projectable_effects(engine: &dyn AttributeEngine, type_id: TypeId) -> Result<bool> {
    Ok(engine.type_has_projectable_effects(type_id)?)
}

/// A type's base attribute value, before any fitting modifies it.
pub fn type_base_attribute(
    engine: &dyn AttributeEngine,
    type_id: TypeId,
    attribute: AttributeId,
) -> Result<f64> {
    Ok(engine.type_base_attribute(type_id, attribute)?)
}

/// The `n`-th effect of a type carrying the standard attribute six-pack.
pub fn nth_type_effect_with_attributes(
    engine: &dyn AttributeEngine,
    type_id: TypeId,
    n: usize,
) -> Result<EffectId> {
    Ok(engine.nth_type_effect_with_attributes(type_id, n)?)
}
