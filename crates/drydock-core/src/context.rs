//! The simulation context: one pilot's full fitting state.
//!
//! [`SimContext`] is the aggregate root of the modeling layer. It owns the
//! fitted ship, the implant and module arenas, drone stacks, skill levels
//! and toggled effects, and the two relationship tables of the targeting
//! graph. Every mutation follows the same discipline:
//!
//! 1. **validate** locally — bad slots and empty stacks fail [`NotFound`]
//!    before the engine is involved;
//! 2. **delegate** to the [`AttributeEngine`] and translate its status;
//! 3. **commit** the local bookkeeping only after the engine accepted.
//!
//! An engine failure therefore never leaves a half-updated context, and a
//! local failure never reaches the engine at all.
//!
//! # Ownership
//!
//! A `SimContext` is the sole owner of its engine context handle. Targeting
//! and fleet relationships hold weak, identity-keyed references only, so
//! dropping a context is always safe: the drop detaches both sides of every
//! live targeting edge, then releases the engine handle exactly once.
//!
//! [`NotFound`]: crate::error::Error::NotFound
//!
//! # Example
//!
//! ```rust,ignore
//! let mut ctx = SimContext::new(engine.clone())?;
//! ctx.set_ship(hull)?;
//! let slot = ctx.add_module_with_state(autocannon, State::Active)?;
//! ctx.add_charge(slot, emp_s)?;
//! let per_shot = ctx.get_charge_attribute(slot, damage_attr)?;
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tenet::{
    AffectorRecord, AttributeEngine, AttributeId, BufferLease, EffectAttributes, EffectId,
    EngineHandle, Location, SlotKey, State, TypeId,
};

use crate::capacitor::{correlate, CapacitorReport, RelevantContext};
use crate::error::{Error, Result};
use crate::slots::SlotArena;
use crate::targeting::{TargetEdge, TargetTable, TargeterTable};

/// Skill level assumed for every skill without an explicit override.
pub const DEFAULT_SKILL_LEVEL: u8 = 5;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Core-side identity of a simulation context.
///
/// Ids are process-wide monotonic and never reused, which makes them safe
/// keys for relationship tables that may outlive the context they refer to.
/// (Engine handles are not: the engine may recycle one after its context is
/// destroyed.)
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx:{}", self.0)
    }
}

/// One fitted module: its type, activation state, and loaded charge.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleFit {
    /// Module type.
    pub module: TypeId,
    /// Current activation state.
    pub state: State,
    /// Loaded charge, if any.
    pub charge: Option<TypeId>,
}

/// Mutable state behind a [`SimContext`] handle.
///
/// Crate-internal: relationship tables reach this through weak handles, and
/// the drop implementation is what keeps the targeting graph free of
/// dangling entries.
pub(crate) struct ContextState {
    pub(crate) id: ContextId,
    pub(crate) handle: EngineHandle,
    pub(crate) engine: Rc<dyn AttributeEngine>,
    pub(crate) ship: Option<TypeId>,
    pub(crate) implants: SlotArena<TypeId>,
    pub(crate) modules: SlotArena<ModuleFit>,
    pub(crate) drones: BTreeMap<TypeId, u32>,
    pub(crate) skill_overrides: BTreeMap<TypeId, u8>,
    pub(crate) default_skill_level: u8,
    pub(crate) toggled_effects: BTreeSet<(Location, EffectId)>,
    pub(crate) targets: TargetTable,
    pub(crate) targeters: TargeterTable,
}

impl ContextState {
    /// Fails `NotFound` unless `location` is currently addressable here.
    fn validate_location(&self, location: Location) -> Result<()> {
        let present = match location {
            Location::Character | Location::Skill(_) => true,
            Location::Ship => self.ship.is_some(),
            Location::Implant(slot) => self.implants.contains(slot),
            Location::Module(slot) => self.modules.contains(slot),
            Location::Charge(slot) => {
                self.modules.get(slot).is_some_and(|fit| fit.charge.is_some())
            }
            Location::Drone(type_id) => self.drones.contains_key(&type_id),
        };
        if present {
            Ok(())
        } else {
            Err(Error::NotFound)
        }
    }

    /// Withdraws the outgoing edge at `location`, cleaning up the target's
    /// inbound entry unless another edge still points at it.
    fn unlink_target(&mut self, location: Location) {
        if let Some(old) = self.targets.remove(location) {
            if !self.targets.has_edge_to(old.id) {
                if let Some(other) = old.upgrade() {
                    other.borrow_mut().targeters.remove(self.id);
                }
            }
        }
    }

    /// This context's capacitor network: itself, every live targeter, every
    /// live outgoing target. Deduplicated, in id order.
    fn relevant_set(&self) -> Vec<RelevantContext> {
        let mut seen = BTreeMap::new();
        seen.insert(self.id, self.handle);
        for (id, handle) in self.targeters.live() {
            seen.insert(id, handle);
        }
        for edge in self.targets.edges() {
            if edge.upgrade().is_some() {
                seen.insert(edge.id, edge.handle);
            }
        }
        seen.into_iter().map(|(id, handle)| RelevantContext { id, handle }).collect()
    }
}

impl Drop for ContextState {
    fn drop(&mut self) {
        // Detach both sides of every live edge before the engine handle goes
        // away: outgoing edges' back-references first, then the forward
        // edges of everyone still targeting this context.
        for edge in self.targets.edges() {
            if let Some(other) = edge.upgrade() {
                other.borrow_mut().targeters.remove(self.id);
            }
        }
        for weak in self.targeters.entries() {
            if let Some(other) = weak.upgrade() {
                other.borrow_mut().targets.remove_edges_to(self.id);
            }
        }
        if let Err(status) = self.engine.destroy_context(self.handle) {
            warn!(handle = %self.handle, %status, "engine refused context teardown");
        }
        debug!(id = %self.id, "fitting context destroyed");
    }
}

/// One pilot's full fitting and simulation state.
///
/// See the module docs for the mutation discipline and ownership rules.
pub struct SimContext {
    pub(crate) state: Rc<RefCell<ContextState>>,
}

impl fmt::Debug for SimContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SimContext")
            .field("id", &state.id)
            .field("handle", &state.handle)
            .finish_non_exhaustive()
    }
}

impl SimContext {
    /// Creates an empty context against the given engine.
    ///
    /// # Errors
    ///
    /// Translates the engine's status if context allocation fails.
    pub fn new(engine: Rc<dyn AttributeEngine>) -> Result<Self> {
        let handle = engine.create_context()?;
        let id = ContextId::next();
        debug!(%id, %handle, "fitting context created");
        Ok(Self {
            state: Rc::new(RefCell::new(ContextState {
                id,
                handle,
                engine,
                ship: None,
                implants: SlotArena::new(),
                modules: SlotArena::new(),
                drones: BTreeMap::new(),
                skill_overrides: BTreeMap::new(),
                default_skill_level: DEFAULT_SKILL_LEVEL,
                toggled_effects: BTreeSet::new(),
                targets: TargetTable::new(),
                targeters: TargeterTable::new(),
            })),
        })
    }

    /// Core-side identity of this context.
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.state.borrow().id
    }

    /// Engine-side identity of this context; the token bulk results carry.
    #[must_use]
    pub fn engine_handle(&self) -> EngineHandle {
        self.state.borrow().handle
    }

    // ------------------------------------------------------------------
    // Implants
    // ------------------------------------------------------------------

    /// Plugs an implant and returns its slot.
    pub fn add_implant(&mut self, implant: TypeId) -> Result<SlotKey> {
        let state = &mut *self.state.borrow_mut();
        let slot = state.implants.vacant_key();
        state.engine.add_implant(state.handle, slot, implant)?;
        Ok(state.implants.insert(implant))
    }

    /// Unplugs the implant at `slot`.
    pub fn remove_implant(&mut self, slot: SlotKey) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        if !state.implants.contains(slot) {
            return Err(Error::NotFound);
        }
        state.engine.remove_implant(state.handle, slot)?;
        state.implants.remove(slot);
        Ok(())
    }

    /// The implant type at `slot`, if the slot is live.
    #[must_use]
    pub fn implant(&self, slot: SlotKey) -> Option<TypeId> {
        self.state.borrow().implants.get(slot).copied()
    }

    /// Number of plugged implants.
    #[must_use]
    pub fn implant_count(&self) -> usize {
        self.state.borrow().implants.len()
    }

    // ------------------------------------------------------------------
    // Skills
    // ------------------------------------------------------------------

    /// Sets the level assumed for all skills without an override.
    pub fn set_default_skill_level(&mut self, level: u8) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        state.engine.set_default_skill_level(state.handle, level)?;
        state.default_skill_level = level;
        Ok(())
    }

    /// Overrides the trained level of one skill.
    pub fn set_skill_level(&mut self, skill: TypeId, level: u8) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        state.engine.set_skill_level(state.handle, skill, level)?;
        state.skill_overrides.insert(skill, level);
        Ok(())
    }

    /// Drops the override for one skill.
    pub fn reset_skill_level(&mut self, skill: TypeId) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        state.engine.reset_skill_level(state.handle, skill)?;
        state.skill_overrides.remove(&skill);
        Ok(())
    }

    /// Drops every skill override.
    pub fn reset_skill_levels(&mut self) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        state.engine.reset_skill_levels(state.handle)?;
        state.skill_overrides.clear();
        Ok(())
    }

    /// The effective level of one skill.
    #[must_use]
    pub fn skill_level(&self, skill: TypeId) -> u8 {
        let state = self.state.borrow();
        state.skill_overrides.get(&skill).copied().unwrap_or(state.default_skill_level)
    }

    // ------------------------------------------------------------------
    // Ship
    // ------------------------------------------------------------------

    /// Sets or replaces the fitted hull.
    pub fn set_ship(&mut self, ship: TypeId) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        state.engine.set_ship(state.handle, ship)?;
        state.ship = Some(ship);
        Ok(())
    }

    /// The fitted hull, if any.
    #[must_use]
    pub fn ship(&self) -> Option<TypeId> {
        self.state.borrow().ship
    }

    // ------------------------------------------------------------------
    // Modules and charges
    // ------------------------------------------------------------------

    /// Fits a module in the engine's default state, unloaded.
    pub fn add_module(&mut self, module: TypeId) -> Result<SlotKey> {
        self.add_module_inner(module, None, None)
    }

    /// Fits a module in an explicit state, unloaded.
    pub fn add_module_with_state(&mut self, module: TypeId, state: State) -> Result<SlotKey> {
        self.add_module_inner(module, Some(state), None)
    }

    /// Fits a module in the engine's default state with a charge loaded.
    pub fn add_module_with_charge(&mut self, module: TypeId, charge: TypeId) -> Result<SlotKey> {
        self.add_module_inner(module, None, Some(charge))
    }

    /// Fits a module in an explicit state with a charge loaded.
    pub fn add_module_full(
        &mut self,
        module: TypeId,
        state: State,
        charge: TypeId,
    ) -> Result<SlotKey> {
        self.add_module_inner(module, Some(state), Some(charge))
    }

    fn add_module_inner(
        &mut self,
        module: TypeId,
        fit_state: Option<State>,
        charge: Option<TypeId>,
    ) -> Result<SlotKey> {
        let state = &mut *self.state.borrow_mut();
        let slot = state.modules.vacant_key();
        state.engine.add_module(state.handle, slot, module, fit_state, charge)?;
        Ok(state.modules.insert(ModuleFit {
            module,
            state: fit_state.unwrap_or_default(),
            charge,
        }))
    }

    /// Unfits the module at `slot`, along with any loaded charge and any
    /// projections leaving from the slot.
    pub fn remove_module(&mut self, slot: SlotKey) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        if !state.modules.contains(slot) {
            return Err(Error::NotFound);
        }
        state.engine.remove_module(state.handle, slot)?;
        state.modules.remove(slot);
        state.unlink_target(Location::Module(slot));
        state.unlink_target(Location::Charge(slot));
        Ok(())
    }

    /// Changes the activation state of the module at `slot`.
    pub fn set_module_state(&mut self, slot: SlotKey, new_state: State) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        if !state.modules.contains(slot) {
            return Err(Error::NotFound);
        }
        state.engine.set_module_state(state.handle, slot, new_state)?;
        if let Some(fit) = state.modules.get_mut(slot) {
            fit.state = new_state;
        }
        Ok(())
    }

    /// Loads a charge into the module at `slot`.
    ///
    /// Fails [`Error::NotFound`] if the slot is absent or the module already
    /// holds a charge; unload first to replace.
    pub fn add_charge(&mut self, slot: SlotKey, charge: TypeId) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        match state.modules.get(slot) {
            None => return Err(Error::NotFound),
            Some(fit) if fit.charge.is_some() => return Err(Error::NotFound),
            Some(_) => {}
        }
        state.engine.add_charge(state.handle, slot, charge)?;
        if let Some(fit) = state.modules.get_mut(slot) {
            fit.charge = Some(charge);
        }
        Ok(())
    }

    /// Unloads the charge from the module at `slot`.
    pub fn remove_charge(&mut self, slot: SlotKey) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        match state.modules.get(slot) {
            None => return Err(Error::NotFound),
            Some(fit) if fit.charge.is_none() => return Err(Error::NotFound),
            Some(_) => {}
        }
        state.engine.remove_charge(state.handle, slot)?;
        if let Some(fit) = state.modules.get_mut(slot) {
            fit.charge = None;
        }
        state.unlink_target(Location::Charge(slot));
        Ok(())
    }

    /// The fit at `slot`, if the slot is live.
    #[must_use]
    pub fn module(&self, slot: SlotKey) -> Option<ModuleFit> {
        self.state.borrow().modules.get(slot).copied()
    }

    /// Number of fitted modules.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.state.borrow().modules.len()
    }

    // ------------------------------------------------------------------
    // Drones
    // ------------------------------------------------------------------

    /// Adds `count` drones of one type, accumulating onto any existing
    /// stack.
    pub fn add_drone(&mut self, drone: TypeId, count: u32) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        state.engine.add_drone(state.handle, drone, count)?;
        *state.drones.entry(drone).or_insert(0) += count;
        Ok(())
    }

    /// Removes `count` drones from a stack.
    ///
    /// Fails [`Error::NotFound`] if the stack is absent or smaller than
    /// `count`; nothing is removed on failure.
    pub fn remove_drone_partial(&mut self, drone: TypeId, count: u32) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        match state.drones.get(&drone) {
            None => return Err(Error::NotFound),
            Some(have) if *have < count => return Err(Error::NotFound),
            Some(_) => {}
        }
        state.engine.remove_drone_partial(state.handle, drone, count)?;
        if let Some(have) = state.drones.get_mut(&drone) {
            *have -= count;
            if *have == 0 {
                state.drones.remove(&drone);
            }
        }
        Ok(())
    }

    /// Removes a whole drone stack.
    pub fn remove_drone(&mut self, drone: TypeId) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        if !state.drones.contains_key(&drone) {
            return Err(Error::NotFound);
        }
        state.engine.remove_drone(state.handle, drone)?;
        state.drones.remove(&drone);
        Ok(())
    }

    /// Number of drones in one stack; zero if the stack is absent.
    #[must_use]
    pub fn drone_count(&self, drone: TypeId) -> u32 {
        self.state.borrow().drones.get(&drone).copied().unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Switches a chance-based effect on or off at a location.
    pub fn toggle_chance_based_effect(
        &mut self,
        location: Location,
        effect: EffectId,
        on: bool,
    ) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        state.engine.toggle_chance_based_effect(state.handle, location, effect, on)?;
        if on {
            state.toggled_effects.insert((location, effect));
        } else {
            state.toggled_effects.remove(&(location, effect));
        }
        Ok(())
    }

    /// Whether a chance-based effect is currently toggled on.
    #[must_use]
    pub fn effect_toggled(&self, location: Location, effect: EffectId) -> bool {
        self.state.borrow().toggled_effects.contains(&(location, effect))
    }

    // ------------------------------------------------------------------
    // Targeting
    // ------------------------------------------------------------------

    /// Projects `location` of this context onto `targetee`, replacing any
    /// previous target at that location.
    ///
    /// Both sides of the edge are recorded before returning: the outgoing
    /// entry here, the inbound entry on `targetee`. Retargeting cleans up
    /// the previous target's inbound entry in the same call.
    pub fn target(&mut self, location: Location, targetee: &SimContext) -> Result<()> {
        let (target_id, target_handle) = {
            let t = targetee.state.borrow();
            (t.id, t.handle)
        };
        let state = &mut *self.state.borrow_mut();
        state.engine.target(state.handle, location, target_handle)?;

        let replaced = state.targets.insert(
            location,
            TargetEdge {
                id: target_id,
                handle: target_handle,
                state: Rc::downgrade(&targetee.state),
            },
        );
        if let Some(old) = replaced {
            if !state.targets.has_edge_to(old.id) {
                if let Some(other) = old.upgrade() {
                    other.borrow_mut().targeters.remove(state.id);
                }
            }
            debug!(source = %state.id, new = %target_id, %location, "retargeted");
        }
        targetee.state.borrow_mut().targeters.insert(state.id, Rc::downgrade(&self.state));
        Ok(())
    }

    /// Withdraws the projection at `location`.
    pub fn clear_target(&mut self, location: Location) -> Result<()> {
        let state = &mut *self.state.borrow_mut();
        if !state.targets.contains(location) {
            return Err(Error::NotFound);
        }
        state.engine.clear_target(state.handle, location)?;
        state.unlink_target(location);
        Ok(())
    }

    /// Whether an outgoing target exists at `location`.
    #[must_use]
    pub fn has_target(&self, location: Location) -> bool {
        self.state.borrow().targets.contains(location)
    }

    /// Identity of the context targeted from `location`, if any.
    #[must_use]
    pub fn target_of(&self, location: Location) -> Option<ContextId> {
        self.state.borrow().targets.get(location).map(|edge| edge.id)
    }

    /// Number of outgoing targets.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.state.borrow().targets.len()
    }

    /// Number of live contexts currently targeting this one.
    #[must_use]
    pub fn targeter_count(&self) -> usize {
        self.state.borrow().targeters.live_count()
    }

    /// Whether `other` currently targets this context.
    #[must_use]
    pub fn is_targeted_by(&self, other: &SimContext) -> bool {
        self.state.borrow().targeters.contains_live(other.id())
    }

    // ------------------------------------------------------------------
    // Attribute queries
    // ------------------------------------------------------------------

    /// Resolves one attribute at an explicit location.
    pub fn get_location_attribute(
        &self,
        location: Location,
        attribute: AttributeId,
    ) -> Result<f64> {
        let state = self.state.borrow();
        state.validate_location(location)?;
        Ok(state.engine.location_attribute(state.handle, location, attribute)?)
    }

    /// Resolves one attribute on the pilot.
    pub fn get_character_attribute(&self, attribute: AttributeId) -> Result<f64> {
        self.get_location_attribute(Location::Character, attribute)
    }

    /// Resolves one attribute on the implant at `slot`.
    pub fn get_implant_attribute(&self, slot: SlotKey, attribute: AttributeId) -> Result<f64> {
        self.get_location_attribute(Location::Implant(slot), attribute)
    }

    /// Resolves one attribute on a skill.
    pub fn get_skill_attribute(&self, skill: TypeId, attribute: AttributeId) -> Result<f64> {
        self.get_location_attribute(Location::Skill(skill), attribute)
    }

    /// Resolves one attribute on the fitted hull.
    pub fn get_ship_attribute(&self, attribute: AttributeId) -> Result<f64> {
        self.get_location_attribute(Location::Ship, attribute)
    }

    /// Resolves one attribute on the module at `slot`.
    pub fn get_module_attribute(&self, slot: SlotKey, attribute: AttributeId) -> Result<f64> {
        self.get_location_attribute(Location::Module(slot), attribute)
    }

    /// Resolves one attribute on the charge loaded at `slot`.
    pub fn get_charge_attribute(&self, slot: SlotKey, attribute: AttributeId) -> Result<f64> {
        self.get_location_attribute(Location::Charge(slot), attribute)
    }

    /// Resolves one attribute on a drone stack.
    pub fn get_drone_attribute(&self, drone: TypeId, attribute: AttributeId) -> Result<f64> {
        self.get_location_attribute(Location::Drone(drone), attribute)
    }

    /// Chance per cycle of a chance-based effect at a location.
    pub fn get_chance_based_effect_chance(
        &self,
        location: Location,
        effect: EffectId,
    ) -> Result<f64> {
        let state = self.state.borrow();
        state.validate_location(location)?;
        Ok(state.engine.chance_based_effect_chance(state.handle, location, effect)?)
    }

    /// The six standard scalar attributes of an effect at a location.
    pub fn get_location_effect_attributes(
        &self,
        location: Location,
        effect: EffectId,
    ) -> Result<EffectAttributes> {
        let state = self.state.borrow();
        state.validate_location(location)?;
        Ok(state.engine.location_effect_attributes(state.handle, location, effect)?)
    }

    /// Every affector currently contributing to attributes at a location,
    /// in stacking order, as an owned snapshot.
    ///
    /// The engine's buffer is copied and released before this returns.
    pub fn get_affectors(&self, location: Location) -> Result<Vec<AffectorRecord>> {
        let state = self.state.borrow();
        state.validate_location(location)?;
        let engine = &*state.engine;
        let lease = BufferLease::new(engine, engine.affectors(state.handle, location)?);
        Ok(lease.records().to_vec())
    }

    /// Capacitor snapshots for this context's whole capacitor network,
    /// keyed by context identity.
    ///
    /// The relevant set is computed locally (self, live targeters, live
    /// targets) and the engine's anonymous records are correlated onto it
    /// by identity token. Any disagreement between the two sides is an
    /// [`EngineFault`](crate::error::EngineFault).
    pub fn get_capacitor_all(&self, include_reload_time: bool) -> Result<CapacitorReport> {
        let state = self.state.borrow();
        let relevant = state.relevant_set();
        let engine = &*state.engine;
        let lease =
            BufferLease::new(engine, engine.capacitor_all(state.handle, include_reload_time)?);
        correlate(&relevant, lease.records())
    }
}
