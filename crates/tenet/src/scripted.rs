//! Scriptable in-memory attribute engine for tests.
//!
//! [`ScriptedEngine`] implements [`AttributeEngine`] against a small scripted
//! type catalog instead of real game data. It tracks per-context fitted
//! state, engine-side targeting edges and fleet tables, so the tri-state
//! contracts (not-found vs. not-applicable) behave the way the real service
//! does, and it accounts for every bulk buffer it issues so tests can assert
//! that none leak.
//!
//! Compiled for this crate's own tests and, via the `test-utils` feature,
//! for downstream test suites.
//!
//! # Example
//!
//! ```
//! use tenet::scripted::{ScriptedEngine, TypeCategory};
//! use tenet::{AttributeEngine, AttributeId, TypeId};
//!
//! let engine = ScriptedEngine::new();
//! engine.script_type(TypeId::new(587), TypeCategory::Ship);
//! engine.script_attribute(TypeId::new(587), AttributeId::new(9), 450.0);
//!
//! let ctx = engine.create_context().unwrap();
//! engine.set_ship(ctx, TypeId::new(587)).unwrap();
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use crate::engine::{AttributeEngine, EngineResult, EngineStatus, RawBuffer};
use crate::ids::{AttributeId, BufferId, EffectId, EngineHandle, FleetHandle, SlotKey, TypeId};
use crate::location::{Location, State};
use crate::records::{AffectorRecord, CapacitorRecord, EffectAttributes, Stability};

// ===========================================================================
// Scripted catalog
// ===========================================================================

/// Coarse classification of a scripted type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TypeCategory {
    /// A flyable hull.
    Ship,
    /// A fittable module.
    Module,
    /// A loadable charge.
    Charge,
    /// A drone.
    Drone,
    /// A pluggable implant.
    Implant,
    /// A trainable skill.
    Skill,
    /// Anything else.
    Other,
}

/// Scripted description of one effect carried by a type.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EffectDef {
    /// Minimum activation state whose categories include this effect.
    pub state: State,
    /// Whether the effect rolls a chance each cycle.
    pub chance_based: bool,
    /// Whether the effect projects onto a target.
    pub projectable: bool,
    /// Per-cycle chance reported for chance-based effects.
    pub chance: f64,
    /// The standard attribute six-pack, when the effect carries one.
    pub attributes: Option<EffectAttributes>,
}

impl Default for EffectDef {
    fn default() -> Self {
        Self {
            state: State::Active,
            chance_based: false,
            projectable: false,
            chance: 0.0,
            attributes: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct TypeDef {
    category: Option<TypeCategory>,
    attributes: BTreeMap<AttributeId, f64>,
    effects: BTreeMap<EffectId, EffectDef>,
    affectors: Vec<AffectorRecord>,
}

#[derive(Debug, Clone)]
struct FittedModule {
    module: TypeId,
    charge: Option<TypeId>,
}

#[derive(Debug, Clone)]
struct ContextEntry {
    ship: Option<TypeId>,
    implants: BTreeMap<SlotKey, TypeId>,
    modules: BTreeMap<SlotKey, FittedModule>,
    drones: BTreeMap<TypeId, u32>,
    skill_overrides: BTreeMap<TypeId, u8>,
    default_skill_level: u8,
    toggles: BTreeSet<(Location, EffectId)>,
    targets: BTreeMap<Location, EngineHandle>,
    capacitor: (f64, f64, Stability),
}

impl Default for ContextEntry {
    fn default() -> Self {
        Self {
            ship: None,
            implants: BTreeMap::new(),
            modules: BTreeMap::new(),
            drones: BTreeMap::new(),
            skill_overrides: BTreeMap::new(),
            default_skill_level: 5,
            toggles: BTreeSet::new(),
            targets: BTreeMap::new(),
            capacitor: (0.0, 0.0, Stability::Stable { fraction: 1.0 }),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct FleetEntry {
    fleet_commander: Option<EngineHandle>,
    wing_commanders: BTreeMap<u32, EngineHandle>,
    squad_commanders: BTreeMap<(u32, u32), EngineHandle>,
    squad_members: BTreeMap<(u32, u32), BTreeSet<EngineHandle>>,
    fleet_booster: Option<EngineHandle>,
    wing_boosters: BTreeMap<u32, EngineHandle>,
    squad_boosters: BTreeMap<(u32, u32), EngineHandle>,
}

#[derive(Debug, Default)]
struct EngineState {
    next_handle: u64,
    next_buffer: u64,
    types: BTreeMap<TypeId, TypeDef>,
    character_attributes: BTreeMap<AttributeId, f64>,
    contexts: BTreeMap<EngineHandle, ContextEntry>,
    fleets: BTreeMap<FleetHandle, FleetEntry>,
    outstanding: BTreeSet<BufferId>,
    fail_next: Option<EngineStatus>,
}

// ===========================================================================
// ScriptedEngine
// ===========================================================================

/// In-memory [`AttributeEngine`] driven by a scripted type catalog.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    state: RefCell<EngineState>,
}

impl ScriptedEngine {
    /// Creates an engine with an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type under a category.
    pub fn script_type(&self, type_id: TypeId, category: TypeCategory) {
        self.state.borrow_mut().types.entry(type_id).or_default().category = Some(category);
    }

    /// Scripts one attribute value on a type.
    pub fn script_attribute(&self, type_id: TypeId, attribute: AttributeId, value: f64) {
        self.state
            .borrow_mut()
            .types
            .entry(type_id)
            .or_default()
            .attributes
            .insert(attribute, value);
    }

    /// Scripts one character attribute value.
    pub fn script_character_attribute(&self, attribute: AttributeId, value: f64) {
        self.state.borrow_mut().character_attributes.insert(attribute, value);
    }

    /// Scripts one effect on a type.
    pub fn script_effect(&self, type_id: TypeId, effect: EffectId, def: EffectDef) {
        self.state.borrow_mut().types.entry(type_id).or_default().effects.insert(effect, def);
    }

    /// Scripts an affector row reported against any location fitting `target`.
    pub fn script_affector(&self, target: TypeId, record: AffectorRecord) {
        self.state.borrow_mut().types.entry(target).or_default().affectors.push(record);
    }

    /// Scripts the capacitor snapshot values reported for a context.
    pub fn script_capacitor(
        &self,
        ctx: EngineHandle,
        capacity: f64,
        delta: f64,
        stability: Stability,
    ) {
        if let Some(entry) = self.state.borrow_mut().contexts.get_mut(&ctx) {
            entry.capacitor = (capacity, delta, stability);
        }
    }

    /// Makes the next engine call fail with `status`.
    pub fn fail_next_with(&self, status: EngineStatus) {
        self.state.borrow_mut().fail_next = Some(status);
    }

    /// Number of issued bulk buffers not yet released.
    #[must_use]
    pub fn outstanding_buffers(&self) -> usize {
        self.state.borrow().outstanding.len()
    }

    /// Number of live engine contexts.
    #[must_use]
    pub fn live_contexts(&self) -> usize {
        self.state.borrow().contexts.len()
    }

    /// Number of live engine fleets.
    #[must_use]
    pub fn live_fleets(&self) -> usize {
        self.state.borrow().fleets.len()
    }

    fn gate(&self) -> EngineResult<()> {
        match self.state.borrow_mut().fail_next.take() {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    fn issue_buffer<T>(state: &mut EngineState, records: Vec<T>) -> RawBuffer<T> {
        let id = BufferId::new(state.next_buffer);
        state.next_buffer += 1;
        state.outstanding.insert(id);
        RawBuffer { id, records }
    }
}

// Catalog lookups, shared by the trait impl.
impl EngineState {
    fn type_def(&self, type_id: TypeId) -> EngineResult<&TypeDef> {
        self.types.get(&type_id).ok_or(EngineStatus::NotFound)
    }

    fn context(&self, ctx: EngineHandle) -> EngineResult<&ContextEntry> {
        self.contexts.get(&ctx).ok_or(EngineStatus::NotFound)
    }

    fn context_mut(&mut self, ctx: EngineHandle) -> EngineResult<&mut ContextEntry> {
        self.contexts.get_mut(&ctx).ok_or(EngineStatus::NotFound)
    }

    fn fleet_mut(&mut self, fleet: FleetHandle) -> EngineResult<&mut FleetEntry> {
        self.fleets.get_mut(&fleet).ok_or(EngineStatus::NotFound)
    }

    fn expect_category(&self, type_id: TypeId, category: TypeCategory) -> EngineResult<()> {
        match self.type_def(type_id)?.category {
            Some(c) if c == category => Ok(()),
            _ => Err(EngineStatus::NotApplicable),
        }
    }

    /// The type fitted at a location, or `NotFound` when nothing is there.
    fn resolve_location(&self, ctx: EngineHandle, location: Location) -> EngineResult<Option<TypeId>> {
        let entry = self.context(ctx)?;
        match location {
            Location::Character => Ok(None),
            Location::Ship => entry.ship.map(Some).ok_or(EngineStatus::NotFound),
            Location::Implant(slot) => {
                entry.implants.get(&slot).copied().map(Some).ok_or(EngineStatus::NotFound)
            }
            Location::Skill(type_id) => {
                self.type_def(type_id)?;
                Ok(Some(type_id))
            }
            Location::Module(slot) => entry
                .modules
                .get(&slot)
                .map(|fitted| Some(fitted.module))
                .ok_or(EngineStatus::NotFound),
            Location::Charge(slot) => {
                let fitted = entry.modules.get(&slot).ok_or(EngineStatus::NotFound)?;
                fitted.charge.map(Some).ok_or(EngineStatus::NotFound)
            }
            Location::Drone(type_id) => {
                if entry.drones.contains_key(&type_id) {
                    Ok(Some(type_id))
                } else {
                    Err(EngineStatus::NotFound)
                }
            }
        }
    }

    fn effect_def(&self, ctx: EngineHandle, location: Location, effect: EffectId)
        -> EngineResult<EffectDef> {
        let type_id = self.resolve_location(ctx, location)?.ok_or(EngineStatus::NotFound)?;
        self.type_def(type_id)?
            .effects
            .get(&effect)
            .copied()
            .ok_or(EngineStatus::NotFound)
    }
}

impl AttributeEngine for ScriptedEngine {
    fn create_context(&self) -> EngineResult<EngineHandle> {
        self.gate()?;
        let mut state = self.state.borrow_mut();
        let handle = EngineHandle::new(state.next_handle);
        state.next_handle += 1;
        state.contexts.insert(handle, ContextEntry::default());
        Ok(handle)
    }

    fn destroy_context(&self, ctx: EngineHandle) -> EngineResult<()> {
        self.gate()?;
        let mut state = self.state.borrow_mut();
        state.contexts.remove(&ctx).ok_or(EngineStatus::NotFound)?;
        // Inbound edges die with the context.
        for entry in state.contexts.values_mut() {
            entry.targets.retain(|_, targetee| *targetee != ctx);
        }
        Ok(())
    }

    fn create_fleet(&self) -> EngineResult<FleetHandle> {
        self.gate()?;
        let mut state = self.state.borrow_mut();
        let handle = FleetHandle::new(state.next_handle);
        state.next_handle += 1;
        state.fleets.insert(handle, FleetEntry::default());
        Ok(handle)
    }

    fn destroy_fleet(&self, fleet: FleetHandle) -> EngineResult<()> {
        self.gate()?;
        self.state.borrow_mut().fleets.remove(&fleet).map(|_| ()).ok_or(EngineStatus::NotFound)
    }

    fn add_implant(&self, ctx: EngineHandle, slot: SlotKey, implant: TypeId) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        state.type_def(implant)?;
        state.context_mut(ctx)?.implants.insert(slot, implant);
        Ok(())
    }

    fn remove_implant(&self, ctx: EngineHandle, slot: SlotKey) -> EngineResult<()> {
        self.gate()?;
        self.state
            .borrow_mut()
            .context_mut(ctx)?
            .implants
            .remove(&slot)
            .map(|_| ())
            .ok_or(EngineStatus::NotFound)
    }

    fn set_default_skill_level(&self, ctx: EngineHandle, level: u8) -> EngineResult<()> {
        self.gate()?;
        if level > 5 {
            return Err(EngineStatus::NotApplicable);
        }
        self.state.borrow_mut().context_mut(ctx)?.default_skill_level = level;
        Ok(())
    }

    fn set_skill_level(&self, ctx: EngineHandle, skill: TypeId, level: u8) -> EngineResult<()> {
        self.gate()?;
        if level > 5 {
            return Err(EngineStatus::NotApplicable);
        }
        let state = &mut *self.state.borrow_mut();
        state.expect_category(skill, TypeCategory::Skill)?;
        state.context_mut(ctx)?.skill_overrides.insert(skill, level);
        Ok(())
    }

    fn reset_skill_level(&self, ctx: EngineHandle, skill: TypeId) -> EngineResult<()> {
        self.gate()?;
        self.state.borrow_mut().context_mut(ctx)?.skill_overrides.remove(&skill);
        Ok(())
    }

    fn reset_skill_levels(&self, ctx: EngineHandle) -> EngineResult<()> {
        self.gate()?;
        self.state.borrow_mut().context_mut(ctx)?.skill_overrides.clear();
        Ok(())
    }

    fn set_ship(&self, ctx: EngineHandle, ship: TypeId) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        state.expect_category(ship, TypeCategory::Ship)?;
        state.context_mut(ctx)?.ship = Some(ship);
        Ok(())
    }

    fn add_module(
        &self,
        ctx: EngineHandle,
        slot: SlotKey,
        module: TypeId,
        _state: Option<State>,
        charge: Option<TypeId>,
    ) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        state.expect_category(module, TypeCategory::Module)?;
        if let Some(charge) = charge {
            state.expect_category(charge, TypeCategory::Charge)?;
        }
        state.context_mut(ctx)?.modules.insert(slot, FittedModule { module, charge });
        Ok(())
    }

    fn remove_module(&self, ctx: EngineHandle, slot: SlotKey) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        let entry = state.context_mut(ctx)?;
        entry.modules.remove(&slot).ok_or(EngineStatus::NotFound)?;
        // Projections from the unfitted slot die with it.
        entry.targets.remove(&Location::Module(slot));
        entry.targets.remove(&Location::Charge(slot));
        Ok(())
    }

    fn set_module_state(&self, ctx: EngineHandle, slot: SlotKey, _state: State) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        let entry = state.context_mut(ctx)?;
        if entry.modules.contains_key(&slot) {
            Ok(())
        } else {
            Err(EngineStatus::NotFound)
        }
    }

    fn add_charge(&self, ctx: EngineHandle, slot: SlotKey, charge: TypeId) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        state.expect_category(charge, TypeCategory::Charge)?;
        let fitted =
            state.context_mut(ctx)?.modules.get_mut(&slot).ok_or(EngineStatus::NotFound)?;
        if fitted.charge.is_some() {
            return Err(EngineStatus::NotFound);
        }
        fitted.charge = Some(charge);
        Ok(())
    }

    fn remove_charge(&self, ctx: EngineHandle, slot: SlotKey) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        let entry = state.context_mut(ctx)?;
        let fitted = entry.modules.get_mut(&slot).ok_or(EngineStatus::NotFound)?;
        fitted.charge.take().ok_or(EngineStatus::NotFound)?;
        entry.targets.remove(&Location::Charge(slot));
        Ok(())
    }

    fn add_drone(&self, ctx: EngineHandle, drone: TypeId, count: u32) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        state.expect_category(drone, TypeCategory::Drone)?;
        *state.context_mut(ctx)?.drones.entry(drone).or_insert(0) += count;
        Ok(())
    }

    fn remove_drone_partial(
        &self,
        ctx: EngineHandle,
        drone: TypeId,
        count: u32,
    ) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        let drones = &mut state.context_mut(ctx)?.drones;
        let have = drones.get_mut(&drone).ok_or(EngineStatus::NotFound)?;
        if count > *have {
            return Err(EngineStatus::NotFound);
        }
        *have -= count;
        if *have == 0 {
            drones.remove(&drone);
        }
        Ok(())
    }

    fn remove_drone(&self, ctx: EngineHandle, drone: TypeId) -> EngineResult<()> {
        self.gate()?;
        self.state
            .borrow_mut()
            .context_mut(ctx)?
            .drones
            .remove(&drone)
            .map(|_| ())
            .ok_or(EngineStatus::NotFound)
    }

    fn toggle_chance_based_effect(
        &self,
        ctx: EngineHandle,
        location: Location,
        effect: EffectId,
        on: bool,
    ) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        let def = state.effect_def(ctx, location, effect)?;
        if !def.chance_based {
            return Err(EngineStatus::NotApplicable);
        }
        let toggles = &mut state.context_mut(ctx)?.toggles;
        if on {
            toggles.insert((location, effect));
        } else {
            toggles.remove(&(location, effect));
        }
        Ok(())
    }

    fn target(
        &self,
        ctx: EngineHandle,
        location: Location,
        targetee: EngineHandle,
    ) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        state.context(targetee)?;
        state.resolve_location(ctx, location)?;
        state.context_mut(ctx)?.targets.insert(location, targetee);
        Ok(())
    }

    fn clear_target(&self, ctx: EngineHandle, location: Location) -> EngineResult<()> {
        self.gate()?;
        self.state
            .borrow_mut()
            .context_mut(ctx)?
            .targets
            .remove(&location)
            .map(|_| ())
            .ok_or(EngineStatus::NotFound)
    }

    fn location_attribute(
        &self,
        ctx: EngineHandle,
        location: Location,
        attribute: AttributeId,
    ) -> EngineResult<f64> {
        self.gate()?;
        let state = self.state.borrow();
        match state.resolve_location(ctx, location)? {
            None => {
                state.character_attributes.get(&attribute).copied().ok_or(EngineStatus::NotApplicable)
            }
            Some(type_id) => state
                .type_def(type_id)?
                .attributes
                .get(&attribute)
                .copied()
                .ok_or(EngineStatus::NotApplicable),
        }
    }

    fn chance_based_effect_chance(
        &self,
        ctx: EngineHandle,
        location: Location,
        effect: EffectId,
    ) -> EngineResult<f64> {
        self.gate()?;
        let state = self.state.borrow();
        let def = state.effect_def(ctx, location, effect)?;
        if def.chance_based {
            Ok(def.chance)
        } else {
            Err(EngineStatus::NotApplicable)
        }
    }

    fn location_effect_attributes(
        &self,
        ctx: EngineHandle,
        location: Location,
        effect: EffectId,
    ) -> EngineResult<EffectAttributes> {
        self.gate()?;
        let state = self.state.borrow();
        state.effect_def(ctx, location, effect)?.attributes.ok_or(EngineStatus::NotApplicable)
    }

    fn affectors(
        &self,
        ctx: EngineHandle,
        location: Location,
    ) -> EngineResult<RawBuffer<AffectorRecord>> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        let records = match state.resolve_location(ctx, location)? {
            None => Vec::new(),
            Some(type_id) => state.type_def(type_id)?.affectors.clone(),
        };
        Ok(ScriptedEngine::issue_buffer(state, records))
    }

    fn capacitor_all(
        &self,
        ctx: EngineHandle,
        _include_reload_time: bool,
    ) -> EngineResult<RawBuffer<CapacitorRecord>> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        state.context(ctx)?;

        let mut network = BTreeSet::new();
        network.insert(ctx);
        for (handle, entry) in &state.contexts {
            if entry.targets.values().any(|t| *t == ctx) {
                network.insert(*handle);
            }
        }
        network.extend(state.context(ctx)?.targets.values().copied());

        let records = network
            .iter()
            .map(|handle| {
                let (capacity, delta, stability) = state.contexts[handle].capacitor;
                CapacitorRecord { origin: *handle, capacity, delta, stability }
            })
            .collect();
        Ok(ScriptedEngine::issue_buffer(state, records))
    }

    fn release_buffer(&self, buffer: BufferId) {
        let released = self.state.borrow_mut().outstanding.remove(&buffer);
        assert!(released, "buffer {buffer} released twice or never issued");
    }

    fn add_fleet_commander(&self, fleet: FleetHandle, commander: EngineHandle) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        state.context(commander)?;
        state.fleet_mut(fleet)?.fleet_commander = Some(commander);
        Ok(())
    }

    fn add_wing_commander(
        &self,
        fleet: FleetHandle,
        wing: u32,
        commander: EngineHandle,
    ) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        state.context(commander)?;
        state.fleet_mut(fleet)?.wing_commanders.insert(wing, commander);
        Ok(())
    }

    fn add_squad_commander(
        &self,
        fleet: FleetHandle,
        wing: u32,
        squad: u32,
        commander: EngineHandle,
    ) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        state.context(commander)?;
        state.fleet_mut(fleet)?.squad_commanders.insert((wing, squad), commander);
        Ok(())
    }

    fn add_squad_member(
        &self,
        fleet: FleetHandle,
        wing: u32,
        squad: u32,
        member: EngineHandle,
    ) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        state.context(member)?;
        let entry = state.fleet_mut(fleet)?;
        // One squad slot per member: adding moves.
        for members in entry.squad_members.values_mut() {
            members.remove(&member);
        }
        entry.squad_members.entry((wing, squad)).or_default().insert(member);
        Ok(())
    }

    fn remove_fleet_member(&self, fleet: FleetHandle, member: EngineHandle) -> EngineResult<bool> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        let entry = state.fleet_mut(fleet)?;
        let mut found = false;
        if entry.fleet_commander == Some(member) {
            entry.fleet_commander = None;
            found = true;
        }
        let wings = entry.wing_commanders.len();
        entry.wing_commanders.retain(|_, c| *c != member);
        found |= entry.wing_commanders.len() != wings;
        let squads = entry.squad_commanders.len();
        entry.squad_commanders.retain(|_, c| *c != member);
        found |= entry.squad_commanders.len() != squads;
        for members in entry.squad_members.values_mut() {
            found |= members.remove(&member);
        }
        Ok(found)
    }

    fn set_fleet_booster(
        &self,
        fleet: FleetHandle,
        booster: Option<EngineHandle>,
    ) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        if let Some(booster) = booster {
            state.context(booster)?;
        }
        state.fleet_mut(fleet)?.fleet_booster = booster;
        Ok(())
    }

    fn set_wing_booster(
        &self,
        fleet: FleetHandle,
        wing: u32,
        booster: Option<EngineHandle>,
    ) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        if let Some(booster) = booster {
            state.context(booster)?;
        }
        let entry = state.fleet_mut(fleet)?;
        match booster {
            Some(b) => {
                entry.wing_boosters.insert(wing, b);
            }
            None => {
                entry.wing_boosters.remove(&wing);
            }
        }
        Ok(())
    }

    fn set_squad_booster(
        &self,
        fleet: FleetHandle,
        wing: u32,
        squad: u32,
        booster: Option<EngineHandle>,
    ) -> EngineResult<()> {
        self.gate()?;
        let state = &mut *self.state.borrow_mut();
        if let Some(booster) = booster {
            state.context(booster)?;
        }
        let entry = state.fleet_mut(fleet)?;
        match booster {
            Some(b) => {
                entry.squad_boosters.insert((wing, squad), b);
            }
            None => {
                entry.squad_boosters.remove(&(wing, squad));
            }
        }
        Ok(())
    }

    fn type_has_effect(
        &self,
        type_id: TypeId,
        state: State,
        effect: EffectId,
    ) -> EngineResult<bool> {
        self.gate()?;
        let engine_state = self.state.borrow();
        let def = engine_state.type_def(type_id)?;
        Ok(def.effects.get(&effect).is_some_and(|e| {
            state.as_mask() & e.state.as_mask() == e.state.as_mask()
        }))
    }

    fn type_has_active_effects(&self, type_id: TypeId) -> EngineResult<bool> {
        self.gate()?;
        let state = self.state.borrow();
        Ok(state.type_def(type_id)?.effects.values().any(|e| e.state == State::Active))
    }

    fn type_has_overload_effects(&self, type_id: TypeId) -> EngineResult<bool> {
        self.gate()?;
        let state = self.state.borrow();
        Ok(state.type_def(type_id)?.effects.values().any(|e| e.state == State::Overloaded))
    }

    fn type_has_projectable_effects(&self, type_id: TypeId) -> EngineResult<bool> {
        self.gate()?;
        let state = self.state.borrow();
        Ok(state.type_def(type_id)?.effects.values().any(|e| e.projectable))
    }

    fn type_base_attribute(&self, type_id: TypeId, attribute: AttributeId) -> EngineResult<f64> {
        self.gate()?;
        let state = self.state.borrow();
        state
            .type_def(type_id)?
            .attributes
            .get(&attribute)
            .copied()
            .ok_or(EngineStatus::NotApplicable)
    }

    fn nth_type_effect_with_attributes(&self, type_id: TypeId, n: usize) -> EngineResult<EffectId> {
        self.gate()?;
        let state = self.state.borrow();
        state
            .type_def(type_id)?
            .effects
            .iter()
            .filter(|(_, def)| def.attributes.is_some())
            .nth(n)
            .map(|(id, _)| *id)
            .ok_or(EngineStatus::NotFound)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
