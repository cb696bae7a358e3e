//! The attribute engine capability.
//!
//! Everything rules-shaped — attribute formulas, stacking penalties, effect
//! scripting, the data set itself — lives behind [`AttributeEngine`]. The
//! modeling layer owns object lifecycles and relationships and treats the
//! engine as an opaque service: every call returns a tri-state outcome
//! (success, not-found, not-applicable), and anything else the engine says is
//! a fault, not a result.
//!
//! # Status discipline
//!
//! Engine methods return [`EngineResult`]. Callers check and translate on
//! every call; no call site may assume success.
//!
//! # Bulk buffers
//!
//! The two bulk queries ([`affectors`](AttributeEngine::affectors) and
//! [`capacitor_all`](AttributeEngine::capacitor_all)) hand back a
//! [`RawBuffer`]: records plus a [`BufferId`] that stays engine-owned until
//! [`release_buffer`](AttributeEngine::release_buffer) is called for it,
//! exactly once. Wrap raw buffers in a [`BufferLease`] immediately: the lease
//! releases on drop, so the buffer is returned even when copying out of it
//! fails partway.

use thiserror::Error;

use crate::ids::{AttributeId, BufferId, EffectId, EngineHandle, FleetHandle, SlotKey, TypeId};
use crate::location::{Location, State};
use crate::records::{AffectorRecord, CapacitorRecord, EffectAttributes};

/// Failure statuses surfaced by engine calls.
///
/// `NotFound` and `NotApplicable` are expected, recoverable outcomes.
/// `Internal` is any other status code the engine produced; the modeling
/// layer treats it as an unrecoverable fault.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum EngineStatus {
    /// The referenced handle, slot, or entity does not exist engine-side.
    #[error("engine: referenced entity does not exist")]
    NotFound,
    /// The operation is well-formed but does not apply to the entity.
    #[error("engine: operation not applicable to the addressed entity")]
    NotApplicable,
    /// Any status outside the documented tri-state. Unrecoverable.
    #[error("engine: unexpected internal status {0}")]
    Internal(u32),
}

/// Outcome of one engine call.
pub type EngineResult<T> = Result<T, EngineStatus>;

/// An engine-owned bulk result buffer.
///
/// The records are readable immediately, but the buffer identity is owed
/// back to the engine via
/// [`release_buffer`](AttributeEngine::release_buffer). Prefer not to touch
/// this type directly — see [`BufferLease`].
#[derive(Debug)]
pub struct RawBuffer<T> {
    /// Identity owed back to the engine.
    pub id: BufferId,
    /// Records, in engine order.
    pub records: Vec<T>,
}

/// Scoped ownership of a [`RawBuffer`]: releases the buffer on drop.
///
/// ```rust,ignore
/// let lease = BufferLease::new(&engine, engine.affectors(ctx, location)?);
/// let copied = lease.records().to_vec();
/// drop(lease); // buffer released exactly once, even if the copy had failed
/// ```
pub struct BufferLease<'a, T> {
    engine: &'a dyn AttributeEngine,
    raw: Option<RawBuffer<T>>,
}

impl<'a, T> BufferLease<'a, T> {
    /// Takes ownership of a raw buffer on behalf of `engine`.
    #[must_use]
    pub fn new(engine: &'a dyn AttributeEngine, raw: RawBuffer<T>) -> Self {
        Self { engine, raw: Some(raw) }
    }

    /// The records held by the leased buffer, in engine order.
    #[must_use]
    pub fn records(&self) -> &[T] {
        self.raw.as_ref().map_or(&[], |raw| raw.records.as_slice())
    }

    /// Number of records in the leased buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Whether the leased buffer holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

impl<T> Drop for BufferLease<'_, T> {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            self.engine.release_buffer(raw.id);
        }
    }
}

/// The attribute engine service boundary.
///
/// Implementations are single-threaded and may use interior mutability; all
/// methods take `&self`. Handles issued by one engine instance are only
/// meaningful to that instance.
///
/// Mutation methods are addressed by caller-allocated [`SlotKey`]s: the
/// modeling layer owns slot allocation and informs the engine which key an
/// item lives under.
pub trait AttributeEngine {
    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Allocates engine state for a new simulation context.
    fn create_context(&self) -> EngineResult<EngineHandle>;

    /// Releases engine state for a context. The handle is dead afterwards.
    fn destroy_context(&self, ctx: EngineHandle) -> EngineResult<()>;

    /// Allocates engine state for a new fleet.
    fn create_fleet(&self) -> EngineResult<FleetHandle>;

    /// Releases engine state for a fleet. Member contexts are untouched.
    fn destroy_fleet(&self, fleet: FleetHandle) -> EngineResult<()>;

    // ------------------------------------------------------------------
    // Fitting mutation
    // ------------------------------------------------------------------

    /// Plugs an implant under the given slot key.
    fn add_implant(&self, ctx: EngineHandle, slot: SlotKey, implant: TypeId) -> EngineResult<()>;

    /// Unplugs the implant at `slot`.
    fn remove_implant(&self, ctx: EngineHandle, slot: SlotKey) -> EngineResult<()>;

    /// Sets the level assumed for all skills without an explicit override.
    fn set_default_skill_level(&self, ctx: EngineHandle, level: u8) -> EngineResult<()>;

    /// Overrides the trained level of one skill.
    fn set_skill_level(&self, ctx: EngineHandle, skill: TypeId, level: u8) -> EngineResult<()>;

    /// Drops the override for one skill, reverting it to the default level.
    fn reset_skill_level(&self, ctx: EngineHandle, skill: TypeId) -> EngineResult<()>;

    /// Drops every skill override.
    fn reset_skill_levels(&self, ctx: EngineHandle) -> EngineResult<()>;

    /// Sets or replaces the fitted hull.
    fn set_ship(&self, ctx: EngineHandle, ship: TypeId) -> EngineResult<()>;

    /// Fits a module under the given slot key.
    ///
    /// `state` defaults to [`State::Online`] when absent; `charge` loads a
    /// charge in the same call when present.
    fn add_module(
        &self,
        ctx: EngineHandle,
        slot: SlotKey,
        module: TypeId,
        state: Option<State>,
        charge: Option<TypeId>,
    ) -> EngineResult<()>;

    /// Unfits the module at `slot`, along with any loaded charge.
    fn remove_module(&self, ctx: EngineHandle, slot: SlotKey) -> EngineResult<()>;

    /// Changes the activation state of the module at `slot`.
    fn set_module_state(&self, ctx: EngineHandle, slot: SlotKey, state: State) -> EngineResult<()>;

    /// Loads a charge into the module at `slot`.
    fn add_charge(&self, ctx: EngineHandle, slot: SlotKey, charge: TypeId) -> EngineResult<()>;

    /// Unloads the charge from the module at `slot`.
    fn remove_charge(&self, ctx: EngineHandle, slot: SlotKey) -> EngineResult<()>;

    /// Adds `count` drones of one type to the context's drone stack.
    fn add_drone(&self, ctx: EngineHandle, drone: TypeId, count: u32) -> EngineResult<()>;

    /// Removes `count` drones from a stack, leaving the remainder.
    fn remove_drone_partial(&self, ctx: EngineHandle, drone: TypeId, count: u32)
        -> EngineResult<()>;

    /// Removes a whole drone stack.
    fn remove_drone(&self, ctx: EngineHandle, drone: TypeId) -> EngineResult<()>;

    /// Switches a chance-based effect on or off at a location.
    fn toggle_chance_based_effect(
        &self,
        ctx: EngineHandle,
        location: Location,
        effect: EffectId,
        on: bool,
    ) -> EngineResult<()>;

    // ------------------------------------------------------------------
    // Targeting
    // ------------------------------------------------------------------

    /// Projects `location` of `ctx` onto the `targetee` context, replacing
    /// any previous target at that location.
    fn target(
        &self,
        ctx: EngineHandle,
        location: Location,
        targetee: EngineHandle,
    ) -> EngineResult<()>;

    /// Withdraws the projection at `location`.
    fn clear_target(&self, ctx: EngineHandle, location: Location) -> EngineResult<()>;

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Resolves one attribute at one location.
    fn location_attribute(
        &self,
        ctx: EngineHandle,
        location: Location,
        attribute: AttributeId,
    ) -> EngineResult<f64>;

    /// Chance per cycle of a toggled chance-based effect.
    fn chance_based_effect_chance(
        &self,
        ctx: EngineHandle,
        location: Location,
        effect: EffectId,
    ) -> EngineResult<f64>;

    /// The six standard scalar attributes of an effect at a location.
    fn location_effect_attributes(
        &self,
        ctx: EngineHandle,
        location: Location,
        effect: EffectId,
    ) -> EngineResult<EffectAttributes>;

    /// Every affector currently contributing to attributes at a location.
    ///
    /// Returns an engine-owned buffer; see the module docs for the release
    /// discipline.
    fn affectors(&self, ctx: EngineHandle, location: Location)
        -> EngineResult<RawBuffer<AffectorRecord>>;

    /// Capacitor snapshots for every context in the caller's capacitor
    /// network: the caller itself, everyone it targets, everyone targeting
    /// it. One record per context, identified only by
    /// [`CapacitorRecord::origin`].
    fn capacitor_all(
        &self,
        ctx: EngineHandle,
        include_reload_time: bool,
    ) -> EngineResult<RawBuffer<CapacitorRecord>>;

    /// Returns a bulk result buffer to the engine. Must be called exactly
    /// once per issued buffer.
    fn release_buffer(&self, buffer: BufferId);

    // ------------------------------------------------------------------
    // Fleet mutation
    // ------------------------------------------------------------------

    /// Assigns or replaces the fleet commander.
    fn add_fleet_commander(&self, fleet: FleetHandle, commander: EngineHandle) -> EngineResult<()>;

    /// Assigns or replaces a wing commander.
    fn add_wing_commander(
        &self,
        fleet: FleetHandle,
        wing: u32,
        commander: EngineHandle,
    ) -> EngineResult<()>;

    /// Assigns or replaces a squad commander.
    fn add_squad_commander(
        &self,
        fleet: FleetHandle,
        wing: u32,
        squad: u32,
        commander: EngineHandle,
    ) -> EngineResult<()>;

    /// Adds a member to a squad.
    fn add_squad_member(
        &self,
        fleet: FleetHandle,
        wing: u32,
        squad: u32,
        member: EngineHandle,
    ) -> EngineResult<()>;

    /// Removes a context from every slot it occupies in the fleet. Returns
    /// whether anything was removed.
    fn remove_fleet_member(&self, fleet: FleetHandle, member: EngineHandle) -> EngineResult<bool>;

    /// Sets or clears the fleet-level booster.
    fn set_fleet_booster(&self, fleet: FleetHandle, booster: Option<EngineHandle>)
        -> EngineResult<()>;

    /// Sets or clears a wing-level booster.
    fn set_wing_booster(
        &self,
        fleet: FleetHandle,
        wing: u32,
        booster: Option<EngineHandle>,
    ) -> EngineResult<()>;

    /// Sets or clears a squad-level booster.
    fn set_squad_booster(
        &self,
        fleet: FleetHandle,
        wing: u32,
        squad: u32,
        booster: Option<EngineHandle>,
    ) -> EngineResult<()>;

    // ------------------------------------------------------------------
    // Global type queries (context-independent)
    // ------------------------------------------------------------------

    /// Whether a type carries an effect in the given state's categories.
    fn type_has_effect(&self, type_id: TypeId, state: State, effect: EffectId)
        -> EngineResult<bool>;

    /// Whether a type carries any active-state effects.
    fn type_has_active_effects(&self, type_id: TypeId) -> EngineResult<bool>;

    /// Whether a type carries any overload-state effects.
    fn type_has_overload_effects(&self, type_id: TypeId) -> EngineResult<bool>;

    /// Whether a type carries any effects projectable onto a target.
    fn type_has_projectable_effects(&self, type_id: TypeId) -> EngineResult<bool>;

    /// A type's base (unmodified) attribute value.
    fn type_base_attribute(&self, type_id: TypeId, attribute: AttributeId) -> EngineResult<f64>;

    /// The `n`-th effect of a type that carries the standard attribute
    /// six-pack, in engine order.
    fn nth_type_effect_with_attributes(&self, type_id: TypeId, n: usize) -> EngineResult<EffectId>;
}
