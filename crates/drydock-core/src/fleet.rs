//! Fleet command hierarchy.
//!
//! A [`FleetContext`] is a three-level command tree — fleet, wings, squads —
//! over simulation contexts, plus optional booster designations at each
//! level. The fleet holds members by identity only ([`ContextId`] and engine
//! handle); it never owns a [`SimContext`] and never controls one's
//! lifetime. Commander and booster roles are independent of membership: a
//! context can boost a fleet it is not a member of.
//!
//! Membership invariant: a context occupies at most one (wing, squad) slot
//! per fleet. Re-adding a member to another squad moves it; it is never
//! duplicated.
//!
//! Like every other mutation in this crate, fleet operations delegate to the
//! engine and commit local bookkeeping only on success. Removal goes one
//! step further: the engine reports whether it found the member, the local
//! scan reports the same, and a disagreement surfaces as
//! [`EngineFault::FleetDesync`](crate::error::EngineFault::FleetDesync) —
//! the two membership tables are never allowed to drift silently.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, warn};

use tenet::{AttributeEngine, EngineHandle, FleetHandle};

use crate::context::{ContextId, SimContext};
use crate::error::{EngineFault, Result};

/// Identity pair for a context referenced by the fleet, held without
/// ownership.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct FleetMember {
    id: ContextId,
    handle: EngineHandle,
}

impl FleetMember {
    fn of(ctx: &SimContext) -> Self {
        Self { id: ctx.id(), handle: ctx.engine_handle() }
    }
}

/// Three-level command tree over simulation contexts.
pub struct FleetContext {
    engine: Rc<dyn AttributeEngine>,
    handle: FleetHandle,
    fleet_commander: Option<FleetMember>,
    wing_commanders: BTreeMap<u32, FleetMember>,
    squad_commanders: BTreeMap<(u32, u32), FleetMember>,
    squad_members: BTreeMap<(u32, u32), BTreeMap<ContextId, FleetMember>>,
    fleet_booster: Option<FleetMember>,
    wing_boosters: BTreeMap<u32, FleetMember>,
    squad_boosters: BTreeMap<(u32, u32), FleetMember>,
}

impl fmt::Debug for FleetContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FleetContext")
            .field("handle", &self.handle)
            .field("members", &self.member_count())
            .finish_non_exhaustive()
    }
}

impl FleetContext {
    /// Creates an empty fleet against the given engine.
    ///
    /// # Errors
    ///
    /// Translates the engine's status if fleet allocation fails.
    pub fn new(engine: Rc<dyn AttributeEngine>) -> Result<Self> {
        let handle = engine.create_fleet()?;
        debug!(%handle, "fleet context created");
        Ok(Self {
            engine,
            handle,
            fleet_commander: None,
            wing_commanders: BTreeMap::new(),
            squad_commanders: BTreeMap::new(),
            squad_members: BTreeMap::new(),
            fleet_booster: None,
            wing_boosters: BTreeMap::new(),
            squad_boosters: BTreeMap::new(),
        })
    }

    /// Assigns or replaces the fleet commander.
    pub fn add_fleet_commander(&mut self, commander: &SimContext) -> Result<()> {
        self.engine.add_fleet_commander(self.handle, commander.engine_handle())?;
        self.fleet_commander = Some(FleetMember::of(commander));
        Ok(())
    }

    /// Assigns or replaces the commander of one wing.
    pub fn add_wing_commander(&mut self, wing: u32, commander: &SimContext) -> Result<()> {
        self.engine.add_wing_commander(self.handle, wing, commander.engine_handle())?;
        self.wing_commanders.insert(wing, FleetMember::of(commander));
        Ok(())
    }

    /// Assigns or replaces the commander of one squad.
    pub fn add_squad_commander(
        &mut self,
        wing: u32,
        squad: u32,
        commander: &SimContext,
    ) -> Result<()> {
        self.engine.add_squad_commander(self.handle, wing, squad, commander.engine_handle())?;
        self.squad_commanders.insert((wing, squad), FleetMember::of(commander));
        Ok(())
    }

    /// Adds a member to a squad, moving it out of any squad it already
    /// occupies.
    pub fn add_squad_member(&mut self, wing: u32, squad: u32, member: &SimContext) -> Result<()> {
        self.engine.add_squad_member(self.handle, wing, squad, member.engine_handle())?;
        let entry = FleetMember::of(member);
        for members in self.squad_members.values_mut() {
            members.remove(&entry.id);
        }
        self.squad_members.entry((wing, squad)).or_default().insert(entry.id, entry);
        Ok(())
    }

    /// Removes a context from every membership set and commander slot it
    /// occupies. Returns whether anything was removed; removing a
    /// non-member is a successful no-op, never an error.
    ///
    /// Booster designations are untouched — clear those explicitly.
    pub fn remove_fleet_member(&mut self, member: &SimContext) -> Result<bool> {
        let engine_found = self.engine.remove_fleet_member(self.handle, member.engine_handle())?;

        let id = member.id();
        let mut local_found = false;
        if self.fleet_commander.is_some_and(|m| m.id == id) {
            self.fleet_commander = None;
            local_found = true;
        }
        let before = self.wing_commanders.len();
        self.wing_commanders.retain(|_, m| m.id != id);
        local_found |= self.wing_commanders.len() != before;
        let before = self.squad_commanders.len();
        self.squad_commanders.retain(|_, m| m.id != id);
        local_found |= self.squad_commanders.len() != before;
        for members in self.squad_members.values_mut() {
            local_found |= members.remove(&id).is_some();
        }

        if engine_found != local_found {
            let fault = EngineFault::FleetDesync { local: local_found, engine: engine_found };
            error!(%fault, member = %id, "fleet removal disagreement");
            return Err(fault.into());
        }
        Ok(local_found)
    }

    /// Sets or clears the fleet-level booster.
    pub fn set_fleet_booster(&mut self, booster: Option<&SimContext>) -> Result<()> {
        self.engine.set_fleet_booster(self.handle, booster.map(SimContext::engine_handle))?;
        self.fleet_booster = booster.map(FleetMember::of);
        Ok(())
    }

    /// Sets or clears the booster of one wing.
    pub fn set_wing_booster(&mut self, wing: u32, booster: Option<&SimContext>) -> Result<()> {
        self.engine.set_wing_booster(self.handle, wing, booster.map(SimContext::engine_handle))?;
        match booster {
            Some(ctx) => {
                self.wing_boosters.insert(wing, FleetMember::of(ctx));
            }
            None => {
                self.wing_boosters.remove(&wing);
            }
        }
        Ok(())
    }

    /// Sets or clears the booster of one squad.
    pub fn set_squad_booster(
        &mut self,
        wing: u32,
        squad: u32,
        booster: Option<&SimContext>,
    ) -> Result<()> {
        self.engine.set_squad_booster(
            self.handle,
            wing,
            squad,
            booster.map(SimContext::engine_handle),
        )?;
        match booster {
            Some(ctx) => {
                self.squad_boosters.insert((wing, squad), FleetMember::of(ctx));
            }
            None => {
                self.squad_boosters.remove(&(wing, squad));
            }
        }
        Ok(())
    }

    /// Whether the context holds any membership or commander slot.
    #[must_use]
    pub fn is_member(&self, ctx: &SimContext) -> bool {
        let id = ctx.id();
        self.fleet_commander.is_some_and(|m| m.id == id)
            || self.wing_commanders.values().any(|m| m.id == id)
            || self.squad_commanders.values().any(|m| m.id == id)
            || self.squad_members.values().any(|members| members.contains_key(&id))
    }

    /// The squad a context is a plain member of, if any.
    #[must_use]
    pub fn squad_of(&self, ctx: &SimContext) -> Option<(u32, u32)> {
        let id = ctx.id();
        self.squad_members
            .iter()
            .find(|(_, members)| members.contains_key(&id))
            .map(|(slot, _)| *slot)
    }

    /// Total occupied membership and commander slots.
    #[must_use]
    pub fn member_count(&self) -> usize {
        usize::from(self.fleet_commander.is_some())
            + self.wing_commanders.len()
            + self.squad_commanders.len()
            + self.squad_members.values().map(BTreeMap::len).sum::<usize>()
    }
}

impl Drop for FleetContext {
    fn drop(&mut self) {
        if let Err(status) = self.engine.destroy_fleet(self.handle) {
            warn!(handle = %self.handle, %status, "engine refused fleet teardown");
        }
        debug!(handle = %self.handle, "fleet context destroyed");
    }
}
