//! Test setup utilities: the scripted catalog and scenario builders.

use std::rc::Rc;

use tenet::scripted::{EffectDef, ScriptedEngine, TypeCategory};
use tenet::{AttributeId, EffectAttributes, EffectId, SlotKey, State, TypeId};

use crate::context::SimContext;

// ===========================================================================
// Scripted catalog
// ===========================================================================

/// Frigate hull.
pub const RIFTER: TypeId = TypeId::new(587);
/// Cruiser hull.
pub const STABBER: TypeId = TypeId::new(622);
/// Projectile turret module.
pub const AUTOCANNON: TypeId = TypeId::new(484);
/// Short-range ammunition.
pub const EMP_S: TypeId = TypeId::new(222);
/// Light combat drone.
pub const WARRIOR: TypeId = TypeId::new(2486);
/// Agility hardwiring implant.
pub const NOMAD_ALPHA: TypeId = TypeId::new(28801);
/// Turret skill.
pub const SMALL_PROJECTILE_TURRET: TypeId = TypeId::new(3300);

/// Ship agility.
pub const AGILITY: AttributeId = AttributeId::new(70);
/// Capacitor capacity.
pub const CAPACITOR_CAPACITY: AttributeId = AttributeId::new(482);
/// Damage multiplier.
pub const DAMAGE_MULTIPLIER: AttributeId = AttributeId::new(64);

/// Turret fire effect: active, projectable, carries the attribute six-pack.
pub const PROJECTILE_FIRED: EffectId = EffectId::new(34);
/// Chance-based side effect.
pub const SIDE_EFFECT: EffectId = EffectId::new(5934);

/// Builds an engine with the standard test catalog scripted.
pub fn rigged_engine() -> Rc<ScriptedEngine> {
    let engine = ScriptedEngine::new();

    engine.script_type(RIFTER, TypeCategory::Ship);
    engine.script_attribute(RIFTER, AGILITY, 3.19);
    engine.script_attribute(RIFTER, CAPACITOR_CAPACITY, 250.0);
    engine.script_type(STABBER, TypeCategory::Ship);
    engine.script_attribute(STABBER, AGILITY, 4.2);
    engine.script_attribute(STABBER, CAPACITOR_CAPACITY, 1125.0);

    engine.script_type(AUTOCANNON, TypeCategory::Module);
    engine.script_attribute(AUTOCANNON, DAMAGE_MULTIPLIER, 2.475);
    engine.script_effect(
        AUTOCANNON,
        PROJECTILE_FIRED,
        EffectDef {
            state: State::Active,
            projectable: true,
            attributes: Some(EffectAttributes {
                duration: 3825.0,
                tracking_speed: 0.253,
                discharge: 0.0,
                range: 1200.0,
                falloff: 6000.0,
                fitting_usage_chance: 0.0,
            }),
            ..EffectDef::default()
        },
    );

    engine.script_type(EMP_S, TypeCategory::Charge);
    engine.script_attribute(EMP_S, DAMAGE_MULTIPLIER, 1.0);

    engine.script_type(WARRIOR, TypeCategory::Drone);
    engine.script_attribute(WARRIOR, DAMAGE_MULTIPLIER, 1.65);

    engine.script_type(NOMAD_ALPHA, TypeCategory::Implant);
    engine.script_attribute(NOMAD_ALPHA, AGILITY, 0.97);
    engine.script_effect(
        NOMAD_ALPHA,
        SIDE_EFFECT,
        EffectDef { chance_based: true, chance: 0.3, ..EffectDef::default() },
    );

    engine.script_type(SMALL_PROJECTILE_TURRET, TypeCategory::Skill);
    engine.script_attribute(SMALL_PROJECTILE_TURRET, DAMAGE_MULTIPLIER, 0.05);

    Rc::new(engine)
}

// ===========================================================================
// Scenario builders
// ===========================================================================

/// A context flying a Rifter with one active autocannon fitted.
///
/// Returns the context and the turret's slot.
pub fn armed_context(engine: &Rc<ScriptedEngine>) -> (SimContext, SlotKey) {
    let mut ctx = SimContext::new(engine.clone()).expect("context creation");
    ctx.set_ship(RIFTER).expect("set ship");
    let gun = ctx.add_module_with_state(AUTOCANNON, State::Active).expect("fit turret");
    (ctx, gun)
}

/// An attacker with a turret and an unarmed victim, not yet targeting.
pub fn attacker_and_victim(engine: &Rc<ScriptedEngine>) -> (SimContext, SlotKey, SimContext) {
    let (attacker, gun) = armed_context(engine);
    let mut victim = SimContext::new(engine.clone()).expect("context creation");
    victim.set_ship(STABBER).expect("set ship");
    (attacker, gun, victim)
}
