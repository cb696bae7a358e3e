//! End-to-end scenarios across contexts, targeting, fleets, and bulk
//! result correlation.

use tenet::{AttributeEngine, Location, Stability};

use super::helpers::*;
use crate::context::SimContext;
use crate::error::{EngineFault, Error};
use crate::fleet::FleetContext;

// ===========================================================================
// Targeting graph
// ===========================================================================

#[test]
fn targeting_is_visible_from_both_sides() {
    let engine = rigged_engine();
    let (mut attacker, gun, victim) = attacker_and_victim(&engine);

    attacker.target(Location::Module(gun), &victim).unwrap();

    assert_eq!(attacker.target_of(Location::Module(gun)), Some(victim.id()));
    assert!(victim.is_targeted_by(&attacker));
    assert_eq!(victim.targeter_count(), 1);
}

#[test]
fn clearing_a_target_removes_both_sides() {
    let engine = rigged_engine();
    let (mut attacker, gun, victim) = attacker_and_victim(&engine);

    attacker.target(Location::Module(gun), &victim).unwrap();
    attacker.clear_target(Location::Module(gun)).unwrap();

    assert!(!attacker.has_target(Location::Module(gun)));
    assert!(!victim.is_targeted_by(&attacker));
    assert_eq!(attacker.clear_target(Location::Module(gun)), Err(Error::NotFound));
}

#[test]
fn retargeting_replaces_without_duplicates() {
    let engine = rigged_engine();
    let (mut attacker, gun, first) = attacker_and_victim(&engine);
    let mut second = SimContext::new(engine.clone()).unwrap();
    second.set_ship(STABBER).unwrap();

    attacker.target(Location::Module(gun), &first).unwrap();
    attacker.target(Location::Module(gun), &second).unwrap();

    assert_eq!(attacker.target_of(Location::Module(gun)), Some(second.id()));
    assert_eq!(attacker.target_count(), 1);
    assert!(!first.is_targeted_by(&attacker));
    assert!(second.is_targeted_by(&attacker));
}

#[test]
fn two_locations_may_hold_the_same_target() {
    let engine = rigged_engine();
    let (mut attacker, gun, victim) = attacker_and_victim(&engine);
    let second_gun = attacker.add_module_with_state(AUTOCANNON, tenet::State::Active).unwrap();

    attacker.target(Location::Module(gun), &victim).unwrap();
    attacker.target(Location::Module(second_gun), &victim).unwrap();

    // Withdrawing one projection must not sever the other's back-reference.
    attacker.clear_target(Location::Module(gun)).unwrap();
    assert!(victim.is_targeted_by(&attacker));

    attacker.clear_target(Location::Module(second_gun)).unwrap();
    assert!(!victim.is_targeted_by(&attacker));
}

#[test]
fn unfitting_a_module_withdraws_its_projection() {
    let engine = rigged_engine();
    let (mut attacker, gun, victim) = attacker_and_victim(&engine);

    attacker.target(Location::Module(gun), &victim).unwrap();
    attacker.remove_module(gun).unwrap();

    assert!(!attacker.has_target(Location::Module(gun)));
    assert!(!victim.is_targeted_by(&attacker));
    let report = attacker.get_capacitor_all(false).unwrap();
    assert_eq!(report.len(), 1);
}

#[test]
fn dropping_a_target_leaves_no_dangling_edge() {
    let engine = rigged_engine();
    let (mut attacker, gun, victim) = attacker_and_victim(&engine);

    attacker.target(Location::Module(gun), &victim).unwrap();
    drop(victim);

    assert!(!attacker.has_target(Location::Module(gun)));
    let report = attacker.get_capacitor_all(false).unwrap();
    assert_eq!(report.len(), 1);
    assert!(report.contains(attacker.id()));
    assert_eq!(engine.live_contexts(), 1);
}

#[test]
fn dropping_a_targeter_leaves_no_dangling_back_reference() {
    let engine = rigged_engine();
    let (mut attacker, gun, victim) = attacker_and_victim(&engine);

    attacker.target(Location::Module(gun), &victim).unwrap();
    assert_eq!(victim.targeter_count(), 1);

    drop(attacker);
    assert_eq!(victim.targeter_count(), 0);
    let report = victim.get_capacitor_all(false).unwrap();
    assert_eq!(report.len(), 1);
}

// ===========================================================================
// Capacitor correlation
// ===========================================================================

#[test]
fn capacitor_report_covers_attacker_and_victim_once_each() {
    let engine = rigged_engine();
    let (mut attacker, gun, victim) = attacker_and_victim(&engine);
    engine.script_capacitor(
        attacker.engine_handle(),
        250.0,
        -4.5,
        Stability::Depleting { seconds: 310.0 },
    );
    engine.script_capacitor(
        victim.engine_handle(),
        1125.0,
        2.1,
        Stability::Stable { fraction: 0.71 },
    );

    attacker.target(Location::Module(gun), &victim).unwrap();
    let report = attacker.get_capacitor_all(true).unwrap();

    assert_eq!(report.len(), 2);
    let own = report.get(attacker.id()).unwrap();
    assert_eq!(own.capacity, 250.0);
    assert!(!own.stability.is_stable());
    let theirs = report.get(victim.id()).unwrap();
    assert_eq!(theirs.capacity, 1125.0);
    assert_eq!(theirs.stability, Stability::Stable { fraction: 0.71 });
    assert_eq!(engine.outstanding_buffers(), 0);
}

#[test]
fn capacitor_report_covers_the_whole_network() {
    let engine = rigged_engine();
    let (mut hub, hub_gun, outgoing) = attacker_and_victim(&engine);
    let (mut inbound_a, gun_a) = armed_context(&engine);
    let (mut inbound_b, gun_b) = armed_context(&engine);

    hub.target(Location::Module(hub_gun), &outgoing).unwrap();
    inbound_a.target(Location::Module(gun_a), &hub).unwrap();
    inbound_b.target(Location::Module(gun_b), &hub).unwrap();

    let report = hub.get_capacitor_all(false).unwrap();
    assert_eq!(report.len(), 4);
    for ctx in [&hub, &outgoing, &inbound_a, &inbound_b] {
        assert!(report.contains(ctx.id()), "missing {:?}", ctx.id());
    }

    // The inbound contexts are not part of each other's networks.
    let side_report = inbound_a.get_capacitor_all(false).unwrap();
    assert_eq!(side_report.len(), 2);
    assert!(side_report.contains(inbound_a.id()));
    assert!(side_report.contains(hub.id()));
}

#[test]
fn engine_side_desync_is_fatal_and_leak_free() {
    let engine = rigged_engine();
    let (attacker, _gun) = armed_context(&engine);

    // An engine context the model has never heard of targets the attacker:
    // the engine's network disagrees with the local relevant set.
    let rogue = engine.create_context().unwrap();
    engine.set_ship(rogue, RIFTER).unwrap();
    engine.target(rogue, Location::Ship, attacker.engine_handle()).unwrap();

    let err = attacker.get_capacitor_all(false).unwrap_err();
    assert_eq!(
        err,
        Error::EngineFault(EngineFault::CapacitorCount { expected: 1, actual: 2 })
    );
    assert_eq!(engine.outstanding_buffers(), 0);
}

// ===========================================================================
// Effects and effect attributes
// ===========================================================================

#[test]
fn chance_based_effect_toggle_and_chance() {
    let engine = rigged_engine();
    let mut ctx = SimContext::new(engine.clone()).unwrap();
    let slot = ctx.add_implant(NOMAD_ALPHA).unwrap();
    let location = Location::Implant(slot);

    ctx.toggle_chance_based_effect(location, SIDE_EFFECT, true).unwrap();
    assert!(ctx.effect_toggled(location, SIDE_EFFECT));
    assert_eq!(ctx.get_chance_based_effect_chance(location, SIDE_EFFECT).unwrap(), 0.3);

    ctx.toggle_chance_based_effect(location, SIDE_EFFECT, false).unwrap();
    assert!(!ctx.effect_toggled(location, SIDE_EFFECT));
}

#[test]
fn non_chance_based_effect_refuses_to_toggle() {
    let engine = rigged_engine();
    let (mut ctx, gun) = armed_context(&engine);

    assert_eq!(
        ctx.toggle_chance_based_effect(Location::Module(gun), PROJECTILE_FIRED, true),
        Err(Error::NotApplicable)
    );
}

#[test]
fn effect_attributes_carry_the_six_pack() {
    let engine = rigged_engine();
    let (ctx, gun) = armed_context(&engine);

    let attrs =
        ctx.get_location_effect_attributes(Location::Module(gun), PROJECTILE_FIRED).unwrap();
    assert_eq!(attrs.duration, 3825.0);
    assert_eq!(attrs.falloff, 6000.0);
    assert_eq!(attrs.fitting_usage_chance, 0.0);
}

// ===========================================================================
// Skills
// ===========================================================================

#[test]
fn skill_levels_override_and_reset() {
    let engine = rigged_engine();
    let mut ctx = SimContext::new(engine).unwrap();

    assert_eq!(ctx.skill_level(SMALL_PROJECTILE_TURRET), 5);
    ctx.set_default_skill_level(3).unwrap();
    assert_eq!(ctx.skill_level(SMALL_PROJECTILE_TURRET), 3);

    ctx.set_skill_level(SMALL_PROJECTILE_TURRET, 5).unwrap();
    assert_eq!(ctx.skill_level(SMALL_PROJECTILE_TURRET), 5);

    ctx.reset_skill_level(SMALL_PROJECTILE_TURRET).unwrap();
    assert_eq!(ctx.skill_level(SMALL_PROJECTILE_TURRET), 3);

    ctx.set_skill_level(SMALL_PROJECTILE_TURRET, 4).unwrap();
    ctx.reset_skill_levels().unwrap();
    assert_eq!(ctx.skill_level(SMALL_PROJECTILE_TURRET), 3);
}

#[test]
fn out_of_range_skill_level_is_not_applicable() {
    let engine = rigged_engine();
    let mut ctx = SimContext::new(engine).unwrap();

    assert_eq!(ctx.set_default_skill_level(6), Err(Error::NotApplicable));
    assert_eq!(ctx.set_skill_level(SMALL_PROJECTILE_TURRET, 9), Err(Error::NotApplicable));
    assert_eq!(ctx.skill_level(SMALL_PROJECTILE_TURRET), 5);
}

// ===========================================================================
// Fleet hierarchy with live contexts
// ===========================================================================

#[test]
fn fleet_roles_across_multiple_contexts() {
    let engine = rigged_engine();
    let fc = SimContext::new(engine.clone()).unwrap();
    let wc = SimContext::new(engine.clone()).unwrap();
    let grunt = SimContext::new(engine.clone()).unwrap();
    let mut fleet = FleetContext::new(engine.clone()).unwrap();

    fleet.add_fleet_commander(&fc).unwrap();
    fleet.add_wing_commander(0, &wc).unwrap();
    fleet.add_squad_commander(0, 0, &wc).unwrap();
    fleet.add_squad_member(0, 0, &grunt).unwrap();
    fleet.set_fleet_booster(Some(&fc)).unwrap();

    assert!(fleet.is_member(&fc));
    assert!(fleet.is_member(&wc));
    assert_eq!(fleet.squad_of(&grunt), Some((0, 0)));

    assert!(fleet.remove_fleet_member(&wc).unwrap());
    assert!(!fleet.is_member(&wc));
    assert!(fleet.is_member(&fc));
    assert!(!fleet.remove_fleet_member(&wc).unwrap());
}

// ===========================================================================
// Full walkthrough
// ===========================================================================

#[test]
fn full_fitting_walkthrough_releases_everything() {
    let engine = rigged_engine();
    {
        let (mut ctx, gun) = armed_context(&engine);
        ctx.add_charge(gun, EMP_S).unwrap();
        ctx.add_drone(WARRIOR, 5).unwrap();
        let implant = ctx.add_implant(NOMAD_ALPHA).unwrap();
        ctx.set_skill_level(SMALL_PROJECTILE_TURRET, 4).unwrap();

        assert_eq!(ctx.get_ship_attribute(AGILITY).unwrap(), 3.19);
        assert_eq!(ctx.get_module_attribute(gun, DAMAGE_MULTIPLIER).unwrap(), 2.475);
        assert_eq!(ctx.get_charge_attribute(gun, DAMAGE_MULTIPLIER).unwrap(), 1.0);
        assert_eq!(ctx.get_drone_attribute(WARRIOR, DAMAGE_MULTIPLIER).unwrap(), 1.65);
        assert_eq!(ctx.get_implant_attribute(implant, AGILITY).unwrap(), 0.97);

        let _ = ctx.get_affectors(Location::Ship).unwrap();
        let report = ctx.get_capacitor_all(true).unwrap();
        assert_eq!(report.len(), 1);

        let mut fleet = FleetContext::new(engine.clone()).unwrap();
        fleet.add_squad_member(0, 0, &ctx).unwrap();
        assert!(fleet.remove_fleet_member(&ctx).unwrap());
    }
    // Everything owned by the scope is back with the engine.
    assert_eq!(engine.live_contexts(), 0);
    assert_eq!(engine.live_fleets(), 0);
    assert_eq!(engine.outstanding_buffers(), 0);
}
