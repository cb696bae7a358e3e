//! Property tests: slot recycling never aliases, and arbitrary targeting
//! sequences keep both sides of the graph consistent.

use std::collections::BTreeMap;

use proptest::prelude::*;

use tenet::{Location, SlotKey, State};

use super::helpers::{armed_context, rigged_engine, AUTOCANNON};
use crate::context::SimContext;
use crate::error::Error;
use crate::slots::SlotArena;

// ===========================================================================
// Generators
// ===========================================================================

/// One step against a slot arena.
#[derive(Debug, Clone, Copy)]
enum ArenaOp {
    Insert(u32),
    /// Remove the n-th live key (modulo the live count).
    RemoveNth(usize),
}

fn arb_arena_ops(max_ops: usize) -> impl Strategy<Value = Vec<ArenaOp>> {
    proptest::collection::vec(
        prop_oneof![
            (0..10_000u32).prop_map(ArenaOp::Insert),
            (0..32usize).prop_map(ArenaOp::RemoveNth),
        ],
        0..max_ops,
    )
}

/// One step against a trio of contexts, each with two turret slots.
#[derive(Debug, Clone, Copy)]
enum TargetOp {
    /// `source` targets `target` from one of its three locations.
    Target { source: usize, target: usize, loc: usize },
    /// `source` withdraws whatever is at one of its three locations.
    Clear { source: usize, loc: usize },
}

fn arb_target_ops(max_ops: usize) -> impl Strategy<Value = Vec<TargetOp>> {
    proptest::collection::vec(
        prop_oneof![
            (0..3usize, 0..3usize, 0..3usize)
                .prop_map(|(source, target, loc)| TargetOp::Target { source, target, loc }),
            (0..3usize, 0..3usize).prop_map(|(source, loc)| TargetOp::Clear { source, loc }),
        ],
        0..max_ops,
    )
}

/// Mutable access to one context plus shared access to another.
fn pair_mut(contexts: &mut [SimContext], a: usize, b: usize) -> (&mut SimContext, &SimContext) {
    assert_ne!(a, b);
    if a < b {
        let (left, right) = contexts.split_at_mut(b);
        (&mut left[a], &right[0])
    } else {
        let (left, right) = contexts.split_at_mut(a);
        (&mut right[0], &left[b])
    }
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    /// The arena agrees with a reference map under arbitrary churn, and a
    /// freed key always misses until it is reissued.
    #[test]
    fn slot_arena_matches_reference_model(ops in arb_arena_ops(64)) {
        let mut arena = SlotArena::new();
        let mut reference: BTreeMap<SlotKey, u32> = BTreeMap::new();

        for op in ops {
            match op {
                ArenaOp::Insert(value) => {
                    let key = arena.insert(value);
                    prop_assert!(reference.insert(key, value).is_none(), "key {key} aliased");
                }
                ArenaOp::RemoveNth(n) => {
                    if reference.is_empty() {
                        continue;
                    }
                    let key = *reference.keys().nth(n % reference.len()).unwrap();
                    prop_assert_eq!(arena.remove(key), reference.remove(&key));
                    prop_assert!(arena.get(key).is_none());
                    prop_assert!(arena.remove(key).is_none());
                }
            }
        }

        prop_assert_eq!(arena.len(), reference.len());
        for (key, value) in &reference {
            prop_assert_eq!(arena.get(*key), Some(value));
        }
    }

    /// After any sequence of target/clear calls, every outgoing edge has a
    /// matching inbound entry, every inbound entry has a matching outgoing
    /// edge, and capacitor correlation succeeds for every context.
    #[test]
    fn targeting_graph_stays_symmetric(ops in arb_target_ops(48)) {
        let engine = rigged_engine();
        let mut contexts = Vec::new();
        let mut locations = Vec::new();
        for _ in 0..3 {
            let (mut ctx, first_gun) = armed_context(&engine);
            let second_gun = ctx.add_module_with_state(AUTOCANNON, State::Active).unwrap();
            locations.push([Location::Ship, Location::Module(first_gun), Location::Module(second_gun)]);
            contexts.push(ctx);
        }

        for op in ops {
            match op {
                TargetOp::Target { source, target, loc } => {
                    if source == target {
                        continue;
                    }
                    let location = locations[source][loc];
                    let (src, dst) = pair_mut(&mut contexts, source, target);
                    src.target(location, dst).unwrap();
                }
                TargetOp::Clear { source, loc } => {
                    let location = locations[source][loc];
                    if let Err(err) = contexts[source].clear_target(location) {
                        prop_assert_eq!(err, Error::NotFound);
                    }
                }
            }
        }

        // Outgoing edges imply inbound entries.
        for (i, ctx) in contexts.iter().enumerate() {
            for location in locations[i] {
                if let Some(target_id) = ctx.target_of(location) {
                    let target = contexts.iter().find(|c| c.id() == target_id).unwrap();
                    prop_assert!(target.is_targeted_by(ctx));
                }
            }
        }

        // Inbound entries imply outgoing edges.
        for target in &contexts {
            for source in &contexts {
                if source.id() == target.id() {
                    continue;
                }
                if target.is_targeted_by(source) {
                    let i = contexts.iter().position(|c| c.id() == source.id()).unwrap();
                    let has_edge = locations[i]
                        .iter()
                        .any(|loc| source.target_of(*loc) == Some(target.id()));
                    prop_assert!(has_edge, "inbound entry without outgoing edge");
                }
            }
        }

        // Correlation succeeds everywhere and covers exactly the network.
        for (i, ctx) in contexts.iter().enumerate() {
            let mut expected = vec![ctx.id()];
            for (j, other) in contexts.iter().enumerate() {
                if i == j {
                    continue;
                }
                let outgoing = locations[i].iter().any(|l| ctx.target_of(*l) == Some(other.id()));
                let inbound = ctx.is_targeted_by(other);
                if outgoing || inbound {
                    expected.push(other.id());
                }
            }
            let report = ctx.get_capacitor_all(false).unwrap();
            prop_assert_eq!(report.len(), expected.len());
            for id in expected {
                prop_assert!(report.contains(id));
            }
        }
        prop_assert_eq!(engine.outstanding_buffers(), 0);
    }
}
