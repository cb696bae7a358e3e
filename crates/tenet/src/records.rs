//! Result record types produced by the attribute engine.
//!
//! These are plain data carriers: the engine fills them in, the modeling
//! layer copies them out of engine-owned buffers and hands them to callers.
//! None of them hold references back into engine state — the one identity
//! field ([`CapacitorRecord::origin`]) is an opaque token compared for
//! equality, never dereferenced.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::ids::{AttributeId, EngineHandle, TypeId};

bitflags! {
    /// Flags qualifying one affector contribution.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct AffectorFlags: u8 {
        /// Contribution is subject to stacking penalties.
        const PENALIZED = 1 << 0;
        /// Source may contribute at most once regardless of fitted count.
        const SINGLETON = 1 << 1;
    }
}

impl Serialize for AffectorFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for AffectorFlags {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u8::deserialize(deserializer).map(Self::from_bits_retain)
    }
}

/// One source/value/operator contribution to an attribute at a location.
///
/// Affector lists come back from the engine in stacking order; the order of
/// records is part of the result and must be preserved when copying.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectorRecord {
    /// Type contributing the modification.
    pub source: TypeId,
    /// Attribute being modified.
    pub attribute: AttributeId,
    /// Contributed value.
    pub value: f64,
    /// Combination operator applied by the engine.
    pub operator: char,
    /// Stacking order within the operator group.
    pub order: u8,
    /// Qualifying flags.
    pub flags: AffectorFlags,
}

impl AffectorRecord {
    /// Whether this contribution is subject to stacking penalties.
    #[must_use]
    pub fn penalized(&self) -> bool {
        self.flags.contains(AffectorFlags::PENALIZED)
    }

    /// Whether the source contributes at most once.
    #[must_use]
    pub fn singleton(&self) -> bool {
        self.flags.contains(AffectorFlags::SINGLETON)
    }
}

impl fmt::Display for AffectorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{} -> {}",
            self.source, self.operator, self.value, self.attribute
        )
    }
}

/// Long-run capacitor behavior, as projected by the engine.
///
/// The stable/depleting split carries its own payload: a stable capacitor
/// settles at a fraction of capacity, an unstable one runs dry after a
/// number of seconds.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stability {
    /// Capacitor settles; payload is the settled fraction of capacity in
    /// `0.0..=1.0`.
    Stable {
        /// Settled fraction of capacity.
        fraction: f64,
    },
    /// Capacitor runs dry; payload is the time until empty, in seconds.
    Depleting {
        /// Seconds until the capacitor is empty.
        seconds: f64,
    },
}

impl Stability {
    /// Whether the capacitor settles rather than running dry.
    #[must_use]
    pub const fn is_stable(&self) -> bool {
        matches!(self, Self::Stable { .. })
    }
}

/// Capacitor snapshot for one context in a capacitor network.
///
/// The record carries no context-level identifier. [`origin`] is the engine's
/// internal identity for the context the snapshot belongs to; re-associating
/// records with contexts is the correlator's job.
///
/// [`origin`]: CapacitorRecord::origin
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacitorRecord {
    /// Opaque identity of the engine state this snapshot describes.
    pub origin: EngineHandle,
    /// Total capacitor capacity.
    pub capacity: f64,
    /// Net energy delta per second under the queried assumptions.
    pub delta: f64,
    /// Long-run projection.
    pub stability: Stability,
}

/// The six scalar outputs of a location/effect attribute query.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EffectAttributes {
    /// Cycle duration, in milliseconds.
    pub duration: f64,
    /// Tracking speed.
    pub tracking_speed: f64,
    /// Capacitor discharged per cycle.
    pub discharge: f64,
    /// Optimal range, in meters.
    pub range: f64,
    /// Falloff past optimal, in meters.
    pub falloff: f64,
    /// Chance per cycle for fitting-usage effects.
    pub fitting_usage_chance: f64,
}
