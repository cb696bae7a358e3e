//! Typed identifiers for the attribute engine boundary.
//!
//! Every identifier is a newtype over its raw integer representation. The
//! wrappers exist so that a skill type cannot be passed where an attribute is
//! expected, and so that engine-issued handles cannot be confused with
//! core-issued slot keys.
//!
//! # Identity vs. addressing
//!
//! - [`TypeId`], [`AttributeId`] and [`EffectId`] name entries in the game
//!   data set. They are stable across the whole process.
//! - [`SlotKey`] addresses one fitted item inside one context. Keys are
//!   issued by the context that owns the item and may be recycled after the
//!   item is removed; they mean nothing to any other context.
//! - [`EngineHandle`] and [`FleetHandle`] are opaque tokens naming engine
//!   internal state. The engine may recycle a handle after the owning
//!   context is destroyed, so handles are compared only among live contexts.
//! - [`BufferId`] names one engine-owned bulk result buffer, valid from the
//!   query that produced it until it is released.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a game data type: a ship hull, module, charge, drone, implant
/// or skill.
///
/// # Example
///
/// ```
/// use tenet::TypeId;
///
/// let rifter = TypeId::new(587);
/// assert_eq!(rifter.as_u32(), 587);
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeId(u32);

impl TypeId {
    /// Creates a type identifier from its raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type:{}", self.0)
    }
}

impl From<u32> for TypeId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// Identifies a named numeric attribute (capacitor need, optimal range, ...).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttributeId(u16);

impl AttributeId {
    /// Creates an attribute identifier from its raw value.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attr:{}", self.0)
    }
}

impl From<u16> for AttributeId {
    fn from(id: u16) -> Self {
        Self::new(id)
    }
}

/// Identifies an engine-defined effect.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EffectId(i32);

impl EffectId {
    /// Creates an effect identifier from its raw value.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect:{}", self.0)
    }
}

impl From<i32> for EffectId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

/// Context-scoped handle for one fitted item (implant or module).
///
/// A slot key is only meaningful to the context that issued it. Keys stay
/// stable while arbitrary other items are added and removed, and a freed key
/// becomes eligible for reuse by a later add; the one guarantee is that two
/// live items never share a key within one category of one context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotKey(u32);

impl SlotKey {
    /// Creates a slot key from its raw index.
    #[must_use]
    pub const fn new(key: u32) -> Self {
        Self(key)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot:{}", self.0)
    }
}

impl From<u32> for SlotKey {
    fn from(key: u32) -> Self {
        Self::new(key)
    }
}

/// Opaque engine-issued identity of one simulation context's engine state.
///
/// Doubles as the identity token carried by bulk result records: a record is
/// matched back to a context by comparing handles for equality, never by
/// inspecting record payloads.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EngineHandle(u64);

impl EngineHandle {
    /// Creates a handle from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine:{}", self.0)
    }
}

/// Opaque engine-issued identity of one fleet's engine state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FleetHandle(u64);

impl FleetHandle {
    /// Creates a handle from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FleetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fleet:{}", self.0)
    }
}

/// Identity of an engine-owned bulk result buffer.
///
/// Issued together with the buffer contents and owed back to the engine via
/// [`AttributeEngine::release_buffer`](crate::AttributeEngine::release_buffer)
/// exactly once.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BufferId(u64);

impl BufferId {
    /// Creates a buffer identity from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_keys_order_by_raw_index() {
        assert!(SlotKey::new(0) < SlotKey::new(1));
        assert!(SlotKey::new(7) < SlotKey::new(100));
    }

    #[test]
    fn handles_compare_by_identity() {
        let a = EngineHandle::new(10);
        let b = EngineHandle::new(10);
        let c = EngineHandle::new(11);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display_is_prefixed() {
        assert_eq!(TypeId::new(587).to_string(), "type:587");
        assert_eq!(SlotKey::new(3).to_string(), "slot:3");
        assert_eq!(EngineHandle::new(9).to_string(), "engine:9");
    }

    #[test]
    fn serialization_roundtrip() {
        let id = TypeId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        let back: TypeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
