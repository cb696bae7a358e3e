//! Attribute-bearing locations and module activation states.
//!
//! A [`Location`] is a pure value: it names a point in a fitting where
//! attributes and effects can be resolved, and is used as a map/set key
//! throughout the modeling layer. It carries no ownership and never outlives
//! its meaning — a `Module(slot)` location for a removed slot simply resolves
//! to nothing.
//!
//! Structurally invalid locations (a module location without a slot, a drone
//! location without a type) cannot be constructed: each variant carries
//! exactly the payload its kind requires.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{SlotKey, TypeId};

/// Addresses one attribute-bearing point in a fitting.
///
/// # Variants
///
/// - `Character`: the pilot itself
/// - `Ship`: the fitted hull
/// - `Implant(slot)`: one plugged implant
/// - `Skill(type)`: one trained skill
/// - `Module(slot)`: one fitted module
/// - `Charge(slot)`: the charge loaded in a module slot
/// - `Drone(type)`: one drone stack, addressed by drone type
///
/// # Ordering
///
/// Locations order structurally (variant first, then payload), so they can
/// key `BTreeMap`s with deterministic iteration.
///
/// # Example
///
/// ```
/// use tenet::{Location, SlotKey, TypeId};
///
/// let loc = Location::Module(SlotKey::new(2));
/// assert!(loc < Location::Charge(SlotKey::new(0)));
/// assert_eq!(loc, Location::Module(SlotKey::new(2)));
/// let _skill = Location::Skill(TypeId::new(3300));
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Location {
    /// The pilot.
    Character,
    /// The fitted hull.
    Ship,
    /// One plugged implant.
    Implant(SlotKey),
    /// One trained skill.
    Skill(TypeId),
    /// One fitted module.
    Module(SlotKey),
    /// The charge loaded in a module slot.
    Charge(SlotKey),
    /// One drone stack, addressed by drone type.
    Drone(TypeId),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Character => write!(f, "character"),
            Self::Ship => write!(f, "ship"),
            Self::Implant(slot) => write!(f, "implant[{}]", slot.as_u32()),
            Self::Skill(type_id) => write!(f, "skill[{}]", type_id.as_u32()),
            Self::Module(slot) => write!(f, "module[{}]", slot.as_u32()),
            Self::Charge(slot) => write!(f, "charge[{}]", slot.as_u32()),
            Self::Drone(type_id) => write!(f, "drone[{}]", type_id.as_u32()),
        }
    }
}

/// Activation state of a fitted module.
///
/// The discriminants are effect-category masks: each state includes every
/// effect category of the states below it, which is why the variants order
/// by containment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum State {
    /// Fitted but disconnected; contributes nothing.
    Unplugged = 0,
    /// Fitted offline; only always-on effects apply.
    Offline = 1,
    /// Powered online.
    Online = 17,
    /// Actively cycling.
    Active = 31,
    /// Overloaded beyond rated limits.
    Overloaded = 63,
}

impl State {
    /// Returns the effect-category mask for this state.
    #[must_use]
    pub const fn as_mask(self) -> u8 {
        self as u8
    }
}

impl Default for State {
    /// The state a module is fitted in when none is requested.
    fn default() -> Self {
        Self::Online
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unplugged => write!(f, "unplugged"),
            Self::Offline => write!(f, "offline"),
            Self::Online => write!(f, "online"),
            Self::Active => write!(f, "active"),
            Self::Overloaded => write!(f, "overloaded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locations_are_structurally_equal() {
        assert_eq!(Location::Module(SlotKey::new(1)), Location::Module(SlotKey::new(1)));
        assert_ne!(Location::Module(SlotKey::new(1)), Location::Charge(SlotKey::new(1)));
        assert_ne!(Location::Module(SlotKey::new(1)), Location::Module(SlotKey::new(2)));
    }

    #[test]
    fn locations_key_ordered_maps() {
        use std::collections::BTreeMap;

        let mut map = BTreeMap::new();
        map.insert(Location::Drone(TypeId::new(2486)), 5u32);
        map.insert(Location::Character, 1);
        map.insert(Location::Module(SlotKey::new(0)), 3);

        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(
            keys,
            vec![
                Location::Character,
                Location::Module(SlotKey::new(0)),
                Location::Drone(TypeId::new(2486)),
            ]
        );
    }

    #[test]
    fn state_masks_are_cumulative() {
        assert!(State::Offline < State::Online);
        assert!(State::Online < State::Active);
        assert!(State::Active < State::Overloaded);
        // Each mask contains the one below it.
        assert_eq!(State::Active.as_mask() & State::Online.as_mask(), State::Online.as_mask());
        assert_eq!(
            State::Overloaded.as_mask() & State::Active.as_mask(),
            State::Active.as_mask()
        );
    }

    #[test]
    fn default_state_is_online() {
        assert_eq!(State::default(), State::Online);
    }

    #[test]
    fn serialization_roundtrip() {
        let loc = Location::Charge(SlotKey::new(4));
        let json = serde_json::to_string(&loc).unwrap();
        let back: Location = serde_json::from_str(&json).unwrap();
        assert_eq!(loc, back);
    }
}
