//! Identifier newtypes for stored records.
//!
//! Heroes, hero templates and equipment items are all keyed by a `u64` in the
//! storage collaborator. Wrapping each in its own newtype keeps a hero id from
//! ever being passed where an item id is expected.
//!
//! # Example
//!
//! ```
//! use soulforge_core::ids::{EquipmentId, HeroId};
//!
//! let hero = HeroId::new(7);
//! let item = EquipmentId::from(7);
//!
//! assert_eq!(hero.as_u64(), item.as_u64());
//! assert_eq!(format!("{hero:?}"), "HeroId(7)");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Creates an identifier from a raw `u64` value.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the raw `u64` value of this identifier.
            #[must_use]
            pub const fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self::new(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

record_id!(
    /// Identifier of a player-owned hero instance.
    ///
    /// Hero ids are ordered numerically; every collection keyed by hero id
    /// iterates in that order so batch results are reproducible.
    HeroId
);

record_id!(
    /// Identifier of an immutable hero template (content definition).
    TemplateId
);

record_id!(
    /// Identifier of an equipment item in the player's inventory.
    EquipmentId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_numerically() {
        assert!(HeroId::new(1) < HeroId::new(2));
        assert!(EquipmentId::new(10) > EquipmentId::new(9));
    }

    #[test]
    fn ids_convert_both_ways() {
        let id = TemplateId::from(99);
        let raw: u64 = id.into();
        assert_eq!(raw, 99);
    }

    #[test]
    fn debug_names_the_kind() {
        assert_eq!(format!("{:?}", EquipmentId::new(3)), "EquipmentId(3)");
        assert_eq!(format!("{}", EquipmentId::new(3)), "3");
    }

    #[test]
    fn ids_are_serializable() {
        let json = serde_json::to_string(&HeroId::new(5)).unwrap();
        assert_eq!(json, "5");
        let back: HeroId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, HeroId::new(5));
    }
}
