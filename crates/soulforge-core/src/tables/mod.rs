//! Static lookup tables.
//!
//! Every number the rules engine depends on lives here: role base stats,
//! growth curves, synergy effects, equipment stat tables, drop rates, set
//! bonuses and battle formula data. Tables are plain `const` data and are
//! never mutated after start-up.
//!
//! # Closed enumerations
//!
//! Roles, factions, attributes and rarities are closed enums with stable
//! numeric codes. Stored records may still carry a code outside the known
//! range; `from_code` returns `None` for those and callers fall back to a
//! neutral value with a `tracing` warning.
//!
//! - [`hero`]: hero-side tables (roles, factions, attributes, growth, synergy)
//! - [`equipment`]: item tables (slots, rarities, stat rolls, sets, costs)
//! - [`battle`]: battle formula data (damage, hit chance, type advantage)

pub mod battle;
pub mod equipment;
pub mod hero;

pub use battle::{DamageType, Position};
pub use equipment::{
    EquipmentRarity, EquipmentSet, MainStatKind, SecondaryKind, SetEffect, SlotType,
};
pub use hero::{
    Attribute, AttributeBonus, BaseStats, EpicCombo, Faction, HeroRarity, Role, SynergyEffect,
    SynergyFlags,
};

/// Rounds half-up to the nearest integer, matching how every stored stat is
/// derived from its floating-point multiplier chain.
///
/// Stats are non-negative in practice; negative inputs still round toward
/// positive infinity on exact halves.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// [`round_half_up`] narrowed to the `i32` width used for hero stats.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn round_stat(value: f64) -> i32 {
    round_half_up(value).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
