//! Battle formula data.
//!
//! Damage mitigation, hit chance, faction advantage and positional
//! protection. These are exposed as pure functions for battle hosts; the
//! engine itself never runs a battle.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::hero::Faction;
use super::round_half_up;

/// Damage reduction granted per DEF point.
pub const DEFENSE_FACTOR: f64 = 0.005;

/// Cap on DEF-based damage reduction.
pub const MAX_DAMAGE_REDUCTION: f64 = 0.8;

/// Cap on the crit damage multiplier.
pub const MAX_CRIT_DAMAGE: f64 = 3.0;

/// Cap on evasion when computing hit chance.
pub const MAX_EVASION: f64 = 0.75;

/// Floor on hit chance.
pub const MIN_HIT_CHANCE: f64 = 0.05;

/// Half-width of the turn-order speed jitter.
pub const SPEED_RANDOMNESS: f64 = 0.15;

/// Extra protection for back-row heroes while the team fields a Tank.
pub const TANK_COVER_BONUS: f64 = 1.2;

// =============================================================================
// Positions
// =============================================================================

/// Formation position. `Bench` means not deployed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Position {
    /// Not in the active formation.
    #[default]
    Bench = 0,
    /// Front row, left.
    FrontLeft = 1,
    /// Front row, center. The most exposed slot.
    FrontCenter = 2,
    /// Front row, right.
    FrontRight = 3,
    /// Back row, left.
    BackLeft = 4,
    /// Back row, right.
    BackRight = 5,
}

impl Position {
    /// Deployed positions, front to back.
    #[must_use]
    pub const fn deployed() -> &'static [Position] {
        &[
            Position::FrontLeft,
            Position::FrontCenter,
            Position::FrontRight,
            Position::BackLeft,
            Position::BackRight,
        ]
    }

    /// Stable numeric code (slot number, 0 for bench).
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Resolves a stored code; `None` when out of range.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Bench),
            1 => Some(Self::FrontLeft),
            2 => Some(Self::FrontCenter),
            3 => Some(Self::FrontRight),
            4 => Some(Self::BackLeft),
            5 => Some(Self::BackRight),
            _ => None,
        }
    }

    /// Position of the `n`th deployed slot (0-based), front to back.
    #[must_use]
    pub fn nth_deployed(n: usize) -> Option<Self> {
        Self::deployed().get(n).copied()
    }

    /// Deployed in any slot.
    #[must_use]
    pub const fn is_deployed(self) -> bool {
        !matches!(self, Self::Bench)
    }

    /// Slots 1..=3.
    #[must_use]
    pub const fn is_front_row(self) -> bool {
        matches!(self, Self::FrontLeft | Self::FrontCenter | Self::FrontRight)
    }

    /// Slots 4..=5.
    #[must_use]
    pub const fn is_back_row(self) -> bool {
        matches!(self, Self::BackLeft | Self::BackRight)
    }

    /// Incoming-damage protection multiplier of the slot.
    #[must_use]
    pub const fn protection(self) -> f64 {
        match self {
            Self::FrontCenter => 0.8,
            Self::BackLeft | Self::BackRight => 1.2,
            Self::Bench | Self::FrontLeft | Self::FrontRight => 1.0,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bench => "Bench",
            Self::FrontLeft => "Front Left",
            Self::FrontCenter => "Front Center",
            Self::FrontRight => "Front Right",
            Self::BackLeft => "Back Left",
            Self::BackRight => "Back Right",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Damage
// =============================================================================

/// Kind of incoming damage, for faction resistances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    /// Weapons and fists.
    Physical,
    /// Shinigami spellcraft.
    Kido,
    /// Raw spiritual pressure.
    Spiritual,
}

/// Share of incoming damage removed by `def`, capped at
/// [`MAX_DAMAGE_REDUCTION`].
#[must_use]
pub fn defense_reduction(def: i32) -> f64 {
    (f64::from(def.max(0)) * DEFENSE_FACTOR).min(MAX_DAMAGE_REDUCTION)
}

/// Damage dealt after crit, defense and resistance. Never below 1.
#[must_use]
pub fn final_damage(
    base_damage: i32,
    crit: Option<f64>,
    defender_def: i32,
    resistance: f64,
) -> i64 {
    let crit_multiplier = crit.map_or(1.0, |m| m.clamp(1.0, MAX_CRIT_DAMAGE));
    let raw = f64::from(base_damage)
        * crit_multiplier
        * (1.0 - defense_reduction(defender_def))
        * resistance;
    round_half_up(raw).max(1)
}

/// Probability an attack lands.
#[must_use]
pub fn hit_chance(accuracy: f64, evasion: f64) -> f64 {
    (accuracy.min(1.0) - evasion.min(MAX_EVASION)).max(MIN_HIT_CHANCE)
}

/// Damage multiplier for `attacker` striking `defender`.
#[must_use]
pub fn type_advantage(attacker: Faction, defender: Faction) -> f64 {
    match (attacker, defender) {
        (Faction::Quincy, Faction::Hollow) => 1.3,
        (Faction::Shinigami, Faction::Hollow) => 1.2,
        (Faction::Arrancar, Faction::Shinigami) => 1.15,
        _ => 1.0,
    }
}

/// Incoming-damage multiplier for `defender` hit by `damage`.
#[must_use]
pub fn damage_resistance(defender: Faction, damage: DamageType) -> f64 {
    match (defender, damage) {
        (Faction::Shinigami, DamageType::Kido) => 0.8,
        (Faction::Hollow, DamageType::Spiritual) => 0.9,
        (Faction::Fullbring, _) => 0.95,
        _ => 1.0,
    }
}

/// Speed with ±[`SPEED_RANDOMNESS`] jitter, used to order turns.
pub fn effective_speed(speed: i32, rng: &mut impl Rng) -> f64 {
    let jitter: f64 = rng.gen_range(-1.0..1.0);
    f64::from(speed) * (1.0 + jitter * SPEED_RANDOMNESS)
}
