//! Equipment tables: rarities, slots, main and secondary stat rolls, sets,
//! drop rates and crafting costs.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::hero::Faction;

/// Highest equipment enhancement (`+9`).
pub const MAX_EQUIPMENT_ENHANCEMENT: u8 = 9;

/// Main-stat growth per enhancement level.
pub const ENHANCEMENT_MAIN_STAT_GROWTH: f64 = 0.12;

/// Power-rating growth per enhancement level.
pub const ENHANCEMENT_POWER_GROWTH: f64 = 0.1;

/// Enhancement level from which upgrades also consume a special material.
pub const SPECIAL_MATERIAL_ENHANCEMENT: u8 = 6;

/// Items consumed by one melt.
pub const MELT_INPUT_COUNT: usize = 5;

/// Level of items crafted by melting unless configured otherwise.
pub const DEFAULT_MELT_OUTPUT_LEVEL: u32 = 50;

/// Chance that a successful reforge also bumps every secondary stat by one.
pub const REFORGE_BUMP_CHANCE: f64 = 0.25;

/// Chance that a generated item belongs to no set.
pub const NO_SET_CHANCE: f64 = 0.7;

/// Main-stat roll window around the table value.
pub const MAIN_STAT_ROLL: (f64, f64) = (0.9, 1.1);

// =============================================================================
// Rarity
// =============================================================================

/// Equipment rarity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EquipmentRarity {
    /// Common.
    Gray = 1,
    /// Uncommon.
    Green = 2,
    /// Rare.
    Blue = 3,
    /// Epic.
    Purple = 4,
    /// Legendary.
    Orange = 5,
    /// Mythic. Cannot be reforged or melted.
    Red = 6,
}

impl EquipmentRarity {
    /// Total number of equipment rarities.
    pub const COUNT: usize = 6;

    /// All rarities, lowest first.
    #[must_use]
    pub const fn all() -> &'static [EquipmentRarity] {
        &[
            EquipmentRarity::Gray,
            EquipmentRarity::Green,
            EquipmentRarity::Blue,
            EquipmentRarity::Purple,
            EquipmentRarity::Orange,
            EquipmentRarity::Red,
        ]
    }

    /// Zero-based table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize - 1
    }

    /// Stable numeric code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Resolves a stored code; `None` when out of range.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Gray),
            2 => Some(Self::Green),
            3 => Some(Self::Blue),
            4 => Some(Self::Purple),
            5 => Some(Self::Orange),
            6 => Some(Self::Red),
            _ => None,
        }
    }

    /// The next tier up, `None` at the top.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        Self::from_code(self.code() + 1)
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gray => "Gray",
            Self::Green => "Green",
            Self::Blue => "Blue",
            Self::Purple => "Purple",
            Self::Orange => "Orange",
            Self::Red => "Red",
        }
    }

    /// Multiplier applied to the power rating.
    #[must_use]
    pub const fn power_multiplier(self) -> f64 {
        [1.0, 3.0, 5.0, 8.0, 12.0, 20.0][self.index()]
    }

    /// Probability of this tier on a loot roll.
    #[must_use]
    pub const fn drop_rate(self) -> f64 {
        [0.4, 0.3, 0.2, 0.08, 0.019, 0.001][self.index()]
    }

    /// Number of secondary stats rolled.
    #[must_use]
    pub const fn secondary_count(self) -> usize {
        [0, 1, 1, 2, 2, 3][self.index()]
    }

    /// Inclusive value range of each secondary stat.
    #[must_use]
    pub const fn secondary_range(self) -> (i32, i32) {
        [(1, 3), (2, 5), (3, 8), (5, 12), (8, 18), (12, 25)][self.index()]
    }

    /// Whether the tier can be reforged or melted.
    #[must_use]
    pub const fn is_salvageable(self) -> bool {
        !matches!(self, Self::Red)
    }

    /// Gold charged per reforge.
    #[must_use]
    pub const fn reforge_gold(self) -> u64 {
        [1000, 2000, 5000, 10_000, 25_000, 50_000][self.index()]
    }

    /// Gems charged per reforge.
    #[must_use]
    pub const fn reforge_gems(self) -> u64 {
        [0, 0, 10, 25, 50, 100][self.index()]
    }

    /// Probability that a reforge rerolls the secondary stats.
    #[must_use]
    pub const fn reforge_success_chance(self) -> f64 {
        [0.8, 0.6, 0.4, 0.25, 0.15, 0.1][self.index()]
    }

    /// Gold base for enhancement costs.
    #[must_use]
    pub const fn upgrade_base_cost(self) -> u64 {
        [500, 1000, 2500, 5000, 12_500, 25_000][self.index()]
    }

    /// Resolves a uniform draw in `[0, 1)` against the cumulative drop table.
    ///
    /// Rounding can leave the cumulative total a hair below 1.0; a draw past
    /// every bucket resolves to [`EquipmentRarity::Gray`].
    #[must_use]
    pub fn from_drop_roll(draw: f64) -> Self {
        let mut cumulative = 0.0;
        for &rarity in Self::all() {
            cumulative += rarity.drop_rate();
            if draw <= cumulative {
                return rarity;
            }
        }
        Self::Gray
    }
}

impl fmt::Display for EquipmentRarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Gold cost of enhancing from `enhancement` to `enhancement + 1`:
/// `base × floor((e + 1)^1.8)`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn equipment_upgrade_cost(rarity: EquipmentRarity, enhancement: u8) -> u64 {
    let growth = (f64::from(enhancement) + 1.0).powf(1.8).floor() as u64;
    rarity.upgrade_base_cost() * growth
}

/// Whether enhancing from `enhancement` needs the special material.
#[must_use]
pub const fn requires_special_material(enhancement: u8) -> bool {
    enhancement.saturating_add(1) >= SPECIAL_MATERIAL_ENHANCEMENT
}

// =============================================================================
// Slots and stat kinds
// =============================================================================

/// Equipment slot. A hero holds at most one item per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SlotType {
    /// ATK main stat.
    Weapon = 1,
    /// DEF main stat.
    Armor = 2,
    /// HP main stat.
    Accessory = 3,
    /// Speed main stat.
    Boots = 4,
    /// Crit-rate main stat.
    Gloves = 5,
    /// Resistance main stat.
    Helmet = 6,
}

impl SlotType {
    /// Total number of slots.
    pub const COUNT: usize = 6;

    /// All slots in code order.
    #[must_use]
    pub const fn all() -> &'static [SlotType] {
        &[
            SlotType::Weapon,
            SlotType::Armor,
            SlotType::Accessory,
            SlotType::Boots,
            SlotType::Gloves,
            SlotType::Helmet,
        ]
    }

    /// Zero-based table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize - 1
    }

    /// Stable numeric code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Resolves a stored code; `None` when out of range.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Weapon),
            2 => Some(Self::Armor),
            3 => Some(Self::Accessory),
            4 => Some(Self::Boots),
            5 => Some(Self::Gloves),
            6 => Some(Self::Helmet),
            _ => None,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Weapon => "Weapon",
            Self::Armor => "Armor",
            Self::Accessory => "Accessory",
            Self::Boots => "Boots",
            Self::Gloves => "Gloves",
            Self::Helmet => "Helmet",
        }
    }

    /// The stat this slot's main stat boosts.
    #[must_use]
    pub const fn main_stat_kind(self) -> MainStatKind {
        match self {
            Self::Weapon => MainStatKind::Atk,
            Self::Armor => MainStatKind::Def,
            Self::Accessory => MainStatKind::Hp,
            Self::Boots => MainStatKind::Speed,
            Self::Gloves => MainStatKind::CritRate,
            Self::Helmet => MainStatKind::Resistance,
        }
    }

    /// Unenhanced main-stat value for this slot at `rarity`.
    #[must_use]
    pub const fn base_main_stat(self, rarity: EquipmentRarity) -> i32 {
        MAIN_STAT_TABLE[self.index()][rarity.index()]
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Main-stat values indexed by `[slot][rarity]`.
const MAIN_STAT_TABLE: [[i32; EquipmentRarity::COUNT]; SlotType::COUNT] = [
    [100, 125, 150, 200, 275, 400], // Weapon ATK
    [80, 100, 120, 160, 220, 320],  // Armor DEF
    [200, 250, 300, 400, 550, 800], // Accessory HP
    [15, 20, 25, 35, 50, 75],       // Boots Speed
    [5, 8, 12, 18, 25, 40],         // Gloves crit %
    [10, 15, 20, 30, 45, 70],       // Helmet resistance
];

/// Kind of an item's main stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MainStatKind {
    /// Flat HP.
    Hp,
    /// Flat ATK.
    Atk,
    /// Flat DEF.
    Def,
    /// Flat speed.
    Speed,
    /// Crit rate in percent.
    CritRate,
    /// Resistance in percent.
    Resistance,
}

impl MainStatKind {
    /// The secondary kind an item with this main stat never rolls.
    #[must_use]
    pub const fn excluded_secondary(self) -> Option<SecondaryKind> {
        match self {
            Self::Hp => Some(SecondaryKind::HpPercent),
            Self::Atk => Some(SecondaryKind::AtkPercent),
            Self::Def => Some(SecondaryKind::DefPercent),
            Self::Speed => Some(SecondaryKind::Speed),
            Self::CritRate => Some(SecondaryKind::CritRatePercent),
            Self::Resistance => None,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hp => "HP",
            Self::Atk => "ATK",
            Self::Def => "DEF",
            Self::Speed => "Speed",
            Self::CritRate => "Crit Rate",
            Self::Resistance => "Resistance",
        }
    }
}

/// Kind of a secondary stat. The pool every roll draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecondaryKind {
    /// ATK as a percentage of the pre-equipment value.
    AtkPercent,
    /// DEF as a percentage of the pre-equipment value.
    DefPercent,
    /// HP as a percentage of the pre-equipment value.
    HpPercent,
    /// Flat speed.
    Speed,
    /// Crit rate points.
    CritRatePercent,
    /// Crit damage points.
    CritDamagePercent,
    /// Accuracy points.
    AccuracyPercent,
    /// Evasion points.
    EvasionPercent,
    /// Lifesteal points.
    LifestealPercent,
    /// Armor penetration points.
    PenetrationPercent,
}

impl SecondaryKind {
    /// Size of the secondary pool.
    pub const COUNT: usize = 10;

    /// The full pool in roll order.
    #[must_use]
    pub const fn all() -> &'static [SecondaryKind] {
        &[
            SecondaryKind::AtkPercent,
            SecondaryKind::DefPercent,
            SecondaryKind::HpPercent,
            SecondaryKind::Speed,
            SecondaryKind::CritRatePercent,
            SecondaryKind::CritDamagePercent,
            SecondaryKind::AccuracyPercent,
            SecondaryKind::EvasionPercent,
            SecondaryKind::LifestealPercent,
            SecondaryKind::PenetrationPercent,
        ]
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AtkPercent => "ATK%",
            Self::DefPercent => "DEF%",
            Self::HpPercent => "HP%",
            Self::Speed => "Speed",
            Self::CritRatePercent => "Crit Rate%",
            Self::CritDamagePercent => "Crit DMG%",
            Self::AccuracyPercent => "Accuracy%",
            Self::EvasionPercent => "Evasion%",
            Self::LifestealPercent => "Lifesteal%",
            Self::PenetrationPercent => "Penetration%",
        }
    }
}

impl fmt::Display for SecondaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Sets
// =============================================================================

/// Equipment set membership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EquipmentSet {
    /// Not part of a set.
    #[default]
    None = 0,
    /// Gotei 13. Shinigami only.
    Gotei13 = 1,
    /// Espada.
    Espada = 2,
    /// Sternritter.
    Sternritter = 3,
    /// Vizard.
    Vizard = 4,
    /// Fullbring.
    Fullbring = 5,
    /// Hollow.
    Hollow = 6,
}

/// Piece counts at which set tiers unlock.
pub const SET_TIERS: [usize; 3] = [2, 4, 6];

impl EquipmentSet {
    /// Number of real sets (excluding [`EquipmentSet::None`]).
    pub const DEFINED: usize = 6;

    /// All real sets.
    #[must_use]
    pub const fn defined() -> &'static [EquipmentSet] {
        &[
            EquipmentSet::Gotei13,
            EquipmentSet::Espada,
            EquipmentSet::Sternritter,
            EquipmentSet::Vizard,
            EquipmentSet::Fullbring,
            EquipmentSet::Hollow,
        ]
    }

    /// Stable numeric code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Resolves a stored code; `None` when out of range.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Gotei13),
            2 => Some(Self::Espada),
            3 => Some(Self::Sternritter),
            4 => Some(Self::Vizard),
            5 => Some(Self::Fullbring),
            6 => Some(Self::Hollow),
            _ => None,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "No Set",
            Self::Gotei13 => "Gotei 13",
            Self::Espada => "Espada",
            Self::Sternritter => "Sternritter",
            Self::Vizard => "Vizard",
            Self::Fullbring => "Fullbring",
            Self::Hollow => "Hollow",
        }
    }

    /// Whether a hero of `faction` may equip pieces of this set.
    #[must_use]
    pub fn can_be_equipped_by(self, faction: Option<Faction>) -> bool {
        match self {
            Self::Gotei13 => faction == Some(Faction::Shinigami),
            _ => true,
        }
    }

    /// Description of the tier unlocked at `pieces` (2, 4 or 6).
    #[must_use]
    pub const fn tier_description(self, pieces: usize) -> Option<&'static str> {
        let text = match (self, pieces) {
            (Self::Gotei13, 2) => "Gotei 13 (2): +15% EXP gained",
            (Self::Gotei13, 4) => "Gotei 13 (4): +25% EXP, skills cost 20% less energy",
            (Self::Gotei13, 6) => "Gotei 13 (6): all previous bonuses, Bankai twice per battle",
            (Self::Espada, 2) => "Espada (2): +20% armor penetration",
            (Self::Espada, 4) => "Espada (4): +35% penetration, ignores 20% enemy defense",
            (Self::Espada, 6) => "Espada (6): all previous bonuses, revive once at 50% HP",
            (Self::Sternritter, 2) => "Sternritter (2): +25% accuracy",
            (Self::Sternritter, 4) => "Sternritter (4): +40% accuracy, 30% double attack chance",
            (Self::Sternritter, 6) => {
                "Sternritter (6): all previous bonuses, Vollstandig doubles all stats for 15s"
            }
            (Self::Vizard, 2) => "Vizard (2): +20% all stats",
            (Self::Vizard, 4) => "Vizard (4): +35% all stats, resists negative effects",
            (Self::Vizard, 6) => "Vizard (6): all previous bonuses, final hollowfication",
            (Self::Fullbring, 2) => "Fullbring (2): +30% debuff resistance",
            (Self::Fullbring, 4) => "Fullbring (4): +50% resistance, crowd-control immunity",
            (Self::Fullbring, 6) => "Fullbring (6): all previous bonuses, battlefield control",
            (Self::Hollow, 2) => "Hollow (2): +25% crit damage",
            (Self::Hollow, 4) => "Hollow (4): +40% crit damage, 25% lifesteal",
            (Self::Hollow, 6) => "Hollow (6): all previous bonuses, Cero Oscuras finisher",
            _ => return None,
        };
        Some(text)
    }

    /// Stat effect of the highest tier unlocked by `pieces`.
    ///
    /// Each tier supersedes the one below it; the 6-piece tier keeps the
    /// 4-piece numbers and only adds a battle ability.
    #[must_use]
    pub const fn effect(self, pieces: usize) -> SetEffect {
        let four = pieces >= 4;
        if pieces < 2 {
            return SetEffect::NONE;
        }
        match self {
            Self::Sternritter => SetEffect {
                accuracy: if four { 0.40 } else { 0.25 },
                ..SetEffect::NONE
            },
            Self::Vizard => SetEffect {
                all_stats: if four { 0.35 } else { 0.20 },
                ..SetEffect::NONE
            },
            Self::Hollow => SetEffect {
                crit_damage: if four { 0.40 } else { 0.25 },
                lifesteal: if four { 0.25 } else { 0.0 },
                ..SetEffect::NONE
            },
            Self::None | Self::Gotei13 | Self::Espada | Self::Fullbring => SetEffect::NONE,
        }
    }
}

impl fmt::Display for EquipmentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric part of a set bonus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetEffect {
    /// HP/ATK/DEF/Speed fraction of the pre-equipment snapshot.
    pub all_stats: f64,
    /// Flat accuracy addition.
    pub accuracy: f64,
    /// Flat crit-damage addition.
    pub crit_damage: f64,
    /// Lifesteal fraction (recorded).
    pub lifesteal: f64,
}

impl SetEffect {
    /// No numeric effect.
    pub const NONE: Self = Self {
        all_stats: 0.0,
        accuracy: 0.0,
        crit_damage: 0.0,
        lifesteal: 0.0,
    };
}
