//! Hero-side tables: roles, factions, spiritual attributes, rarity and growth
//! curves, attribute self-bonuses, team synergy effects and epic combos.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Limits and thresholds
// =============================================================================

/// Highest reachable hero level.
pub const MAX_HERO_LEVEL: u32 = 100;

/// Highest star grade.
pub const MAX_STARS: u8 = 5;

/// Highest hero enhancement (`+9`).
pub const MAX_HERO_ENHANCEMENT: u8 = 9;

/// Maximum number of heroes in a formation.
pub const MAX_TEAM_SIZE: usize = 5;

/// Heroes of one faction needed to unlock its team bonus.
pub const FACTION_BONUS_REQUIREMENT: usize = 3;

/// Heroes of one attribute needed to unlock its team bonus.
pub const ATTRIBUTE_BONUS_REQUIREMENT: usize = 4;

/// Default crit rate of a freshly obtained hero.
pub const BASE_CRIT_RATE: f64 = 0.05;

/// Default crit damage multiplier of a freshly obtained hero.
pub const BASE_CRIT_DAMAGE: f64 = 1.5;

/// Default accuracy of a freshly obtained hero.
pub const BASE_ACCURACY: f64 = 0.95;

/// Default evasion of a freshly obtained hero.
pub const BASE_EVASION: f64 = 0.05;

// =============================================================================
// Role
// =============================================================================

/// Combat role. Determines the base stat row and positioning priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Role {
    /// Frontline damage sponge.
    Tank = 1,
    /// Restores allied HP.
    Healer = 2,
    /// High burst, fragile.
    Assassin = 3,
    /// Sustained ranged damage.
    Range = 4,
    /// Buffs and utility.
    Support = 5,
    /// Reckless melee damage.
    Berserker = 6,
    /// Crowd control.
    Controller = 7,
    /// Spell damage.
    Mage = 8,
}

impl Role {
    /// Total number of roles.
    pub const COUNT: usize = 8;

    /// All roles in code order.
    #[must_use]
    pub const fn all() -> &'static [Role] {
        &[
            Role::Tank,
            Role::Healer,
            Role::Assassin,
            Role::Range,
            Role::Support,
            Role::Berserker,
            Role::Controller,
            Role::Mage,
        ]
    }

    /// Zero-based table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize - 1
    }

    /// Stable numeric code used by stored records.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Resolves a stored code; `None` when out of range.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Tank),
            2 => Some(Self::Healer),
            3 => Some(Self::Assassin),
            4 => Some(Self::Range),
            5 => Some(Self::Support),
            6 => Some(Self::Berserker),
            7 => Some(Self::Controller),
            8 => Some(Self::Mage),
            _ => None,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tank => "Tank",
            Self::Healer => "Healer",
            Self::Assassin => "Assassin",
            Self::Range => "Range",
            Self::Support => "Support",
            Self::Berserker => "Berserker",
            Self::Controller => "Controller",
            Self::Mage => "Mage",
        }
    }

    /// Support and Healer heroes, the targets of "supporters first".
    #[must_use]
    pub const fn is_supporter(self) -> bool {
        matches!(self, Self::Support | Self::Healer)
    }

    /// Front-to-back ordering key used when assigning formation positions.
    ///
    /// Lower values stand closer to the front.
    #[must_use]
    pub const fn position_priority(self) -> u8 {
        match self {
            Self::Tank => 1,
            Self::Berserker => 2,
            Self::Assassin => 3,
            Self::Range => 4,
            Self::Controller => 5,
            Self::Mage => 6,
            Self::Support => 7,
            Self::Healer => 8,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Faction
// =============================================================================

/// Faction a hero belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Faction {
    /// Soul reapers.
    Shinigami = 1,
    /// Hollows.
    Hollow = 2,
    /// Quincy archers.
    Quincy = 3,
    /// Arrancar.
    Arrancar = 4,
    /// Spiritually aware humans.
    Human = 5,
    /// Fullbring users.
    Fullbring = 6,
}

impl Faction {
    /// Total number of factions.
    pub const COUNT: usize = 6;

    /// All factions in code order.
    #[must_use]
    pub const fn all() -> &'static [Faction] {
        &[
            Faction::Shinigami,
            Faction::Hollow,
            Faction::Quincy,
            Faction::Arrancar,
            Faction::Human,
            Faction::Fullbring,
        ]
    }

    /// Zero-based table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize - 1
    }

    /// Stable numeric code used by stored records.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Resolves a stored code; `None` when out of range.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Shinigami),
            2 => Some(Self::Hollow),
            3 => Some(Self::Quincy),
            4 => Some(Self::Arrancar),
            5 => Some(Self::Human),
            6 => Some(Self::Fullbring),
            _ => None,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Shinigami => "Shinigami",
            Self::Hollow => "Hollow",
            Self::Quincy => "Quincy",
            Self::Arrancar => "Arrancar",
            Self::Human => "Human",
            Self::Fullbring => "Fullbring",
        }
    }

    /// Team effect unlocked by fielding [`FACTION_BONUS_REQUIREMENT`] heroes of
    /// this faction.
    #[must_use]
    pub const fn synergy(self) -> SynergyEffect {
        match self {
            Self::Shinigami => SynergyEffect::flag(0.15, SynergyFlags::EXP_BOOST),
            Self::Hollow => SynergyEffect::flag(0.20, SynergyFlags::DAMAGE_VS_OTHER_FACTIONS),
            Self::Quincy => SynergyEffect {
                crit_rate: 0.25,
                ..SynergyEffect::flag(0.25, SynergyFlags::empty())
            },
            Self::Arrancar => SynergyEffect::flag(0.20, SynergyFlags::ARMOR_PENETRATION),
            Self::Human => SynergyEffect::flag(0.30, SynergyFlags::DEBUFF_RESISTANCE),
            Self::Fullbring => SynergyEffect {
                all_stats: 0.20,
                ..SynergyEffect::flag(0.20, SynergyFlags::empty())
            },
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Attribute
// =============================================================================

/// Spiritual attribute. Grants a personal bonus and, in numbers, a team bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Attribute {
    /// Raw offense.
    Power = 1,
    /// Spiritual endurance.
    Soul = 2,
    /// Balanced growth.
    Core = 3,
    /// Skill mastery.
    Mind = 4,
    /// Healing affinity.
    Heart = 5,
    /// Penetration.
    Void = 6,
}

impl Attribute {
    /// Total number of attributes.
    pub const COUNT: usize = 6;

    /// All attributes in code order.
    #[must_use]
    pub const fn all() -> &'static [Attribute] {
        &[
            Attribute::Power,
            Attribute::Soul,
            Attribute::Core,
            Attribute::Mind,
            Attribute::Heart,
            Attribute::Void,
        ]
    }

    /// Zero-based table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize - 1
    }

    /// Stable numeric code used by stored records.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Resolves a stored code; `None` when out of range.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Power),
            2 => Some(Self::Soul),
            3 => Some(Self::Core),
            4 => Some(Self::Mind),
            5 => Some(Self::Heart),
            6 => Some(Self::Void),
            _ => None,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Power => "Power",
            Self::Soul => "Soul",
            Self::Core => "Core",
            Self::Mind => "Mind",
            Self::Heart => "Heart",
            Self::Void => "Void",
        }
    }

    /// Personal bonus every hero of this attribute receives.
    #[must_use]
    pub const fn self_bonus(self) -> AttributeBonus {
        const NONE: AttributeBonus = AttributeBonus {
            atk: 0.0,
            hp: 0.0,
            def: 0.0,
            crit_rate: 0.0,
            recorded: 0.0,
            secondary: 0.0,
        };
        match self {
            // Secondary: attack speed.
            Self::Power => AttributeBonus {
                atk: 0.25,
                recorded: 0.25,
                secondary: 0.15,
                ..NONE
            },
            // Secondary: spiritual defense.
            Self::Soul => AttributeBonus {
                hp: 0.30,
                recorded: 0.30,
                secondary: 0.20,
                ..NONE
            },
            Self::Core => AttributeBonus {
                atk: 0.20,
                def: 0.20,
                crit_rate: 0.10,
                recorded: 0.20,
                ..NONE
            },
            // Secondary: cooldown reduction.
            Self::Mind => AttributeBonus {
                recorded: 0.25,
                secondary: 0.15,
                ..NONE
            },
            Self::Heart => AttributeBonus {
                recorded: 0.35,
                ..NONE
            },
            // Secondary: share of enemy DEF ignored.
            Self::Void => AttributeBonus {
                recorded: 0.30,
                secondary: 0.15,
                ..NONE
            },
        }
    }

    /// Team effect unlocked by fielding [`ATTRIBUTE_BONUS_REQUIREMENT`] heroes
    /// of this attribute.
    #[must_use]
    pub const fn synergy(self) -> SynergyEffect {
        match self {
            Self::Power => SynergyEffect {
                atk: 0.30,
                ..SynergyEffect::flag(0.30, SynergyFlags::empty())
            },
            Self::Soul => SynergyEffect {
                hp: 0.40,
                ..SynergyEffect::flag(0.40, SynergyFlags::empty())
            },
            Self::Core => SynergyEffect {
                all_stats: 0.25,
                ..SynergyEffect::flag(0.25, SynergyFlags::empty())
            },
            Self::Mind => SynergyEffect::flag(0.25, SynergyFlags::ENERGY_REDUCTION),
            Self::Heart => SynergyEffect::flag(0.05, SynergyFlags::GROUP_HEAL),
            Self::Void => SynergyEffect::flag(0.20, SynergyFlags::IGNORE_DEFENSE),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Hero rarity
// =============================================================================

/// Hero rarity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HeroRarity {
    /// ×1.0
    Common = 1,
    /// ×1.25
    Rare = 2,
    /// ×1.6
    Epic = 3,
    /// ×2.1
    Legendary = 4,
    /// ×2.8
    Mythic = 5,
}

impl HeroRarity {
    /// Total number of hero rarities.
    pub const COUNT: usize = 5;

    /// All rarities, lowest first.
    #[must_use]
    pub const fn all() -> &'static [HeroRarity] {
        &[
            HeroRarity::Common,
            HeroRarity::Rare,
            HeroRarity::Epic,
            HeroRarity::Legendary,
            HeroRarity::Mythic,
        ]
    }

    /// Zero-based index into per-rarity arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize - 1
    }

    /// Stable numeric code used by stored records.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Resolves a stored code; `None` when out of range.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Common),
            2 => Some(Self::Rare),
            3 => Some(Self::Epic),
            4 => Some(Self::Legendary),
            5 => Some(Self::Mythic),
            _ => None,
        }
    }

    /// Stat multiplier applied to the role base row.
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Common => 1.0,
            Self::Rare => 1.25,
            Self::Epic => 1.6,
            Self::Legendary => 2.1,
            Self::Mythic => 2.8,
        }
    }

    /// Shards needed to summon a hero of this rarity.
    #[must_use]
    pub const fn shards_to_summon(self) -> u32 {
        match self {
            Self::Common => 10,
            Self::Rare => 20,
            Self::Epic => 50,
            Self::Legendary => 80,
            Self::Mythic => 120,
        }
    }
}

// =============================================================================
// Base stats
// =============================================================================

/// The stat quintet every hero is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    /// Hit points.
    pub hp: i32,
    /// Attack.
    pub atk: i32,
    /// Physical defense.
    pub def: i32,
    /// Speed (turn order).
    pub speed: i32,
    /// Magic defense.
    pub magic_def: i32,
}

impl BaseStats {
    /// All-zero quintet, the neutral fallback for unknown roles.
    pub const ZERO: Self = Self::new(0, 0, 0, 0, 0);

    /// Creates a quintet.
    #[must_use]
    pub const fn new(hp: i32, atk: i32, def: i32, speed: i32, magic_def: i32) -> Self {
        Self {
            hp,
            atk,
            def,
            speed,
            magic_def,
        }
    }

    /// Base row for a role.
    #[must_use]
    pub const fn for_role(role: Role) -> Self {
        ROLE_BASE_STATS[role.index()]
    }
}

/// Base stat rows indexed by [`Role::index`].
const ROLE_BASE_STATS: [BaseStats; Role::COUNT] = [
    BaseStats::new(1500, 120, 200, 80, 180),  // Tank
    BaseStats::new(1000, 90, 120, 90, 150),   // Healer
    BaseStats::new(800, 180, 80, 120, 70),    // Assassin
    BaseStats::new(900, 150, 110, 100, 100),  // Range
    BaseStats::new(1100, 100, 130, 95, 140),  // Support
    BaseStats::new(1200, 170, 90, 110, 80),   // Berserker
    BaseStats::new(1000, 130, 140, 105, 160), // Controller
    BaseStats::new(950, 140, 120, 85, 170),   // Mage
];

// =============================================================================
// Growth curves
// =============================================================================

/// `1 + (stars - 1) × 0.2`
#[must_use]
pub fn star_multiplier(stars: u8) -> f64 {
    1.0 + f64::from(stars.saturating_sub(1)) * 0.2
}

/// `1 + enhancement × 0.15`
#[must_use]
pub fn enhancement_multiplier(enhancement: u8) -> f64 {
    1.0 + f64::from(enhancement) * 0.15
}

/// `1 + (level - 1) × 0.05`
#[must_use]
pub fn level_multiplier(level: u32) -> f64 {
    1.0 + f64::from(level.saturating_sub(1)) * 0.05
}

/// Total experience a hero needs to reach `level`: `floor(100 × level^1.5)`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn exp_required_for_level(level: u32) -> u64 {
    (100.0 * f64::from(level).powf(1.5)).floor() as u64
}

/// Gold cost of raising a hero from `enhancement` to `enhancement + 1`.
#[must_use]
pub fn hero_upgrade_cost(enhancement: u8, rarity: HeroRarity) -> u64 {
    let next = u64::from(enhancement) + 1;
    1000 + u64::from(rarity.code()) * 500 + next * next * 100
}

/// Shards needed to raise a hero from `stars` to `stars + 1`.
#[must_use]
pub fn star_upgrade_shards(stars: u8) -> u32 {
    20 * u32::from(stars)
}

/// Formation slots unlocked at a player level.
#[must_use]
pub const fn available_team_slots(player_level: u32) -> usize {
    match player_level {
        20.. => 5,
        15..=19 => 4,
        10..=14 => 3,
        5..=9 => 2,
        _ => 1,
    }
}

/// Power of a stat quintet: `round(HP×0.5 + ATK×2 + DEF×1.5 + Speed×0.5)`.
#[must_use]
pub fn power_of(hp: i32, atk: i32, def: i32, speed: i32) -> i64 {
    super::round_half_up(
        f64::from(hp) * 0.5 + f64::from(atk) * 2.0 + f64::from(def) * 1.5 + f64::from(speed) * 0.5,
    )
}

// =============================================================================
// Attribute self-bonus
// =============================================================================

/// Personal bonus granted by a hero's own attribute.
///
/// Fractions apply to the running stat value. `recorded` is the headline
/// number stored on the computed stats; `secondary` is the attribute's
/// side effect (attack speed, cooldown, penetration) consumed outside the
/// stat quintet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttributeBonus {
    /// ATK fraction.
    pub atk: f64,
    /// HP fraction.
    pub hp: f64,
    /// DEF fraction.
    pub def: f64,
    /// Flat crit-rate addition.
    pub crit_rate: f64,
    /// Headline value recorded on the stats.
    pub recorded: f64,
    /// Side-effect magnitude.
    pub secondary: f64,
}

// =============================================================================
// Synergy effects
// =============================================================================

bitflags! {
    /// Team effects that do not alter the stat quintet and are only recorded.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SynergyFlags: u16 {
        /// Bonus experience from battles.
        const EXP_BOOST                = 1 << 0;
        /// Extra damage against heroes of other factions.
        const DAMAGE_VS_OTHER_FACTIONS = 1 << 1;
        /// Armor penetration.
        const ARMOR_PENETRATION        = 1 << 2;
        /// Debuff resistance.
        const DEBUFF_RESISTANCE        = 1 << 3;
        /// Reduced skill energy cost.
        const ENERGY_REDUCTION         = 1 << 4;
        /// Periodic group heal.
        const GROUP_HEAL               = 1 << 5;
        /// Chance to ignore enemy defense.
        const IGNORE_DEFENSE           = 1 << 6;
    }
}

/// Effect of an active faction or attribute team bonus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynergyEffect {
    /// HP/ATK/DEF/Speed fraction.
    pub all_stats: f64,
    /// ATK fraction.
    pub atk: f64,
    /// HP fraction.
    pub hp: f64,
    /// Flat crit-rate addition.
    pub crit_rate: f64,
    /// Headline value recorded on the stats.
    pub magnitude: f64,
    /// Recorded-only effects.
    pub flags: SynergyFlags,
}

impl SynergyEffect {
    /// Effect that only records a magnitude and flags.
    #[must_use]
    pub const fn flag(magnitude: f64, flags: SynergyFlags) -> Self {
        Self {
            all_stats: 0.0,
            atk: 0.0,
            hp: 0.0,
            crit_rate: 0.0,
            magnitude,
            flags,
        }
    }

    /// True when the effect changes at least one stat.
    #[must_use]
    pub fn alters_stats(&self) -> bool {
        self.all_stats != 0.0 || self.atk != 0.0 || self.hp != 0.0 || self.crit_rate != 0.0
    }
}

// =============================================================================
// Epic combos
// =============================================================================

/// Named attribute combinations that score extra synergy points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EpicCombo {
    /// 3 Power + 2 Void.
    DestructiveForce,
    /// 4 Soul + 1 Heart.
    SpiritualBarrier,
    /// 5 Core.
    PerfectBalance,
    /// 3 Mind + 2 Heart.
    WiseCompassion,
    /// 2 Power + 2 Soul + 1 Void.
    TrinityDestroyer,
}

impl EpicCombo {
    /// All combos in evaluation order.
    #[must_use]
    pub const fn all() -> &'static [EpicCombo] {
        &[
            EpicCombo::DestructiveForce,
            EpicCombo::SpiritualBarrier,
            EpicCombo::PerfectBalance,
            EpicCombo::WiseCompassion,
            EpicCombo::TrinityDestroyer,
        ]
    }

    /// Minimum attribute counts required.
    #[must_use]
    pub const fn requirements(self) -> &'static [(Attribute, usize)] {
        match self {
            Self::DestructiveForce => &[(Attribute::Power, 3), (Attribute::Void, 2)],
            Self::SpiritualBarrier => &[(Attribute::Soul, 4), (Attribute::Heart, 1)],
            Self::PerfectBalance => &[(Attribute::Core, 5)],
            Self::WiseCompassion => &[(Attribute::Mind, 3), (Attribute::Heart, 2)],
            Self::TrinityDestroyer => &[
                (Attribute::Power, 2),
                (Attribute::Soul, 2),
                (Attribute::Void, 1),
            ],
        }
    }

    /// True when `counts` (indexed by [`Attribute::index`]) satisfy this combo.
    #[must_use]
    pub fn is_met(self, counts: &[usize; Attribute::COUNT]) -> bool {
        self.requirements()
            .iter()
            .all(|&(attribute, needed)| counts[attribute.index()] >= needed)
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DestructiveForce => "Destructive Force",
            Self::SpiritualBarrier => "Spiritual Barrier",
            Self::PerfectBalance => "Perfect Balance",
            Self::WiseCompassion => "Wise Compassion",
            Self::TrinityDestroyer => "Trinity Destroyer",
        }
    }

    /// Effect description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::DestructiveForce => "+50% crit damage, +25% penetration",
            Self::SpiritualBarrier => "+30% resistance, immune to debuffs",
            Self::PerfectBalance => "+25% all stats",
            Self::WiseCompassion => "-40% cooldowns, +60% healing",
            Self::TrinityDestroyer => "+35% ATK, +20% HP, ignores 30% armor",
        }
    }
}

impl fmt::Display for EpicCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
