//! Layered hero stat composition.
//!
//! [`StatCompositor`] turns a hero snapshot into [`HeroStats`] by applying
//! bonus layers in a fixed order:
//!
//! 1. Base quintet of the template (zero when role or rarity is unknown)
//! 2. Rarity, star, enhancement and level multipliers, rounded half-up.
//!    The result is the *base-final* snapshot.
//! 3. Equipment main stats, secondaries and set tiers (optional)
//! 4. The hero's own attribute bonus on the running values
//! 5. Faction and attribute team synergy from the active formation (optional)
//! 6. Floors and rate clamps
//!
//! The compositor is a pure function of its inputs. Storage lookups, caching
//! and the choice of teammates belong to [`crate::engine::Engine`].
//!
//! # Example
//!
//! ```
//! use soulforge_core::hero::{HeroInstance, HeroTemplate};
//! use soulforge_core::ids::{HeroId, TemplateId};
//! use soulforge_core::stats::{ComputeOptions, StatCompositor};
//! use soulforge_core::tables::{Attribute, Faction, HeroRarity, Role};
//!
//! let template = HeroTemplate::new(
//!     TemplateId::new(1),
//!     "Sado",
//!     Faction::Human,
//!     Attribute::Mind,
//!     Role::Tank,
//!     HeroRarity::Epic,
//! );
//! let hero = HeroInstance::new(HeroId::new(1), template);
//!
//! let stats = StatCompositor::new().compose(&hero, &[], &[], ComputeOptions::BASE_ONLY);
//! assert_eq!(stats.hp, 2400);
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::equipment::{EquipmentBonusResolver, EquipmentItem};
use crate::hero::HeroInstance;
use crate::ids::HeroId;
use crate::tables::hero::{
    enhancement_multiplier, level_multiplier, power_of, star_multiplier,
    ATTRIBUTE_BONUS_REQUIREMENT, FACTION_BONUS_REQUIREMENT, MAX_HERO_ENHANCEMENT, MAX_HERO_LEVEL,
    MAX_STARS,
};
use crate::tables::{round_stat, Attribute, BaseStats, Faction, SynergyEffect, SynergyFlags};

bitflags! {
    /// Layers of the pipeline that contributed to a [`HeroStats`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AppliedLayers: u8 {
        /// Base quintet and growth multipliers.
        const BASE              = 1 << 0;
        /// Equipment main and secondary stats.
        const EQUIPMENT         = 1 << 1;
        /// At least one set tier.
        const SETS              = 1 << 2;
        /// The hero's own attribute bonus.
        const ATTRIBUTE         = 1 << 3;
        /// At least one faction team bonus.
        const FACTION_SYNERGY   = 1 << 4;
        /// At least one attribute team bonus.
        const ATTRIBUTE_SYNERGY = 1 << 5;
    }
}

/// Which optional layers to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComputeOptions {
    /// Apply step 3.
    pub include_equipment: bool,
    /// Apply step 5.
    pub include_formation_synergy: bool,
}

impl ComputeOptions {
    /// Steps 1, 2, 4 and 6 only.
    pub const BASE_ONLY: Self = Self::new(false, false);

    /// Equipment without team synergy; what targeting compares.
    pub const EQUIPPED: Self = Self::new(true, false);

    /// Every layer.
    pub const FULL: Self = Self::new(true, true);

    /// Creates options.
    #[must_use]
    pub const fn new(include_equipment: bool, include_formation_synergy: bool) -> Self {
        Self {
            include_equipment,
            include_formation_synergy,
        }
    }
}

impl Default for ComputeOptions {
    fn default() -> Self {
        Self::FULL
    }
}

/// Derived combat stats of one hero. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroStats {
    /// Hero the stats belong to.
    pub hero_id: HeroId,
    /// Final HP, at least 1.
    pub hp: i32,
    /// Final ATK, at least 1.
    pub atk: i32,
    /// Final DEF, at least 0.
    pub def: i32,
    /// Final magic DEF, at least 0.
    pub magic_def: i32,
    /// Final speed, at least 1.
    pub speed: i32,
    /// Crit rate in `[0, 1]`.
    pub crit_rate: f64,
    /// Crit damage multiplier, at least 1.
    pub crit_damage: f64,
    /// Accuracy in `[0, 1]`.
    pub accuracy: f64,
    /// Evasion in `[0, 1]`.
    pub evasion: f64,
    /// Resistance from equipment.
    pub resistance: f64,
    /// Lifesteal from equipment.
    pub lifesteal: f64,
    /// Armor penetration from equipment.
    pub penetration: f64,
    /// `level multiplier - 1`.
    pub level_bonus: f64,
    /// `star multiplier - 1`.
    pub star_bonus: f64,
    /// `enhancement multiplier - 1`.
    pub enhancement_bonus: f64,
    /// Share of the post-equipment quartet contributed by item stats.
    pub equipment_bonus: f64,
    /// `Σ 0.1 × pieces` over active sets.
    pub set_bonus: f64,
    /// Headline value of the hero's attribute bonus.
    pub attribute_bonus: f64,
    /// Side effect of the hero's attribute (attack speed, cooldown, ...).
    pub attribute_secondary: f64,
    /// Sum of active faction team bonus magnitudes.
    pub faction_synergy_bonus: f64,
    /// Sum of active attribute team bonus magnitudes.
    pub attribute_synergy_bonus: f64,
    /// Layers that were applied.
    pub layers: AppliedLayers,
    /// Team effects recorded but not applied to the quintet.
    pub synergy_flags: SynergyFlags,
}

impl HeroStats {
    /// `round(HP×0.5 + ATK×2 + DEF×1.5 + Speed×0.5)`
    #[must_use]
    pub fn total_power(&self) -> i64 {
        power_of(self.hp, self.atk, self.def, self.speed)
    }

    /// `HP / 10 + DEF`, the tank-selection key.
    #[must_use]
    pub fn tankiness(&self) -> i32 {
        self.hp / 10 + self.def
    }

    fn from_base(hero: &HeroInstance, base: BaseStats) -> Self {
        Self {
            hero_id: hero.id,
            hp: base.hp,
            atk: base.atk,
            def: base.def,
            magic_def: base.magic_def,
            speed: base.speed,
            crit_rate: hero.crit_rate,
            crit_damage: hero.crit_damage,
            accuracy: hero.accuracy,
            evasion: hero.evasion,
            resistance: 0.0,
            lifesteal: 0.0,
            penetration: 0.0,
            level_bonus: 0.0,
            star_bonus: 0.0,
            enhancement_bonus: 0.0,
            equipment_bonus: 0.0,
            set_bonus: 0.0,
            attribute_bonus: 0.0,
            attribute_secondary: 0.0,
            faction_synergy_bonus: 0.0,
            attribute_synergy_bonus: 0.0,
            layers: AppliedLayers::BASE,
            synergy_flags: SynergyFlags::empty(),
        }
    }

    /// Multiplies each quartet stat by `1 + fraction`, rounding per stat.
    fn scale(&mut self, hp: f64, atk: f64, def: f64, speed: f64) {
        self.hp = round_stat(f64::from(self.hp) * (1.0 + hp));
        self.atk = round_stat(f64::from(self.atk) * (1.0 + atk));
        self.def = round_stat(f64::from(self.def) * (1.0 + def));
        self.speed = round_stat(f64::from(self.speed) * (1.0 + speed));
    }

    fn apply_synergy(&mut self, effect: SynergyEffect) {
        let all = effect.all_stats;
        if effect.alters_stats() {
            self.scale(all + effect.hp, all + effect.atk, all, all);
            self.crit_rate += effect.crit_rate;
        }
        self.synergy_flags |= effect.flags;
    }

    fn clamp(&mut self) {
        self.hp = self.hp.max(1);
        self.atk = self.atk.max(1);
        self.def = self.def.max(0);
        self.magic_def = self.magic_def.max(0);
        self.speed = self.speed.max(1);
        self.crit_rate = self.crit_rate.clamp(0.0, 1.0);
        self.accuracy = self.accuracy.clamp(0.0, 1.0);
        self.evasion = self.evasion.clamp(0.0, 1.0);
        self.crit_damage = self.crit_damage.max(1.0);
    }
}

/// A hero paired with the stats it fights with.
///
/// Analysis, targeting and formation code work on combatants so that the
/// stat options used (with or without team synergy) are chosen once by the
/// caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    /// The hero snapshot.
    pub hero: HeroInstance,
    /// Its composed stats.
    pub stats: HeroStats,
}

impl Combatant {
    /// Pairs a hero with its stats.
    #[must_use]
    pub fn new(hero: HeroInstance, stats: HeroStats) -> Self {
        Self { hero, stats }
    }

    /// Shorthand for [`HeroStats::total_power`].
    #[must_use]
    pub fn power(&self) -> i64 {
        self.stats.total_power()
    }
}

/// Faction and attribute head counts of a team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamCounts {
    /// Heroes per faction, indexed by [`Faction::index`].
    pub factions: [usize; Faction::COUNT],
    /// Heroes per attribute, indexed by [`Attribute::index`].
    pub attributes: [usize; Attribute::COUNT],
}

impl TeamCounts {
    /// Counts `team`. Heroes with unknown codes are skipped.
    #[must_use]
    pub fn of<'a>(team: impl IntoIterator<Item = &'a HeroInstance>) -> Self {
        let mut counts = Self::default();
        for hero in team {
            if let Some(faction) = hero.faction() {
                counts.factions[faction.index()] += 1;
            }
            if let Some(attribute) = hero.attribute() {
                counts.attributes[attribute.index()] += 1;
            }
        }
        counts
    }

    /// Factions at or above the team bonus threshold, in code order.
    pub fn active_factions(&self) -> impl Iterator<Item = Faction> + '_ {
        Faction::all()
            .iter()
            .copied()
            .filter(|f| self.factions[f.index()] >= FACTION_BONUS_REQUIREMENT)
    }

    /// Attributes at or above the team bonus threshold, in code order.
    pub fn active_attributes(&self) -> impl Iterator<Item = Attribute> + '_ {
        Attribute::all()
            .iter()
            .copied()
            .filter(|a| self.attributes[a.index()] >= ATTRIBUTE_BONUS_REQUIREMENT)
    }

    /// Number of factions with at least one hero.
    #[must_use]
    pub fn distinct_factions(&self) -> usize {
        self.factions.iter().filter(|&&n| n > 0).count()
    }
}

/// Runs the layering pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatCompositor {
    resolver: EquipmentBonusResolver,
}

impl StatCompositor {
    /// Creates a compositor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolver: EquipmentBonusResolver::new(),
        }
    }

    /// Steps 1 and 2: the base-final snapshot.
    ///
    /// Unknown role or rarity codes yield an all-zero quintet. Level, stars
    /// and enhancement outside their ranges are clamped. Both cases log a
    /// warning and never fail.
    #[must_use]
    pub fn base_final(&self, hero: &HeroInstance) -> BaseStats {
        let template = &hero.template;
        let (Some(_role), Some(rarity)) = (template.role(), template.rarity()) else {
            warn!(
                hero = %hero.id,
                template = %template.id,
                codes = ?template.codes(),
                "unknown role or rarity code, using a zero base quintet"
            );
            return BaseStats::ZERO;
        };

        let (level, stars, enhancement) = Self::progression(hero);
        let multiplier = rarity.multiplier()
            * star_multiplier(stars)
            * enhancement_multiplier(enhancement)
            * level_multiplier(level);

        let base = template.base;
        BaseStats::new(
            round_stat(f64::from(base.hp) * multiplier),
            round_stat(f64::from(base.atk) * multiplier),
            round_stat(f64::from(base.def) * multiplier),
            round_stat(f64::from(base.speed) * multiplier),
            round_stat(f64::from(base.magic_def) * multiplier),
        )
    }

    fn progression(hero: &HeroInstance) -> (u32, u8, u8) {
        let level = hero.level.clamp(1, MAX_HERO_LEVEL);
        let stars = hero.stars.clamp(1, MAX_STARS);
        let enhancement = hero.enhancement.min(MAX_HERO_ENHANCEMENT);
        if (level, stars, enhancement) != (hero.level, hero.stars, hero.enhancement) {
            warn!(
                hero = %hero.id,
                level = hero.level,
                stars = hero.stars,
                enhancement = hero.enhancement,
                "progression out of range, clamping"
            );
        }
        (level, stars, enhancement)
    }

    /// Runs the full pipeline.
    ///
    /// `equipment` is the hero's equipped loadout and `team` the heroes in
    /// the active formation. Each is ignored when its layer is disabled in
    /// `options`.
    #[must_use]
    pub fn compose(
        &self,
        hero: &HeroInstance,
        equipment: &[EquipmentItem],
        team: &[HeroInstance],
        options: ComputeOptions,
    ) -> HeroStats {
        // Steps 1-2
        let base_final = self.base_final(hero);
        let mut stats = HeroStats::from_base(hero, base_final);
        let (level, stars, enhancement) = Self::progression(hero);
        stats.level_bonus = level_multiplier(level) - 1.0;
        stats.star_bonus = star_multiplier(stars) - 1.0;
        stats.enhancement_bonus = enhancement_multiplier(enhancement) - 1.0;

        // Step 3
        if options.include_equipment {
            self.apply_equipment(&mut stats, equipment, &base_final);
        }

        // Step 4
        if let Some(attribute) = hero.attribute() {
            let bonus = attribute.self_bonus();
            stats.scale(bonus.hp, bonus.atk, bonus.def, 0.0);
            stats.crit_rate += bonus.crit_rate;
            stats.attribute_bonus = bonus.recorded;
            stats.attribute_secondary = bonus.secondary;
            stats.layers |= AppliedLayers::ATTRIBUTE;
        } else {
            warn!(hero = %hero.id, "unknown attribute code, skipping attribute bonus");
        }

        // Step 5
        if options.include_formation_synergy {
            Self::apply_team_synergy(&mut stats, &TeamCounts::of(team));
        }

        // Step 6
        stats.clamp();

        debug!(
            hero = %hero.id,
            power = stats.total_power(),
            layers = ?stats.layers,
            "composed hero stats"
        );
        stats
    }

    fn apply_equipment(&self, stats: &mut HeroStats, equipment: &[EquipmentItem], base_final: &BaseStats) {
        let bonus = self.resolver.resolve(equipment, base_final);

        stats.hp += bonus.items.hp;
        stats.atk += bonus.items.atk;
        stats.def += bonus.items.def;
        stats.speed += bonus.items.speed;

        let after = i64::from(stats.hp) + i64::from(stats.atk) + i64::from(stats.def) + i64::from(stats.speed);
        #[allow(clippy::cast_precision_loss)]
        let fraction = if after > 0 {
            bonus.items.total() as f64 / after as f64
        } else {
            0.0
        };
        stats.equipment_bonus = fraction;

        stats.hp += bonus.sets.hp;
        stats.atk += bonus.sets.atk;
        stats.def += bonus.sets.def;
        stats.speed += bonus.sets.speed;

        stats.crit_rate += bonus.crit_rate;
        stats.crit_damage += bonus.crit_damage;
        stats.accuracy += bonus.accuracy;
        stats.evasion += bonus.evasion;
        stats.resistance = bonus.resistance;
        stats.lifesteal = bonus.lifesteal;
        stats.penetration = bonus.penetration;
        stats.set_bonus = bonus.set_fraction;

        stats.layers |= AppliedLayers::EQUIPMENT;
        if bonus.set_fraction > 0.0 {
            stats.layers |= AppliedLayers::SETS;
        }
    }

    fn apply_team_synergy(stats: &mut HeroStats, counts: &TeamCounts) {
        for faction in counts.active_factions() {
            let effect = faction.synergy();
            stats.apply_synergy(effect);
            stats.faction_synergy_bonus += effect.magnitude;
            stats.layers |= AppliedLayers::FACTION_SYNERGY;
        }
        for attribute in counts.active_attributes() {
            let effect = attribute.synergy();
            stats.apply_synergy(effect);
            stats.attribute_synergy_bonus += effect.magnitude;
            stats.layers |= AppliedLayers::ATTRIBUTE_SYNERGY;
        }
    }
}
