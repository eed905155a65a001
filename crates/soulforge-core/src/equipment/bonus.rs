//! Aggregation of an equipped loadout into stat contributions.
//!
//! The resolver is pure: it never reads storage and never touches the hero.
//! Percentage secondaries and set all-stats bonuses are taken against the
//! base-final snapshot handed in by the compositor, so the result does not
//! depend on the order items are listed in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::EquipmentItem;
use crate::tables::equipment::SET_TIERS;
use crate::tables::{round_stat, BaseStats, EquipmentSet, MainStatKind, SecondaryKind};

/// Flat additions to the integer stat quartet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDelta {
    /// HP added.
    pub hp: i32,
    /// ATK added.
    pub atk: i32,
    /// DEF added.
    pub def: i32,
    /// Speed added.
    pub speed: i32,
}

impl StatDelta {
    /// Sum of all four additions.
    #[must_use]
    pub fn total(&self) -> i64 {
        i64::from(self.hp) + i64::from(self.atk) + i64::from(self.def) + i64::from(self.speed)
    }

    /// Adds `fraction` of each stat in `base`, rounded per stat.
    fn add_fraction_of(&mut self, base: &BaseStats, fraction: f64) {
        self.hp += round_stat(f64::from(base.hp) * fraction);
        self.atk += round_stat(f64::from(base.atk) * fraction);
        self.def += round_stat(f64::from(base.def) * fraction);
        self.speed += round_stat(f64::from(base.speed) * fraction);
    }
}

/// Everything a loadout contributes to a hero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentBonus {
    /// Additions from main and secondary stats.
    pub items: StatDelta,
    /// Additions from unlocked set tiers.
    pub sets: StatDelta,
    /// Crit rate added.
    pub crit_rate: f64,
    /// Crit damage added.
    pub crit_damage: f64,
    /// Accuracy added.
    pub accuracy: f64,
    /// Evasion added.
    pub evasion: f64,
    /// Resistance from helmet main stats (recorded).
    pub resistance: f64,
    /// Lifesteal (recorded).
    pub lifesteal: f64,
    /// Armor penetration (recorded).
    pub penetration: f64,
    /// Pieces worn per set, sets with no pieces omitted.
    pub set_counts: BTreeMap<EquipmentSet, usize>,
    /// `Σ 0.1 × pieces` over sets with at least two pieces.
    pub set_fraction: f64,
}

impl EquipmentBonus {
    /// True when no item contributed anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Folds equipped items into an [`EquipmentBonus`].
///
/// # Example
///
/// ```
/// use soulforge_core::equipment::EquipmentBonusResolver;
/// use soulforge_core::tables::BaseStats;
///
/// let resolver = EquipmentBonusResolver::new();
/// let bonus = resolver.resolve(&[], &BaseStats::new(1000, 100, 100, 100, 100));
/// assert!(bonus.is_empty());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EquipmentBonusResolver;

impl EquipmentBonusResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Aggregates `items` against the hero's base-final snapshot.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn resolve(&self, items: &[EquipmentItem], base_final: &BaseStats) -> EquipmentBonus {
        let mut bonus = EquipmentBonus::default();

        for item in items {
            Self::add_main_stat(&mut bonus, item);
            for secondary in &item.secondary_stats {
                Self::add_secondary(&mut bonus, base_final, secondary.kind, secondary.value);
            }
        }

        bonus.set_counts = self.set_counts(items);
        for (&set, &pieces) in &bonus.set_counts {
            if pieces < 2 {
                continue;
            }
            let effect = set.effect(pieces);
            bonus.sets.add_fraction_of(base_final, effect.all_stats);
            bonus.accuracy += effect.accuracy;
            bonus.crit_damage += effect.crit_damage;
            bonus.lifesteal += effect.lifesteal;
            bonus.set_fraction += 0.1 * pieces as f64;
        }

        debug!(
            items = items.len(),
            hp = bonus.items.hp + bonus.sets.hp,
            atk = bonus.items.atk + bonus.sets.atk,
            sets = bonus.set_counts.len(),
            "resolved equipment bonus"
        );
        bonus
    }

    fn add_main_stat(bonus: &mut EquipmentBonus, item: &EquipmentItem) {
        let value = item.main_stat.value;
        match item.main_stat.kind {
            MainStatKind::Hp => bonus.items.hp += value,
            MainStatKind::Atk => bonus.items.atk += value,
            MainStatKind::Def => bonus.items.def += value,
            MainStatKind::Speed => bonus.items.speed += value,
            MainStatKind::CritRate => bonus.crit_rate += percent(value),
            MainStatKind::Resistance => bonus.resistance += percent(value),
        }
    }

    fn add_secondary(bonus: &mut EquipmentBonus, base: &BaseStats, kind: SecondaryKind, value: i32) {
        match kind {
            SecondaryKind::HpPercent => {
                bonus.items.hp += round_stat(f64::from(base.hp) * percent(value));
            }
            SecondaryKind::AtkPercent => {
                bonus.items.atk += round_stat(f64::from(base.atk) * percent(value));
            }
            SecondaryKind::DefPercent => {
                bonus.items.def += round_stat(f64::from(base.def) * percent(value));
            }
            SecondaryKind::Speed => bonus.items.speed += value,
            SecondaryKind::CritRatePercent => bonus.crit_rate += percent(value),
            SecondaryKind::CritDamagePercent => bonus.crit_damage += percent(value),
            SecondaryKind::AccuracyPercent => bonus.accuracy += percent(value),
            SecondaryKind::EvasionPercent => bonus.evasion += percent(value),
            SecondaryKind::LifestealPercent => bonus.lifesteal += percent(value),
            SecondaryKind::PenetrationPercent => bonus.penetration += percent(value),
        }
    }

    /// Pieces worn per set. Items outside any set are not counted.
    #[must_use]
    pub fn set_counts(&self, items: &[EquipmentItem]) -> BTreeMap<EquipmentSet, usize> {
        let mut counts = BTreeMap::new();
        for item in items.iter().filter(|item| item.set != EquipmentSet::None) {
            *counts.entry(item.set).or_insert(0) += 1;
        }
        counts
    }

    /// Descriptions of every set tier unlocked by `items`, grouped by set in
    /// code order, lowest tier first.
    #[must_use]
    pub fn active_set_bonuses(&self, items: &[EquipmentItem]) -> Vec<String> {
        self.set_counts(items)
            .into_iter()
            .flat_map(|(set, pieces)| {
                SET_TIERS
                    .into_iter()
                    .filter(move |&tier| pieces >= tier)
                    .filter_map(move |tier| set.tier_description(tier))
            })
            .map(str::to_owned)
            .collect()
    }
}

fn percent(value: i32) -> f64 {
    f64::from(value) / 100.0
}
