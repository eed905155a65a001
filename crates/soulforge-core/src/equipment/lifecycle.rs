//! Equipment generation, enhancement, reforge and melt.
//!
//! Every function that rolls dice takes `rng: &mut impl Rng`. None of them
//! touch storage: callers persist the returned or mutated items and delete
//! melt inputs only after a [`MeltOutcome::Crafted`].

use std::collections::BTreeSet;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EquipmentItem, MainStat, SecondaryStat};
use crate::error::{EngineError, Result};
use crate::ids::EquipmentId;
use crate::tables::equipment::{
    ENHANCEMENT_MAIN_STAT_GROWTH, MAIN_STAT_ROLL, MAX_EQUIPMENT_ENHANCEMENT, MELT_INPUT_COUNT,
    NO_SET_CHANCE, REFORGE_BUMP_CHANCE,
};
use crate::tables::{round_half_up, EquipmentRarity, EquipmentSet, SecondaryKind, SlotType};

/// Cumulative melt yield thresholds: below the first → 3 items, below the
/// second → 2 items, otherwise 1.
const MELT_YIELD_THRESHOLDS: [f64; 2] = [0.1, 0.4];

// =============================================================================
// Generation
// =============================================================================

/// Rolls a new item with rarity uniform in `[min_rarity, max_rarity]`.
///
/// Bounds given in the wrong order are swapped.
pub fn generate(
    id: EquipmentId,
    min_rarity: EquipmentRarity,
    max_rarity: EquipmentRarity,
    level: u32,
    rng: &mut impl Rng,
) -> EquipmentItem {
    let (lo, hi) = if min_rarity <= max_rarity {
        (min_rarity.code(), max_rarity.code())
    } else {
        (max_rarity.code(), min_rarity.code())
    };
    let rarity = EquipmentRarity::from_code(rng.gen_range(lo..=hi)).unwrap_or(min_rarity);
    let slot = SlotType::all()[rng.gen_range(0..SlotType::COUNT)];

    let roll: f64 = rng.gen_range(MAIN_STAT_ROLL.0..MAIN_STAT_ROLL.1);
    let main_value = round_half_up(f64::from(slot.base_main_stat(rarity)) * roll);
    let main_stat = MainStat {
        kind: slot.main_stat_kind(),
        value: i32::try_from(main_value).unwrap_or(i32::MAX),
    };

    let secondary_stats = roll_secondaries(main_stat, rarity, rng);

    let set = if rng.gen_bool(NO_SET_CHANCE) {
        EquipmentSet::None
    } else {
        EquipmentSet::defined()[rng.gen_range(0..EquipmentSet::DEFINED)]
    };

    let mut item = EquipmentItem {
        id,
        slot,
        rarity,
        enhancement: 0,
        level,
        main_stat,
        secondary_stats,
        set,
        equipped_by: None,
        locked: false,
        power_rating: 0,
    };
    item.refresh_power();
    debug!(id = %id, rarity = %rarity, slot = %slot, power = item.power_rating, "generated equipment");
    item
}

/// Rolls the secondary stats for an item: count and range set by rarity,
/// kinds drawn without replacement from the pool minus the main stat's kind.
pub fn roll_secondaries(
    main_stat: MainStat,
    rarity: EquipmentRarity,
    rng: &mut impl Rng,
) -> Vec<SecondaryStat> {
    let excluded = main_stat.kind.excluded_secondary();
    let mut pool: Vec<SecondaryKind> = SecondaryKind::all()
        .iter()
        .copied()
        .filter(|kind| Some(*kind) != excluded)
        .collect();
    pool.shuffle(rng);
    pool.truncate(rarity.secondary_count());

    let (lo, hi) = rarity.secondary_range();
    pool.into_iter()
        .map(|kind| SecondaryStat {
            kind,
            value: rng.gen_range(lo..=hi),
        })
        .collect()
}

/// Loot-table rarity roll.
pub fn roll_rarity(rng: &mut impl Rng) -> EquipmentRarity {
    EquipmentRarity::from_drop_roll(rng.gen::<f64>())
}

/// Rolls `quantity` loot drops. With `guarantee_rare`, the first drop's rarity
/// is uniform over Blue..=Red instead of the drop table.
///
/// `next_id` is called once per item, in order.
pub fn generate_loot(
    level: u32,
    quantity: usize,
    guarantee_rare: bool,
    mut next_id: impl FnMut() -> EquipmentId,
    rng: &mut impl Rng,
) -> Vec<EquipmentItem> {
    (0..quantity)
        .map(|i| {
            let (min, max) = if guarantee_rare && i == 0 {
                (EquipmentRarity::Blue, EquipmentRarity::Red)
            } else {
                let rarity = roll_rarity(rng);
                (rarity, rarity)
            };
            generate(next_id(), min, max, level, rng)
        })
        .collect()
}

// =============================================================================
// Enhancement
// =============================================================================

/// Main-stat value of an item at its current enhancement:
/// `round(table × (1 + e × 0.12))`.
#[must_use]
pub fn enhanced_main_stat(slot: SlotType, rarity: EquipmentRarity, enhancement: u8) -> i32 {
    let base = f64::from(slot.base_main_stat(rarity));
    let value = round_half_up(base * (1.0 + f64::from(enhancement) * ENHANCEMENT_MAIN_STAT_GROWTH));
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Raises an item by one enhancement level.
///
/// # Errors
///
/// [`EngineError::InvalidState`] when already at +9.
pub fn enhance(item: &mut EquipmentItem) -> Result<()> {
    if item.enhancement >= MAX_EQUIPMENT_ENHANCEMENT {
        return Err(EngineError::InvalidState(format!(
            "equipment {} is already at +{MAX_EQUIPMENT_ENHANCEMENT}",
            item.id
        )));
    }
    item.enhancement += 1;
    item.main_stat.value = enhanced_main_stat(item.slot, item.rarity, item.enhancement);
    item.refresh_power();
    Ok(())
}

// =============================================================================
// Reforge
// =============================================================================

/// Result of a reforge attempt. A failed roll still costs resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReforgeOutcome {
    /// The secondary stats were rerolled.
    pub succeeded: bool,
    /// Every secondary stat also gained +1.
    pub bumped: bool,
    /// Gold charged.
    pub gold_cost: u64,
    /// Gems charged.
    pub gem_cost: u64,
}

/// Attempts to reroll an item's secondary stats.
///
/// On a successful roll the secondaries are regenerated and, with an
/// independent [`REFORGE_BUMP_CHANCE`] roll, each gains +1.
///
/// # Errors
///
/// [`EngineError::InvalidState`] when the rarity cannot be reforged.
pub fn reforge(item: &mut EquipmentItem, rng: &mut impl Rng) -> Result<ReforgeOutcome> {
    if !item.rarity.is_salvageable() {
        return Err(EngineError::InvalidState(format!(
            "{} equipment cannot be reforged",
            item.rarity
        )));
    }

    let mut outcome = ReforgeOutcome {
        succeeded: false,
        bumped: false,
        gold_cost: item.rarity.reforge_gold(),
        gem_cost: item.rarity.reforge_gems(),
    };

    if rng.gen::<f64>() < item.rarity.reforge_success_chance() {
        item.secondary_stats = roll_secondaries(item.main_stat, item.rarity, rng);
        outcome.succeeded = true;

        if rng.gen::<f64>() < REFORGE_BUMP_CHANCE {
            for stat in &mut item.secondary_stats {
                stat.value += 1;
            }
            outcome.bumped = true;
        }
        item.refresh_power();
    }

    Ok(outcome)
}

// =============================================================================
// Melt
// =============================================================================

/// Why a melt was refused. Nothing is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeltRejection {
    /// Not exactly five items.
    WrongCount(usize),
    /// The same item was listed twice.
    Duplicate(EquipmentId),
    /// An id did not resolve.
    Missing(EquipmentId),
    /// An input is worn by a hero.
    Equipped(EquipmentId),
    /// An input is locked.
    Locked(EquipmentId),
    /// Inputs span more than one rarity.
    MixedRarity,
    /// The rarity is at the top tier.
    NotSalvageable(EquipmentRarity),
}

impl fmt::Display for MeltRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongCount(n) => write!(f, "melt needs exactly {MELT_INPUT_COUNT} items, got {n}"),
            Self::Duplicate(id) => write!(f, "equipment {id} listed more than once"),
            Self::Missing(id) => write!(f, "equipment {id} not found"),
            Self::Equipped(id) => write!(f, "equipment {id} is equipped"),
            Self::Locked(id) => write!(f, "equipment {id} is locked"),
            Self::MixedRarity => write!(f, "melt inputs must share one rarity"),
            Self::NotSalvageable(r) => write!(f, "{r} equipment cannot be melted"),
        }
    }
}

/// Result of a melt. Either all five inputs are consumed or none are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeltOutcome {
    /// Inputs consumed and 1-3 new items crafted one tier higher.
    Crafted {
        /// The five consumed inputs.
        consumed: Vec<EquipmentId>,
        /// Newly generated items.
        crafted: Vec<EquipmentItem>,
    },
    /// Validation failed; nothing consumed.
    Rejected(MeltRejection),
}

impl MeltOutcome {
    /// Items produced; empty on rejection.
    #[must_use]
    pub fn crafted(&self) -> &[EquipmentItem] {
        match self {
            Self::Crafted { crafted, .. } => crafted,
            Self::Rejected(_) => &[],
        }
    }

    /// Items consumed; empty on rejection.
    #[must_use]
    pub fn consumed(&self) -> &[EquipmentId] {
        match self {
            Self::Crafted { consumed, .. } => consumed,
            Self::Rejected(_) => &[],
        }
    }

    /// True for [`MeltOutcome::Crafted`].
    #[must_use]
    pub fn is_crafted(&self) -> bool {
        matches!(self, Self::Crafted { .. })
    }
}

/// Checks melt inputs and returns the shared rarity.
///
/// # Errors
///
/// The first [`MeltRejection`] found.
pub fn validate_melt(inputs: &[EquipmentItem]) -> std::result::Result<EquipmentRarity, MeltRejection> {
    if inputs.len() != MELT_INPUT_COUNT {
        return Err(MeltRejection::WrongCount(inputs.len()));
    }
    let mut seen = BTreeSet::new();
    for item in inputs {
        if !seen.insert(item.id) {
            return Err(MeltRejection::Duplicate(item.id));
        }
        if item.is_equipped() {
            return Err(MeltRejection::Equipped(item.id));
        }
        if item.locked {
            return Err(MeltRejection::Locked(item.id));
        }
    }
    let rarity = inputs[0].rarity;
    if inputs.iter().any(|item| item.rarity != rarity) {
        return Err(MeltRejection::MixedRarity);
    }
    if !rarity.is_salvageable() {
        return Err(MeltRejection::NotSalvageable(rarity));
    }
    Ok(rarity)
}

/// Number of items a melt yields for a uniform draw in `[0, 1)`.
#[must_use]
pub fn melt_yield(draw: f64) -> usize {
    if draw < MELT_YIELD_THRESHOLDS[0] {
        3
    } else if draw < MELT_YIELD_THRESHOLDS[1] {
        2
    } else {
        1
    }
}

/// Melts five items of one rarity into 1-3 items one tier higher.
///
/// Crafted items are generated at `output_level`. `next_id` is only called
/// once validation passes.
pub fn melt(
    inputs: &[EquipmentItem],
    output_level: u32,
    mut next_id: impl FnMut() -> EquipmentId,
    rng: &mut impl Rng,
) -> MeltOutcome {
    let rarity = match validate_melt(inputs) {
        Ok(rarity) => rarity,
        Err(rejection) => return MeltOutcome::Rejected(rejection),
    };
    let Some(target) = rarity.next() else {
        return MeltOutcome::Rejected(MeltRejection::NotSalvageable(rarity));
    };

    let count = melt_yield(rng.gen::<f64>());
    let crafted = (0..count)
        .map(|_| generate(next_id(), target, target, output_level, rng))
        .collect();

    MeltOutcome::Crafted {
        consumed: inputs.iter().map(|item| item.id).collect(),
        crafted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::HeroId;
    use crate::tables::MainStatKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn counter(start: u64) -> impl FnMut() -> EquipmentId {
        let mut next = start;
        move || {
            let id = EquipmentId::new(next);
            next += 1;
            id
        }
    }

    fn batch(rarity: EquipmentRarity) -> Vec<EquipmentItem> {
        let mut rng = rng();
        (1..=5)
            .map(|i| generate(EquipmentId::new(i), rarity, rarity, 1, &mut rng))
            .collect()
    }

    mod generation_tests {
        use super::*;

        #[test]
        fn rarity_stays_in_range() {
            let mut rng = rng();
            for i in 0..200 {
                let item = generate(
                    EquipmentId::new(i),
                    EquipmentRarity::Green,
                    EquipmentRarity::Purple,
                    1,
                    &mut rng,
                );
                assert!(item.rarity >= EquipmentRarity::Green);
                assert!(item.rarity <= EquipmentRarity::Purple);
            }
        }

        #[test]
        fn reversed_bounds_are_swapped() {
            let mut rng = rng();
            let item = generate(
                EquipmentId::new(1),
                EquipmentRarity::Orange,
                EquipmentRarity::Orange,
                1,
                &mut rng,
            );
            assert_eq!(item.rarity, EquipmentRarity::Orange);
            let item = generate(EquipmentId::new(2), EquipmentRarity::Red, EquipmentRarity::Blue, 1, &mut rng);
            assert!(item.rarity >= EquipmentRarity::Blue);
        }

        #[test]
        fn main_stat_within_roll_window() {
            let mut rng = rng();
            for i in 0..200 {
                let item = generate(EquipmentId::new(i), EquipmentRarity::Red, EquipmentRarity::Red, 1, &mut rng);
                let base = f64::from(item.slot.base_main_stat(item.rarity));
                let value = f64::from(item.main_stat.value);
                assert!(value >= (base * 0.9).floor() && value <= (base * 1.1).ceil());
                assert_eq!(item.main_stat.kind, item.slot.main_stat_kind());
            }
        }

        #[test]
        fn secondaries_follow_rarity_and_exclusion() {
            let mut rng = rng();
            for i in 0..300 {
                let item = generate(EquipmentId::new(i), EquipmentRarity::Gray, EquipmentRarity::Red, 1, &mut rng);
                assert_eq!(item.secondary_stats.len(), item.rarity.secondary_count());
                let (lo, hi) = item.rarity.secondary_range();
                let excluded = item.main_stat.kind.excluded_secondary();
                let mut kinds = BTreeSet::new();
                for stat in &item.secondary_stats {
                    assert!(stat.value >= lo && stat.value <= hi);
                    assert_ne!(Some(stat.kind), excluded);
                    assert!(kinds.insert(stat.kind.name()), "drawn without replacement");
                }
            }
        }

        #[test]
        fn gray_items_have_no_secondaries() {
            let mut rng = rng();
            let item = generate(EquipmentId::new(1), EquipmentRarity::Gray, EquipmentRarity::Gray, 1, &mut rng);
            assert!(item.secondary_stats.is_empty());
            assert_eq!(item.power_rating, item.compute_power_rating());
        }

        #[test]
        fn set_chance_is_roughly_thirty_percent() {
            let mut rng = rng();
            let trials = 5000;
            let in_set = (0..trials)
                .filter(|&i| {
                    generate(EquipmentId::new(i), EquipmentRarity::Gray, EquipmentRarity::Gray, 1, &mut rng).set
                        != EquipmentSet::None
                })
                .count();
            #[allow(clippy::cast_precision_loss)]
            let share = in_set as f64 / trials as f64;
            assert!((share - 0.3).abs() < 0.03, "set share {share}");
        }

        #[test]
        fn guaranteed_loot_starts_rare() {
            let mut rng = rng();
            for _ in 0..50 {
                let loot = generate_loot(10, 3, true, counter(1), &mut rng);
                assert_eq!(loot.len(), 3);
                assert!(loot[0].rarity >= EquipmentRarity::Blue);
                let ids: Vec<_> = loot.iter().map(|i| i.id.as_u64()).collect();
                assert_eq!(ids, vec![1, 2, 3]);
            }
        }
    }

    mod enhance_tests {
        use super::*;

        #[test]
        fn epic_weapon_plus_one_is_168() {
            let mut item = generate(EquipmentId::new(1), EquipmentRarity::Blue, EquipmentRarity::Blue, 1, &mut rng());
            item.slot = SlotType::Weapon;
            item.main_stat = MainStat {
                kind: MainStatKind::Atk,
                value: 150,
            };
            enhance(&mut item).unwrap();
            assert_eq!(item.enhancement, 1);
            assert_eq!(item.main_stat.value, 168);
            assert_eq!(item.power_rating, item.compute_power_rating());
        }

        #[test]
        fn max_enhancement_is_rejected() {
            let mut item = batch(EquipmentRarity::Green).remove(0);
            for _ in 0..9 {
                enhance(&mut item).unwrap();
            }
            let before = item.clone();
            assert!(matches!(enhance(&mut item), Err(EngineError::InvalidState(_))));
            assert_eq!(item, before);
        }

        #[test]
        fn enhanced_main_stat_formula() {
            assert_eq!(enhanced_main_stat(SlotType::Accessory, EquipmentRarity::Red, 9), 1664);
            assert_eq!(enhanced_main_stat(SlotType::Boots, EquipmentRarity::Gray, 0), 15);
        }
    }

    mod reforge_tests {
        use super::*;

        #[test]
        fn red_cannot_be_reforged() {
            let mut item = batch(EquipmentRarity::Red).remove(0);
            assert!(reforge(&mut item, &mut rng()).is_err());
        }

        #[test]
        fn reforge_reports_costs_and_keeps_counts() {
            let mut rng = rng();
            let mut item = batch(EquipmentRarity::Purple).remove(0);
            let mut successes = 0;
            for _ in 0..400 {
                let outcome = reforge(&mut item, &mut rng).unwrap();
                assert_eq!(outcome.gold_cost, 10_000);
                assert_eq!(outcome.gem_cost, 25);
                assert_eq!(item.secondary_stats.len(), 2);
                if outcome.succeeded {
                    successes += 1;
                } else {
                    assert!(!outcome.bumped);
                }
            }
            // 25% success chance
            assert!((60..=140).contains(&successes), "successes {successes}");
        }

        #[test]
        fn bump_adds_one_above_the_range() {
            let mut rng = rng();
            let mut item = batch(EquipmentRarity::Gray).remove(0);
            item.slot = SlotType::Helmet;
            item.rarity = EquipmentRarity::Green;
            let (_, hi) = item.rarity.secondary_range();
            let mut saw_bump = false;
            for _ in 0..500 {
                let outcome = reforge(&mut item, &mut rng).unwrap();
                if outcome.bumped {
                    saw_bump = true;
                    assert!(item.secondary_stats.iter().all(|s| s.value <= hi + 1));
                }
            }
            assert!(saw_bump);
        }
    }

    mod melt_tests {
        use super::*;

        #[test]
        fn five_greens_make_blues() {
            let inputs = batch(EquipmentRarity::Green);
            let outcome = melt(&inputs, 50, counter(100), &mut rng());
            assert!(outcome.is_crafted());
            assert_eq!(outcome.consumed().len(), 5);
            let crafted = outcome.crafted();
            assert!((1..=3).contains(&crafted.len()));
            for item in crafted {
                assert_eq!(item.rarity, EquipmentRarity::Blue);
                assert_eq!(item.level, 50);
                assert!(item.id.as_u64() >= 100);
            }
        }

        #[test]
        fn rejections_consume_nothing() {
            let mut inputs = batch(EquipmentRarity::Green);
            inputs.pop();
            let outcome = melt(&inputs, 50, counter(100), &mut rng());
            assert_eq!(outcome, MeltOutcome::Rejected(MeltRejection::WrongCount(4)));
            assert!(outcome.crafted().is_empty());
            assert!(outcome.consumed().is_empty());

            let mut inputs = batch(EquipmentRarity::Green);
            inputs[2].equipped_by = Some(HeroId::new(1));
            assert_eq!(
                validate_melt(&inputs),
                Err(MeltRejection::Equipped(inputs[2].id))
            );

            let mut inputs = batch(EquipmentRarity::Green);
            inputs[4].locked = true;
            assert_eq!(validate_melt(&inputs), Err(MeltRejection::Locked(inputs[4].id)));

            let mut inputs = batch(EquipmentRarity::Green);
            inputs[1].rarity = EquipmentRarity::Blue;
            assert_eq!(validate_melt(&inputs), Err(MeltRejection::MixedRarity));

            let mut inputs = batch(EquipmentRarity::Green);
            inputs[3].id = inputs[0].id;
            assert_eq!(validate_melt(&inputs), Err(MeltRejection::Duplicate(inputs[0].id)));

            let inputs = batch(EquipmentRarity::Red);
            assert_eq!(
                validate_melt(&inputs),
                Err(MeltRejection::NotSalvageable(EquipmentRarity::Red))
            );
        }

        #[test]
        fn rejected_melt_allocates_no_ids() {
            let inputs = batch(EquipmentRarity::Red);
            let mut calls = 0;
            let outcome = melt(
                &inputs,
                50,
                || {
                    calls += 1;
                    EquipmentId::new(1)
                },
                &mut rng(),
            );
            assert!(!outcome.is_crafted());
            assert_eq!(calls, 0);
        }

        #[test]
        fn yield_thresholds() {
            assert_eq!(melt_yield(0.0), 3);
            assert_eq!(melt_yield(0.0999), 3);
            assert_eq!(melt_yield(0.1), 2);
            assert_eq!(melt_yield(0.3999), 2);
            assert_eq!(melt_yield(0.4), 1);
            assert_eq!(melt_yield(0.99), 1);
        }

        #[test]
        fn yield_distribution_over_many_trials() {
            let inputs = batch(EquipmentRarity::Green);
            let mut rng = rng();
            let mut counts = [0usize; 4];
            let trials = 10_000;
            for _ in 0..trials {
                let outcome = melt(&inputs, 50, counter(1000), &mut rng);
                let crafted = outcome.crafted();
                assert!(crafted.iter().all(|i| i.rarity == EquipmentRarity::Blue));
                counts[crafted.len()] += 1;
            }
            #[allow(clippy::cast_precision_loss)]
            let share = |n: usize| counts[n] as f64 / f64::from(trials);
            assert!((share(1) - 0.6).abs() < 0.03, "1-item share {}", share(1));
            assert!((share(2) - 0.3).abs() < 0.03, "2-item share {}", share(2));
            assert!((share(3) - 0.1).abs() < 0.02, "3-item share {}", share(3));
        }
    }
}
