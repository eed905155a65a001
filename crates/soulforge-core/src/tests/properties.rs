//! Property tests for the stat pipeline, melt and synergy scoring.

use proptest::prelude::*;

use crate::equipment::{lifecycle, EquipmentItem, MeltOutcome};
use crate::hero::{HeroInstance, HeroTemplate};
use crate::ids::{EquipmentId, HeroId, TemplateId};
use crate::stats::{ComputeOptions, StatCompositor};
use crate::synergy::{
    SynergyAnalyzer, ATTRIBUTE_POINTS, DIVERSITY_POINTS, EPIC_COMBO_POINTS, FACTION_POINTS,
};
use crate::tables::hero::{
    ATTRIBUTE_BONUS_REQUIREMENT, FACTION_BONUS_REQUIREMENT, MAX_HERO_ENHANCEMENT, MAX_HERO_LEVEL, MAX_STARS,
    MAX_TEAM_SIZE,
};
use crate::tables::{Attribute, BaseStats, EpicCombo, EquipmentRarity, Faction, Role};

use super::helpers::{hero, rng};

fn coded_hero(codes: [u8; 4], level: u32, stars: u8, enhancement: u8) -> HeroInstance {
    let template = HeroTemplate::from_codes(
        TemplateId::new(1),
        "coded",
        codes,
        BaseStats::new(1000, 120, 110, 95, 130),
    );
    let mut hero = HeroInstance::new(HeroId::new(1), template);
    hero.level = level;
    hero.stars = stars;
    hero.enhancement = enhancement;
    hero
}

/// Highest score a full team can reach: each bonus needs its threshold of
/// heroes, combos are independent.
fn max_team_score() -> u32 {
    let teams = |requirement: usize| u32::try_from(MAX_TEAM_SIZE / requirement).unwrap_or(u32::MAX);
    let combos = u32::try_from(EpicCombo::all().len()).unwrap_or(u32::MAX);
    FACTION_POINTS * teams(FACTION_BONUS_REQUIREMENT)
        + ATTRIBUTE_POINTS * teams(ATTRIBUTE_BONUS_REQUIREMENT)
        + EPIC_COMBO_POINTS * combos
        + DIVERSITY_POINTS
}

fn faction(code: u8) -> Faction {
    Faction::from_code(code).unwrap_or(Faction::Human)
}

fn attribute(code: u8) -> Attribute {
    Attribute::from_code(code).unwrap_or(Attribute::Heart)
}

proptest! {
    #[test]
    fn prop_stats_stay_in_range(
        faction in 0u8..=8,
        attribute in 0u8..=8,
        role in 0u8..=10,
        rarity in 0u8..=7,
        level in 0u32..=300,
        stars in 0u8..=12,
        enhancement in 0u8..=20,
    ) {
        let hero = coded_hero([faction, attribute, role, rarity], level, stars, enhancement);
        let team = [hero.clone()];
        let stats = StatCompositor::new().compose(&hero, &[], &team, ComputeOptions::FULL);

        prop_assert!(stats.hp >= 1);
        prop_assert!(stats.atk >= 1);
        prop_assert!(stats.speed >= 1);
        prop_assert!(stats.def >= 0);
        prop_assert!((0.0..=1.0).contains(&stats.crit_rate));
        prop_assert!((0.0..=1.0).contains(&stats.evasion));
        prop_assert!(stats.crit_damage >= 1.0);
    }

    #[test]
    fn prop_progression_is_clamped(
        level in 0u32..=1000,
        stars in 0u8..=50,
        enhancement in 0u8..=50,
    ) {
        let compositor = StatCompositor::new();
        let wild = coded_hero([1, 2, 1, 3], level, stars, enhancement);
        let tame = coded_hero(
            [1, 2, 1, 3],
            level.clamp(1, MAX_HERO_LEVEL),
            stars.clamp(1, MAX_STARS),
            enhancement.min(MAX_HERO_ENHANCEMENT),
        );
        prop_assert_eq!(compositor.base_final(&wild), compositor.base_final(&tame));
    }

    #[test]
    fn prop_compose_is_pure(level in 1u32..=100, stars in 1u8..=5) {
        let compositor = StatCompositor::new();
        let hero = coded_hero([3, 4, 5, 2], level, stars, 0);
        let team = [hero.clone()];
        let first = compositor.compose(&hero, &[], &team, ComputeOptions::FULL);
        let second = compositor.compose(&hero, &[], &team, ComputeOptions::FULL);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_levels_never_lower_stats(level in 1u32..MAX_HERO_LEVEL) {
        let compositor = StatCompositor::new();
        let low = compositor.base_final(&coded_hero([1, 1, 1, 2], level, 1, 0));
        let high = compositor.base_final(&coded_hero([1, 1, 1, 2], level + 1, 1, 0));
        prop_assert!(high.hp >= low.hp);
        prop_assert!(high.atk >= low.atk);
        prop_assert!(high.def >= low.def);
        prop_assert!(high.speed >= low.speed);
    }

    #[test]
    fn prop_enhancement_never_lowers_stats(
        enhancement in 0u8..MAX_HERO_ENHANCEMENT,
        level in 1u32..=MAX_HERO_LEVEL,
        stars in 1u8..=MAX_STARS,
        faction in 1u8..=6,
        attribute in 1u8..=6,
        role in 1u8..=8,
        rarity in 1u8..=5,
    ) {
        let compositor = StatCompositor::new();
        let codes = [faction, attribute, role, rarity];
        let low_hero = coded_hero(codes, level, stars, enhancement);
        let high_hero = coded_hero(codes, level, stars, enhancement + 1);

        let low = compositor.base_final(&low_hero);
        let high = compositor.base_final(&high_hero);
        prop_assert!(high.hp >= low.hp);
        prop_assert!(high.atk >= low.atk);
        prop_assert!(high.def >= low.def);
        prop_assert!(high.speed >= low.speed);

        let low = compositor.compose(&low_hero, &[], &[low_hero.clone()], ComputeOptions::FULL);
        let high = compositor.compose(&high_hero, &[], &[high_hero.clone()], ComputeOptions::FULL);
        prop_assert!(high.hp >= low.hp);
        prop_assert!(high.atk >= low.atk);
        prop_assert!(high.def >= low.def);
        prop_assert!(high.speed >= low.speed);
    }

    #[test]
    fn prop_melt_is_all_or_nothing(
        seed in any::<u64>(),
        rarity in 1u8..=6,
        count in 0usize..=7,
        locked in proptest::collection::vec(any::<bool>(), 7),
    ) {
        let rarity = EquipmentRarity::from_code(rarity).unwrap_or(EquipmentRarity::Gray);
        let mut rng = rng(seed);
        let inputs: Vec<EquipmentItem> = (0..count)
            .map(|i| {
                let mut item = lifecycle::generate(EquipmentId::new(i as u64 + 1), rarity, rarity, 1, &mut rng);
                item.locked = locked[i];
                item
            })
            .collect();

        let mut next = 100;
        let outcome = lifecycle::melt(
            &inputs,
            50,
            || {
                next += 1;
                EquipmentId::new(next)
            },
            &mut rng,
        );

        let valid = count == 5 && rarity.is_salvageable() && !locked[..5].iter().any(|&l| l);
        match outcome {
            MeltOutcome::Crafted { consumed, crafted } => {
                prop_assert!(valid);
                prop_assert_eq!(consumed, inputs.iter().map(|item| item.id).collect::<Vec<_>>());
                prop_assert!((1..=3).contains(&crafted.len()));
                prop_assert!(crafted.iter().all(|item| Some(item.rarity) == rarity.next()));
            }
            MeltOutcome::Rejected(_) => {
                prop_assert!(!valid);
                prop_assert_eq!(next, 100);
            }
        }
    }

    #[test]
    fn prop_score_ignores_order(
        members in proptest::collection::vec((1u8..=6, 1u8..=6), 0..=5),
    ) {
        let analyzer = SynergyAnalyzer::new();
        let team: Vec<HeroInstance> = members
            .iter()
            .enumerate()
            .map(|(i, &(f, a))| hero(i as u64 + 1, faction(f), attribute(a), Role::Mage))
            .collect();
        let forward = analyzer.score(&team);
        let backward = analyzer.score(team.iter().rev());

        prop_assert_eq!(forward.total, backward.total);
        prop_assert_eq!(
            forward.total,
            forward.faction_points + forward.attribute_points + forward.epic_combo_points + forward.diversity_bonus
        );
    }

    #[test]
    fn prop_full_team_score_is_bounded(
        members in proptest::collection::vec((0u8..=8, 0u8..=8, 0u8..=10), MAX_TEAM_SIZE),
    ) {
        let team: Vec<HeroInstance> = members
            .iter()
            .enumerate()
            .map(|(i, &(faction, attribute, role))| {
                let template = HeroTemplate::from_codes(
                    TemplateId::new(i as u64 + 1),
                    "coded",
                    [faction, attribute, role, 2],
                    BaseStats::new(1000, 120, 110, 95, 130),
                );
                HeroInstance::new(HeroId::new(i as u64 + 1), template)
            })
            .collect();
        let score = SynergyAnalyzer::new().score(&team);

        prop_assert!(score.total <= max_team_score());
        prop_assert!(score.faction_bonuses.len() <= MAX_TEAM_SIZE / FACTION_BONUS_REQUIREMENT);
        prop_assert!(score.attribute_bonuses.len() <= MAX_TEAM_SIZE / ATTRIBUTE_BONUS_REQUIREMENT);
    }
}
