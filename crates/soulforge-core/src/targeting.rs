//! Combat target selection.
//!
//! An attacker first derives a smart strategy from its faction, then from its
//! role. When neither applies the caller's preferred [`TargetMode`] is used.
//! Deterministic modes break ties by first occurrence; modes that look for a
//! specific kind of target fall back to a uniform pick over all candidates
//! when none match.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::hero::HeroInstance;
use crate::stats::Combatant;
use crate::tables::{Faction, Role};

/// Caller-selectable targeting mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TargetMode {
    /// Uniform over all candidates.
    #[default]
    Random = 1,
    /// Lowest HP, first on ties.
    LowestHp = 2,
    /// Highest ATK, first on ties.
    HighestAtk = 3,
    /// First candidate in the front row.
    FrontRow = 4,
    /// First candidate in the back row.
    BackRow = 5,
    /// First candidate of the attacker's faction.
    SameType = 6,
    /// First candidate of another faction.
    OppositeType = 7,
    /// First Support or Healer.
    SupportFirst = 8,
}

impl TargetMode {
    /// Stable numeric code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Resolves a stored code; `None` when out of range.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Random),
            2 => Some(Self::LowestHp),
            3 => Some(Self::HighestAtk),
            4 => Some(Self::FrontRow),
            5 => Some(Self::BackRow),
            6 => Some(Self::SameType),
            7 => Some(Self::OppositeType),
            8 => Some(Self::SupportFirst),
            _ => None,
        }
    }
}

/// What the engine actually targets with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// A plain mode.
    Mode(TargetMode),
    /// First candidate of the given faction.
    PreferFaction(Faction),
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mode(mode) => write!(f, "{mode:?}"),
            Self::PreferFaction(faction) => write!(f, "prefer {faction}"),
        }
    }
}

/// Picks targets.
///
/// # Example
///
/// ```
/// use soulforge_core::targeting::{Strategy, TargetMode, TargetingEngine};
/// use soulforge_core::hero::{HeroInstance, HeroTemplate};
/// use soulforge_core::ids::{HeroId, TemplateId};
/// use soulforge_core::tables::{Attribute, Faction, HeroRarity, Role};
///
/// let template = HeroTemplate::new(
///     TemplateId::new(1),
///     "Ulquiorra",
///     Faction::Hollow,
///     Attribute::Void,
///     Role::Mage,
///     HeroRarity::Mythic,
/// );
/// let attacker = HeroInstance::new(HeroId::new(1), template);
///
/// // Faction rules take precedence over role rules.
/// let strategy = TargetingEngine::new().smart_strategy(&attacker, &[]);
/// assert_eq!(strategy, Some(Strategy::Mode(TargetMode::LowestHp)));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetingEngine;

impl TargetingEngine {
    /// Creates a targeting engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Strategy implied by the attacker's faction, else its role.
    ///
    /// `None` means no rule applies and the preferred mode should be used.
    #[must_use]
    pub fn smart_strategy(&self, attacker: &HeroInstance, candidates: &[Combatant]) -> Option<Strategy> {
        let present = |faction: Faction| candidates.iter().any(|c| c.hero.faction() == Some(faction));

        match attacker.faction() {
            Some(Faction::Quincy) if present(Faction::Hollow) => {
                return Some(Strategy::PreferFaction(Faction::Hollow));
            }
            Some(Faction::Quincy) => return Some(Strategy::Mode(TargetMode::HighestAtk)),
            Some(Faction::Arrancar) if present(Faction::Shinigami) => {
                return Some(Strategy::PreferFaction(Faction::Shinigami));
            }
            Some(Faction::Arrancar) => return Some(Strategy::Mode(TargetMode::SupportFirst)),
            Some(Faction::Hollow) => return Some(Strategy::Mode(TargetMode::LowestHp)),
            _ => {}
        }

        let mode = match attacker.role()? {
            Role::Assassin => TargetMode::SupportFirst,
            Role::Tank => TargetMode::HighestAtk,
            Role::Mage | Role::Controller => TargetMode::BackRow,
            // Berserkers attack without a plan.
            Role::Berserker => return None,
            Role::Healer | Role::Range | Role::Support => TargetMode::FrontRow,
        };
        Some(Strategy::Mode(mode))
    }

    /// Chooses a candidate index for `attacker`.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] when `candidates` is empty.
    pub fn select_target(
        &self,
        candidates: &[Combatant],
        attacker: &HeroInstance,
        preferred: TargetMode,
        rng: &mut impl Rng,
    ) -> Result<usize> {
        if candidates.is_empty() {
            return Err(EngineError::InvalidState("no target candidates".to_owned()));
        }
        let strategy = self
            .smart_strategy(attacker, candidates)
            .unwrap_or(Strategy::Mode(preferred));
        let index = self.apply(strategy, candidates, attacker, rng);
        debug!(
            attacker = %attacker.id,
            target = %candidates[index].hero.id,
            %strategy,
            "selected target"
        );
        Ok(index)
    }

    /// Applies one strategy to a non-empty candidate list.
    pub fn apply(
        &self,
        strategy: Strategy,
        candidates: &[Combatant],
        attacker: &HeroInstance,
        rng: &mut impl Rng,
    ) -> usize {
        let first = |pred: &dyn Fn(&Combatant) -> bool| candidates.iter().position(pred);

        let found = match strategy {
            Strategy::PreferFaction(faction) => first(&|c| c.hero.faction() == Some(faction)),
            Strategy::Mode(TargetMode::Random) => None,
            Strategy::Mode(TargetMode::LowestHp) => Some(first_extreme(candidates, |c| -i64::from(c.stats.hp))),
            Strategy::Mode(TargetMode::HighestAtk) => Some(first_extreme(candidates, |c| i64::from(c.stats.atk))),
            Strategy::Mode(TargetMode::FrontRow) => first(&|c| c.hero.position.is_front_row()),
            Strategy::Mode(TargetMode::BackRow) => first(&|c| c.hero.position.is_back_row()),
            Strategy::Mode(TargetMode::SameType) => {
                let own = attacker.faction();
                first(&|c| own.is_some() && c.hero.faction() == own)
            }
            Strategy::Mode(TargetMode::OppositeType) => {
                let own = attacker.faction();
                first(&|c| c.hero.faction().is_some() && c.hero.faction() != own)
            }
            Strategy::Mode(TargetMode::SupportFirst) => {
                first(&|c| c.hero.role().is_some_and(Role::is_supporter))
            }
        };

        found.unwrap_or_else(|| rng.gen_range(0..candidates.len()))
    }
}

/// Index of the first candidate maximizing `key`.
fn first_extreme(candidates: &[Combatant], key: impl Fn(&Combatant) -> i64) -> usize {
    let mut best = 0;
    for (i, c) in candidates.iter().enumerate().skip(1) {
        if key(c) > key(&candidates[best]) {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hero::HeroTemplate;
    use crate::ids::{HeroId, TemplateId};
    use crate::stats::{ComputeOptions, StatCompositor};
    use crate::tables::{Attribute, HeroRarity, Position};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn hero(id: u64, faction: Faction, role: Role) -> HeroInstance {
        let template = HeroTemplate::new(
            TemplateId::new(id),
            format!("hero-{id}"),
            faction,
            Attribute::Heart,
            role,
            HeroRarity::Common,
        );
        HeroInstance::new(HeroId::new(id), template)
    }

    fn candidate(id: u64, faction: Faction, role: Role, position: Position, hp: i32, atk: i32) -> Combatant {
        let mut h = hero(id, faction, role);
        h.position = position;
        let mut stats = StatCompositor::new().compose(&h, &[], &[], ComputeOptions::EQUIPPED);
        stats.hp = hp;
        stats.atk = atk;
        Combatant::new(h, stats)
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(3)
    }

    fn plain_attacker() -> HeroInstance {
        hero(100, Faction::Human, Role::Berserker)
    }

    mod mode_tests {
        use super::*;

        #[test]
        fn lowest_hp_picks_the_weakest() {
            let candidates = [
                candidate(1, Faction::Human, Role::Range, Position::FrontLeft, 50, 10),
                candidate(2, Faction::Human, Role::Range, Position::FrontLeft, 10, 10),
                candidate(3, Faction::Human, Role::Range, Position::FrontLeft, 30, 10),
            ];
            let index = TargetingEngine::new()
                .select_target(&candidates, &plain_attacker(), TargetMode::LowestHp, &mut rng())
                .unwrap();
            assert_eq!(index, 1);
        }

        #[test]
        fn ties_break_by_first_occurrence() {
            let candidates = [
                candidate(1, Faction::Human, Role::Range, Position::FrontLeft, 40, 90),
                candidate(2, Faction::Human, Role::Range, Position::FrontLeft, 10, 90),
                candidate(3, Faction::Human, Role::Range, Position::FrontLeft, 10, 20),
            ];
            let engine = TargetingEngine::new();
            let attacker = plain_attacker();
            let lowest = engine.apply(Strategy::Mode(TargetMode::LowestHp), &candidates, &attacker, &mut rng());
            let highest = engine.apply(Strategy::Mode(TargetMode::HighestAtk), &candidates, &attacker, &mut rng());
            assert_eq!(lowest, 1);
            assert_eq!(highest, 0);
        }

        #[test]
        fn row_modes_match_positions() {
            let candidates = [
                candidate(1, Faction::Human, Role::Range, Position::BackLeft, 10, 10),
                candidate(2, Faction::Human, Role::Range, Position::FrontRight, 10, 10),
                candidate(3, Faction::Human, Role::Range, Position::BackRight, 10, 10),
            ];
            let engine = TargetingEngine::new();
            let attacker = plain_attacker();
            assert_eq!(engine.apply(Strategy::Mode(TargetMode::FrontRow), &candidates, &attacker, &mut rng()), 1);
            assert_eq!(engine.apply(Strategy::Mode(TargetMode::BackRow), &candidates, &attacker, &mut rng()), 0);
        }

        #[test]
        fn unmatched_mode_falls_back_to_random() {
            let candidates = [
                candidate(1, Faction::Human, Role::Range, Position::Bench, 10, 10),
                candidate(2, Faction::Human, Role::Range, Position::Bench, 10, 10),
            ];
            let engine = TargetingEngine::new();
            let mut rng = rng();
            let mut seen = [false; 2];
            for _ in 0..50 {
                let i = engine.apply(Strategy::Mode(TargetMode::FrontRow), &candidates, &plain_attacker(), &mut rng);
                seen[i] = true;
            }
            assert_eq!(seen, [true, true]);
        }

        #[test]
        fn faction_modes() {
            let candidates = [
                candidate(1, Faction::Human, Role::Range, Position::FrontLeft, 10, 10),
                candidate(2, Faction::Hollow, Role::Range, Position::FrontLeft, 10, 10),
            ];
            let engine = TargetingEngine::new();
            let attacker = plain_attacker();
            assert_eq!(engine.apply(Strategy::Mode(TargetMode::SameType), &candidates, &attacker, &mut rng()), 0);
            assert_eq!(engine.apply(Strategy::Mode(TargetMode::OppositeType), &candidates, &attacker, &mut rng()), 1);
        }

        #[test]
        fn support_first() {
            let candidates = [
                candidate(1, Faction::Human, Role::Tank, Position::FrontLeft, 10, 10),
                candidate(2, Faction::Human, Role::Healer, Position::BackLeft, 10, 10),
                candidate(3, Faction::Human, Role::Support, Position::BackRight, 10, 10),
            ];
            let engine = TargetingEngine::new();
            let index = engine.apply(Strategy::Mode(TargetMode::SupportFirst), &candidates, &plain_attacker(), &mut rng());
            assert_eq!(index, 1);
        }

        #[test]
        fn empty_candidates_is_an_error() {
            let result = TargetingEngine::new().select_target(&[], &plain_attacker(), TargetMode::Random, &mut rng());
            assert!(matches!(result, Err(EngineError::InvalidState(_))));
        }

        #[test]
        fn mode_codes_round_trip() {
            for code in 1..=8 {
                assert_eq!(TargetMode::from_code(code).map(TargetMode::code), Some(code));
            }
            assert_eq!(TargetMode::from_code(0), None);
        }
    }

    mod smart_tests {
        use super::*;

        #[test]
        fn quincy_hunts_hollows() {
            let engine = TargetingEngine::new();
            let quincy = hero(1, Faction::Quincy, Role::Range);
            let with_hollow = [
                candidate(2, Faction::Human, Role::Tank, Position::FrontLeft, 10, 99),
                candidate(3, Faction::Hollow, Role::Range, Position::BackLeft, 10, 10),
            ];
            assert_eq!(
                engine.smart_strategy(&quincy, &with_hollow),
                Some(Strategy::PreferFaction(Faction::Hollow))
            );
            assert_eq!(engine.select_target(&with_hollow, &quincy, TargetMode::Random, &mut rng()).unwrap(), 1);

            let without = [candidate(2, Faction::Human, Role::Tank, Position::FrontLeft, 10, 99)];
            assert_eq!(
                engine.smart_strategy(&quincy, &without),
                Some(Strategy::Mode(TargetMode::HighestAtk))
            );
        }

        #[test]
        fn arrancar_hunts_shinigami_then_supporters() {
            let engine = TargetingEngine::new();
            let arrancar = hero(1, Faction::Arrancar, Role::Tank);
            let with = [candidate(2, Faction::Shinigami, Role::Tank, Position::FrontLeft, 10, 10)];
            assert_eq!(
                engine.smart_strategy(&arrancar, &with),
                Some(Strategy::PreferFaction(Faction::Shinigami))
            );
            let without = [candidate(2, Faction::Human, Role::Tank, Position::FrontLeft, 10, 10)];
            assert_eq!(
                engine.smart_strategy(&arrancar, &without),
                Some(Strategy::Mode(TargetMode::SupportFirst))
            );
        }

        #[test]
        fn faction_rule_beats_role_rule() {
            let engine = TargetingEngine::new();
            let hollow_tank = hero(1, Faction::Hollow, Role::Tank);
            assert_eq!(
                engine.smart_strategy(&hollow_tank, &[]),
                Some(Strategy::Mode(TargetMode::LowestHp))
            );
        }

        #[test]
        fn role_rules() {
            let engine = TargetingEngine::new();
            let cases = [
                (Role::Assassin, Some(Strategy::Mode(TargetMode::SupportFirst))),
                (Role::Tank, Some(Strategy::Mode(TargetMode::HighestAtk))),
                (Role::Mage, Some(Strategy::Mode(TargetMode::BackRow))),
                (Role::Controller, Some(Strategy::Mode(TargetMode::BackRow))),
                (Role::Berserker, None),
                (Role::Healer, Some(Strategy::Mode(TargetMode::FrontRow))),
                (Role::Support, Some(Strategy::Mode(TargetMode::FrontRow))),
            ];
            for (role, expected) in cases {
                assert_eq!(engine.smart_strategy(&hero(1, Faction::Shinigami, role), &[]), expected, "{role}");
            }
        }

        #[test]
        fn unknown_role_uses_preferred_mode() {
            let template = HeroTemplate::from_codes(
                TemplateId::new(1),
                "Glitch",
                [5, 1, 0, 1],
                crate::tables::BaseStats::ZERO,
            );
            let attacker = HeroInstance::new(HeroId::new(1), template);
            assert_eq!(TargetingEngine::new().smart_strategy(&attacker, &[]), None);
        }
    }
}
