//! Squad assembly, validation and turn ordering.
//!
//! # Suggestion
//!
//! [`FormationOptimizer::suggest`] is greedy. It takes the strongest Tank (or
//! the tankiest hero), then the strongest Healer, then repeatedly the hero
//! that raises the synergy score the most, falling back to raw power. The
//! picked heroes are then ordered front to back by role priority.
//!
//! # Validation
//!
//! [`FormationOptimizer::validate`] separates hard errors (empty, over the
//! unlocked slot count, duplicate hero) from warnings. A formation with any
//! error must not be applied.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::hero::HeroInstance;
use crate::ids::HeroId;
use crate::stats::Combatant;
use crate::synergy::SynergyAnalyzer;
use crate::tables::battle::{effective_speed, TANK_COVER_BONUS};
use crate::tables::hero::{available_team_slots, MAX_TEAM_SIZE};
use crate::tables::{Position, Role};

/// Priority used for heroes whose role code is unknown.
const UNKNOWN_ROLE_PRIORITY: u8 = 5;

// =============================================================================
// Formation
// =============================================================================

/// Ordered hero references; index `i` stands at the `i`th deployed position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formation {
    heroes: Vec<HeroId>,
}

impl Formation {
    /// Creates a formation from front-to-back hero ids.
    #[must_use]
    pub fn new(heroes: Vec<HeroId>) -> Self {
        Self { heroes }
    }

    /// Hero ids, front to back.
    #[must_use]
    pub fn heroes(&self) -> &[HeroId] {
        &self.heroes
    }

    /// Number of heroes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heroes.len()
    }

    /// No heroes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heroes.is_empty()
    }

    /// Position assigned to each hero. Heroes past the fifth get none.
    pub fn assignments(&self) -> impl Iterator<Item = (Position, HeroId)> + '_ {
        self.heroes
            .iter()
            .enumerate()
            .filter_map(|(i, &id)| Position::nth_deployed(i).map(|p| (p, id)))
    }

    /// Position of `hero`, if present.
    #[must_use]
    pub fn position_of(&self, hero: HeroId) -> Option<Position> {
        self.assignments().find(|&(_, id)| id == hero).map(|(p, _)| p)
    }
}

// =============================================================================
// Results
// =============================================================================

/// Outcome of [`FormationOptimizer::suggest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationSuggestion {
    /// A formation was produced.
    pub success: bool,
    /// Why not, when unsuccessful.
    pub reason: Option<String>,
    /// Suggested heroes, front to back.
    pub formation: Formation,
    /// Synergy score of the suggestion.
    pub expected_score: u32,
    /// Sum of the picked heroes' power.
    pub total_power: i64,
}

impl FormationSuggestion {
    fn failed(reason: &str) -> Self {
        Self {
            reason: Some(reason.to_owned()),
            ..Self::default()
        }
    }
}

/// Outcome of [`FormationOptimizer::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationValidation {
    /// Blocking problems.
    pub errors: Vec<String>,
    /// Non-blocking problems.
    pub warnings: Vec<String>,
}

impl FormationValidation {
    /// No errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Which side of a battle a hero fights on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// First team passed in.
    Allies,
    /// Second team passed in.
    Enemies,
}

/// One slot of the turn order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnEntry {
    /// Acting hero.
    pub hero: HeroId,
    /// Its side.
    pub side: Side,
    /// Speed after jitter.
    pub effective_speed: f64,
}

// =============================================================================
// Optimizer
// =============================================================================

/// Greedy squad builder and formation checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormationOptimizer {
    analyzer: SynergyAnalyzer,
}

impl FormationOptimizer {
    /// Creates an optimizer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            analyzer: SynergyAnalyzer::new(),
        }
    }

    /// Builds the best team of up to `max_slots` heroes from `pool`.
    ///
    /// `max_slots` is capped at five. An empty pool or zero slots produce an
    /// unsuccessful suggestion with a reason.
    #[must_use]
    pub fn suggest(&self, pool: &[Combatant], max_slots: usize) -> FormationSuggestion {
        if pool.is_empty() {
            return FormationSuggestion::failed("no heroes available");
        }
        let max_slots = max_slots.min(MAX_TEAM_SIZE);
        if max_slots == 0 {
            return FormationSuggestion::failed("no formation slots unlocked");
        }

        let mut remaining: Vec<&Combatant> = pool.iter().collect();
        remaining.sort_by_key(|c| Reverse(c.power()));

        let mut team: Vec<&Combatant> = Vec::with_capacity(max_slots);

        let tank = best_of_role(&remaining, Role::Tank).or_else(|| tankiest(&remaining));
        if let Some(i) = tank {
            team.push(remaining.remove(i));
        }

        if team.len() < max_slots {
            if let Some(i) = best_of_role(&remaining, Role::Healer) {
                team.push(remaining.remove(i));
            }
        }

        while team.len() < max_slots && !remaining.is_empty() {
            let i = self.best_synergy_pick(&team, &remaining).unwrap_or(0);
            team.push(remaining.remove(i));
        }

        team.sort_by_key(|c| {
            let priority = c.hero.role().map_or(UNKNOWN_ROLE_PRIORITY, Role::position_priority);
            (priority, Reverse(c.stats.tankiness()))
        });

        let expected_score = self.analyzer.score(team.iter().map(|c| &c.hero)).total;
        let total_power = team.iter().map(|c| c.power()).sum();
        let formation = Formation::new(team.iter().map(|c| c.hero.id).collect());

        debug!(
            heroes = formation.len(),
            score = expected_score,
            power = total_power,
            "suggested formation"
        );

        FormationSuggestion {
            success: true,
            reason: None,
            formation,
            expected_score,
            total_power,
        }
    }

    /// Index into `remaining` of the hero that raises the score the most.
    /// `None` when no hero raises it at all.
    fn best_synergy_pick(&self, team: &[&Combatant], remaining: &[&Combatant]) -> Option<usize> {
        let current = self.analyzer.score(team.iter().map(|c| &c.hero)).total;
        let mut best: Option<(usize, u32)> = None;
        for (i, candidate) in remaining.iter().enumerate() {
            let with = self
                .analyzer
                .score(team.iter().chain(std::iter::once(candidate)).map(|c| &c.hero))
                .total;
            let gain = with.saturating_sub(current);
            if gain > best.map_or(0, |(_, g)| g) {
                best = Some((i, gain));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Checks a formation against the player's unlocked slots.
    #[must_use]
    pub fn validate(&self, formation: &[Combatant], player_level: u32) -> FormationValidation {
        let mut result = FormationValidation::default();
        if formation.is_empty() {
            result.errors.push("formation cannot be empty".to_owned());
            return result;
        }

        let slots = available_team_slots(player_level);
        if formation.len() > slots {
            result
                .errors
                .push(format!("formation exceeds unlocked slots: {}/{slots}", formation.len()));
        }

        let mut seen = BTreeSet::new();
        let mut reported = BTreeSet::new();
        for c in formation {
            if !seen.insert(c.hero.id) && reported.insert(c.hero.id) {
                result.errors.push(format!("hero {} appears more than once", c.hero.id));
            }
        }

        if self.analyzer.power_distribution(formation).has_weak_links() {
            result
                .warnings
                .push("some heroes are significantly weaker than the rest".to_owned());
        }

        let has_sustain = formation
            .iter()
            .any(|c| matches!(c.hero.role(), Some(Role::Tank | Role::Healer)));
        if !has_sustain && formation.len() > 2 {
            result
                .warnings
                .push("formation has no Tank or Healer".to_owned());
        }

        if result.is_valid() {
            info!(heroes = formation.len(), warnings = result.warnings.len(), "formation valid");
        } else {
            debug!(errors = ?result.errors, "formation rejected");
        }
        result
    }

    /// Interleaves two teams by jittered speed, fastest first.
    ///
    /// Entries with equal effective speed keep their input order, allies
    /// before enemies.
    pub fn turn_order(&self, allies: &[Combatant], enemies: &[Combatant], rng: &mut impl Rng) -> Vec<TurnEntry> {
        let mut entries: Vec<TurnEntry> = allies
            .iter()
            .map(|c| (c, Side::Allies))
            .chain(enemies.iter().map(|c| (c, Side::Enemies)))
            .map(|(c, side)| TurnEntry {
                hero: c.hero.id,
                side,
                effective_speed: effective_speed(c.stats.speed, rng),
            })
            .collect();
        entries.sort_by(|a, b| b.effective_speed.total_cmp(&a.effective_speed));
        entries
    }

    /// Protection multiplier of `position`, with the tank cover bonus for the
    /// back row when `team` fields a Tank.
    #[must_use]
    pub fn position_protection(&self, position: Position, team: &[HeroInstance]) -> f64 {
        let base = position.protection();
        let has_tank = team.iter().any(|h| h.role() == Some(Role::Tank));
        if has_tank && position.is_back_row() {
            base * TANK_COVER_BONUS
        } else {
            base
        }
    }
}

/// Strongest hero of `role` in a power-sorted list; first wins ties.
fn best_of_role(sorted: &[&Combatant], role: Role) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;
    for (i, c) in sorted.iter().enumerate() {
        if c.hero.role() == Some(role) && c.power() > best.map_or(0, |(_, p)| p) {
            best = Some((i, c.power()));
        }
    }
    best.map(|(i, _)| i)
}

/// Hero maximizing `HP / 10 + DEF`; first wins ties.
fn tankiest(sorted: &[&Combatant]) -> Option<usize> {
    let mut best: Option<(usize, i32)> = None;
    for (i, c) in sorted.iter().enumerate() {
        let t = c.stats.tankiness();
        if t > best.map_or(0, |(_, b)| b) {
            best = Some((i, t));
        }
    }
    best.map(|(i, _)| i)
}
