//! Team composition analysis.
//!
//! [`SynergyAnalyzer`] scores faction and attribute synergy, detects epic
//! combos, flags weak links in the power curve and produces positioning
//! advice and role-balance suggestions. Everything it returns is
//! informational: nothing here blocks a formation from being saved.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hero::HeroInstance;
use crate::ids::HeroId;
use crate::stats::{Combatant, TeamCounts};
use crate::tables::battle::type_advantage;
use crate::tables::{Attribute, EpicCombo, Faction, Position, Role};

/// Points per active faction bonus.
pub const FACTION_POINTS: u32 = 20;

/// Points per active attribute bonus.
pub const ATTRIBUTE_POINTS: u32 = 25;

/// Points per epic combo.
pub const EPIC_COMBO_POINTS: u32 = 30;

/// Bonus for fielding three or more distinct factions.
pub const DIVERSITY_POINTS: u32 = 10;

/// Distinct factions needed for the diversity bonus.
pub const DIVERSITY_REQUIREMENT: usize = 3;

/// Scores below this are flagged as low synergy.
pub const LOW_SYNERGY_THRESHOLD: u32 = 30;

/// A hero is a weak link below this share of the average power.
pub const WEAK_LINK_RATIO: f64 = 0.5;

/// Most heroes of one role before the analyzer suggests diversifying.
pub const MAX_SAME_ROLE: usize = 2;

// =============================================================================
// Score
// =============================================================================

/// Synergy score of a team and the bonuses behind it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynergyScore {
    /// Active faction bonuses, in code order.
    pub faction_bonuses: Vec<Faction>,
    /// Active attribute bonuses, in code order.
    pub attribute_bonuses: Vec<Attribute>,
    /// Epic combos met, in evaluation order.
    pub epic_combos: Vec<EpicCombo>,
    /// `20 × faction bonuses`.
    pub faction_points: u32,
    /// `25 × attribute bonuses`.
    pub attribute_points: u32,
    /// `30 × epic combos`.
    pub epic_combo_points: u32,
    /// 10 with three or more distinct factions.
    pub diversity_bonus: u32,
    /// Sum of every component.
    pub total: u32,
}

impl SynergyScore {
    fn from_counts(counts: &TeamCounts) -> Self {
        let faction_bonuses: Vec<_> = counts.active_factions().collect();
        let attribute_bonuses: Vec<_> = counts.active_attributes().collect();
        let epic_combos: Vec<_> = EpicCombo::all()
            .iter()
            .copied()
            .filter(|combo| combo.is_met(&counts.attributes))
            .collect();

        let faction_points = FACTION_POINTS * count_u32(faction_bonuses.len());
        let attribute_points = ATTRIBUTE_POINTS * count_u32(attribute_bonuses.len());
        let epic_combo_points = EPIC_COMBO_POINTS * count_u32(epic_combos.len());
        let diversity_bonus = if counts.distinct_factions() >= DIVERSITY_REQUIREMENT {
            DIVERSITY_POINTS
        } else {
            0
        };

        Self {
            faction_bonuses,
            attribute_bonuses,
            epic_combos,
            faction_points,
            attribute_points,
            epic_combo_points,
            diversity_bonus,
            total: faction_points + attribute_points + epic_combo_points + diversity_bonus,
        }
    }
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// =============================================================================
// Power distribution
// =============================================================================

/// Spread of total power across a team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerDistribution {
    /// Sum of every hero's power.
    pub total: i64,
    /// Integer average.
    pub average: i64,
    /// Weakest hero's power.
    pub min: i64,
    /// Strongest hero's power.
    pub max: i64,
    /// `max - min`.
    pub gap: i64,
    /// Heroes below half the average, in team order.
    pub weak_links: Vec<HeroId>,
}

impl PowerDistribution {
    /// Any hero falls below half the average.
    #[must_use]
    pub fn has_weak_links(&self) -> bool {
        !self.weak_links.is_empty()
    }
}

// =============================================================================
// Analysis
// =============================================================================

/// Full report on a formation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormationAnalysis {
    /// Synergy score.
    pub score: SynergyScore,
    /// Power spread.
    pub power: PowerDistribution,
    /// Positioning hints, one per misplaced hero.
    pub advice: Vec<String>,
    /// Role balance and synergy suggestions.
    pub suggestions: Vec<String>,
    /// No suggestions were raised.
    pub is_optimal: bool,
}

/// Stateless team analyzer.
///
/// # Example
///
/// ```
/// use soulforge_core::synergy::SynergyAnalyzer;
///
/// let analysis = SynergyAnalyzer::new().analyze(&[]);
/// assert!(!analysis.is_optimal);
/// assert_eq!(analysis.score.total, 0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SynergyAnalyzer;

impl SynergyAnalyzer {
    /// Creates an analyzer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Synergy score of `team`. Heroes with unknown codes add nothing.
    #[must_use]
    pub fn score<'a>(&self, team: impl IntoIterator<Item = &'a HeroInstance>) -> SynergyScore {
        SynergyScore::from_counts(&TeamCounts::of(team))
    }

    /// Power spread of `team`. Empty teams have no weak links.
    #[must_use]
    pub fn power_distribution(&self, team: &[Combatant]) -> PowerDistribution {
        let powers: Vec<i64> = team.iter().map(Combatant::power).collect();
        let (Some(&min), Some(&max)) = (powers.iter().min(), powers.iter().max()) else {
            return PowerDistribution::default();
        };
        let total: i64 = powers.iter().sum();
        let average = total / i64::try_from(powers.len()).unwrap_or(i64::MAX);

        #[allow(clippy::cast_precision_loss)]
        let threshold = average as f64 * WEAK_LINK_RATIO;
        #[allow(clippy::cast_precision_loss)]
        let weak_links = team
            .iter()
            .filter(|c| (c.power() as f64) < threshold)
            .map(|c| c.hero.id)
            .collect();

        PowerDistribution {
            total,
            average,
            min,
            max,
            gap: max - min,
            weak_links,
        }
    }

    /// Positioning hints for `team`, taking list order as positions 1..=5.
    ///
    /// Teams of fewer than two heroes get no advice.
    #[must_use]
    pub fn positioning_advice(&self, team: &[Combatant]) -> Vec<String> {
        if team.len() < 2 {
            return Vec::new();
        }
        team.iter()
            .enumerate()
            .filter_map(|(i, c)| {
                let position = Position::nth_deployed(i)?;
                let role = c.hero.role()?;
                advice_for(role, position, c.hero.name())
            })
            .collect()
    }

    /// Role balance and synergy suggestions, in a fixed order.
    #[must_use]
    pub fn suggestions(&self, team: &[Combatant], score: &SynergyScore, power: &PowerDistribution) -> Vec<String> {
        let mut roles = [0usize; Role::COUNT];
        for role in team.iter().filter_map(|c| c.hero.role()) {
            roles[role.index()] += 1;
        }

        let mut out = Vec::new();
        if roles[Role::Tank.index()] == 0 && roles[Role::Healer.index()] == 0 {
            out.push("Consider adding a Tank or Healer for survivability".to_owned());
        }
        for role in Role::all() {
            if roles[role.index()] > MAX_SAME_ROLE {
                out.push(format!("Too many {role} heroes, consider diversifying roles"));
            }
        }
        if score.total < LOW_SYNERGY_THRESHOLD {
            out.push("Low synergy, look for more heroes sharing a faction or attribute".to_owned());
        }
        if power.has_weak_links() {
            out.push("Some heroes are much weaker than the rest, consider upgrading them".to_owned());
        }
        out
    }

    /// Scores, checks balance and advises on positioning.
    #[must_use]
    pub fn analyze(&self, team: &[Combatant]) -> FormationAnalysis {
        if team.is_empty() {
            return FormationAnalysis {
                suggestions: vec!["Formation is empty".to_owned()],
                ..FormationAnalysis::default()
            };
        }

        let score = self.score(team.iter().map(|c| &c.hero));
        let power = self.power_distribution(team);
        let suggestions = self.suggestions(team, &score, &power);
        let advice = self.positioning_advice(team);

        debug!(
            heroes = team.len(),
            score = score.total,
            weak_links = power.weak_links.len(),
            "analyzed formation"
        );

        FormationAnalysis {
            is_optimal: suggestions.is_empty(),
            score,
            power,
            advice,
            suggestions,
        }
    }

    /// Damage multiplier of `attacker` against `defender`: faction × role ×
    /// attribute advantage. Unknown codes count as neutral.
    #[must_use]
    pub fn matchup_effectiveness(&self, attacker: &HeroInstance, defender: &HeroInstance) -> f64 {
        let faction = match (attacker.faction(), defender.faction()) {
            (Some(a), Some(d)) => type_advantage(a, d),
            _ => 1.0,
        };
        let role = match (attacker.role(), defender.role()) {
            (Some(a), Some(d)) => role_advantage(a, d),
            _ => 1.0,
        };
        let attribute = match (attacker.attribute(), defender.attribute()) {
            (Some(a), Some(d)) => attribute_advantage(a, d),
            _ => 1.0,
        };
        faction * role * attribute
    }
}

fn advice_for(role: Role, position: Position, name: &str) -> Option<String> {
    let text = match role {
        Role::Tank if position.is_back_row() => format!("Tank {name} should stand in the front row"),
        Role::Healer if position.is_front_row() => {
            format!("Healer {name} would be safer in the back row")
        }
        Role::Mage | Role::Controller if position.is_front_row() => {
            format!("{role} {name} needs protection in the back row")
        }
        Role::Assassin if position == Position::FrontCenter => {
            format!("Assassin {name} should avoid the front center")
        }
        _ => return None,
    };
    Some(text)
}

/// Role-versus-role multiplier.
#[must_use]
pub fn role_advantage(attacker: Role, defender: Role) -> f64 {
    match (attacker, defender) {
        (Role::Assassin, Role::Support | Role::Healer) => 1.3,
        (Role::Mage, _) => 1.1,
        (Role::Tank, Role::Assassin) => 0.8,
        (Role::Range, Role::Mage) => 1.2,
        _ => 1.0,
    }
}

/// Attribute-versus-attribute multiplier.
#[must_use]
pub fn attribute_advantage(attacker: Attribute, defender: Attribute) -> f64 {
    match (attacker, defender) {
        (Attribute::Power, Attribute::Soul) => 0.9,
        (Attribute::Void, Attribute::Core) => 1.15,
        (Attribute::Mind, Attribute::Heart) => 1.1,
        _ => 1.0,
    }
}
