//! Hero templates and player-owned hero instances.
//!
//! A [`HeroTemplate`] is immutable content: faction, attribute, role, rarity
//! and the base stat quintet. A [`HeroInstance`] is what the player owns: it
//! references its template (joined by the store on read) and carries the
//! mutable progression state.
//!
//! Template classification is kept as raw codes so that a corrupted stored row
//! is still representable; the typed accessors return `None` for codes the
//! tables do not know, and every consumer falls back to a neutral value.
//!
//! # Example
//!
//! ```
//! use soulforge_core::hero::{HeroInstance, HeroTemplate};
//! use soulforge_core::ids::{HeroId, TemplateId};
//! use soulforge_core::tables::{Attribute, Faction, HeroRarity, Role};
//!
//! let template = HeroTemplate::new(
//!     TemplateId::new(1),
//!     "Kenpachi",
//!     Faction::Shinigami,
//!     Attribute::Power,
//!     Role::Berserker,
//!     HeroRarity::Legendary,
//! );
//! let hero = HeroInstance::new(HeroId::new(1), template);
//!
//! assert_eq!(hero.level, 1);
//! assert_eq!(hero.template.role(), Some(Role::Berserker));
//! ```

use serde::{Deserialize, Serialize};

use crate::ids::{EquipmentId, HeroId, TemplateId};
use crate::tables::hero::{
    self, enhancement_multiplier, star_multiplier, BASE_ACCURACY, BASE_CRIT_DAMAGE,
    BASE_CRIT_RATE, BASE_EVASION,
};
use crate::tables::{round_half_up, Attribute, BaseStats, Faction, HeroRarity, Position, Role, SlotType};

// =============================================================================
// Template
// =============================================================================

/// Immutable hero content definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroTemplate {
    /// Template id.
    pub id: TemplateId,
    /// Display name.
    pub name: String,
    faction: u8,
    attribute: u8,
    role: u8,
    rarity: u8,
    /// Base stat quintet.
    pub base: BaseStats,
}

impl HeroTemplate {
    /// Creates a well-formed template whose base stats come from the role row.
    #[must_use]
    pub fn new(
        id: TemplateId,
        name: impl Into<String>,
        faction: Faction,
        attribute: Attribute,
        role: Role,
        rarity: HeroRarity,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            faction: faction.code(),
            attribute: attribute.code(),
            role: role.code(),
            rarity: rarity.code(),
            base: BaseStats::for_role(role),
        }
    }

    /// Creates a template from raw stored codes. Unknown codes are kept as-is.
    #[must_use]
    pub fn from_codes(
        id: TemplateId,
        name: impl Into<String>,
        codes: [u8; 4],
        base: BaseStats,
    ) -> Self {
        let [faction, attribute, role, rarity] = codes;
        Self {
            id,
            name: name.into(),
            faction,
            attribute,
            role,
            rarity,
            base,
        }
    }

    /// Faction, `None` for an unknown code.
    #[must_use]
    pub fn faction(&self) -> Option<Faction> {
        Faction::from_code(self.faction)
    }

    /// Attribute, `None` for an unknown code.
    #[must_use]
    pub fn attribute(&self) -> Option<Attribute> {
        Attribute::from_code(self.attribute)
    }

    /// Role, `None` for an unknown code.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        Role::from_code(self.role)
    }

    /// Rarity, `None` for an unknown code.
    #[must_use]
    pub fn rarity(&self) -> Option<HeroRarity> {
        HeroRarity::from_code(self.rarity)
    }

    /// Raw `[faction, attribute, role, rarity]` codes as stored.
    #[must_use]
    pub fn codes(&self) -> [u8; 4] {
        [self.faction, self.attribute, self.role, self.rarity]
    }

    /// Catalogue power of this template at a given star and enhancement grade.
    ///
    /// Used for sorting summon pools; combat uses [`crate::stats::HeroStats`].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn power_rating(&self, stars: u8, enhancement: u8) -> i64 {
        let base = hero::power_of(self.base.hp, self.base.atk, self.base.def, self.base.speed);
        let rarity = self.rarity().map_or(1.0, HeroRarity::multiplier);
        round_half_up(
            base as f64 * rarity * star_multiplier(stars) * enhancement_multiplier(enhancement),
        )
    }
}

// =============================================================================
// Instance
// =============================================================================

/// A player-owned hero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroInstance {
    /// Hero id.
    pub id: HeroId,
    /// Joined template.
    pub template: HeroTemplate,
    /// Level, 1..=100.
    pub level: u32,
    /// Star grade, 1..=5.
    pub stars: u8,
    /// Enhancement, 0..=9.
    pub enhancement: u8,
    /// Accumulated experience.
    pub experience: u64,
    /// Personal crit rate.
    pub crit_rate: f64,
    /// Personal crit damage multiplier.
    pub crit_damage: f64,
    /// Personal accuracy.
    pub accuracy: f64,
    /// Personal evasion.
    pub evasion: f64,
    /// Marked as favorite by the player.
    pub favorite: bool,
    /// Formation slot, [`Position::Bench`] when not deployed.
    pub position: Position,
    equipped: [Option<EquipmentId>; SlotType::COUNT],
}

impl HeroInstance {
    /// A freshly obtained hero: level 1, one star, no enhancement, benched.
    #[must_use]
    pub fn new(id: HeroId, template: HeroTemplate) -> Self {
        Self {
            id,
            template,
            level: 1,
            stars: 1,
            enhancement: 0,
            experience: 0,
            crit_rate: BASE_CRIT_RATE,
            crit_damage: BASE_CRIT_DAMAGE,
            accuracy: BASE_ACCURACY,
            evasion: BASE_EVASION,
            favorite: false,
            position: Position::Bench,
            equipped: [None; SlotType::COUNT],
        }
    }

    /// Item equipped in `slot`.
    #[must_use]
    pub fn equipped_in(&self, slot: SlotType) -> Option<EquipmentId> {
        self.equipped[slot.index()]
    }

    /// Sets the item in `slot`, returning the previous occupant.
    pub fn set_equipped(&mut self, slot: SlotType, item: Option<EquipmentId>) -> Option<EquipmentId> {
        std::mem::replace(&mut self.equipped[slot.index()], item)
    }

    /// Ids of every equipped item, in slot order.
    pub fn equipped_items(&self) -> impl Iterator<Item = EquipmentId> + '_ {
        self.equipped.iter().flatten().copied()
    }

    /// Clears whichever slot holds `item`. Returns true if one did.
    pub fn clear_item(&mut self, item: EquipmentId) -> bool {
        match self.equipped.iter_mut().find(|slot| **slot == Some(item)) {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    /// Convenience accessor for the template's role.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.template.role()
    }

    /// Convenience accessor for the template's faction.
    #[must_use]
    pub fn faction(&self) -> Option<Faction> {
        self.template.faction()
    }

    /// Convenience accessor for the template's attribute.
    #[must_use]
    pub fn attribute(&self) -> Option<Attribute> {
        self.template.attribute()
    }

    /// Display name from the template.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.template.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tank_template() -> HeroTemplate {
        HeroTemplate::new(
            TemplateId::new(1),
            "Sado",
            Faction::Human,
            Attribute::Soul,
            Role::Tank,
            HeroRarity::Epic,
        )
    }

    mod template_tests {
        use super::*;

        #[test]
        fn typed_accessors() {
            let t = tank_template();
            assert_eq!(t.faction(), Some(Faction::Human));
            assert_eq!(t.attribute(), Some(Attribute::Soul));
            assert_eq!(t.role(), Some(Role::Tank));
            assert_eq!(t.rarity(), Some(HeroRarity::Epic));
            assert_eq!(t.base.hp, 1500);
        }

        #[test]
        fn corrupted_codes_resolve_to_none() {
            let t = HeroTemplate::from_codes(TemplateId::new(2), "Glitch", [9, 0, 12, 7], BaseStats::ZERO);
            assert_eq!(t.faction(), None);
            assert_eq!(t.attribute(), None);
            assert_eq!(t.role(), None);
            assert_eq!(t.rarity(), None);
            assert_eq!(t.codes(), [9, 0, 12, 7]);
        }

        #[test]
        fn power_rating_scales_with_rarity_and_growth() {
            let t = tank_template();
            // round(1330 × 1.6)
            assert_eq!(t.power_rating(1, 0), 2128);
            assert!(t.power_rating(2, 0) > t.power_rating(1, 0));
            assert!(t.power_rating(1, 1) > t.power_rating(1, 0));
        }
    }

    mod instance_tests {
        use super::*;

        #[test]
        fn new_hero_defaults() {
            let hero = HeroInstance::new(HeroId::new(3), tank_template());
            assert_eq!(hero.stars, 1);
            assert_eq!(hero.enhancement, 0);
            assert_eq!(hero.position, Position::Bench);
            assert!((hero.crit_damage - 1.5).abs() < 0.0001);
            assert_eq!(hero.equipped_items().count(), 0);
        }

        #[test]
        fn one_item_per_slot() {
            let mut hero = HeroInstance::new(HeroId::new(3), tank_template());
            assert_eq!(hero.set_equipped(SlotType::Weapon, Some(EquipmentId::new(1))), None);
            assert_eq!(
                hero.set_equipped(SlotType::Weapon, Some(EquipmentId::new(2))),
                Some(EquipmentId::new(1))
            );
            hero.set_equipped(SlotType::Boots, Some(EquipmentId::new(5)));
            let ids: Vec<_> = hero.equipped_items().collect();
            assert_eq!(ids, vec![EquipmentId::new(2), EquipmentId::new(5)]);

            assert!(hero.clear_item(EquipmentId::new(5)));
            assert!(!hero.clear_item(EquipmentId::new(5)));
            assert_eq!(hero.equipped_in(SlotType::Boots), None);
        }
    }
}
