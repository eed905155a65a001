//! Inventory and roster queries.
//!
//! Filters are plain structs with builder methods; an unset field matches
//! everything. Sorting is stable, so records that compare equal keep the
//! store's id order.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::equipment::EquipmentItem;
use crate::hero::HeroInstance;
use crate::tables::{EquipmentRarity, EquipmentSet, Faction, HeroRarity, Role, SlotType};

// =============================================================================
// Equipment
// =============================================================================

/// Which items [`crate::engine::Engine::search_equipment`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentFilter {
    /// Only this slot.
    pub slot: Option<SlotType>,
    /// Only this rarity.
    pub rarity: Option<EquipmentRarity>,
    /// Only this set.
    pub set: Option<EquipmentSet>,
    /// Only items with at least this power rating.
    pub min_power: Option<i64>,
    /// Skip items worn by a hero.
    pub only_unequipped: bool,
}

impl EquipmentFilter {
    /// Filter matching every item.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to `slot`.
    #[must_use]
    pub fn slot(mut self, slot: SlotType) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Restricts to `rarity`.
    #[must_use]
    pub fn rarity(mut self, rarity: EquipmentRarity) -> Self {
        self.rarity = Some(rarity);
        self
    }

    /// Restricts to `set`.
    #[must_use]
    pub fn set(mut self, set: EquipmentSet) -> Self {
        self.set = Some(set);
        self
    }

    /// Restricts to items of at least `power`.
    #[must_use]
    pub fn min_power(mut self, power: i64) -> Self {
        self.min_power = Some(power);
        self
    }

    /// Skips equipped items.
    #[must_use]
    pub fn unequipped(mut self) -> Self {
        self.only_unequipped = true;
        self
    }

    /// Whether `item` passes every set criterion.
    #[must_use]
    pub fn matches(&self, item: &EquipmentItem) -> bool {
        self.slot.map_or(true, |slot| item.slot == slot)
            && self.rarity.map_or(true, |rarity| item.rarity == rarity)
            && self.set.map_or(true, |set| item.set == set)
            && self.min_power.map_or(true, |power| item.power_rating >= power)
            && !(self.only_unequipped && item.is_equipped())
    }
}

/// Ordering of an item list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquipmentSort {
    /// Highest power rating first.
    #[default]
    Power,
    /// Highest rarity first.
    Rarity,
    /// Slot code order.
    Slot,
    /// Highest enhancement first.
    Enhancement,
    /// Most recently created first (highest id).
    Newest,
}

/// Sorts `items` in place.
pub fn sort_equipment(items: &mut [EquipmentItem], by: EquipmentSort) {
    match by {
        EquipmentSort::Power => items.sort_by_key(|item| Reverse(item.power_rating)),
        EquipmentSort::Rarity => items.sort_by_key(|item| Reverse(item.rarity)),
        EquipmentSort::Slot => items.sort_by_key(|item| item.slot),
        EquipmentSort::Enhancement => items.sort_by_key(|item| Reverse(item.enhancement)),
        EquipmentSort::Newest => items.sort_by_key(|item| Reverse(item.id)),
    }
}

// =============================================================================
// Heroes
// =============================================================================

/// Which heroes [`crate::engine::Engine::search_heroes`] returns.
///
/// Heroes whose stored code is unknown never match a set criterion on that
/// code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroFilter {
    /// Only this faction.
    pub faction: Option<Faction>,
    /// Only this rarity.
    pub rarity: Option<HeroRarity>,
    /// Only this role.
    pub role: Option<Role>,
    /// Only favorites.
    pub favorites_only: bool,
}

impl HeroFilter {
    /// Filter matching every hero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to `faction`.
    #[must_use]
    pub fn faction(mut self, faction: Faction) -> Self {
        self.faction = Some(faction);
        self
    }

    /// Restricts to `rarity`.
    #[must_use]
    pub fn rarity(mut self, rarity: HeroRarity) -> Self {
        self.rarity = Some(rarity);
        self
    }

    /// Restricts to `role`.
    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Restricts to favorites.
    #[must_use]
    pub fn favorites(mut self) -> Self {
        self.favorites_only = true;
        self
    }

    /// Whether `hero` passes every set criterion.
    #[must_use]
    pub fn matches(&self, hero: &HeroInstance) -> bool {
        self.faction.map_or(true, |f| hero.faction() == Some(f))
            && self.rarity.map_or(true, |r| hero.template.rarity() == Some(r))
            && self.role.map_or(true, |r| hero.role() == Some(r))
            && (!self.favorites_only || hero.favorite)
    }
}

/// Ordering of a hero list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeroSort {
    /// Highest catalogue power first.
    Power,
    /// Highest level first.
    Level,
    /// Highest rarity code first.
    Rarity,
    /// Name, ascending.
    Name,
    /// Most recently obtained first (highest id).
    #[default]
    Newest,
}

/// Catalogue power of an owned hero, equipment excluded.
#[must_use]
pub fn hero_power(hero: &HeroInstance) -> i64 {
    hero.template.power_rating(hero.stars, hero.enhancement)
}

/// Sorts `heroes` in place.
pub fn sort_heroes(heroes: &mut [HeroInstance], by: HeroSort) {
    match by {
        HeroSort::Power => heroes.sort_by_key(|h| Reverse(hero_power(h))),
        HeroSort::Level => heroes.sort_by_key(|h| Reverse(h.level)),
        HeroSort::Rarity => heroes.sort_by_key(|h| Reverse(h.template.codes()[3])),
        HeroSort::Name => heroes.sort_by(|a, b| a.name().cmp(b.name())),
        HeroSort::Newest => heroes.sort_by_key(|h| Reverse(h.id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::lifecycle;
    use crate::hero::HeroTemplate;
    use crate::ids::{EquipmentId, HeroId, TemplateId};
    use crate::tables::Attribute;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn item(id: u64, rarity: EquipmentRarity, slot: SlotType, enhancement: u8) -> EquipmentItem {
        let mut rng = ChaCha8Rng::seed_from_u64(id);
        let mut item = lifecycle::generate(EquipmentId::new(id), rarity, rarity, 1, &mut rng);
        item.slot = slot;
        item.set = EquipmentSet::None;
        item.enhancement = enhancement;
        item.refresh_power();
        item
    }

    fn hero(id: u64, name: &str, faction: Faction, rarity: HeroRarity, level: u32) -> HeroInstance {
        let template = HeroTemplate::new(TemplateId::new(id), name, faction, Attribute::Heart, Role::Tank, rarity);
        let mut hero = HeroInstance::new(HeroId::new(id), template);
        hero.level = level;
        hero
    }

    mod equipment_tests {
        use super::*;

        #[test]
        fn empty_filter_matches_everything() {
            let mut worn = item(1, EquipmentRarity::Red, SlotType::Boots, 0);
            worn.equipped_by = Some(HeroId::new(1));
            assert!(EquipmentFilter::new().matches(&worn));
            assert!(!EquipmentFilter::new().unequipped().matches(&worn));
        }

        #[test]
        fn criteria_combine() {
            let blue = item(1, EquipmentRarity::Blue, SlotType::Weapon, 0);
            let filter = EquipmentFilter::new().slot(SlotType::Weapon).rarity(EquipmentRarity::Blue);
            assert!(filter.matches(&blue));
            assert!(!filter.slot(SlotType::Armor).matches(&blue));
            assert!(!filter.set(EquipmentSet::Vizard).matches(&blue));
            assert!(!filter.min_power(blue.power_rating + 1).matches(&blue));
            assert!(filter.min_power(blue.power_rating).matches(&blue));
        }

        #[test]
        fn sorts_are_stable() {
            let mut items = vec![
                item(1, EquipmentRarity::Green, SlotType::Helmet, 3),
                item(2, EquipmentRarity::Orange, SlotType::Weapon, 0),
                item(3, EquipmentRarity::Green, SlotType::Armor, 3),
            ];

            sort_equipment(&mut items, EquipmentSort::Rarity);
            let ids: Vec<_> = items.iter().map(|i| i.id.as_u64()).collect();
            assert_eq!(ids, vec![2, 1, 3]);

            sort_equipment(&mut items, EquipmentSort::Slot);
            let ids: Vec<_> = items.iter().map(|i| i.id.as_u64()).collect();
            assert_eq!(ids, vec![2, 3, 1]);

            sort_equipment(&mut items, EquipmentSort::Newest);
            let ids: Vec<_> = items.iter().map(|i| i.id.as_u64()).collect();
            assert_eq!(ids, vec![3, 2, 1]);

            sort_equipment(&mut items, EquipmentSort::Enhancement);
            let ids: Vec<_> = items.iter().map(|i| i.id.as_u64()).collect();
            assert_eq!(ids, vec![3, 1, 2]);

            sort_equipment(&mut items, EquipmentSort::Power);
            assert!(items.windows(2).all(|w| w[0].power_rating >= w[1].power_rating));
        }
    }

    mod hero_tests {
        use super::*;

        #[test]
        fn unknown_codes_never_match() {
            let template = HeroTemplate::from_codes(
                TemplateId::new(9),
                "corrupt",
                [0, 0, 0, 0],
                crate::tables::BaseStats::ZERO,
            );
            let corrupt = HeroInstance::new(HeroId::new(9), template);
            assert!(HeroFilter::new().matches(&corrupt));
            assert!(!HeroFilter::new().faction(Faction::Human).matches(&corrupt));
            assert!(!HeroFilter::new().rarity(HeroRarity::Common).matches(&corrupt));
        }

        #[test]
        fn favorites_filter() {
            let mut a = hero(1, "Ichigo", Faction::Human, HeroRarity::Epic, 1);
            let b = hero(2, "Orihime", Faction::Human, HeroRarity::Rare, 1);
            a.favorite = true;
            let filter = HeroFilter::new().favorites();
            assert!(filter.matches(&a));
            assert!(!filter.matches(&b));
        }

        #[test]
        fn sorts() {
            let mut heroes = vec![
                hero(1, "Uryu", Faction::Quincy, HeroRarity::Rare, 30),
                hero(2, "Chad", Faction::Human, HeroRarity::Mythic, 10),
                hero(3, "Kisuke", Faction::Shinigami, HeroRarity::Rare, 50),
            ];

            sort_heroes(&mut heroes, HeroSort::Level);
            let ids: Vec<_> = heroes.iter().map(|h| h.id.as_u64()).collect();
            assert_eq!(ids, vec![3, 1, 2]);

            sort_heroes(&mut heroes, HeroSort::Name);
            let names: Vec<_> = heroes.iter().map(HeroInstance::name).collect();
            assert_eq!(names, vec!["Chad", "Kisuke", "Uryu"]);

            sort_heroes(&mut heroes, HeroSort::Rarity);
            assert_eq!(heroes[0].id, HeroId::new(2));

            sort_heroes(&mut heroes, HeroSort::Power);
            assert_eq!(heroes[0].id, HeroId::new(2));
            assert!(heroes.windows(2).all(|w| hero_power(&w[0]) >= hero_power(&w[1])));
        }
    }
}
