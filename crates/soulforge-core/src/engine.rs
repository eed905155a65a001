//! The engine facade: every externally exposed operation.
//!
//! [`Engine`] ties the pure components to the collaborators. It resolves ids
//! through a [`GameStore`], composes stats through the [`StatCompositor`],
//! runs crafting with one seeded [`ChaCha8Rng`], and writes each operation's
//! changes back as a single [`StoreWrite`] batch.
//!
//! # Caching
//!
//! Composed stats and hero loadouts are memoized in a [`ComputationCache`].
//! Every mutation invalidates the entries it affects before returning, and a
//! change to a deployed hero also drops every formation-dependent stat block.
//!
//! # Determinism
//!
//! Stat computation never consumes randomness. Crafting, targeting and turn
//! order draw from the engine RNG, seeded from [`EngineConfig::seed`], so two
//! engines with equal seeds and equal call sequences produce equal items.
//!
//! # Example
//!
//! ```
//! use soulforge_core::engine::Engine;
//! use soulforge_core::config::EngineConfig;
//! use soulforge_core::store::{GameStore, InMemoryStore, Unmetered};
//! use soulforge_core::tables::EquipmentRarity;
//!
//! let engine = Engine::new(InMemoryStore::new(20), Unmetered, EngineConfig::with_seed(7));
//! let item = engine
//!     .generate_equipment(EquipmentRarity::Blue, EquipmentRarity::Blue, 10)
//!     .unwrap();
//! engine.enhance_equipment(item.id).unwrap();
//!
//! assert_eq!(engine.store().equipment(item.id).unwrap().enhancement, 1);
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::ComputationCache;
use crate::config::EngineConfig;
use crate::equipment::{lifecycle, EquipmentBonusResolver, EquipmentItem, MeltOutcome, MeltRejection, ReforgeOutcome};
use crate::error::{EngineError, Result};
use crate::formation::{FormationOptimizer, FormationSuggestion, FormationValidation, TurnEntry};
use crate::hero::HeroInstance;
use crate::ids::{EquipmentId, HeroId};
use crate::query::{self, EquipmentFilter, EquipmentSort, HeroFilter, HeroSort};
use crate::stats::{Combatant, ComputeOptions, HeroStats, StatCompositor};
use crate::store::{Economy, GameStore, StoreWrite};
use crate::synergy::{FormationAnalysis, SynergyAnalyzer};
use crate::tables::equipment::{equipment_upgrade_cost, MAX_EQUIPMENT_ENHANCEMENT};
use crate::tables::hero::{
    available_team_slots, exp_required_for_level, hero_upgrade_cost, star_upgrade_shards, MAX_HERO_ENHANCEMENT,
    MAX_HERO_LEVEL, MAX_STARS,
};
use crate::tables::{EquipmentRarity, Faction, HeroRarity, Position, Role, SlotType};
use crate::targeting::{TargetMode, TargetingEngine};

// =============================================================================
// Results
// =============================================================================

/// Outcome of [`Engine::add_experience`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    /// Hero that gained experience.
    pub hero: HeroId,
    /// Levels gained by this call.
    pub levels_gained: u32,
    /// Level after the call.
    pub new_level: u32,
}

impl LevelUp {
    /// At least one level was gained.
    #[must_use]
    pub fn leveled_up(&self) -> bool {
        self.levels_gained > 0
    }
}

/// Outcome of [`Engine::upgrade_stars`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarUpgrade {
    /// Star grade after the upgrade.
    pub new_stars: u8,
    /// Shards the upgrade consumes; the host deducts them.
    pub shards_required: u32,
}

/// Summary of the hero collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Owned heroes.
    pub total_heroes: usize,
    /// Heroes marked favorite.
    pub favorite_heroes: usize,
    /// Heroes at the level cap.
    pub max_level_heroes: usize,
    /// Sum of every hero's power with equipment, without team synergy.
    pub total_power: i64,
    /// Head count per [`HeroRarity::index`].
    pub by_rarity: [usize; HeroRarity::COUNT],
    /// Head count per [`Faction::index`].
    pub by_faction: [usize; Faction::COUNT],
    /// Head count per [`Role::index`].
    pub by_role: [usize; Role::COUNT],
}

/// Summary of the equipment inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStats {
    /// Owned items.
    pub total_items: usize,
    /// Items worn by a hero.
    pub equipped_items: usize,
    /// Locked items.
    pub locked_items: usize,
    /// Sum of item power ratings.
    pub total_power: i64,
    /// Item count per [`EquipmentRarity::index`].
    pub by_rarity: [usize; EquipmentRarity::COUNT],
    /// Item count per [`SlotType::index`].
    pub by_slot: [usize; SlotType::COUNT],
}

// =============================================================================
// Engine
// =============================================================================

/// Service object exposing the rules engine over a store and an economy.
pub struct Engine<S, E> {
    store: S,
    economy: E,
    config: EngineConfig,
    cache: ComputationCache,
    rng: Mutex<ChaCha8Rng>,
    compositor: StatCompositor,
    resolver: EquipmentBonusResolver,
    analyzer: SynergyAnalyzer,
    targeting: TargetingEngine,
    optimizer: FormationOptimizer,
}

impl<S, E> fmt::Debug for Engine<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl<S: GameStore, E: Economy> Engine<S, E> {
    /// Creates an engine with an empty cache and the RNG seeded from
    /// `config`.
    #[must_use]
    pub fn new(store: S, economy: E, config: EngineConfig) -> Self {
        Self {
            cache: ComputationCache::new(config.hero_stats_ttl(), config.equipment_ttl()),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(config.seed)),
            store,
            economy,
            config,
            compositor: StatCompositor::new(),
            resolver: EquipmentBonusResolver::new(),
            analyzer: SynergyAnalyzer::new(),
            targeting: TargetingEngine::new(),
            optimizer: FormationOptimizer::new(),
        }
    }

    /// The storage collaborator.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The economy collaborator.
    #[must_use]
    pub fn economy(&self) -> &E {
        &self.economy
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Memoized results.
    #[must_use]
    pub fn cache(&self) -> &ComputationCache {
        &self.cache
    }

    fn rng(&self) -> MutexGuard<'_, ChaCha8Rng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn hero(&self, id: HeroId) -> Result<HeroInstance> {
        self.store.hero(id).ok_or_else(|| EngineError::hero_not_found(id))
    }

    fn item(&self, id: EquipmentId) -> Result<EquipmentItem> {
        self.store.equipment(id).ok_or_else(|| EngineError::equipment_not_found(id))
    }

    /// Drops cached results that depend on `hero`.
    fn invalidate(&self, hero: &HeroInstance) {
        self.cache.invalidate_hero(hero.id);
        if hero.position.is_deployed() {
            self.cache.invalidate_formation();
        }
    }

    // -------------------------------------------------------------------------
    // Stats
    // -------------------------------------------------------------------------

    fn loadout(&self, hero: &HeroInstance, generation: u64) -> Vec<EquipmentItem> {
        if let Some(items) = self.cache.loadouts().get(&hero.id) {
            return items;
        }
        let items = self.store.equipment_of(hero);
        self.cache.insert_loadout(hero.id, items.clone(), generation);
        items
    }

    fn stats_of(&self, hero: &HeroInstance, options: ComputeOptions, generation: u64) -> HeroStats {
        let key = (hero.id, options);
        if let Some(stats) = self.cache.stats().get(&key) {
            debug!(hero = %hero.id, "stats cache hit");
            return stats;
        }

        let equipment = if options.include_equipment {
            self.loadout(hero, generation)
        } else {
            Vec::new()
        };
        let team = if options.include_formation_synergy {
            self.store.active_formation()
        } else {
            Vec::new()
        };

        let stats = self.compositor.compose(hero, &equipment, &team, options);
        self.cache.insert_stats(key, stats.clone(), generation);
        stats
    }

    /// Final combat stats of a hero.
    ///
    /// Repeated calls with no mutation in between return identical results.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown hero.
    pub fn compute_stats(&self, hero: HeroId, options: ComputeOptions) -> Result<HeroStats> {
        let generation = self.cache.generation();
        let hero = self.hero(hero)?;
        Ok(self.stats_of(&hero, options, generation))
    }

    /// [`Self::compute_stats`] for many heroes in parallel, results in input
    /// order.
    pub fn compute_many(&self, heroes: &[HeroId], options: ComputeOptions) -> Vec<Result<HeroStats>> {
        heroes.par_iter().map(|&id| self.compute_stats(id, options)).collect()
    }

    fn combatants(&self, ids: &[HeroId], options: ComputeOptions) -> Result<Vec<Combatant>> {
        let generation = self.cache.generation();
        ids.iter()
            .map(|&id| {
                let hero = self.hero(id)?;
                let stats = self.stats_of(&hero, options, generation);
                Ok(Combatant::new(hero, stats))
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Equipment lifecycle
    // -------------------------------------------------------------------------

    fn ensure_capacity(&self, incoming: usize) -> Result<()> {
        let held = self.store.inventory().len();
        if held + incoming > self.config.inventory_capacity {
            warn!(held, incoming, capacity = self.config.inventory_capacity, "inventory full");
            return Err(EngineError::InvalidState(format!(
                "inventory full: {held}/{}",
                self.config.inventory_capacity
            )));
        }
        Ok(())
    }

    /// Generates and stores one item with rarity in `[min, max]`.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] when the inventory is full;
    /// [`EngineError::Storage`] when the insert fails.
    pub fn generate_equipment(&self, min: EquipmentRarity, max: EquipmentRarity, level: u32) -> Result<EquipmentItem> {
        self.ensure_capacity(1)?;
        let id = self.store.allocate_equipment_id();
        let item = lifecycle::generate(id, min, max, level, &mut *self.rng());
        self.store.commit(vec![StoreWrite::InsertEquipment(item.clone())])?;
        info!(item = %item.id, rarity = %item.rarity, slot = %item.slot, "generated equipment");
        Ok(item)
    }

    /// Rolls and stores `quantity` loot drops.
    ///
    /// # Errors
    ///
    /// As [`Self::generate_equipment`]. Either every drop is stored or none.
    pub fn generate_loot(&self, level: u32, quantity: usize, guarantee_rare: bool) -> Result<Vec<EquipmentItem>> {
        self.ensure_capacity(quantity)?;
        let items = lifecycle::generate_loot(
            level,
            quantity,
            guarantee_rare,
            || self.store.allocate_equipment_id(),
            &mut *self.rng(),
        );
        self.store
            .commit(items.iter().cloned().map(StoreWrite::InsertEquipment).collect())?;
        info!(count = items.len(), guarantee_rare, "generated loot");
        Ok(items)
    }

    /// Gold cost of the item's next enhancement.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`]; [`EngineError::InvalidState`] at +9.
    pub fn equipment_upgrade_cost(&self, item: EquipmentId) -> Result<u64> {
        let item = self.item(item)?;
        if item.enhancement >= MAX_EQUIPMENT_ENHANCEMENT {
            return Err(EngineError::InvalidState(format!(
                "equipment {} is already at +{MAX_EQUIPMENT_ENHANCEMENT}",
                item.id
            )));
        }
        Ok(equipment_upgrade_cost(item.rarity, item.enhancement))
    }

    /// Spends `cost` and applies `writes`. A failed commit refunds the gold.
    fn charge_and_commit(&self, cost: u64, writes: Vec<StoreWrite>) -> Result<()> {
        self.economy.spend_gold(cost)?;
        if let Err(err) = self.store.commit(writes) {
            self.economy.refund_gold(cost);
            warn!(cost, error = %err, "commit failed, gold refunded");
            return Err(err);
        }
        Ok(())
    }

    /// Drops the cached loadout and stats of the item's wearer, if any.
    fn invalidate_wearer(&self, item: &EquipmentItem) {
        if let Some(owner) = item.equipped_by {
            match self.store.hero(owner) {
                Some(hero) => self.invalidate(&hero),
                None => self.cache.invalidate_hero(owner),
            }
        }
    }

    /// Raises an item by one enhancement level, paying its gold cost.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`]; [`EngineError::InvalidState`] at +9;
    /// [`EngineError::InsufficientResources`] when the economy refuses.
    pub fn enhance_equipment(&self, item: EquipmentId) -> Result<EquipmentItem> {
        let cost = self.equipment_upgrade_cost(item)?;
        let mut item = self.item(item)?;
        if !self.economy.has_gold(cost) {
            warn!(item = %item.id, cost, "cannot afford enhancement");
            return Err(EngineError::InsufficientResources { required: cost });
        }
        lifecycle::enhance(&mut item)?;
        self.charge_and_commit(cost, vec![StoreWrite::PutEquipment(item.clone())])?;
        self.invalidate_wearer(&item);
        info!(item = %item.id, enhancement = item.enhancement, cost, "enhanced equipment");
        Ok(item)
    }

    /// Attempts a reforge. The gold cost is paid whether or not the roll
    /// succeeds; gem cost is reported for the host.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`]; [`EngineError::InvalidState`] for a rarity
    /// that cannot be reforged; [`EngineError::InsufficientResources`].
    pub fn reforge_equipment(&self, item: EquipmentId) -> Result<ReforgeOutcome> {
        let mut item = self.item(item)?;
        let cost = item.rarity.reforge_gold();
        if item.rarity.is_salvageable() && !self.economy.has_gold(cost) {
            warn!(item = %item.id, cost, "cannot afford reforge");
            return Err(EngineError::InsufficientResources { required: cost });
        }
        let outcome = lifecycle::reforge(&mut item, &mut *self.rng())?;
        if outcome.succeeded {
            self.charge_and_commit(outcome.gold_cost, vec![StoreWrite::PutEquipment(item.clone())])?;
            self.invalidate_wearer(&item);
        } else {
            self.economy.spend_gold(outcome.gold_cost)?;
        }
        info!(item = %item.id, succeeded = outcome.succeeded, bumped = outcome.bumped, "reforged equipment");
        Ok(outcome)
    }

    /// Melts five items into one to three items of the next rarity.
    ///
    /// Validation failures, unknown ids included, are returned as
    /// [`MeltOutcome::Rejected`] with nothing consumed. On success the inputs
    /// are deleted and the crafted items inserted in one batch.
    ///
    /// # Errors
    ///
    /// [`EngineError::Storage`] when the batch fails; nothing is applied.
    pub fn melt_equipment(&self, items: &[EquipmentId]) -> Result<MeltOutcome> {
        let inputs: std::result::Result<Vec<_>, _> = items
            .iter()
            .map(|&id| self.store.equipment(id).ok_or(MeltRejection::Missing(id)))
            .collect();
        let inputs = match inputs {
            Ok(inputs) => inputs,
            Err(rejection) => {
                warn!(%rejection, "melt rejected");
                return Ok(MeltOutcome::Rejected(rejection));
            }
        };

        let outcome = lifecycle::melt(
            &inputs,
            self.config.melt_output_level,
            || self.store.allocate_equipment_id(),
            &mut *self.rng(),
        );

        match &outcome {
            MeltOutcome::Crafted { consumed, crafted } => {
                let writes = consumed
                    .iter()
                    .map(|&id| StoreWrite::DeleteEquipment(id))
                    .chain(crafted.iter().cloned().map(StoreWrite::InsertEquipment))
                    .collect();
                self.store.commit(writes)?;
                info!(consumed = consumed.len(), crafted = crafted.len(), "melted equipment");
            }
            MeltOutcome::Rejected(rejection) => warn!(%rejection, "melt rejected"),
        }
        Ok(outcome)
    }

    /// Puts `item` on `hero`, unequipping whatever held the slot.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`]; [`EngineError::InvalidState`] when the item
    /// is worn by another hero or its set is restricted to another faction.
    pub fn equip(&self, item: EquipmentId, hero: HeroId) -> Result<()> {
        let mut item = self.item(item)?;
        let mut hero = self.hero(hero)?;

        match item.equipped_by {
            Some(owner) if owner == hero.id && hero.equipped_in(item.slot) == Some(item.id) => return Ok(()),
            Some(owner) if owner != hero.id => {
                return Err(EngineError::InvalidState(format!(
                    "equipment {} is already equipped by hero {owner}",
                    item.id
                )));
            }
            _ => {}
        }
        if !item.can_be_equipped_by(&hero) {
            return Err(EngineError::InvalidState(format!(
                "{} set cannot be equipped by {}",
                item.set,
                hero.name()
            )));
        }

        let mut writes = Vec::with_capacity(3);
        if let Some(previous) = hero.set_equipped(item.slot, Some(item.id)) {
            match self.store.equipment(previous) {
                Some(mut old) => {
                    old.equipped_by = None;
                    writes.push(StoreWrite::PutEquipment(old));
                }
                None => warn!(hero = %hero.id, item = %previous, "replaced item is missing"),
            }
        }
        item.equipped_by = Some(hero.id);
        writes.push(StoreWrite::PutEquipment(item.clone()));
        writes.push(StoreWrite::PutHero(hero.clone()));

        self.store.commit(writes)?;
        self.invalidate(&hero);
        info!(item = %item.id, hero = %hero.id, slot = %item.slot, "equipped");
        Ok(())
    }

    /// Takes `item` off its wearer. Unequipping a free item is a no-op.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`]; [`EngineError::Storage`].
    pub fn unequip(&self, item: EquipmentId) -> Result<()> {
        let mut item = self.item(item)?;
        let Some(owner) = item.equipped_by else {
            return Ok(());
        };

        let mut writes = Vec::with_capacity(2);
        let wearer = self.store.hero(owner);
        if let Some(mut hero) = wearer.clone() {
            hero.clear_item(item.id);
            writes.push(StoreWrite::PutHero(hero));
        } else {
            warn!(item = %item.id, hero = %owner, "wearer is missing");
        }
        item.equipped_by = None;
        writes.push(StoreWrite::PutEquipment(item.clone()));

        self.store.commit(writes)?;
        match wearer {
            Some(hero) => self.invalidate(&hero),
            None => self.cache.invalidate_hero(owner),
        }
        info!(item = %item.id, hero = %owner, "unequipped");
        Ok(())
    }

    /// Sets the item's lock flag.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`]; [`EngineError::Storage`].
    pub fn lock_equipment(&self, item: EquipmentId, locked: bool) -> Result<()> {
        let mut item = self.item(item)?;
        if item.locked == locked {
            return Ok(());
        }
        item.locked = locked;
        self.store.commit(vec![StoreWrite::PutEquipment(item.clone())])?;
        self.invalidate_wearer(&item);
        info!(item = %item.id, locked, "changed lock");
        Ok(())
    }

    /// Deletes an unequipped, unlocked item.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`]; [`EngineError::InvalidState`] when the item
    /// is equipped or locked.
    pub fn delete_equipment(&self, item: EquipmentId) -> Result<()> {
        let item = self.item(item)?;
        if item.is_equipped() {
            return Err(EngineError::InvalidState(format!("equipment {} is equipped", item.id)));
        }
        if item.locked {
            return Err(EngineError::InvalidState(format!("equipment {} is locked", item.id)));
        }
        self.store.commit(vec![StoreWrite::DeleteEquipment(item.id)])?;
        info!(item = %item.id, "deleted equipment");
        Ok(())
    }

    /// Deletes several items in one batch. If any id is unknown, repeated,
    /// equipped or locked, nothing is deleted. Returns the number deleted.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown id;
    /// [`EngineError::InvalidState`] for a repeated, equipped or locked item;
    /// [`EngineError::Storage`] when the batch fails.
    pub fn delete_equipment_many(&self, items: &[EquipmentId]) -> Result<usize> {
        let mut seen = BTreeSet::new();
        for &id in items {
            if !seen.insert(id) {
                return Err(EngineError::InvalidState(format!("equipment {id} listed twice")));
            }
            let item = self.item(id)?;
            if item.is_equipped() {
                return Err(EngineError::InvalidState(format!("equipment {id} is equipped")));
            }
            if item.locked {
                return Err(EngineError::InvalidState(format!("equipment {id} is locked")));
            }
        }
        self.store
            .commit(items.iter().map(|&id| StoreWrite::DeleteEquipment(id)).collect())?;
        info!(count = items.len(), "deleted equipment batch");
        Ok(items.len())
    }

    /// Inventory items passing `filter`, ordered by `sort`.
    #[must_use]
    pub fn search_equipment(&self, filter: &EquipmentFilter, sort: EquipmentSort) -> Vec<EquipmentItem> {
        let mut items: Vec<_> = self
            .store
            .inventory()
            .into_iter()
            .filter(|item| filter.matches(item))
            .collect();
        query::sort_equipment(&mut items, sort);
        items
    }

    /// Descriptions of the set bonuses active on a hero.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`].
    pub fn active_set_bonuses(&self, hero: HeroId) -> Result<Vec<String>> {
        let generation = self.cache.generation();
        let hero = self.hero(hero)?;
        Ok(self.resolver.active_set_bonuses(&self.loadout(&hero, generation)))
    }

    /// Best free item per slot that beats what the hero wears, by power
    /// rating. Items the hero's faction cannot wear are skipped.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`].
    pub fn suggest_upgrades(&self, hero: HeroId) -> Result<Vec<EquipmentItem>> {
        let generation = self.cache.generation();
        let hero = self.hero(hero)?;
        let current = self.loadout(&hero, generation);
        let available: Vec<_> = self
            .store
            .inventory()
            .into_iter()
            .filter(|item| !item.is_equipped() && item.can_be_equipped_by(&hero))
            .collect();

        let mut suggestions = Vec::new();
        for &slot in SlotType::all() {
            let mut best: Option<&EquipmentItem> = None;
            for item in available.iter().filter(|item| item.slot == slot) {
                if best.map_or(true, |b| item.power_rating > b.power_rating) {
                    best = Some(item);
                }
            }
            let worn = current.iter().find(|item| item.slot == slot);
            if let Some(best) = best {
                if worn.map_or(true, |w| best.power_rating > w.power_rating) {
                    suggestions.push(best.clone());
                }
            }
        }
        Ok(suggestions)
    }

    /// Counts and power of the inventory.
    #[must_use]
    pub fn inventory_stats(&self) -> InventoryStats {
        let mut stats = InventoryStats::default();
        for item in self.store.inventory() {
            stats.total_items += 1;
            stats.equipped_items += usize::from(item.is_equipped());
            stats.locked_items += usize::from(item.locked);
            stats.total_power += item.power_rating;
            stats.by_rarity[item.rarity.index()] += 1;
            stats.by_slot[item.slot.index()] += 1;
        }
        stats
    }

    // -------------------------------------------------------------------------
    // Hero progression
    // -------------------------------------------------------------------------

    fn put_hero(&self, hero: &HeroInstance) -> Result<()> {
        self.store.commit(vec![StoreWrite::PutHero(hero.clone())])?;
        self.invalidate(hero);
        Ok(())
    }

    /// Adds experience and levels the hero up as far as it reaches, up to
    /// the level cap.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`]; [`EngineError::Storage`].
    pub fn add_experience(&self, hero: HeroId, amount: u64) -> Result<LevelUp> {
        let mut hero = self.hero(hero)?;
        let before = hero.level;
        hero.experience = hero.experience.saturating_add(amount);
        while hero.level < MAX_HERO_LEVEL && hero.experience >= exp_required_for_level(hero.level + 1) {
            hero.level += 1;
        }
        self.put_hero(&hero)?;

        let result = LevelUp {
            hero: hero.id,
            levels_gained: hero.level.saturating_sub(before),
            new_level: hero.level,
        };
        info!(hero = %hero.id, amount, from = before, to = hero.level, "added experience");
        Ok(result)
    }

    /// Raises a hero's enhancement by one, paying the gold cost. Returns the
    /// cost paid.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`]; [`EngineError::InvalidState`] at +9;
    /// [`EngineError::InsufficientResources`].
    pub fn enhance_hero(&self, hero: HeroId) -> Result<u64> {
        let mut hero = self.hero(hero)?;
        if hero.enhancement >= MAX_HERO_ENHANCEMENT {
            return Err(EngineError::InvalidState(format!(
                "hero {} is already at +{MAX_HERO_ENHANCEMENT}",
                hero.id
            )));
        }
        let rarity = hero.template.rarity().unwrap_or_else(|| {
            warn!(hero = %hero.id, "unknown rarity code, costing as Common");
            HeroRarity::Common
        });
        let cost = hero_upgrade_cost(hero.enhancement, rarity);
        if !self.economy.has_gold(cost) {
            warn!(hero = %hero.id, cost, "cannot afford hero enhancement");
            return Err(EngineError::InsufficientResources { required: cost });
        }
        hero.enhancement += 1;
        self.charge_and_commit(cost, vec![StoreWrite::PutHero(hero.clone())])?;
        self.invalidate(&hero);
        info!(hero = %hero.id, enhancement = hero.enhancement, cost, "enhanced hero");
        Ok(cost)
    }

    /// Raises a hero by one star.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`]; [`EngineError::InvalidState`] at five stars.
    pub fn upgrade_stars(&self, hero: HeroId) -> Result<StarUpgrade> {
        let mut hero = self.hero(hero)?;
        if hero.stars >= MAX_STARS {
            return Err(EngineError::InvalidState(format!(
                "hero {} already has {MAX_STARS} stars",
                hero.id
            )));
        }
        let shards_required = star_upgrade_shards(hero.stars);
        hero.stars += 1;
        self.put_hero(&hero)?;
        info!(hero = %hero.id, stars = hero.stars, shards_required, "upgraded stars");
        Ok(StarUpgrade {
            new_stars: hero.stars,
            shards_required,
        })
    }

    /// Flips the favorite flag; returns the new value.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`]; [`EngineError::Storage`].
    pub fn toggle_favorite(&self, hero: HeroId) -> Result<bool> {
        let mut hero = self.hero(hero)?;
        hero.favorite = !hero.favorite;
        self.store.commit(vec![StoreWrite::PutHero(hero.clone())])?;
        debug!(hero = %hero.id, favorite = hero.favorite, "toggled favorite");
        Ok(hero.favorite)
    }

    /// Moves a hero to `position`. A hero already standing there is benched.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`]; [`EngineError::InvalidState`] when the
    /// slot is not unlocked at the current player level.
    pub fn update_position(&self, hero: HeroId, position: Position) -> Result<()> {
        let mut hero = self.hero(hero)?;
        let slots = available_team_slots(self.store.player_level());
        if usize::from(position.code()) > slots {
            warn!(hero = %hero.id, %position, slots, "slot locked");
            return Err(EngineError::InvalidState(format!(
                "position {position} is locked ({slots} slots unlocked)"
            )));
        }
        if hero.position == position {
            return Ok(());
        }

        let mut writes = Vec::with_capacity(2);
        let mut benched = Vec::new();
        if position.is_deployed() {
            for mut occupant in self.store.active_formation() {
                if occupant.position == position && occupant.id != hero.id {
                    occupant.position = Position::Bench;
                    benched.push(occupant.id);
                    writes.push(StoreWrite::PutHero(occupant));
                }
            }
        }
        let was_deployed = hero.position.is_deployed();
        hero.position = position;
        writes.push(StoreWrite::PutHero(hero.clone()));

        self.store.commit(writes)?;
        for id in benched {
            self.cache.invalidate_hero(id);
        }
        self.cache.invalidate_hero(hero.id);
        if was_deployed || position.is_deployed() {
            self.cache.invalidate_formation();
        }
        info!(hero = %hero.id, %position, "updated position");
        Ok(())
    }

    /// Owned heroes passing `filter`, ordered by `sort`.
    #[must_use]
    pub fn search_heroes(&self, filter: &HeroFilter, sort: HeroSort) -> Vec<HeroInstance> {
        let mut heroes: Vec<_> = self
            .store
            .heroes()
            .into_iter()
            .filter(|hero| filter.matches(hero))
            .collect();
        query::sort_heroes(&mut heroes, sort);
        heroes
    }

    /// Heroes marked favorite, in id order.
    #[must_use]
    pub fn favorite_heroes(&self) -> Vec<HeroInstance> {
        self.store.heroes().into_iter().filter(|hero| hero.favorite).collect()
    }

    /// Counts and power of the hero collection.
    #[must_use]
    pub fn collection_stats(&self) -> CollectionStats {
        let generation = self.cache.generation();
        let mut stats = CollectionStats::default();
        for hero in self.store.heroes() {
            stats.total_heroes += 1;
            stats.favorite_heroes += usize::from(hero.favorite);
            stats.max_level_heroes += usize::from(hero.level >= MAX_HERO_LEVEL);
            stats.total_power += self.stats_of(&hero, ComputeOptions::EQUIPPED, generation).total_power();
            if let Some(rarity) = hero.template.rarity() {
                stats.by_rarity[rarity.index()] += 1;
            }
            if let Some(faction) = hero.faction() {
                stats.by_faction[faction.index()] += 1;
            }
            if let Some(role) = hero.role() {
                stats.by_role[role.index()] += 1;
            }
        }
        stats
    }

    // -------------------------------------------------------------------------
    // Formation
    // -------------------------------------------------------------------------

    /// Synergy, power spread and advice for a candidate team, in list order.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for any unknown hero.
    pub fn analyze_formation(&self, heroes: &[HeroId]) -> Result<FormationAnalysis> {
        let team = self.combatants(heroes, ComputeOptions::EQUIPPED)?;
        Ok(self.analyzer.analyze(&team))
    }

    /// Greedy team suggestion from `candidates`.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for any unknown hero.
    pub fn suggest_formation(&self, candidates: &[HeroId], max_slots: usize) -> Result<FormationSuggestion> {
        let pool = self.combatants(candidates, ComputeOptions::EQUIPPED)?;
        Ok(self.optimizer.suggest(&pool, max_slots))
    }

    /// Checks a formation against the current player level.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for any unknown hero.
    pub fn validate_formation(&self, heroes: &[HeroId]) -> Result<FormationValidation> {
        let team = self.combatants(heroes, ComputeOptions::EQUIPPED)?;
        Ok(self.optimizer.validate(&team, self.store.player_level()))
    }

    /// Sum of the deployed heroes' power with every layer applied.
    #[must_use]
    pub fn active_team_power(&self) -> i64 {
        let generation = self.cache.generation();
        self.store
            .active_formation()
            .iter()
            .map(|hero| self.stats_of(hero, ComputeOptions::FULL, generation).total_power())
            .sum()
    }

    /// Picks the hero `attacker` should hit among `candidates`.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for unknown heroes;
    /// [`EngineError::InvalidState`] when `candidates` is empty.
    pub fn select_target(&self, candidates: &[HeroId], attacker: HeroId, mode: TargetMode) -> Result<HeroId> {
        let attacker = self.hero(attacker)?;
        let pool = self.combatants(candidates, ComputeOptions::EQUIPPED)?;
        let index = self.targeting.select_target(&pool, &attacker, mode, &mut *self.rng())?;
        Ok(pool[index].hero.id)
    }

    /// Acting order of two teams for one round.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for any unknown hero.
    pub fn turn_order(&self, allies: &[HeroId], enemies: &[HeroId]) -> Result<Vec<TurnEntry>> {
        let allies = self.combatants(allies, ComputeOptions::EQUIPPED)?;
        let enemies = self.combatants(enemies, ComputeOptions::EQUIPPED)?;
        Ok(self.optimizer.turn_order(&allies, &enemies, &mut *self.rng()))
    }
}
