//! Collaborator seams: record storage and currency.
//!
//! The engine never owns persistent state. It reads heroes (with their
//! templates joined) and equipment through [`GameStore`], and hands back every
//! change of one operation as a single batch of [`StoreWrite`]s. A store must
//! apply a batch entirely or not at all.
//!
//! Costs are computed by the engine; whether the player can pay them is the
//! [`Economy`]'s business.
//!
//! [`InMemoryStore`], [`Unmetered`] and [`Wallet`] are complete
//! implementations for tests, benchmarks and hosts that keep state in memory.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

use crate::equipment::EquipmentItem;
use crate::error::{EngineError, Result};
use crate::hero::HeroInstance;
use crate::ids::{EquipmentId, HeroId};
use crate::tables::SlotType;

// =============================================================================
// Traits
// =============================================================================

/// One change to stored records.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    /// Replace a hero.
    PutHero(HeroInstance),
    /// Replace an existing item.
    PutEquipment(EquipmentItem),
    /// Add a new item.
    InsertEquipment(EquipmentItem),
    /// Remove an item.
    DeleteEquipment(EquipmentId),
}

/// Storage of player-owned heroes and equipment.
pub trait GameStore: Send + Sync {
    /// Hero with its template joined.
    fn hero(&self, id: HeroId) -> Option<HeroInstance>;

    /// Every owned hero.
    fn heroes(&self) -> Vec<HeroInstance>;

    /// One item.
    fn equipment(&self, id: EquipmentId) -> Option<EquipmentItem>;

    /// Every owned item.
    fn inventory(&self) -> Vec<EquipmentItem>;

    /// Current player level; drives formation slot unlocks.
    fn player_level(&self) -> u32;

    /// Reserves a fresh, never-used item id.
    fn allocate_equipment_id(&self) -> EquipmentId;

    /// Applies `writes` atomically.
    ///
    /// # Errors
    ///
    /// [`EngineError::Storage`] when any write cannot be applied; nothing is
    /// applied in that case.
    fn commit(&self, writes: Vec<StoreWrite>) -> Result<()>;

    /// Items `hero` has equipped, in slot order.
    ///
    /// Items whose back-reference disagrees with the hero are skipped with a
    /// warning.
    fn equipment_of(&self, hero: &HeroInstance) -> Vec<EquipmentItem> {
        SlotType::all()
            .iter()
            .filter_map(|&slot| hero.equipped_in(slot))
            .filter_map(|id| match self.equipment(id) {
                Some(item) if item.equipped_by == Some(hero.id) => Some(item),
                Some(item) => {
                    warn!(hero = %hero.id, item = %id, owner = ?item.equipped_by, "equipped item belongs to another hero");
                    None
                }
                None => {
                    warn!(hero = %hero.id, item = %id, "equipped item is missing");
                    None
                }
            })
            .collect()
    }

    /// Deployed heroes, front to back.
    fn active_formation(&self) -> Vec<HeroInstance> {
        let mut deployed: Vec<_> = self
            .heroes()
            .into_iter()
            .filter(|h| h.position.is_deployed())
            .collect();
        deployed.sort_by_key(|h| (h.position, h.id));
        deployed
    }
}

/// Currency collaborator.
pub trait Economy: Send + Sync {
    /// The player can pay `amount` gold.
    fn has_gold(&self, amount: u64) -> bool;

    /// Deducts `amount` gold.
    ///
    /// # Errors
    ///
    /// [`EngineError::InsufficientResources`] when the balance is too low.
    fn spend_gold(&self, amount: u64) -> Result<()>;

    /// Returns `amount` gold taken by [`Economy::spend_gold`] for an
    /// operation whose writes were not applied.
    fn refund_gold(&self, amount: u64);
}

// =============================================================================
// Economies
// =============================================================================

/// Economy that accepts every cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unmetered;

impl Economy for Unmetered {
    fn has_gold(&self, _amount: u64) -> bool {
        true
    }

    fn spend_gold(&self, _amount: u64) -> Result<()> {
        Ok(())
    }

    fn refund_gold(&self, _amount: u64) {}
}

/// Economy backed by a single gold balance.
#[derive(Debug, Default)]
pub struct Wallet {
    gold: Mutex<u64>,
}

impl Wallet {
    /// Wallet holding `gold`.
    #[must_use]
    pub fn new(gold: u64) -> Self {
        Self { gold: Mutex::new(gold) }
    }

    /// Current balance.
    #[must_use]
    pub fn balance(&self) -> u64 {
        *self.gold.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Economy for Wallet {
    fn has_gold(&self, amount: u64) -> bool {
        self.balance() >= amount
    }

    fn spend_gold(&self, amount: u64) -> Result<()> {
        let mut gold = self.gold.lock().unwrap_or_else(PoisonError::into_inner);
        *gold = gold
            .checked_sub(amount)
            .ok_or(EngineError::InsufficientResources { required: amount })?;
        Ok(())
    }

    fn refund_gold(&self, amount: u64) {
        let mut gold = self.gold.lock().unwrap_or_else(PoisonError::into_inner);
        *gold = gold.saturating_add(amount);
    }
}

// =============================================================================
// InMemoryStore
// =============================================================================

#[derive(Debug, Clone, Default)]
struct Records {
    heroes: BTreeMap<HeroId, HeroInstance>,
    equipment: BTreeMap<EquipmentId, EquipmentItem>,
}

impl Records {
    fn apply(&mut self, write: StoreWrite) -> Result<()> {
        match write {
            StoreWrite::PutHero(hero) => {
                if !self.heroes.contains_key(&hero.id) {
                    return Err(EngineError::Storage(format!("hero {} does not exist", hero.id)));
                }
                self.heroes.insert(hero.id, hero);
            }
            StoreWrite::PutEquipment(item) => {
                if !self.equipment.contains_key(&item.id) {
                    return Err(EngineError::Storage(format!("equipment {} does not exist", item.id)));
                }
                self.equipment.insert(item.id, item);
            }
            StoreWrite::InsertEquipment(item) => {
                if self.equipment.contains_key(&item.id) {
                    return Err(EngineError::Storage(format!("equipment {} already exists", item.id)));
                }
                self.equipment.insert(item.id, item);
            }
            StoreWrite::DeleteEquipment(id) => {
                if self.equipment.remove(&id).is_none() {
                    return Err(EngineError::Storage(format!("equipment {id} does not exist")));
                }
            }
        }
        Ok(())
    }
}

/// [`GameStore`] keeping every record in memory.
#[derive(Debug)]
pub struct InMemoryStore {
    records: RwLock<Records>,
    next_equipment_id: AtomicU64,
    player_level: AtomicU64,
}

impl InMemoryStore {
    /// Empty store for a player at `player_level`.
    #[must_use]
    pub fn new(player_level: u32) -> Self {
        Self {
            records: RwLock::new(Records::default()),
            next_equipment_id: AtomicU64::new(1),
            player_level: AtomicU64::new(u64::from(player_level)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Records> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Records> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds or replaces a hero outside any engine operation.
    pub fn insert_hero(&self, hero: HeroInstance) {
        self.write().heroes.insert(hero.id, hero);
    }

    /// Adds or replaces an item outside any engine operation.
    pub fn insert_equipment(&self, item: EquipmentItem) {
        self.next_equipment_id
            .fetch_max(item.id.as_u64() + 1, Ordering::Relaxed);
        self.write().equipment.insert(item.id, item);
    }

    /// Changes the player level.
    pub fn set_player_level(&self, level: u32) {
        self.player_level.store(u64::from(level), Ordering::Relaxed);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(1)
    }
}

impl GameStore for InMemoryStore {
    fn hero(&self, id: HeroId) -> Option<HeroInstance> {
        self.read().heroes.get(&id).cloned()
    }

    fn heroes(&self) -> Vec<HeroInstance> {
        self.read().heroes.values().cloned().collect()
    }

    fn equipment(&self, id: EquipmentId) -> Option<EquipmentItem> {
        self.read().equipment.get(&id).cloned()
    }

    fn inventory(&self) -> Vec<EquipmentItem> {
        self.read().equipment.values().cloned().collect()
    }

    fn player_level(&self) -> u32 {
        u32::try_from(self.player_level.load(Ordering::Relaxed)).unwrap_or(u32::MAX)
    }

    fn allocate_equipment_id(&self) -> EquipmentId {
        EquipmentId::new(self.next_equipment_id.fetch_add(1, Ordering::Relaxed))
    }

    fn commit(&self, writes: Vec<StoreWrite>) -> Result<()> {
        let mut records = self.write();
        let mut staged = records.clone();
        for write in writes {
            staged.apply(write)?;
        }
        *records = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::lifecycle;
    use crate::hero::HeroTemplate;
    use crate::ids::TemplateId;
    use crate::tables::{Attribute, EquipmentRarity, Faction, HeroRarity, Position, Role};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn hero(id: u64) -> HeroInstance {
        let template = HeroTemplate::new(
            TemplateId::new(id),
            "Rukia",
            Faction::Shinigami,
            Attribute::Soul,
            Role::Controller,
            HeroRarity::Epic,
        );
        HeroInstance::new(HeroId::new(id), template)
    }

    fn item(id: u64) -> EquipmentItem {
        let mut rng = ChaCha8Rng::seed_from_u64(id);
        lifecycle::generate(
            EquipmentId::new(id),
            EquipmentRarity::Green,
            EquipmentRarity::Green,
            1,
            &mut rng,
        )
    }

    #[test]
    fn traits_are_object_safe() {
        fn _accepts_store(_store: Box<dyn GameStore>) {}
        fn _accepts_economy(_economy: &dyn Economy) {}
    }

    mod commit_tests {
        use super::*;

        #[test]
        fn failed_batch_applies_nothing() {
            let store = InMemoryStore::default();
            store.insert_equipment(item(1));

            let result = store.commit(vec![
                StoreWrite::DeleteEquipment(EquipmentId::new(1)),
                StoreWrite::DeleteEquipment(EquipmentId::new(2)),
            ]);
            assert!(matches!(result, Err(EngineError::Storage(_))));
            assert!(store.equipment(EquipmentId::new(1)).is_some());
        }

        #[test]
        fn batch_applies_in_order() {
            let store = InMemoryStore::default();
            store.insert_equipment(item(1));
            let id = store.allocate_equipment_id();
            assert_eq!(id, EquipmentId::new(2));

            store
                .commit(vec![
                    StoreWrite::DeleteEquipment(EquipmentId::new(1)),
                    StoreWrite::InsertEquipment(item(id.as_u64())),
                ])
                .unwrap();
            assert_eq!(store.inventory().len(), 1);
            assert!(store.equipment(id).is_some());
        }

        #[test]
        fn put_requires_existing_record() {
            let store = InMemoryStore::default();
            assert!(store.commit(vec![StoreWrite::PutHero(hero(3))]).is_err());
            assert!(store.commit(vec![StoreWrite::PutEquipment(item(3))]).is_err());
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn active_formation_is_ordered_by_position() {
            let store = InMemoryStore::default();
            for (id, position) in [(1, Position::BackLeft), (2, Position::Bench), (3, Position::FrontLeft)] {
                let mut h = hero(id);
                h.position = position;
                store.insert_hero(h);
            }
            let ids: Vec<_> = store.active_formation().iter().map(|h| h.id.as_u64()).collect();
            assert_eq!(ids, vec![3, 1]);
        }

        #[test]
        fn equipment_of_skips_mismatched_owner() {
            let store = InMemoryStore::default();
            let mut owner = hero(1);
            let mut a = item(10);
            a.equipped_by = Some(owner.id);
            let mut b = item(11);
            b.equipped_by = Some(HeroId::new(99));
            owner.set_equipped(a.slot, Some(a.id));
            if b.slot != a.slot {
                owner.set_equipped(b.slot, Some(b.id));
            }
            store.insert_equipment(a);
            store.insert_equipment(b);

            let loadout = store.equipment_of(&owner);
            assert_eq!(loadout.len(), 1);
            assert_eq!(loadout[0].id, EquipmentId::new(10));
        }
    }

    #[test]
    fn wallet_refuses_overspend() {
        let wallet = Wallet::new(500);
        assert!(wallet.has_gold(500));
        wallet.spend_gold(300).unwrap();
        assert_eq!(
            wallet.spend_gold(300),
            Err(EngineError::InsufficientResources { required: 300 })
        );
        assert_eq!(wallet.balance(), 200);
    }

    #[test]
    fn wallet_refund_restores_balance() {
        let wallet = Wallet::new(500);
        wallet.spend_gold(500).unwrap();
        wallet.refund_gold(500);
        assert_eq!(wallet.balance(), 500);
    }
}
