//! Fixtures for building heroes, items and engines in tests.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::equipment::lifecycle::enhanced_main_stat;
use crate::equipment::{EquipmentItem, MainStat};
use crate::hero::{HeroInstance, HeroTemplate};
use crate::ids::{HeroId, TemplateId};
use crate::store::{GameStore, InMemoryStore, StoreWrite, Unmetered};
use crate::tables::{Attribute, EquipmentRarity, EquipmentSet, Faction, HeroRarity, Position, Role, SlotType};

/// Engine used by most crate-level tests.
pub type TestEngine = Engine<InMemoryStore, Unmetered>;

/// Routes `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Deterministic RNG for direct component calls.
pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Engine over an empty in-memory store.
pub fn engine(seed: u64, player_level: u32) -> TestEngine {
    init_tracing();
    Engine::new(InMemoryStore::new(player_level), Unmetered, EngineConfig::with_seed(seed))
}

/// A well-formed Rare hero at level 1, not stored anywhere.
pub fn hero(id: u64, faction: Faction, attribute: Attribute, role: Role) -> HeroInstance {
    let template = HeroTemplate::new(
        TemplateId::new(id),
        format!("hero-{id}"),
        faction,
        attribute,
        role,
        HeroRarity::Rare,
    );
    HeroInstance::new(HeroId::new(id), template)
}

/// Stores a fresh hero and returns its id.
pub fn add_hero(engine: &TestEngine, id: u64, faction: Faction, attribute: Attribute, role: Role) -> HeroId {
    let hero = hero(id, faction, attribute, role);
    let id = hero.id;
    engine.store().insert_hero(hero);
    id
}

/// Stores a hero and deploys it at `position`.
pub fn deploy(engine: &TestEngine, id: u64, faction: Faction, attribute: Attribute, role: Role, position: Position) -> HeroId {
    let id = add_hero(engine, id, faction, attribute, role);
    engine
        .update_position(id, position)
        .expect("position should be unlocked");
    id
}

/// Generates a set-free item of `rarity` in `slot` through the engine.
pub fn free_item(engine: &TestEngine, rarity: EquipmentRarity, slot: SlotType) -> EquipmentItem {
    let mut item = engine
        .generate_equipment(rarity, rarity, 1)
        .expect("inventory should have room");
    item.set = EquipmentSet::None;
    item.slot = slot;
    item.main_stat = MainStat {
        kind: slot.main_stat_kind(),
        value: enhanced_main_stat(slot, rarity, item.enhancement),
    };
    item.refresh_power();
    engine
        .store()
        .commit(vec![StoreWrite::PutEquipment(item.clone())])
        .expect("item exists");
    item
}
