//! Equipment items and their lifecycle.
//!
//! # Architecture
//!
//! - [`EquipmentItem`]: the stored item with its main and secondary stats
//! - [`lifecycle`]: generation, loot rolls, enhancement, reforge and melt
//! - [`bonus`]: aggregation of an equipped loadout into stat contributions
//!
//! Lifecycle functions take the RNG as a parameter so the caller decides how
//! randomness is seeded; the engine threads one seeded `ChaCha8Rng` through
//! every crafting call.
//!
//! # Example
//!
//! ```
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use soulforge_core::equipment::lifecycle;
//! use soulforge_core::ids::EquipmentId;
//! use soulforge_core::tables::EquipmentRarity;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! let mut item = lifecycle::generate(
//!     EquipmentId::new(1),
//!     EquipmentRarity::Blue,
//!     EquipmentRarity::Blue,
//!     10,
//!     &mut rng,
//! );
//! let before = item.power_rating;
//! lifecycle::enhance(&mut item).unwrap();
//! assert_eq!(item.enhancement, 1);
//! assert!(item.power_rating > before);
//! ```

pub mod bonus;
pub mod lifecycle;

pub use bonus::{EquipmentBonus, EquipmentBonusResolver, StatDelta};
pub use lifecycle::{MeltOutcome, MeltRejection, ReforgeOutcome};

use serde::{Deserialize, Serialize};

use crate::hero::HeroInstance;
use crate::ids::{EquipmentId, HeroId};
use crate::tables::equipment::ENHANCEMENT_POWER_GROWTH;
use crate::tables::{round_half_up, EquipmentRarity, EquipmentSet, MainStatKind, SecondaryKind, SlotType};

/// An item's main stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainStat {
    /// What it boosts.
    pub kind: MainStatKind,
    /// Current value (includes enhancement growth).
    pub value: i32,
}

/// One rolled secondary stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryStat {
    /// What it boosts.
    pub kind: SecondaryKind,
    /// Rolled value.
    pub value: i32,
}

/// A piece of equipment in the player's inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentItem {
    /// Item id.
    pub id: EquipmentId,
    /// Slot it occupies when equipped.
    pub slot: SlotType,
    /// Rarity tier.
    pub rarity: EquipmentRarity,
    /// Enhancement, 0..=9.
    pub enhancement: u8,
    /// Level the item dropped at.
    pub level: u32,
    /// Main stat.
    pub main_stat: MainStat,
    /// Secondary stats in roll order.
    pub secondary_stats: Vec<SecondaryStat>,
    /// Set membership.
    pub set: EquipmentSet,
    /// Hero wearing it, if any.
    pub equipped_by: Option<HeroId>,
    /// Protected from melting and deletion.
    pub locked: bool,
    /// Derived power rating; refreshed by [`EquipmentItem::refresh_power`].
    pub power_rating: i64,
}

impl EquipmentItem {
    /// Power rating from the current stats:
    /// `round(round((main×10 + Σsec×8) × (1 + e×0.1)) × rarity multiplier)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute_power_rating(&self) -> i64 {
        let secondary: i64 = self
            .secondary_stats
            .iter()
            .map(|s| i64::from(s.value) * 8)
            .sum();
        let raw = i64::from(self.main_stat.value) * 10 + secondary;
        let enhanced =
            round_half_up(raw as f64 * (1.0 + f64::from(self.enhancement) * ENHANCEMENT_POWER_GROWTH));
        round_half_up(enhanced as f64 * self.rarity.power_multiplier())
    }

    /// Recomputes and stores [`EquipmentItem::power_rating`].
    pub fn refresh_power(&mut self) {
        self.power_rating = self.compute_power_rating();
    }

    /// Worn by some hero.
    #[must_use]
    pub fn is_equipped(&self) -> bool {
        self.equipped_by.is_some()
    }

    /// Whether `hero` may wear this item (set restrictions).
    #[must_use]
    pub fn can_be_equipped_by(&self, hero: &HeroInstance) -> bool {
        self.set.can_be_equipped_by(hero.faction())
    }

    /// Sum of every secondary value.
    #[must_use]
    pub fn secondary_total(&self) -> i32 {
        self.secondary_stats.iter().map(|s| s.value).sum()
    }
}
