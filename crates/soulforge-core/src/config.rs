//! Engine configuration.
//!
//! Hosts deserialize an [`EngineConfig`] from whatever source they use; the
//! engine itself never reads files or the environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::tables::equipment::DEFAULT_MELT_OUTPUT_LEVEL;

/// Tunables of an [`crate::engine::Engine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed of the crafting RNG. Equal seeds give equal crafting results.
    pub seed: u64,
    /// Lifetime of cached hero stats, in seconds.
    pub hero_stats_ttl_secs: u64,
    /// Lifetime of cached loadouts, in seconds.
    pub equipment_ttl_secs: u64,
    /// Maximum number of items in the inventory.
    pub inventory_capacity: usize,
    /// Level of items crafted by melting.
    pub melt_output_level: u32,
}

impl EngineConfig {
    /// Default config with a specific seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// [`Self::hero_stats_ttl_secs`] as a duration.
    #[must_use]
    pub fn hero_stats_ttl(&self) -> Duration {
        Duration::from_secs(self.hero_stats_ttl_secs)
    }

    /// [`Self::equipment_ttl_secs`] as a duration.
    #[must_use]
    pub fn equipment_ttl(&self) -> Duration {
        Duration::from_secs(self.equipment_ttl_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            hero_stats_ttl_secs: 2 * 60,
            equipment_ttl_secs: 5 * 60,
            inventory_capacity: 200,
            melt_output_level: DEFAULT_MELT_OUTPUT_LEVEL,
        }
    }
}
