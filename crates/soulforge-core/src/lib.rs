//! # Soulforge Core
//!
//! Rules engine for a collectible-hero combat game.
//!
//! This crate derives a hero's combat stats from a layered stack of bonuses,
//! runs the probabilistic equipment lifecycle, and analyzes and builds squads.
//! It performs no I/O: records live behind the [`store::GameStore`] trait and
//! currency behind [`store::Economy`].
//!
//! ## Architecture
//!
//! - **Tables** ([`tables`]): every constant the rules read
//! - **Model** ([`hero`], [`equipment`]): templates, owned heroes, items
//! - **Lifecycle** ([`equipment::lifecycle`]): generation, enhancement,
//!   reforge and melt
//! - **Composition** ([`stats`], [`equipment::bonus`]): the ordered stat
//!   pipeline
//! - **Queries** ([`query`]): inventory and roster filters and sorts
//! - **Squads** ([`synergy`], [`targeting`], [`formation`]): synergy scoring,
//!   target selection, greedy team building
//! - **Service** ([`engine`], [`cache`], [`config`]): the facade that ties
//!   the above to a store, with TTL memoization
//!
//! ## Usage
//!
//! ```
//! use soulforge_core::config::EngineConfig;
//! use soulforge_core::engine::Engine;
//! use soulforge_core::hero::{HeroInstance, HeroTemplate};
//! use soulforge_core::ids::{HeroId, TemplateId};
//! use soulforge_core::stats::ComputeOptions;
//! use soulforge_core::store::{InMemoryStore, Unmetered};
//! use soulforge_core::tables::{Attribute, Faction, HeroRarity, Role};
//!
//! let store = InMemoryStore::new(20);
//! let template = HeroTemplate::new(
//!     TemplateId::new(1),
//!     "Byakuya",
//!     Faction::Shinigami,
//!     Attribute::Core,
//!     Role::Assassin,
//!     HeroRarity::Legendary,
//! );
//! store.insert_hero(HeroInstance::new(HeroId::new(1), template));
//!
//! let engine = Engine::new(store, Unmetered, EngineConfig::default());
//! let stats = engine.compute_stats(HeroId::new(1), ComputeOptions::FULL).unwrap();
//! assert!(stats.total_power() > 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod config;
pub mod engine;
pub mod equipment;
pub mod error;
pub mod formation;
pub mod hero;
pub mod ids;
pub mod query;
pub mod stats;
pub mod store;
pub mod synergy;
pub mod tables;
pub mod targeting;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};

#[cfg(test)]
mod tests;
