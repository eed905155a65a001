//! Crate-level tests that exercise several modules together.
//!
//! - `determinism.rs`: equal seeds give equal crafting, targeting and turn order
//! - `integration.rs`: end-to-end flows through the [`crate::engine::Engine`]
//! - `properties.rs`: `proptest` properties of the stat pipeline, melt and
//!   synergy score
//! - `helpers.rs`: fixtures shared by the above

mod determinism;
mod helpers;
mod properties;
