//! Error taxonomy for engine operations.
//!
//! Only genuinely exceptional outcomes are errors. A reforge that loses its
//! success roll or a melt whose inputs fail validation are ordinary results
//! (see [`crate::equipment::ReforgeOutcome`] and
//! [`crate::equipment::MeltOutcome`]). Out-of-range table lookups are
//! resolved with a neutral fallback and a `tracing` warning rather than
//! surfaced here.

use std::fmt;

use thiserror::Error;

/// Kind of record an id failed to resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Player-owned hero.
    Hero,
    /// Hero template.
    Template,
    /// Equipment item.
    Equipment,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hero => write!(f, "hero"),
            Self::Template => write!(f, "hero template"),
            Self::Equipment => write!(f, "equipment"),
        }
    }
}

/// Errors returned by engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// An id did not resolve to a stored record.
    #[error("{kind} {id} not found")]
    NotFound {
        /// What was being looked up.
        kind: RecordKind,
        /// The raw id.
        id: u64,
    },

    /// The operation would violate an invariant (max enhancement, empty
    /// candidate set, equipped item deletion, ...).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The economy collaborator refused the computed cost.
    #[error("insufficient resources: {required} gold required")]
    InsufficientResources {
        /// Cost computed by the engine.
        required: u64,
    },

    /// Stored data references a table entry that does not exist.
    #[error("data integrity: {0}")]
    DataIntegrity(String),

    /// The storage collaborator failed to apply a write.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl EngineError {
    /// Shorthand for a missing hero.
    #[must_use]
    pub fn hero_not_found(id: impl Into<u64>) -> Self {
        Self::NotFound {
            kind: RecordKind::Hero,
            id: id.into(),
        }
    }

    /// Shorthand for a missing equipment item.
    #[must_use]
    pub fn equipment_not_found(id: impl Into<u64>) -> Self {
        Self::NotFound {
            kind: RecordKind::Equipment,
            id: id.into(),
        }
    }

    /// Shorthand for a missing template.
    #[must_use]
    pub fn template_not_found(id: impl Into<u64>) -> Self {
        Self::NotFound {
            kind: RecordKind::Template,
            id: id.into(),
        }
    }

    /// Returns true for [`EngineError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
