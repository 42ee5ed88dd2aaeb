//! Multi-lineage merge.
//!
//! # Responsibility
//! - Plan the consolidation of several lineages into the first one.
//! - Drive the store protocol: snapshot, atomic write, optional delete.
//!
//! # Invariants
//! - Only human-confirmed mappings reach this module; match proposals are
//!   never applied directly.
//! - No sibling relationship is ever created by a merge.
//!
//! # See also
//! - matching::matcher for the proposals that become [`PersonMapping`]s.

use crate::model::person::NamespacedId;
use serde::{Deserialize, Serialize};

pub mod coordinator;
pub mod plan;

/// Confirmed identity: `candidate` is the same person as `primary`.
///
/// The candidate is folded into the primary; its id disappears from the
/// merged output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonMapping {
    pub primary: NamespacedId,
    pub candidate: NamespacedId,
}

impl PersonMapping {
    pub fn new(primary: NamespacedId, candidate: NamespacedId) -> Self {
        Self { primary, candidate }
    }
}
