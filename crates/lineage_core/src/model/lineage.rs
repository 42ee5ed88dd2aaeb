//! Lineage (family tree) records.

use crate::model::person::{LineageId, PersonId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque key-value bag persisted with a lineage.
///
/// Callers keep UI state here (for example matcher confirmations between
/// sessions); the engine never interprets it.
pub type LineageSettings = BTreeMap<String, serde_json::Value>;

/// Stored lineage record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineage {
    pub id: LineageId,
    pub name: String,
    pub description: Option<String>,
    pub settings: LineageSettings,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

/// Create/update payload for a lineage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineageDraft {
    pub name: String,
    pub description: Option<String>,
    pub settings: LineageSettings,
}

impl LineageDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Request for copying a lineage into a new one.
///
/// `person_ids = None` copies the whole tree (snapshotting); `Some(ids)`
/// copies only those persons and the relationships among them (branch split).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneRequest {
    pub name: String,
    pub person_ids: Option<Vec<PersonId>>,
}

impl CloneRequest {
    pub fn full(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            person_ids: None,
        }
    }

    pub fn subset(name: impl Into<String>, person_ids: Vec<PersonId>) -> Self {
        Self {
            name: name.into(),
            person_ids: Some(person_ids),
        }
    }
}
