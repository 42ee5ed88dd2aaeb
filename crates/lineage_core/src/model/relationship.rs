//! Relationship domain model.
//!
//! # Responsibility
//! - Define the fine-grained relationship vocabulary stored per lineage.
//! - Collapse fine-grained types into graph kinds and rendering categories.
//!
//! # Invariants
//! - Parent-type rows are directed: `from_person_id` is the parent of
//!   `to_person_id`.
//! - Spouse-type rows are symmetric.
//! - Sibling-type rows never become graph edges.

use crate::model::person::{LineageId, PersonId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RelationshipId = Uuid;

/// Fine-grained relationship type as recorded by users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    BiologicalParent,
    AdoptiveParent,
    InformalAdoptive,
    StepParent,
    FosterParent,
    SurrogateParent,
    Godparent,
    SpouseMarried,
    SpouseDivorced,
    Partner,
    Concubine,
    SiblingFull,
    SiblingHalf,
    SiblingStep,
    SiblingSworn,
    Guardian,
    #[serde(other)]
    Unknown,
}

/// Graph role of a relationship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    /// Directed parent -> child edge.
    Parent,
    /// Symmetric spouse edge.
    Spouse,
    /// Derived from shared parents; never a stored graph edge.
    Sibling,
    /// Recorded but not traversable (guardian, unknown).
    Other,
}

/// Rendering category of a graph edge.
///
/// Variant order is the precedence used when one person pair carries several
/// rows with different categories: earlier variants win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeCategory {
    Biological,
    Adoptive,
    Step,
    Sworn,
    Spouse,
    Other,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 17] = [
        Self::BiologicalParent,
        Self::AdoptiveParent,
        Self::InformalAdoptive,
        Self::StepParent,
        Self::FosterParent,
        Self::SurrogateParent,
        Self::Godparent,
        Self::SpouseMarried,
        Self::SpouseDivorced,
        Self::Partner,
        Self::Concubine,
        Self::SiblingFull,
        Self::SiblingHalf,
        Self::SiblingStep,
        Self::SiblingSworn,
        Self::Guardian,
        Self::Unknown,
    ];

    pub fn kind(self) -> RelationshipKind {
        match self {
            Self::BiologicalParent
            | Self::AdoptiveParent
            | Self::InformalAdoptive
            | Self::StepParent
            | Self::FosterParent
            | Self::SurrogateParent
            | Self::Godparent => RelationshipKind::Parent,
            Self::SpouseMarried | Self::SpouseDivorced | Self::Partner | Self::Concubine => {
                RelationshipKind::Spouse
            }
            Self::SiblingFull | Self::SiblingHalf | Self::SiblingStep | Self::SiblingSworn => {
                RelationshipKind::Sibling
            }
            Self::Guardian | Self::Unknown => RelationshipKind::Other,
        }
    }

    pub fn edge_category(self) -> EdgeCategory {
        match self {
            Self::BiologicalParent => EdgeCategory::Biological,
            Self::AdoptiveParent | Self::InformalAdoptive | Self::FosterParent => {
                EdgeCategory::Adoptive
            }
            Self::StepParent => EdgeCategory::Step,
            Self::Godparent | Self::SurrogateParent => EdgeCategory::Sworn,
            Self::SpouseMarried | Self::SpouseDivorced | Self::Partner | Self::Concubine => {
                EdgeCategory::Spouse
            }
            Self::SiblingFull
            | Self::SiblingHalf
            | Self::SiblingStep
            | Self::SiblingSworn
            | Self::Guardian
            | Self::Unknown => EdgeCategory::Other,
        }
    }

    /// Stable storage label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BiologicalParent => "biological_parent",
            Self::AdoptiveParent => "adoptive_parent",
            Self::InformalAdoptive => "informal_adoptive",
            Self::StepParent => "step_parent",
            Self::FosterParent => "foster_parent",
            Self::SurrogateParent => "surrogate_parent",
            Self::Godparent => "godparent",
            Self::SpouseMarried => "spouse_married",
            Self::SpouseDivorced => "spouse_divorced",
            Self::Partner => "partner",
            Self::Concubine => "concubine",
            Self::SiblingFull => "sibling_full",
            Self::SiblingHalf => "sibling_half",
            Self::SiblingStep => "sibling_step",
            Self::SiblingSworn => "sibling_sworn",
            Self::Guardian => "guardian",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a storage label. Unrecognized labels map to `Unknown`.
    pub fn parse(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value.trim())
            .unwrap_or(Self::Unknown)
    }
}

/// Stored relationship row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub lineage_id: LineageId,
    pub relationship_type: RelationshipType,
    pub from_person_id: PersonId,
    pub to_person_id: PersonId,
    pub notes: Option<String>,
}

impl Relationship {
    /// Creates a relationship row with a generated id.
    pub fn new(
        lineage_id: LineageId,
        relationship_type: RelationshipType,
        from_person_id: PersonId,
        to_person_id: PersonId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            lineage_id,
            relationship_type,
            from_person_id,
            to_person_id,
            notes: None,
        }
    }

    /// Parent-type row: `parent` -> `child`.
    pub fn parent(
        lineage_id: LineageId,
        relationship_type: RelationshipType,
        parent: PersonId,
        child: PersonId,
    ) -> Self {
        Self::new(lineage_id, relationship_type, parent, child)
    }

    pub fn kind(&self) -> RelationshipKind {
        self.relationship_type.kind()
    }
}

/// Write payload for a new relationship row; the store assigns id and lineage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelationship {
    pub relationship_type: RelationshipType,
    pub from_person_id: PersonId,
    pub to_person_id: PersonId,
    pub notes: Option<String>,
}
