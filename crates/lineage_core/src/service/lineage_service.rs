//! Lineage use-case service.
//!
//! # Responsibility
//! - Load lineages from the record store and hand them to the pure engine
//!   (graph building, matching, kinship terms, combined views).
//! - Orchestrate store-touching use cases: spouse linking, branch split,
//!   merge.
//!
//! # Invariants
//! - Every call reads fresh records; nothing is cached between calls.
//! - Spouse links are validated against the current graph before writing.

use crate::graph::builder::build;
use crate::graph::combined::{combine_lineages, CombinedGraph, LineageSource};
use crate::graph::depth::branch_members;
use crate::graph::path::{can_link_as_spouse, SpouseLinkError};
use crate::graph::kinship::{calculate_kinship, KinshipResult};
use crate::graph::FamilyGraph;
use crate::matching::matcher::{candidates, match_persons_with_policy, MatchPolicy, MatchResult};
use crate::merge::coordinator::{MergeCoordinator, MergeError, MergeOptions, MergeResult};
use crate::merge::plan::{FieldResolutions, MergeSource};
use crate::merge::PersonMapping;
use crate::model::lineage::{CloneRequest, Lineage, LineageDraft};
use crate::model::person::{LineageId, PersonId};
use crate::model::relationship::{
    NewRelationship, Relationship, RelationshipKind, RelationshipType,
};
use crate::repo::store::{RecordKind, RecordStore, StoreError};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from lineage service operations.
#[derive(Debug)]
pub enum LineageServiceError {
    /// Name is blank after trim.
    InvalidName,
    /// Target lineage does not exist.
    LineageNotFound(LineageId),
    /// Branch root is not a person of the lineage.
    RootNotFound {
        lineage_id: LineageId,
        person_id: PersonId,
    },
    /// Relationship type passed to a spouse operation is not a spouse type.
    NotSpouseType(RelationshipType),
    /// Spouse link refused by graph validation.
    SpouseLink(SpouseLinkError),
    /// Merge protocol failure.
    Merge(MergeError),
    /// Store-level failure.
    Store(StoreError),
}

impl Display for LineageServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "lineage name must not be blank"),
            Self::LineageNotFound(id) => write!(f, "lineage not found: {id}"),
            Self::RootNotFound {
                lineage_id,
                person_id,
            } => write!(
                f,
                "branch root {person_id} is not a person of lineage {lineage_id}"
            ),
            Self::NotSpouseType(kind) => {
                write!(f, "relationship type `{}` is not a spouse type", kind.as_str())
            }
            Self::SpouseLink(err) => write!(f, "{err}"),
            Self::Merge(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LineageServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SpouseLink(err) => Some(err),
            Self::Merge(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for LineageServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound {
                kind: RecordKind::Lineage,
                id,
            } => Self::LineageNotFound(id),
            other => Self::Store(other),
        }
    }
}

impl From<MergeError> for LineageServiceError {
    fn from(value: MergeError) -> Self {
        Self::Merge(value)
    }
}

impl From<SpouseLinkError> for LineageServiceError {
    fn from(value: SpouseLinkError) -> Self {
        Self::SpouseLink(value)
    }
}

/// Lineage service facade.
pub struct LineageService<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> LineageService<S> {
    /// Creates service from store implementation.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates one empty lineage.
    pub fn create_lineage(
        &self,
        name: impl Into<String>,
    ) -> Result<Lineage, LineageServiceError> {
        let name = normalize_name(name.into())?;
        self.store
            .create_lineage(&LineageDraft::named(name))
            .map_err(Into::into)
    }

    /// Loads one lineage's records as a merge source.
    pub fn load_source(&self, lineage_id: LineageId) -> Result<MergeSource, LineageServiceError> {
        self.require_lineage(lineage_id)?;
        Ok(MergeSource {
            lineage_id,
            persons: self.store.list_persons(lineage_id)?,
            relationships: self.store.list_relationships_by_lineage(lineage_id)?,
        })
    }

    /// Builds the family graph of one lineage.
    pub fn load_graph(&self, lineage_id: LineageId) -> Result<FamilyGraph, LineageServiceError> {
        let source = self.load_source(lineage_id)?;
        Ok(build(&source.persons, &source.relationships))
    }

    /// Kinship term `to` carries from `from`'s point of view, or `None` when
    /// they are not connected inside the lineage.
    pub fn kinship(
        &self,
        lineage_id: LineageId,
        from: PersonId,
        to: PersonId,
    ) -> Result<Option<KinshipResult>, LineageServiceError> {
        let graph = self.load_graph(lineage_id)?;
        Ok(calculate_kinship(&graph.nodes, from, to))
    }

    /// Proposes duplicates between two lineages.
    pub fn match_lineages(
        &self,
        primary: LineageId,
        other: LineageId,
        policy: &MatchPolicy,
    ) -> Result<Vec<MatchResult>, LineageServiceError> {
        let primary = self.load_source(primary)?;
        let other = self.load_source(other)?;
        Ok(match_persons_with_policy(
            &candidates(&primary.persons),
            &candidates(&other.persons),
            policy,
        ))
    }

    /// Builds a combined view of several lineages, in display order.
    pub fn combined_view(
        &self,
        lineages: &[(LineageId, String)],
        mappings: &[PersonMapping],
    ) -> Result<CombinedGraph, LineageServiceError> {
        let mut sources = Vec::with_capacity(lineages.len());
        for (lineage_id, display_color) in lineages {
            let lineage = self.require_lineage(*lineage_id)?;
            sources.push(LineageSource {
                lineage_id: lineage.id,
                lineage_name: lineage.name,
                display_color: display_color.clone(),
                graph: self.load_graph(*lineage_id)?,
            });
        }
        Ok(combine_lineages(&sources, mappings))
    }

    /// Links two persons of one lineage as spouses after graph validation.
    pub fn link_spouses(
        &self,
        lineage_id: LineageId,
        person_id: PersonId,
        spouse_id: PersonId,
        relationship_type: RelationshipType,
    ) -> Result<Relationship, LineageServiceError> {
        if relationship_type.kind() != RelationshipKind::Spouse {
            return Err(LineageServiceError::NotSpouseType(relationship_type));
        }
        let graph = self.load_graph(lineage_id)?;
        can_link_as_spouse(&graph.nodes, person_id, spouse_id)?;
        self.store
            .create_relationship(&NewRelationship {
                relationship_type,
                from_person_id: person_id,
                to_person_id: spouse_id,
                notes: None,
            })
            .map_err(Into::into)
    }

    /// Copies the branch under `root_id` into a new lineage.
    ///
    /// The branch is the root, all its descendants and their direct spouses.
    pub fn split_branch(
        &self,
        lineage_id: LineageId,
        root_id: PersonId,
        name: impl Into<String>,
    ) -> Result<Lineage, LineageServiceError> {
        let name = normalize_name(name.into())?;
        let graph = self.load_graph(lineage_id)?;
        if graph.node(root_id).is_none() {
            return Err(LineageServiceError::RootNotFound {
                lineage_id,
                person_id: root_id,
            });
        }
        let members = branch_members(&graph.nodes, root_id).into_iter().collect();
        self.store
            .clone_lineage(lineage_id, &CloneRequest::subset(name, members))
            .map_err(Into::into)
    }

    /// Merges `lineage_ids` into the first one.
    pub fn merge_lineages(
        &self,
        lineage_ids: &[LineageId],
        mappings: &[PersonMapping],
        resolutions: &FieldResolutions,
        options: &MergeOptions,
    ) -> Result<MergeResult, LineageServiceError> {
        let mut sources = Vec::with_capacity(lineage_ids.len());
        for lineage_id in lineage_ids {
            sources.push(self.load_source(*lineage_id)?);
        }
        MergeCoordinator::new(&self.store)
            .merge(&sources, mappings, resolutions, options)
            .map_err(Into::into)
    }

    fn require_lineage(&self, lineage_id: LineageId) -> Result<Lineage, LineageServiceError> {
        self.store
            .get_lineage(lineage_id)?
            .ok_or(LineageServiceError::LineageNotFound(lineage_id))
    }
}

fn normalize_name(value: String) -> Result<String, LineageServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LineageServiceError::InvalidName);
    }
    Ok(trimmed.to_string())
}
