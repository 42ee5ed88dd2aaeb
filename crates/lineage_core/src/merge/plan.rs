//! Pure merge planning.
//!
//! # Responsibility
//! - Re-key absorbed persons: mapped candidates fold into their primary,
//!   unmapped persons get fresh ids under the target lineage.
//! - Reconcile person fields of mapped pairs and report unresolved conflicts.
//! - Union relationships after re-keying, collapsing duplicate edges.
//!
//! # Invariants
//! - Target persons keep their ids; no fresh id collides with them.
//! - No output relationship references a mapped-away candidate id.
//! - Absorbed sibling rows are dropped, never re-created.
//! - An unresolved differing field keeps the primary's value.
//! - A date without any year, month or text is blank and never conflicts.

use crate::merge::PersonMapping;
use crate::model::date::FlexibleDate;
use crate::model::person::{Gender, LineageId, NamespacedId, Person, PersonId};
use crate::model::relationship::{EdgeCategory, Relationship, RelationshipKind, RelationshipType};
use crate::repo::store::MergeWrite;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::iter;
use uuid::Uuid;

/// One lineage's records as loaded for a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSource {
    pub lineage_id: LineageId,
    pub persons: Vec<Person>,
    pub relationships: Vec<Relationship>,
}

/// Person field that needs an explicit decision when a mapped pair disagrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvableField {
    FamilyName,
    MiddleName,
    GivenName,
    CommonName,
    Gender,
    IsAlive,
    Biography,
    Notes,
    BirthPlace,
    DeathPlace,
    HonorificName,
    PosthumousName,
    ReligiousName,
    HanNomName,
    BurialPlace,
    GenerationNumber,
    BirthDate,
    DeathDate,
}

impl ResolvableField {
    pub const ALL: [ResolvableField; 18] = [
        Self::FamilyName,
        Self::MiddleName,
        Self::GivenName,
        Self::CommonName,
        Self::Gender,
        Self::IsAlive,
        Self::Biography,
        Self::Notes,
        Self::BirthPlace,
        Self::DeathPlace,
        Self::HonorificName,
        Self::PosthumousName,
        Self::ReligiousName,
        Self::HanNomName,
        Self::BurialPlace,
        Self::GenerationNumber,
        Self::BirthDate,
        Self::DeathDate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FamilyName => "family_name",
            Self::MiddleName => "middle_name",
            Self::GivenName => "given_name",
            Self::CommonName => "common_name",
            Self::Gender => "gender",
            Self::IsAlive => "is_alive",
            Self::Biography => "biography",
            Self::Notes => "notes",
            Self::BirthPlace => "birth_place",
            Self::DeathPlace => "death_place",
            Self::HonorificName => "honorific_name",
            Self::PosthumousName => "posthumous_name",
            Self::ReligiousName => "religious_name",
            Self::HanNomName => "han_nom_name",
            Self::BurialPlace => "burial_place",
            Self::GenerationNumber => "generation_number",
            Self::BirthDate => "birth_date",
            Self::DeathDate => "death_date",
        }
    }
}

/// Side chosen for one conflicting field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldChoice {
    /// Keep the primary person's value.
    Source,
    /// Adopt the absorbed candidate's value.
    Target,
}

pub type FieldChoices = HashMap<ResolvableField, FieldChoice>;

/// Field decisions keyed by the mapping's primary namespaced id.
pub type FieldResolutions = HashMap<NamespacedId, FieldChoices>;

/// Mapped pair whose differing fields had no decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConflict {
    pub primary: NamespacedId,
    pub candidate: NamespacedId,
    pub fields: Vec<ResolvableField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    UnknownPrimary,
    UnknownCandidate,
    SameLineage,
    /// The candidate already folds into another primary.
    CandidateAlreadyMapped,
    /// The candidate's lineage precedes the primary's in source order.
    CandidateBeforePrimary,
}

/// Mapping that was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedMapping {
    pub mapping: PersonMapping,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Absorbed persons imported as new target persons.
    pub persons_merged: usize,
    /// Absorbed relationships imported after re-keying.
    pub relationships_merged: usize,
    /// Mapped candidates folded into their primary.
    pub duplicates_resolved: usize,
    pub duplicate_edges_collapsed: usize,
    pub sibling_rows_dropped: usize,
    pub dangling_rows_dropped: usize,
    pub self_links_dropped: usize,
}

/// Complete, not yet persisted merge outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    pub target_lineage_id: LineageId,
    /// Final person id for every source person, keyed by its namespaced id.
    pub id_map: HashMap<NamespacedId, PersonId>,
    /// Consolidated persons: target persons first, then imported ones.
    pub persons: Vec<Person>,
    /// Consolidated relationships: target rows first, then imported ones.
    pub relationships: Vec<Relationship>,
    pub updated_persons: Vec<Person>,
    pub created_persons: Vec<Person>,
    pub created_relationships: Vec<Relationship>,
    pub conflicts: Vec<FieldConflict>,
    pub rejected_mappings: Vec<RejectedMapping>,
    pub stats: MergeStats,
}

impl MergePlan {
    /// Store payload persisting this plan.
    pub fn write(&self) -> MergeWrite<'_> {
        MergeWrite {
            target_lineage_id: self.target_lineage_id,
            updated_persons: &self.updated_persons,
            created_persons: &self.created_persons,
            created_relationships: &self.created_relationships,
        }
    }

    /// Final id of one source person.
    pub fn resolve(&self, id: NamespacedId) -> Option<PersonId> {
        self.id_map.get(&id).copied()
    }
}

/// Plans folding `absorbed` lineages into `target`.
///
/// Source order matters: a mapping's primary must come from an earlier
/// source than its candidate, so chains always resolve toward the target.
pub fn plan_merge(
    target: &MergeSource,
    absorbed: &[MergeSource],
    mappings: &[PersonMapping],
    resolutions: &FieldResolutions,
) -> MergePlan {
    let sources: Vec<&MergeSource> = iter::once(target).chain(absorbed).collect();
    let target_lineage_id = target.lineage_id;

    let mut position_of: HashMap<NamespacedId, usize> = HashMap::new();
    for (position, source) in sources.iter().enumerate() {
        for person in &source.persons {
            position_of
                .entry(NamespacedId::new(source.lineage_id, person.id))
                .or_insert(position);
        }
    }
    let (accepted, rejected_mappings) = validate_mappings(mappings, &position_of);

    let mut stats = MergeStats::default();
    let mut id_map: HashMap<NamespacedId, PersonId> = HashMap::new();
    let mut slot_of: HashMap<PersonId, usize> = HashMap::new();
    let mut persons: Vec<Person> = Vec::new();
    let mut target_originals: Vec<&Person> = Vec::new();
    let mut conflicts = Vec::new();

    for (position, source) in sources.iter().enumerate() {
        for person in &source.persons {
            let id = NamespacedId::new(source.lineage_id, person.id);
            if id_map.contains_key(&id) {
                continue;
            }
            if position == 0 {
                id_map.insert(id, person.id);
                slot_of.insert(person.id, persons.len());
                persons.push(person.clone());
                target_originals.push(person);
                continue;
            }

            let folded = accepted.get(&id).and_then(|mapping| {
                let final_id = id_map.get(&mapping.primary)?;
                Some((*mapping, *final_id, *slot_of.get(final_id)?))
            });
            if let Some((mapping, final_id, slot)) = folded {
                id_map.insert(id, final_id);
                let unresolved =
                    absorb_fields(&mut persons[slot], person, resolutions.get(&mapping.primary));
                if !unresolved.is_empty() {
                    conflicts.push(FieldConflict {
                        primary: mapping.primary,
                        candidate: mapping.candidate,
                        fields: unresolved,
                    });
                }
                stats.duplicates_resolved += 1;
                continue;
            }

            let fresh_id = Uuid::new_v4();
            id_map.insert(id, fresh_id);
            slot_of.insert(fresh_id, persons.len());
            persons.push(Person {
                id: fresh_id,
                lineage_id: target_lineage_id,
                ..person.clone()
            });
        }
    }

    let target_count = target_originals.len();
    let updated_persons: Vec<Person> = persons[..target_count]
        .iter()
        .zip(target_originals)
        .filter(|(merged, original)| *merged != *original)
        .map(|(merged, _)| merged.clone())
        .collect();
    let created_persons: Vec<Person> = persons[target_count..].to_vec();
    stats.persons_merged = created_persons.len();

    let mut seen: HashSet<EdgeIdentity> = HashSet::new();
    let mut relationships: Vec<Relationship> = Vec::new();
    for row in &target.relationships {
        seen.insert(EdgeIdentity::of(
            row.from_person_id,
            row.to_person_id,
            row.relationship_type,
        ));
        relationships.push(row.clone());
    }

    let mut created_relationships = Vec::new();
    for source in sources.iter().skip(1) {
        for row in &source.relationships {
            if row.kind() == RelationshipKind::Sibling {
                stats.sibling_rows_dropped += 1;
                continue;
            }
            let from = id_map.get(&NamespacedId::new(source.lineage_id, row.from_person_id));
            let to = id_map.get(&NamespacedId::new(source.lineage_id, row.to_person_id));
            let (Some(&from), Some(&to)) = (from, to) else {
                stats.dangling_rows_dropped += 1;
                continue;
            };
            if from == to {
                stats.self_links_dropped += 1;
                continue;
            }
            if !seen.insert(EdgeIdentity::of(from, to, row.relationship_type)) {
                stats.duplicate_edges_collapsed += 1;
                continue;
            }
            let created = Relationship {
                id: Uuid::new_v4(),
                lineage_id: target_lineage_id,
                relationship_type: row.relationship_type,
                from_person_id: from,
                to_person_id: to,
                notes: row.notes.clone(),
            };
            relationships.push(created.clone());
            created_relationships.push(created);
        }
    }
    stats.relationships_merged = created_relationships.len();

    info!(
        "event=merge_plan module=merge status=ok target={} absorbed={} persons_merged={} relationships_merged={} duplicates_resolved={} conflicts={} rejected_mappings={}",
        target_lineage_id,
        absorbed.len(),
        stats.persons_merged,
        stats.relationships_merged,
        stats.duplicates_resolved,
        conflicts.len(),
        rejected_mappings.len()
    );

    MergePlan {
        target_lineage_id,
        id_map,
        persons,
        relationships,
        updated_persons,
        created_persons,
        created_relationships,
        conflicts,
        rejected_mappings,
        stats,
    }
}

fn validate_mappings(
    mappings: &[PersonMapping],
    position_of: &HashMap<NamespacedId, usize>,
) -> (HashMap<NamespacedId, PersonMapping>, Vec<RejectedMapping>) {
    let mut accepted: HashMap<NamespacedId, PersonMapping> = HashMap::new();
    let mut rejected = Vec::new();
    for mapping in mappings {
        let primary = position_of.get(&mapping.primary);
        let candidate = position_of.get(&mapping.candidate);
        let reason = match (primary, candidate) {
            (None, _) => Some(RejectReason::UnknownPrimary),
            (_, None) => Some(RejectReason::UnknownCandidate),
            _ if mapping.primary.lineage_id == mapping.candidate.lineage_id => {
                Some(RejectReason::SameLineage)
            }
            _ if accepted.contains_key(&mapping.candidate) => {
                Some(RejectReason::CandidateAlreadyMapped)
            }
            (Some(primary), Some(candidate)) if candidate <= primary => {
                Some(RejectReason::CandidateBeforePrimary)
            }
            _ => None,
        };
        match reason {
            Some(reason) => rejected.push(RejectedMapping {
                mapping: *mapping,
                reason,
            }),
            None => {
                accepted.insert(mapping.candidate, *mapping);
            }
        }
    }
    (accepted, rejected)
}

/// Deduplication identity of a relationship after re-keying.
///
/// Spouse edges are unordered; typed-but-untraversable rows keep their exact
/// type so a guardian row never collapses into an unknown one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct EdgeIdentity {
    from: PersonId,
    to: PersonId,
    category: EdgeCategory,
    exact_type: Option<RelationshipType>,
}

impl EdgeIdentity {
    fn of(from: PersonId, to: PersonId, relationship_type: RelationshipType) -> Self {
        let kind = relationship_type.kind();
        let (from, to) = if kind == RelationshipKind::Spouse && to < from {
            (to, from)
        } else {
            (from, to)
        };
        Self {
            from,
            to,
            category: relationship_type.edge_category(),
            exact_type: (kind != RelationshipKind::Parent && kind != RelationshipKind::Spouse)
                .then_some(relationship_type),
        }
    }
}

/// Folds `incoming` into `kept`; returns fields left unresolved.
fn absorb_fields(
    kept: &mut Person,
    incoming: &Person,
    choices: Option<&FieldChoices>,
) -> Vec<ResolvableField> {
    let mut merger = FieldMerger {
        choices,
        unresolved: Vec::new(),
    };
    merger.text(
        ResolvableField::FamilyName,
        &mut kept.family_name,
        &incoming.family_name,
    );
    merger.text(
        ResolvableField::MiddleName,
        &mut kept.middle_name,
        &incoming.middle_name,
    );
    merger.value(
        ResolvableField::GivenName,
        &mut kept.given_name,
        &incoming.given_name,
        |name| name.trim().is_empty(),
    );
    merger.text(
        ResolvableField::CommonName,
        &mut kept.common_name,
        &incoming.common_name,
    );
    merger.value(
        ResolvableField::Gender,
        &mut kept.gender,
        &incoming.gender,
        |gender: &Gender| !gender.is_known(),
    );
    merger.value(
        ResolvableField::IsAlive,
        &mut kept.is_alive,
        &incoming.is_alive,
        |_| false,
    );
    merger.text(
        ResolvableField::Biography,
        &mut kept.biography,
        &incoming.biography,
    );
    merger.text(ResolvableField::Notes, &mut kept.notes, &incoming.notes);
    merger.text(
        ResolvableField::BirthPlace,
        &mut kept.birth_place,
        &incoming.birth_place,
    );
    merger.text(
        ResolvableField::DeathPlace,
        &mut kept.death_place,
        &incoming.death_place,
    );

    merger.text(
        ResolvableField::HonorificName,
        &mut kept.honorific_name,
        &incoming.honorific_name,
    );
    merger.text(
        ResolvableField::PosthumousName,
        &mut kept.posthumous_name,
        &incoming.posthumous_name,
    );
    merger.text(
        ResolvableField::ReligiousName,
        &mut kept.religious_name,
        &incoming.religious_name,
    );
    merger.text(
        ResolvableField::HanNomName,
        &mut kept.han_nom_name,
        &incoming.han_nom_name,
    );
    merger.text(
        ResolvableField::BurialPlace,
        &mut kept.burial_place,
        &incoming.burial_place,
    );
    merger.value(
        ResolvableField::GenerationNumber,
        &mut kept.generation_number,
        &incoming.generation_number,
        |generation: &Option<i32>| generation.is_none(),
    );
    merger.value(
        ResolvableField::BirthDate,
        &mut kept.birth_date,
        &incoming.birth_date,
        blank_date,
    );
    merger.value(
        ResolvableField::DeathDate,
        &mut kept.death_date,
        &incoming.death_date,
        blank_date,
    );

    merger.unresolved
}

struct FieldMerger<'a> {
    choices: Option<&'a FieldChoices>,
    unresolved: Vec<ResolvableField>,
}

impl FieldMerger<'_> {
    fn text(&mut self, field: ResolvableField, kept: &mut Option<String>, incoming: &Option<String>) {
        if trimmed(kept) == trimmed(incoming) {
            return;
        }
        self.value(field, kept, incoming, |value| trimmed(value).is_none());
    }

    fn value<T: Clone + PartialEq>(
        &mut self,
        field: ResolvableField,
        kept: &mut T,
        incoming: &T,
        is_blank: impl Fn(&T) -> bool,
    ) {
        if is_blank(incoming) || kept == incoming {
            return;
        }
        if is_blank(kept) {
            *kept = incoming.clone();
            return;
        }
        match self.choices.and_then(|choices| choices.get(&field)) {
            Some(FieldChoice::Source) => {}
            Some(FieldChoice::Target) => *kept = incoming.clone(),
            None => self.unresolved.push(field),
        }
    }
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

fn blank_date(date: &Option<FlexibleDate>) -> bool {
    date.as_ref().map_or(true, FlexibleDate::is_empty)
}
