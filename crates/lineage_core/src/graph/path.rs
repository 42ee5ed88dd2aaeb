//! Kinship queries over built graph nodes.
//!
//! # Responsibility
//! - Find the shortest relationship path between two persons.
//! - Validate candidate spouse links before they are written.
//! - Derive siblings from shared parents.

use crate::graph::{index_nodes, push_unique, GraphNode};
use crate::model::person::PersonId;
use std::collections::{HashMap, VecDeque};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Edge direction taken by one path step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEdge {
    /// Moved from a child to one of its parents.
    Parent,
    /// Moved from a parent to one of its children.
    Child,
    Spouse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStep {
    /// Person reached by this step.
    pub person_id: PersonId,
    pub edge: PathEdge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipPath {
    pub steps: Vec<PathStep>,
    /// Parent steps minus child steps; positive means `to` sits in an older
    /// generation than `from`.
    pub generation_delta: i32,
}

impl RelationshipPath {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns whether the path uses at least one spouse edge.
    pub fn through_marriage(&self) -> bool {
        self.steps.iter().any(|step| step.edge == PathEdge::Spouse)
    }
}

/// Shortest path from `from` to `to` over parent, child and spouse edges.
///
/// Returns an empty path when `from == to` and `None` when either id is
/// unknown or the persons are not connected.
pub fn find_relationship_path(
    nodes: &[GraphNode],
    from: PersonId,
    to: PersonId,
) -> Option<RelationshipPath> {
    let index = index_nodes(nodes);
    if !index.contains_key(&from) || !index.contains_key(&to) {
        return None;
    }
    if from == to {
        return Some(RelationshipPath {
            steps: Vec::new(),
            generation_delta: 0,
        });
    }

    let mut came_from: HashMap<PersonId, (PersonId, PathEdge)> = HashMap::new();
    let mut queue = VecDeque::from([from]);
    while let Some(current) = queue.pop_front() {
        let Some(&position) = index.get(&current) else {
            continue;
        };
        let rels = &nodes[position].rels;
        let neighbors = rels
            .parents
            .iter()
            .map(|id| (*id, PathEdge::Parent))
            .chain(rels.children.iter().map(|id| (*id, PathEdge::Child)))
            .chain(rels.spouses.iter().map(|id| (*id, PathEdge::Spouse)));

        for (neighbor, edge) in neighbors {
            if neighbor == from || came_from.contains_key(&neighbor) {
                continue;
            }
            came_from.insert(neighbor, (current, edge));
            if neighbor == to {
                return Some(unwind(&came_from, from, to));
            }
            queue.push_back(neighbor);
        }
    }
    None
}

fn unwind(
    came_from: &HashMap<PersonId, (PersonId, PathEdge)>,
    from: PersonId,
    to: PersonId,
) -> RelationshipPath {
    let mut steps = Vec::new();
    let mut cursor = to;
    while cursor != from {
        let Some(&(previous, edge)) = came_from.get(&cursor) else {
            break;
        };
        steps.push(PathStep {
            person_id: cursor,
            edge,
        });
        cursor = previous;
    }
    steps.reverse();

    let generation_delta = steps
        .iter()
        .map(|step| match step.edge {
            PathEdge::Parent => 1,
            PathEdge::Child => -1,
            PathEdge::Spouse => 0,
        })
        .sum();
    RelationshipPath {
        steps,
        generation_delta,
    }
}

/// Reasons a spouse link is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpouseLinkError {
    SelfLink,
    PersonNotFound(PersonId),
    AlreadySpouses,
    DirectParentChild,
}

impl Display for SpouseLinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfLink => write!(f, "a person cannot be linked to themselves"),
            Self::PersonNotFound(id) => write!(f, "person not found: {id}"),
            Self::AlreadySpouses => write!(f, "persons are already spouses"),
            Self::DirectParentChild => {
                write!(f, "direct parent and child cannot be linked as spouses")
            }
        }
    }
}

impl Error for SpouseLinkError {}

/// Checks whether `person_id` and `candidate_id` may be linked as spouses.
pub fn can_link_as_spouse(
    nodes: &[GraphNode],
    person_id: PersonId,
    candidate_id: PersonId,
) -> Result<(), SpouseLinkError> {
    if person_id == candidate_id {
        return Err(SpouseLinkError::SelfLink);
    }
    let index = index_nodes(nodes);
    let person = index
        .get(&person_id)
        .map(|position| &nodes[*position])
        .ok_or(SpouseLinkError::PersonNotFound(person_id))?;
    if !index.contains_key(&candidate_id) {
        return Err(SpouseLinkError::PersonNotFound(candidate_id));
    }

    if person.rels.spouses.contains(&candidate_id) {
        return Err(SpouseLinkError::AlreadySpouses);
    }
    if person.rels.parents.contains(&candidate_id) || person.rels.children.contains(&candidate_id)
    {
        return Err(SpouseLinkError::DirectParentChild);
    }
    Ok(())
}

/// Persons sharing at least one parent with `person_id`, in first-seen order.
///
/// Siblings are always derived here; no sibling edge is ever stored in the
/// graph.
pub fn siblings_of(nodes: &[GraphNode], person_id: PersonId) -> Vec<PersonId> {
    let index = index_nodes(nodes);
    let Some(&position) = index.get(&person_id) else {
        return Vec::new();
    };

    let mut siblings = Vec::new();
    for parent in &nodes[position].rels.parents {
        let Some(&parent_position) = index.get(parent) else {
            continue;
        };
        for child in &nodes[parent_position].rels.children {
            if *child != person_id {
                push_unique(&mut siblings, *child);
            }
        }
    }
    siblings
}
