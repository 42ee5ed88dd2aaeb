//! Family-tree graph engine.
//!
//! # Responsibility
//! - Turn flat person/relationship rows into adjacency-based graph nodes.
//! - Provide pure derived views (depth, branch, collapse, paths) over nodes.
//!
//! # Invariants
//! - `b in a.rels.children` iff `a in b.rels.parents`; spouse lists are
//!   symmetric.
//! - Views never mutate their input; they return new projections.
//! - Every traversal keeps a visited set, so cyclic data cannot hang it.

use crate::model::person::{Person, PersonId};
use crate::model::relationship::EdgeCategory;
use std::collections::HashMap;
use std::hash::Hash;

pub mod builder;
pub mod collapse;
pub mod combined;
pub mod depth;
pub mod kinship;
pub mod path;

/// Adjacency lists of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rels<Id = PersonId> {
    pub parents: Vec<Id>,
    pub children: Vec<Id>,
    pub spouses: Vec<Id>,
}

impl<Id> Default for Rels<Id> {
    fn default() -> Self {
        Self {
            parents: Vec::new(),
            children: Vec::new(),
            spouses: Vec::new(),
        }
    }
}

/// One person in a built family graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: PersonId,
    pub data: Person,
    pub rels: Rels,
}

/// Unordered person pair used to key edge categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeKey<Id = PersonId> {
    low: Id,
    high: Id,
}

impl<Id: Ord + Copy> EdgeKey<Id> {
    pub fn new(a: Id, b: Id) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn endpoints(&self) -> (Id, Id) {
        (self.low, self.high)
    }
}

/// Counters describing what the builder could not turn into edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildDiagnostics {
    /// Rows whose endpoint is missing from the person set, or self links.
    pub skipped_edges: usize,
    /// Rows that encode an edge already present.
    pub duplicate_edges: usize,
    /// Sibling rows; siblings are derived from shared parents instead.
    pub derived_only_rows: usize,
    /// Guardian/unknown rows: neither traversable nor categorized.
    pub unlinked_rows: usize,
    /// Person rows repeating an id already seen.
    pub duplicate_persons: usize,
    /// Parent edges form at least one cycle.
    pub has_parent_cycle: bool,
}

/// Output of the graph builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyGraph {
    pub nodes: Vec<GraphNode>,
    pub edge_categories: HashMap<EdgeKey, EdgeCategory>,
    pub diagnostics: BuildDiagnostics,
}

impl FamilyGraph {
    pub fn node(&self, id: PersonId) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Rendering category of the edge between `a` and `b`, if any.
    pub fn edge_category(&self, a: PersonId, b: PersonId) -> Option<EdgeCategory> {
        self.edge_categories.get(&EdgeKey::new(a, b)).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Arena-style lookup from id to position in `nodes`.
pub(crate) fn index_nodes(nodes: &[GraphNode]) -> HashMap<PersonId, usize> {
    index_by(nodes, |node| node.id)
}

pub(crate) fn index_by<T, Id: Eq + Hash>(
    items: &[T],
    id_of: impl Fn(&T) -> Id,
) -> HashMap<Id, usize> {
    let mut index = HashMap::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        index.entry(id_of(item)).or_insert(position);
    }
    index
}

/// Appends `value` unless already present. Keeps first-seen order.
pub(crate) fn push_unique<Id: PartialEq>(list: &mut Vec<Id>, value: Id) -> bool {
    if list.contains(&value) {
        return false;
    }
    list.push(value);
    true
}
