//! Graph builder: flat rows -> bidirectional adjacency.
//!
//! # Responsibility
//! - Build one `GraphNode` per person, in input order.
//! - Classify every traversable edge into an `EdgeCategory`.
//!
//! # Invariants
//! - Dangling rows are skipped and counted, never fatal.
//! - Each edge appears exactly once in each endpoint's `rels`.
//! - Category of a pair does not depend on row order.

use crate::graph::depth::find_parent_cycle;
use crate::graph::{
    index_nodes, push_unique, BuildDiagnostics, EdgeKey, FamilyGraph, GraphNode, Rels,
};
use crate::model::person::Person;
use crate::model::relationship::{Relationship, RelationshipKind};
use log::{debug, info};
use std::collections::{HashMap, HashSet};

/// Builds a family graph from persons and relationship rows.
pub fn build(persons: &[Person], relationships: &[Relationship]) -> FamilyGraph {
    let mut diagnostics = BuildDiagnostics::default();
    let mut nodes: Vec<GraphNode> = Vec::with_capacity(persons.len());
    let mut seen = HashSet::with_capacity(persons.len());
    for person in persons {
        if !seen.insert(person.id) {
            diagnostics.duplicate_persons += 1;
            continue;
        }
        nodes.push(GraphNode {
            id: person.id,
            data: person.clone(),
            rels: Rels::default(),
        });
    }

    let index = index_nodes(&nodes);
    let mut edge_categories = HashMap::new();

    for row in relationships {
        let from = row.from_person_id;
        let to = row.to_person_id;
        let (Some(&from_idx), Some(&to_idx)) = (index.get(&from), index.get(&to)) else {
            diagnostics.skipped_edges += 1;
            continue;
        };
        if from == to {
            diagnostics.skipped_edges += 1;
            continue;
        }

        let kind = row.kind();
        match kind {
            RelationshipKind::Sibling => {
                diagnostics.derived_only_rows += 1;
                continue;
            }
            RelationshipKind::Other => {
                diagnostics.unlinked_rows += 1;
                continue;
            }
            RelationshipKind::Parent | RelationshipKind::Spouse => {}
        }

        let category = row.relationship_type.edge_category();
        edge_categories
            .entry(EdgeKey::new(from, to))
            .and_modify(|current| {
                if category < *current {
                    *current = category;
                }
            })
            .or_insert(category);

        match kind {
            RelationshipKind::Parent => {
                let added_child = push_unique(&mut nodes[from_idx].rels.children, to);
                let added_parent = push_unique(&mut nodes[to_idx].rels.parents, from);
                if !added_child && !added_parent {
                    diagnostics.duplicate_edges += 1;
                }
            }
            RelationshipKind::Spouse => {
                let added_forward = push_unique(&mut nodes[from_idx].rels.spouses, to);
                let added_back = push_unique(&mut nodes[to_idx].rels.spouses, from);
                if !added_forward && !added_back {
                    diagnostics.duplicate_edges += 1;
                }
            }
            RelationshipKind::Sibling | RelationshipKind::Other => {}
        }
    }

    diagnostics.has_parent_cycle = find_parent_cycle(&nodes).is_some();

    if diagnostics.skipped_edges > 0 {
        debug!(
            "event=graph_build module=graph status=warn skipped_edges={}",
            diagnostics.skipped_edges
        );
    }
    info!(
        "event=graph_build module=graph status=ok nodes={} edges={} skipped_edges={} duplicate_edges={} parent_cycle={}",
        nodes.len(),
        edge_categories.len(),
        diagnostics.skipped_edges,
        diagnostics.duplicate_edges,
        diagnostics.has_parent_cycle
    );

    FamilyGraph {
        nodes,
        edge_categories,
        diagnostics,
    }
}
