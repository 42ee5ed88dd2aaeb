//! Multi-lineage view for side-by-side rendering of several trees.
//!
//! # Responsibility
//! - Namespace node ids so persons from different trees cannot collide.
//! - Collapse confirmed duplicates into their primary node for display.
//!
//! # Invariants
//! - View-only: nothing produced here is written back to a store.
//! - The first source is the primary tree; nodes of later sources are marked
//!   external.

use crate::graph::{index_by, push_unique, EdgeKey, FamilyGraph, Rels};
use crate::merge::PersonMapping;
use crate::model::person::{LineageId, NamespacedId, Person, PersonId};
use crate::model::relationship::EdgeCategory;
use std::collections::{HashMap, HashSet};

/// One tree prepared for combined rendering.
#[derive(Debug, Clone)]
pub struct LineageSource {
    pub lineage_id: LineageId,
    pub lineage_name: String,
    pub display_color: String,
    pub graph: FamilyGraph,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedNode {
    pub id: NamespacedId,
    pub data: Person,
    pub display_color: String,
    /// Short badge derived from the lineage name.
    pub lineage_badge: String,
    pub is_external: bool,
    pub rels: Rels<NamespacedId>,
}

#[derive(Debug, Clone, Default)]
pub struct CombinedGraph {
    pub nodes: Vec<CombinedNode>,
    pub edge_categories: HashMap<EdgeKey<NamespacedId>, EdgeCategory>,
}

impl CombinedGraph {
    pub fn node(&self, id: NamespacedId) -> Option<&CombinedNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

/// Merges several built graphs into one namespaced view.
///
/// Mappings whose ids are unknown are ignored; a candidate mapped more than
/// once keeps its first mapping, and a mapping that would close a cycle is
/// dropped.
pub fn combine_lineages(sources: &[LineageSource], mappings: &[PersonMapping]) -> CombinedGraph {
    let known: HashSet<NamespacedId> = sources
        .iter()
        .flat_map(|source| {
            source
                .graph
                .nodes
                .iter()
                .map(move |node| NamespacedId::new(source.lineage_id, node.id))
        })
        .collect();

    let mut redirect: HashMap<NamespacedId, NamespacedId> = HashMap::new();
    for mapping in mappings {
        if mapping.primary == mapping.candidate
            || !known.contains(&mapping.primary)
            || !known.contains(&mapping.candidate)
        {
            continue;
        }
        if redirect.contains_key(&mapping.candidate)
            || resolve_redirect(&redirect, mapping.primary) == mapping.candidate
        {
            continue;
        }
        redirect.insert(mapping.candidate, mapping.primary);
    }
    let resolve = |id: NamespacedId| resolve_redirect(&redirect, id);

    let mut nodes: Vec<CombinedNode> = Vec::new();
    for (position, source) in sources.iter().enumerate() {
        let badge = lineage_badge(&source.lineage_name);
        for node in &source.graph.nodes {
            let id = NamespacedId::new(source.lineage_id, node.id);
            if resolve(id) != id {
                continue;
            }
            nodes.push(CombinedNode {
                id,
                data: node.data.clone(),
                display_color: source.display_color.clone(),
                lineage_badge: badge.clone(),
                is_external: position > 0,
                rels: Rels::default(),
            });
        }
    }

    let index = index_by(&nodes, |node| node.id);
    let mut edge_categories = HashMap::new();
    for source in sources {
        let lineage_id = source.lineage_id;
        for node in &source.graph.nodes {
            let owner = resolve(NamespacedId::new(lineage_id, node.id));
            let Some(&position) = index.get(&owner) else {
                continue;
            };
            let remap = |ids: &[PersonId]| -> Vec<NamespacedId> {
                ids.iter()
                    .map(|id| resolve(NamespacedId::new(lineage_id, *id)))
                    .filter(|id| *id != owner)
                    .collect()
            };
            let parents = remap(&node.rels.parents);
            let children = remap(&node.rels.children);
            let spouses = remap(&node.rels.spouses);

            let rels = &mut nodes[position].rels;
            for id in parents {
                push_unique(&mut rels.parents, id);
            }
            for id in children {
                push_unique(&mut rels.children, id);
            }
            for id in spouses {
                push_unique(&mut rels.spouses, id);
            }
        }

        for (key, category) in &source.graph.edge_categories {
            let (a, b) = key.endpoints();
            let a = resolve(NamespacedId::new(lineage_id, a));
            let b = resolve(NamespacedId::new(lineage_id, b));
            if a == b {
                continue;
            }
            edge_categories
                .entry(EdgeKey::new(a, b))
                .and_modify(|current: &mut EdgeCategory| {
                    if *category < *current {
                        *current = *category;
                    }
                })
                .or_insert(*category);
        }
    }

    CombinedGraph {
        nodes,
        edge_categories,
    }
}

fn resolve_redirect(
    redirect: &HashMap<NamespacedId, NamespacedId>,
    id: NamespacedId,
) -> NamespacedId {
    let mut current = id;
    let mut visited = HashSet::from([id]);
    while let Some(next) = redirect.get(&current) {
        if !visited.insert(*next) {
            break;
        }
        current = *next;
    }
    current
}

/// Two-letter badge: initials of the first two words, or the first two chars.
fn lineage_badge(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    if words.len() >= 2 {
        return words[..2]
            .iter()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .collect();
    }
    name.trim().chars().take(2).flat_map(char::to_uppercase).collect()
}

#[cfg(test)]
mod tests {
    use super::{combine_lineages, lineage_badge, LineageSource};
    use crate::graph::builder::build;
    use crate::merge::PersonMapping;
    use crate::model::person::{NamespacedId, Person};
    use crate::model::relationship::{EdgeCategory, Relationship, RelationshipType};
    use uuid::Uuid;

    fn source(name: &str, persons: &[Person], rows: &[Relationship]) -> LineageSource {
        LineageSource {
            lineage_id: persons[0].lineage_id,
            lineage_name: name.to_string(),
            display_color: "#336699".to_string(),
            graph: build(persons, rows),
        }
    }

    #[test]
    fn mapped_duplicate_collapses_into_primary_node() {
        let first_lineage = Uuid::new_v4();
        let second_lineage = Uuid::new_v4();
        let ancestor = Person::new(first_lineage, "An");
        let ancestor_copy = Person::new(second_lineage, "An");
        let child = Person::new(second_lineage, "Binh");
        let rows = vec![Relationship::parent(
            second_lineage,
            RelationshipType::AdoptiveParent,
            ancestor_copy.id,
            child.id,
        )];

        let sources = vec![
            source("Nguyen Family", std::slice::from_ref(&ancestor), &[]),
            source("Tran", &[ancestor_copy.clone(), child.clone()], &rows),
        ];
        let mappings = vec![PersonMapping::new(
            ancestor.namespaced_id(),
            ancestor_copy.namespaced_id(),
        )];
        let combined = combine_lineages(&sources, &mappings);

        assert_eq!(combined.nodes.len(), 2);
        let primary = combined
            .node(ancestor.namespaced_id())
            .expect("primary node should exist");
        assert_eq!(primary.rels.children, vec![child.namespaced_id()]);
        assert_eq!(primary.lineage_badge, "NF");
        assert!(!primary.is_external);

        let external = combined.node(child.namespaced_id()).expect("child node");
        assert!(external.is_external);
        assert_eq!(external.rels.parents, vec![ancestor.namespaced_id()]);
        assert_eq!(
            combined.edge_categories.get(&crate::graph::EdgeKey::new(
                ancestor.namespaced_id(),
                child.namespaced_id()
            )),
            Some(&EdgeCategory::Adoptive)
        );
        assert!(combined
            .node(NamespacedId::new(second_lineage, ancestor_copy.id))
            .is_none());
    }

    #[test]
    fn badge_uses_initials_or_prefix() {
        assert_eq!(lineage_badge("họ Lê làng Đông"), "HL");
        assert_eq!(lineage_badge("tran"), "TR");
    }
}
