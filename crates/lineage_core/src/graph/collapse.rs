//! Subtree collapse projection.
//!
//! # Invariants
//! - A collapsed node itself stays visible; only its descendants (and their
//!   direct spouses) are hidden.
//! - Each hidden id is counted once, under the first collapsed node (in node
//!   order) that hides it.
//! - The input nodes are never modified.

use crate::graph::{index_nodes, GraphNode};
use crate::model::person::PersonId;
use std::collections::{HashMap, HashSet, VecDeque};

/// Result of [`filter_by_collapsed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapsedView {
    pub filtered: Vec<GraphNode>,
    /// Hidden id count per collapsed node, for UI badges.
    pub hidden_counts: HashMap<PersonId, usize>,
}

/// Hides all descendants of every collapsed node plus each hidden
/// descendant's direct spouses.
///
/// A spouse that is itself a collapsed node is not hidden through marriage.
/// Visible nodes that lost children get a `rels.children` list without the
/// hidden ids.
pub fn filter_by_collapsed(
    nodes: &[GraphNode],
    collapsed_ids: &HashSet<PersonId>,
) -> CollapsedView {
    if collapsed_ids.is_empty() {
        return CollapsedView {
            filtered: nodes.to_vec(),
            hidden_counts: HashMap::new(),
        };
    }

    let index = index_nodes(nodes);
    let mut hidden: HashSet<PersonId> = HashSet::new();
    let mut hidden_counts = HashMap::new();

    for root in nodes.iter().filter(|node| collapsed_ids.contains(&node.id)) {
        let mut count = 0usize;
        let mut queued: HashSet<PersonId> = HashSet::from([root.id]);
        let mut queue: VecDeque<PersonId> = VecDeque::new();
        for child in &root.rels.children {
            if queued.insert(*child) {
                queue.push_back(*child);
            }
        }

        while let Some(current) = queue.pop_front() {
            let Some(&position) = index.get(&current) else {
                continue;
            };
            if hidden.insert(current) {
                count += 1;
            }
            let node = &nodes[position];

            for spouse in &node.rels.spouses {
                if *spouse == root.id
                    || collapsed_ids.contains(spouse)
                    || !index.contains_key(spouse)
                {
                    continue;
                }
                if hidden.insert(*spouse) {
                    count += 1;
                }
            }
            for child in &node.rels.children {
                if *child != root.id && queued.insert(*child) {
                    queue.push_back(*child);
                }
            }
        }

        hidden_counts.insert(root.id, count);
    }

    let filtered = nodes
        .iter()
        .filter(|node| !hidden.contains(&node.id))
        .map(|node| {
            if !node.rels.children.iter().any(|child| hidden.contains(child)) {
                return node.clone();
            }
            let mut projected = node.clone();
            projected
                .rels
                .children
                .retain(|child| !hidden.contains(child));
            projected
        })
        .collect();

    CollapsedView {
        filtered,
        hidden_counts,
    }
}
