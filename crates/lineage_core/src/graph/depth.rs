//! Generation depth, branch isolation and cycle verification.
//!
//! # Responsibility
//! - Derive per-node depth for filtering and match plausibility checks.
//! - Isolate one root's lineage branch.
//! - Detect parent-edge cycles before anything assumes a DAG.
//!
//! # Invariants
//! - Stored `generation_number` always wins over derived depth.
//! - Nodes without a generation number are never hidden by depth filters.
//! - Parent ids that are not part of `nodes` are ignored.

use crate::graph::{index_nodes, GraphNode};
use crate::model::person::PersonId;
use std::collections::{HashMap, HashSet, VecDeque};

/// Computes a depth per node.
///
/// Nodes with a stored generation number get it; roots (no parent inside
/// `nodes`) without one get 0; every other node gets its first-reached
/// parent's depth + 1 by breadth-first traversal from the seeded nodes,
/// saturating at `i32::MAX`.
/// Nodes reachable only through a parent cycle stay absent.
pub fn compute_depth(nodes: &[GraphNode]) -> HashMap<PersonId, i32> {
    let index = index_nodes(nodes);
    let mut depth = HashMap::with_capacity(nodes.len());
    let mut queue = VecDeque::new();

    for node in nodes {
        let is_root = !node
            .rels
            .parents
            .iter()
            .any(|parent| index.contains_key(parent));
        let seeded = match node.data.generation_number {
            Some(generation) => Some(generation),
            None if is_root => Some(0),
            None => None,
        };
        if let Some(value) = seeded {
            depth.insert(node.id, value);
            queue.push_back(node.id);
        }
    }

    while let Some(current) = queue.pop_front() {
        let Some(&position) = index.get(&current) else {
            continue;
        };
        let current_depth = depth[&current];
        for child in &nodes[position].rels.children {
            if !index.contains_key(child) || depth.contains_key(child) {
                continue;
            }
            depth.insert(*child, current_depth.saturating_add(1));
            queue.push_back(*child);
        }
    }

    depth
}

/// Highest stored generation number, or 1 when none is recorded.
pub fn max_generation(nodes: &[GraphNode]) -> i32 {
    nodes
        .iter()
        .filter_map(|node| node.data.generation_number)
        .filter(|generation| *generation > 0)
        .max()
        .unwrap_or(1)
}

/// Keeps nodes with `generation_number <= max_depth` or no generation number.
pub fn filter_by_depth(nodes: &[GraphNode], max_depth: i32) -> Vec<GraphNode> {
    nodes
        .iter()
        .filter(|node| {
            node.data
                .generation_number
                .map_or(true, |generation| generation <= max_depth)
        })
        .cloned()
        .collect()
}

/// Keeps `root_id`, all its descendants and the direct spouses of each of them.
///
/// Spouses are included but not traversed further. Unknown roots yield an
/// empty projection.
pub fn filter_by_branch(nodes: &[GraphNode], root_id: PersonId) -> Vec<GraphNode> {
    let included = branch_members(nodes, root_id);
    nodes
        .iter()
        .filter(|node| included.contains(&node.id))
        .cloned()
        .collect()
}

/// Ids selected by [`filter_by_branch`].
pub fn branch_members(nodes: &[GraphNode], root_id: PersonId) -> HashSet<PersonId> {
    let index = index_nodes(nodes);
    let mut included = HashSet::new();
    if !index.contains_key(&root_id) {
        return included;
    }

    let mut visited = HashSet::from([root_id]);
    let mut queue = VecDeque::from([root_id]);
    while let Some(current) = queue.pop_front() {
        included.insert(current);
        let Some(&position) = index.get(&current) else {
            continue;
        };
        let node = &nodes[position];
        for spouse in &node.rels.spouses {
            if index.contains_key(spouse) {
                included.insert(*spouse);
            }
        }
        for child in &node.rels.children {
            if visited.insert(*child) {
                queue.push_back(*child);
            }
        }
    }
    included
}

/// Returns one parent -> child cycle as an id path, if any exists.
///
/// The returned path starts and ends at the same id.
pub fn find_parent_cycle(nodes: &[GraphNode]) -> Option<Vec<PersonId>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        OnStack,
        Done,
    }

    let index = index_nodes(nodes);
    let mut marks = vec![Mark::Unvisited; nodes.len()];

    for start in 0..nodes.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        // (node position, next child cursor)
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        marks[start] = Mark::OnStack;

        while let Some(top) = stack.last_mut() {
            let (position, cursor) = *top;
            let children = &nodes[position].rels.children;
            if cursor >= children.len() {
                marks[position] = Mark::Done;
                stack.pop();
                continue;
            }
            top.1 += 1;
            let child_id = children[cursor];

            let Some(&child) = index.get(&child_id) else {
                continue;
            };
            match marks[child] {
                Mark::Unvisited => {
                    marks[child] = Mark::OnStack;
                    stack.push((child, 0));
                }
                Mark::OnStack => {
                    let from = stack
                        .iter()
                        .position(|(entry, _)| *entry == child)
                        .unwrap_or(0);
                    let mut cycle: Vec<PersonId> = stack[from..]
                        .iter()
                        .map(|(entry, _)| nodes[*entry].id)
                        .collect();
                    cycle.push(child_id);
                    return Some(cycle);
                }
                Mark::Done => {}
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{compute_depth, find_parent_cycle, max_generation};
    use crate::graph::builder::build;
    use crate::model::person::Person;
    use crate::model::relationship::{Relationship, RelationshipType};
    use uuid::Uuid;

    fn chain(generations: &[Option<i32>]) -> (Vec<Person>, Vec<Relationship>) {
        let lineage = Uuid::new_v4();
        let persons: Vec<Person> = generations
            .iter()
            .enumerate()
            .map(|(position, generation)| {
                let mut person = Person::new(lineage, format!("P{position}"));
                person.generation_number = *generation;
                person
            })
            .collect();
        let rows = persons
            .windows(2)
            .map(|pair| {
                Relationship::parent(
                    lineage,
                    RelationshipType::BiologicalParent,
                    pair[0].id,
                    pair[1].id,
                )
            })
            .collect();
        (persons, rows)
    }

    #[test]
    fn depth_prefers_stored_generation_and_fills_gaps() {
        let (persons, rows) = chain(&[Some(3), None, Some(9), None]);
        let graph = build(&persons, &rows);
        let depth = compute_depth(&graph.nodes);

        assert_eq!(depth[&persons[0].id], 3);
        assert_eq!(depth[&persons[1].id], 4);
        assert_eq!(depth[&persons[2].id], 9);
        assert_eq!(depth[&persons[3].id], 10);
    }

    #[test]
    fn root_without_generation_starts_at_zero() {
        let (persons, rows) = chain(&[None, None]);
        let graph = build(&persons, &rows);
        let depth = compute_depth(&graph.nodes);
        assert_eq!(depth[&persons[0].id], 0);
        assert_eq!(depth[&persons[1].id], 1);
    }

    #[test]
    fn child_of_maximal_generation_saturates() {
        let (persons, rows) = chain(&[Some(i32::MAX), None]);
        let graph = build(&persons, &rows);
        let depth = compute_depth(&graph.nodes);
        assert_eq!(depth[&persons[0].id], i32::MAX);
        assert_eq!(depth[&persons[1].id], i32::MAX);
    }

    #[test]
    fn cycle_is_reported_and_depth_terminates() {
        let (persons, mut rows) = chain(&[None, None, None]);
        rows.push(Relationship::parent(
            persons[0].lineage_id,
            RelationshipType::BiologicalParent,
            persons[2].id,
            persons[0].id,
        ));
        let graph = build(&persons, &rows);
        assert!(graph.diagnostics.has_parent_cycle);

        let cycle = find_parent_cycle(&graph.nodes).expect("cycle should be found");
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);

        assert!(compute_depth(&graph.nodes).is_empty());
    }

    #[test]
    fn max_generation_defaults_to_one() {
        let (persons, rows) = chain(&[None, None]);
        assert_eq!(max_generation(&build(&persons, &rows).nodes), 1);
        let (persons, rows) = chain(&[Some(1), Some(5)]);
        assert_eq!(max_generation(&build(&persons, &rows).nodes), 5);
    }
}
