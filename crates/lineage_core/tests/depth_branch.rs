use lineage_core::graph::depth::{branch_members, max_generation};
use lineage_core::{
    build, compute_depth, filter_by_branch, filter_by_depth, FamilyGraph, Person, Relationship,
    RelationshipType,
};
use std::collections::HashSet;
use uuid::Uuid;

struct Family {
    graph: FamilyGraph,
    a: Person,
    b: Person,
    c: Person,
}

/// A (gen 1) -> B (gen 2), B married to C (gen 2).
fn three_person_family() -> Family {
    let lineage = Uuid::new_v4();
    let mut a = Person::new(lineage, "A");
    a.generation_number = Some(1);
    let mut b = Person::new(lineage, "B");
    b.generation_number = Some(2);
    let mut c = Person::new(lineage, "C");
    c.generation_number = Some(2);
    let rows = vec![
        Relationship::parent(lineage, RelationshipType::BiologicalParent, a.id, b.id),
        Relationship::new(lineage, RelationshipType::SpouseMarried, b.id, c.id),
    ];
    let graph = build(&[a.clone(), b.clone(), c.clone()], &rows);
    Family { graph, a, b, c }
}

#[test]
fn filter_by_depth_keeps_only_shallow_generations() {
    let family = three_person_family();

    let filtered = filter_by_depth(&family.graph.nodes, 1);

    let ids: Vec<Uuid> = filtered.iter().map(|node| node.id).collect();
    assert_eq!(ids, vec![family.a.id]);
    assert_eq!(family.graph.len(), 3);
}

#[test]
fn filter_by_depth_never_hides_unnumbered_persons() {
    let lineage = Uuid::new_v4();
    let mut deep = Person::new(lineage, "Deep");
    deep.generation_number = Some(7);
    let unnumbered = Person::new(lineage, "Unnumbered");
    let graph = build(&[deep, unnumbered.clone()], &[]);

    let filtered = filter_by_depth(&graph.nodes, 2);

    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, unnumbered.id);
}

#[test]
fn filter_by_branch_takes_descendants_and_their_spouses() {
    let lineage = Uuid::new_v4();
    let root = Person::new(lineage, "Root");
    let root_wife = Person::new(lineage, "Root wife");
    let son = Person::new(lineage, "Son");
    let daughter_in_law = Person::new(lineage, "Daughter-in-law");
    let in_law_parent = Person::new(lineage, "In-law parent");
    let grandson = Person::new(lineage, "Grandson");
    let unrelated = Person::new(lineage, "Unrelated");
    let rows = vec![
        Relationship::new(lineage, RelationshipType::SpouseMarried, root.id, root_wife.id),
        Relationship::parent(lineage, RelationshipType::BiologicalParent, root.id, son.id),
        Relationship::new(
            lineage,
            RelationshipType::SpouseMarried,
            son.id,
            daughter_in_law.id,
        ),
        Relationship::parent(
            lineage,
            RelationshipType::BiologicalParent,
            in_law_parent.id,
            daughter_in_law.id,
        ),
        Relationship::parent(lineage, RelationshipType::BiologicalParent, son.id, grandson.id),
    ];
    let persons = vec![
        root.clone(),
        root_wife.clone(),
        son.clone(),
        daughter_in_law.clone(),
        in_law_parent.clone(),
        grandson.clone(),
        unrelated.clone(),
    ];
    let graph = build(&persons, &rows);

    let branch: HashSet<Uuid> = filter_by_branch(&graph.nodes, root.id)
        .iter()
        .map(|node| node.id)
        .collect();

    let expected: HashSet<Uuid> = [root.id, root_wife.id, son.id, daughter_in_law.id, grandson.id]
        .into_iter()
        .collect();
    assert_eq!(branch, expected);
    assert_eq!(branch_members(&graph.nodes, root.id), expected);
}

#[test]
fn filter_by_branch_with_unknown_root_is_empty() {
    let family = three_person_family();
    assert!(filter_by_branch(&family.graph.nodes, Uuid::new_v4()).is_empty());
}

#[test]
fn compute_depth_uses_stored_generations() {
    let family = three_person_family();
    let depth = compute_depth(&family.graph.nodes);
    assert_eq!(depth[&family.a.id], 1);
    assert_eq!(depth[&family.b.id], 2);
    assert_eq!(depth[&family.c.id], 2);
    assert_eq!(max_generation(&family.graph.nodes), 2);
}

#[test]
fn unnumbered_spouse_without_parents_is_a_root() {
    let lineage = Uuid::new_v4();
    let parent = Person::new(lineage, "Parent");
    let child = Person::new(lineage, "Child");
    let spouse = Person::new(lineage, "Spouse");
    let rows = vec![
        Relationship::parent(lineage, RelationshipType::BiologicalParent, parent.id, child.id),
        Relationship::new(lineage, RelationshipType::Partner, child.id, spouse.id),
    ];
    let graph = build(&[parent.clone(), child.clone(), spouse.clone()], &rows);

    let depth = compute_depth(&graph.nodes);

    assert_eq!(depth[&parent.id], 0);
    assert_eq!(depth[&child.id], 1);
    assert_eq!(depth[&spouse.id], 0);
}
