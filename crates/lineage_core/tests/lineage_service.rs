use lineage_core::graph::path::SpouseLinkError;
use lineage_core::model::relationship::NewRelationship;
use lineage_core::{
    open_db_in_memory, FlexibleDate, Gender, LineageId, LineageService, LineageServiceError,
    MatchPolicy, MergeOptions, NamespacedId, Person, PersonMapping, RecordStore,
    RelationshipType, SqliteRecordStore,
};
use rusqlite::Connection;
use std::collections::HashMap;
use uuid::Uuid;

fn service(conn: &Connection) -> LineageService<SqliteRecordStore<'_>> {
    LineageService::new(SqliteRecordStore::try_new(conn).unwrap())
}

fn add_person<S: RecordStore>(
    service: &LineageService<S>,
    lineage_id: LineageId,
    given: &str,
    generation: Option<i32>,
) -> Person {
    let mut fields = Person::new(lineage_id, given);
    fields.family_name = Some("Nguyen".to_string());
    fields.gender = Gender::Male;
    fields.generation_number = generation;
    fields.birth_date = generation.map(|g| FlexibleDate::solar_year(1900 + 25 * g));
    service.store().create_person(lineage_id, &fields).unwrap()
}

fn add_link<S: RecordStore>(
    service: &LineageService<S>,
    relationship_type: RelationshipType,
    from: &Person,
    to: &Person,
) {
    service
        .store()
        .create_relationship(&NewRelationship {
            relationship_type,
            from_person_id: from.id,
            to_person_id: to.id,
            notes: None,
        })
        .unwrap();
}

#[test]
fn create_lineage_rejects_blank_names() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert!(matches!(
        service.create_lineage("   "),
        Err(LineageServiceError::InvalidName)
    ));
    let lineage = service.create_lineage("  Nguyen  ").unwrap();
    assert_eq!(lineage.name, "Nguyen");
}

#[test]
fn unknown_lineage_is_reported_by_id() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let missing = Uuid::new_v4();

    let err = service.load_graph(missing).unwrap_err();

    assert!(matches!(err, LineageServiceError::LineageNotFound(id) if id == missing));
}

#[test]
fn split_branch_copies_descendants_and_spouses() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let lineage = service.create_lineage("Nguyen").unwrap();
    let root = add_person(&service, lineage.id, "Root", Some(1));
    let son = add_person(&service, lineage.id, "Son", Some(2));
    let uncle = add_person(&service, lineage.id, "Uncle", Some(2));
    let wife = add_person(&service, lineage.id, "Wife", Some(2));
    let grandson = add_person(&service, lineage.id, "Grandson", Some(3));
    add_link(&service, RelationshipType::BiologicalParent, &root, &son);
    add_link(&service, RelationshipType::BiologicalParent, &root, &uncle);
    add_link(&service, RelationshipType::SpouseMarried, &son, &wife);
    add_link(&service, RelationshipType::BiologicalParent, &son, &grandson);

    let branch = service.split_branch(lineage.id, son.id, "Son branch").unwrap();

    let graph = service.load_graph(branch.id).unwrap();
    let mut names: Vec<&str> = graph
        .nodes
        .iter()
        .map(|node| node.data.given_name.as_str())
        .collect();
    names.sort_unstable();
    assert_eq!(names, vec!["Grandson", "Son", "Wife"]);
    assert_eq!(graph.diagnostics.skipped_edges, 0);
    assert_eq!(graph.edge_categories.len(), 2);
    assert_eq!(service.load_graph(lineage.id).unwrap().len(), 5);
}

#[test]
fn split_branch_with_unknown_root_fails() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let lineage = service.create_lineage("Nguyen").unwrap();

    let err = service
        .split_branch(lineage.id, Uuid::new_v4(), "Nothing")
        .unwrap_err();

    assert!(matches!(err, LineageServiceError::RootNotFound { .. }));
}

#[test]
fn link_spouses_validates_against_the_graph() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let lineage = service.create_lineage("Nguyen").unwrap();
    let parent = add_person(&service, lineage.id, "Parent", Some(1));
    let child = add_person(&service, lineage.id, "Child", Some(2));
    let partner = add_person(&service, lineage.id, "Partner", Some(2));
    add_link(&service, RelationshipType::BiologicalParent, &parent, &child);

    let err = service
        .link_spouses(lineage.id, parent.id, child.id, RelationshipType::SpouseMarried)
        .unwrap_err();
    assert!(matches!(
        err,
        LineageServiceError::SpouseLink(SpouseLinkError::DirectParentChild)
    ));

    let err = service
        .link_spouses(lineage.id, child.id, partner.id, RelationshipType::StepParent)
        .unwrap_err();
    assert!(matches!(err, LineageServiceError::NotSpouseType(_)));

    let row = service
        .link_spouses(lineage.id, child.id, partner.id, RelationshipType::Partner)
        .unwrap();
    assert_eq!(row.lineage_id, lineage.id);
    let graph = service.load_graph(lineage.id).unwrap();
    assert_eq!(graph.node(partner.id).unwrap().rels.spouses, vec![child.id]);

    let err = service
        .link_spouses(lineage.id, partner.id, child.id, RelationshipType::SpouseMarried)
        .unwrap_err();
    assert!(matches!(
        err,
        LineageServiceError::SpouseLink(SpouseLinkError::AlreadySpouses)
    ));
}

#[test]
fn kinship_reads_the_stored_graph() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let lineage = service.create_lineage("Nguyen").unwrap();
    let father = add_person(&service, lineage.id, "Hai", Some(1));
    let son = add_person(&service, lineage.id, "Ba", Some(2));
    let stranger = add_person(&service, lineage.id, "Tu", Some(2));
    add_link(&service, RelationshipType::BiologicalParent, &father, &son);

    let kinship = service.kinship(lineage.id, son.id, father.id).unwrap().unwrap();
    assert_eq!(kinship.term, "Cha");
    assert_eq!(kinship.path, vec![father.id]);
    assert_eq!(kinship.description, "Nguyen Hai là Cha của Nguyen Ba");
    assert!(service
        .kinship(lineage.id, son.id, stranger.id)
        .unwrap()
        .is_none());
}

#[test]
fn match_then_merge_two_lineages() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let main = service.create_lineage("Nguyen main").unwrap();
    let other = service.create_lineage("Nguyen south").unwrap();
    let ancestor = add_person(&service, main.id, "An", Some(1));
    let ancestor_copy = add_person(&service, other.id, "An", Some(1));
    let son = add_person(&service, other.id, "Binh", Some(2));
    add_link(&service, RelationshipType::BiologicalParent, &ancestor_copy, &son);

    let proposals = service
        .match_lineages(main.id, other.id, &MatchPolicy::default())
        .unwrap();
    assert_eq!(proposals.len(), 1);
    let mapping = PersonMapping::new(
        proposals[0].primary_namespaced_id,
        proposals[0].candidate_namespaced_id,
    );
    assert_eq!(mapping.primary, ancestor.namespaced_id());
    assert_eq!(mapping.candidate, ancestor_copy.namespaced_id());

    let result = service
        .merge_lineages(
            &[main.id, other.id],
            &[mapping],
            &HashMap::new(),
            &MergeOptions {
                delete_sources: true,
                ..MergeOptions::default()
            },
        )
        .unwrap();

    assert!(result.conflicts.is_empty());
    assert_eq!(result.deleted_sources, vec![other.id]);
    let graph = service.load_graph(main.id).unwrap();
    assert_eq!(graph.len(), 2);
    let new_son = result.id_map[&son.namespaced_id()];
    assert_eq!(graph.node(ancestor.id).unwrap().rels.children, vec![new_son]);
    assert!(matches!(
        service.load_graph(other.id),
        Err(LineageServiceError::LineageNotFound(_))
    ));
}

#[test]
fn merge_of_missing_lineage_fails_before_writing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let main = service.create_lineage("Main").unwrap();
    add_person(&service, main.id, "An", Some(1));

    let err = service
        .merge_lineages(
            &[main.id, Uuid::new_v4()],
            &[],
            &HashMap::new(),
            &MergeOptions::default(),
        )
        .unwrap_err();

    assert!(matches!(err, LineageServiceError::LineageNotFound(_)));
    assert_eq!(service.store().list_lineages().unwrap().len(), 1);
}

#[test]
fn combined_view_marks_external_nodes_and_folds_mappings() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let main = service.create_lineage("Nguyen main").unwrap();
    let other = service.create_lineage("Tran family").unwrap();
    let ancestor = add_person(&service, main.id, "An", Some(1));
    let ancestor_copy = add_person(&service, other.id, "An", Some(1));
    let daughter = add_person(&service, other.id, "Cuc", Some(2));
    add_link(&service, RelationshipType::AdoptiveParent, &ancestor_copy, &daughter);
    let mapping = PersonMapping::new(ancestor.namespaced_id(), ancestor_copy.namespaced_id());

    let combined = service
        .combined_view(
            &[
                (main.id, "#aa0000".to_string()),
                (other.id, "#00aa00".to_string()),
            ],
            &[mapping],
        )
        .unwrap();

    assert_eq!(combined.nodes.len(), 2);
    let root = combined.node(ancestor.namespaced_id()).unwrap();
    assert!(!root.is_external);
    assert_eq!(root.lineage_badge, "NM");
    let daughter_id = NamespacedId::new(other.id, daughter.id);
    assert_eq!(root.rels.children, vec![daughter_id]);
    let daughter_node = combined.node(daughter_id).unwrap();
    assert!(daughter_node.is_external);
    assert_eq!(daughter_node.display_color, "#00aa00");
    assert_eq!(daughter_node.lineage_badge, "TF");
    assert!(combined.node(ancestor_copy.namespaced_id()).is_none());
}
