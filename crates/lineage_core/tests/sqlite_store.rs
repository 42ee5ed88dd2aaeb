use lineage_core::model::relationship::NewRelationship;
use lineage_core::repo::store::{MergeWrite, RecordKind};
use lineage_core::{
    open_db_in_memory, CloneRequest, DateQualifier, FlexibleDate, Gender, LineageDraft, Person,
    RecordStore, Relationship, RelationshipType, SqliteRecordStore, StoreError,
};
use rusqlite::Connection;
use uuid::Uuid;

fn link(
    store: &SqliteRecordStore<'_>,
    relationship_type: RelationshipType,
    from: &Person,
    to: &Person,
) -> Relationship {
    store
        .create_relationship(&NewRelationship {
            relationship_type,
            from_person_id: from.id,
            to_person_id: to.id,
            notes: None,
        })
        .unwrap()
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteRecordStore::try_new(&conn).err().unwrap();
    assert!(matches!(err, StoreError::UninitializedConnection { .. }));
}

#[test]
fn lineage_crud_round_trip() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();

    let mut draft = LineageDraft::named("Nguyen family");
    draft
        .settings
        .insert("confirmed_matches".to_string(), serde_json::json!(["a:b"]));
    let created = store.create_lineage(&draft).unwrap();
    assert_eq!(created.name, "Nguyen family");
    assert_eq!(created.settings, draft.settings);

    let renamed = store
        .update_lineage(created.id, &LineageDraft::named("Nguyen clan"))
        .unwrap();
    assert_eq!(renamed.name, "Nguyen clan");
    assert!(renamed.settings.is_empty());

    let second = store.create_lineage(&LineageDraft::named("Tran")).unwrap();
    let listed: Vec<Uuid> = store
        .list_lineages()
        .unwrap()
        .iter()
        .map(|lineage| lineage.id)
        .collect();
    assert_eq!(listed, vec![created.id, second.id]);

    store.delete_lineage(created.id).unwrap();
    assert!(store.get_lineage(created.id).unwrap().is_none());
    let err = store.delete_lineage(created.id).unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            kind: RecordKind::Lineage,
            ..
        }
    ));
}

#[test]
fn person_fields_survive_storage() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();
    let lineage = store.create_lineage(&LineageDraft::named("Le")).unwrap();

    let mut fields = Person::new(Uuid::new_v4(), "Hoa");
    fields.family_name = Some("Le".to_string());
    fields.han_nom_name = Some("黎花".to_string());
    fields.gender = Gender::Female;
    fields.is_alive = false;
    fields.generation_number = Some(4);
    fields.birth_date = Some(FlexibleDate::lunar(1901, Some(3), None));
    fields.death_date =
        Some(FlexibleDate::solar_year(1980).with_qualifier(DateQualifier::About));
    fields.burial_place = Some("Family shrine".to_string());

    let stored = store.create_person(lineage.id, &fields).unwrap();

    assert_ne!(stored.id, fields.id);
    assert_eq!(stored.lineage_id, lineage.id);
    let expected = Person {
        id: stored.id,
        lineage_id: lineage.id,
        ..fields
    };
    assert_eq!(stored, expected);
    assert_eq!(store.get_person(stored.id).unwrap(), Some(expected));
}

#[test]
fn update_and_delete_person() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();
    let lineage = store.create_lineage(&LineageDraft::named("Pham")).unwrap();
    let parent = store
        .create_person(lineage.id, &Person::new(lineage.id, "Parent"))
        .unwrap();
    let child = store
        .create_person(lineage.id, &Person::new(lineage.id, "Child"))
        .unwrap();
    link(&store, RelationshipType::BiologicalParent, &parent, &child);

    let mut edited = child.clone();
    edited.notes = Some("moved south".to_string());
    let updated = store.update_person(&edited).unwrap();
    assert_eq!(updated.notes.as_deref(), Some("moved south"));

    store.delete_person(child.id).unwrap();
    assert!(store.get_person(child.id).unwrap().is_none());
    assert!(store
        .list_relationships_by_person(parent.id)
        .unwrap()
        .is_empty());

    let err = store.update_person(&edited).unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            kind: RecordKind::Person,
            ..
        }
    ));
}

#[test]
fn create_person_requires_existing_lineage() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();
    let missing = Uuid::new_v4();

    let err = store
        .create_person(missing, &Person::new(missing, "Nobody"))
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::NotFound {
            kind: RecordKind::Lineage,
            ..
        }
    ));
}

#[test]
fn relationships_cannot_cross_lineages() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();
    let first = store.create_lineage(&LineageDraft::named("First")).unwrap();
    let second = store.create_lineage(&LineageDraft::named("Second")).unwrap();
    let a = store
        .create_person(first.id, &Person::new(first.id, "A"))
        .unwrap();
    let b = store
        .create_person(second.id, &Person::new(second.id, "B"))
        .unwrap();

    let err = store
        .create_relationship(&NewRelationship {
            relationship_type: RelationshipType::SpouseMarried,
            from_person_id: a.id,
            to_person_id: b.id,
            notes: None,
        })
        .unwrap_err();

    assert!(matches!(err, StoreError::InvalidData(_)));
}

#[test]
fn relationship_listing_and_delete() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();
    let lineage = store.create_lineage(&LineageDraft::named("Vo")).unwrap();
    let a = store
        .create_person(lineage.id, &Person::new(lineage.id, "A"))
        .unwrap();
    let b = store
        .create_person(lineage.id, &Person::new(lineage.id, "B"))
        .unwrap();
    let c = store
        .create_person(lineage.id, &Person::new(lineage.id, "C"))
        .unwrap();
    let marriage = link(&store, RelationshipType::SpouseMarried, &a, &b);
    let parent = link(&store, RelationshipType::StepParent, &b, &c);

    let all = store.list_relationships_by_lineage(lineage.id).unwrap();
    assert_eq!(all, vec![marriage.clone(), parent.clone()]);
    assert_eq!(
        store.list_relationships_by_person(b.id).unwrap(),
        vec![marriage.clone(), parent.clone()]
    );

    store.delete_relationship(marriage.id).unwrap();
    assert_eq!(
        store.list_relationships_by_lineage(lineage.id).unwrap(),
        vec![parent]
    );
    assert!(store.delete_relationship(marriage.id).is_err());
}

#[test]
fn clone_subset_copies_only_internal_relationships() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();
    let lineage = store.create_lineage(&LineageDraft::named("Do")).unwrap();
    let grandparent = store
        .create_person(lineage.id, &Person::new(lineage.id, "Grandparent"))
        .unwrap();
    let parent = store
        .create_person(lineage.id, &Person::new(lineage.id, "Parent"))
        .unwrap();
    let child = store
        .create_person(lineage.id, &Person::new(lineage.id, "Child"))
        .unwrap();
    link(&store, RelationshipType::BiologicalParent, &grandparent, &parent);
    link(&store, RelationshipType::BiologicalParent, &parent, &child);

    let copy = store
        .clone_lineage(
            lineage.id,
            &CloneRequest::subset("Do branch", vec![parent.id, child.id]),
        )
        .unwrap();

    assert_eq!(copy.name, "Do branch");
    let persons = store.list_persons(copy.id).unwrap();
    let names: Vec<&str> = persons.iter().map(|p| p.given_name.as_str()).collect();
    assert_eq!(names, vec!["Parent", "Child"]);
    assert!(persons.iter().all(|p| p.id != parent.id && p.id != child.id));

    let rows = store.list_relationships_by_lineage(copy.id).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].from_person_id, persons[0].id);
    assert_eq!(rows[0].to_person_id, persons[1].id);

    assert_eq!(store.list_persons(lineage.id).unwrap().len(), 3);
}

#[test]
fn clone_of_missing_lineage_fails() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();

    let err = store
        .clone_lineage(Uuid::new_v4(), &CloneRequest::full("copy"))
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::NotFound {
            kind: RecordKind::Lineage,
            ..
        }
    ));
    assert!(store.list_lineages().unwrap().is_empty());
}

#[test]
fn apply_merge_is_all_or_nothing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRecordStore::try_new(&conn).unwrap();
    let lineage = store.create_lineage(&LineageDraft::named("Target")).unwrap();
    let existing = store
        .create_person(lineage.id, &Person::new(lineage.id, "Existing"))
        .unwrap();

    let imported = Person::new(lineage.id, "Imported");
    let ghost = Person::new(lineage.id, "Ghost");
    let failing_updates = [ghost];
    let created = [imported.clone()];
    let rows = [Relationship::parent(
        lineage.id,
        RelationshipType::BiologicalParent,
        existing.id,
        imported.id,
    )];
    let err = store
        .apply_merge(&MergeWrite {
            target_lineage_id: lineage.id,
            updated_persons: &failing_updates,
            created_persons: &created,
            created_relationships: &rows,
        })
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            kind: RecordKind::Person,
            ..
        }
    ));
    assert_eq!(store.list_persons(lineage.id).unwrap().len(), 1);

    let mut renamed = existing.clone();
    renamed.common_name = Some("Uncle Ba".to_string());
    let updates = [renamed];
    store
        .apply_merge(&MergeWrite {
            target_lineage_id: lineage.id,
            updated_persons: &updates,
            created_persons: &created,
            created_relationships: &rows,
        })
        .unwrap();

    let persons = store.list_persons(lineage.id).unwrap();
    assert_eq!(persons.len(), 2);
    assert_eq!(persons[0].common_name.as_deref(), Some("Uncle Ba"));
    assert_eq!(persons[1].id, imported.id);
    assert_eq!(store.list_relationships_by_lineage(lineage.id).unwrap(), rows);
}
