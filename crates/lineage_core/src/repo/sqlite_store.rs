//! SQLite-backed record store.
//!
//! # Responsibility
//! - Implement every [`RecordStore`] operation on a migrated connection.
//! - Keep SQL details and row decoding inside the repository boundary.
//!
//! # Invariants
//! - Listing is deterministic: insertion order (`rowid ASC`).
//! - Flexible dates and lineage settings are stored as JSON text.
//! - Clone and merge writes run in one immediate transaction each.

use crate::db::migrations::{latest_version, schema_version};
use crate::model::date::FlexibleDate;
use crate::model::lineage::{CloneRequest, Lineage, LineageDraft, LineageSettings};
use crate::model::person::{Gender, LineageId, Person, PersonId};
use crate::model::relationship::{
    NewRelationship, Relationship, RelationshipId, RelationshipType,
};
use crate::repo::store::{MergeWrite, RecordKind, RecordStore, StoreError, StoreResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const LINEAGE_COLUMNS: &str =
    "id, name, description, settings_json, created_at, updated_at";

const PERSON_COLUMNS: &str = "id, lineage_id, family_name, middle_name, given_name, \
     common_name, honorific_name, posthumous_name, religious_name, han_nom_name, \
     gender, is_alive, generation_number, birth_date_json, death_date_json, \
     biography, notes, birth_place, death_place, burial_place";

const RELATIONSHIP_COLUMNS: &str =
    "id, lineage_id, relationship_type, from_person_id, to_person_id, notes";

/// SQLite-backed record store.
pub struct SqliteRecordStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordStore<'conn> {
    /// Creates store from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn list_lineages(&self) -> StoreResult<Vec<Lineage>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LINEAGE_COLUMNS}
             FROM lineages
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_lineage_row(row)?);
        }
        Ok(items)
    }

    fn get_lineage(&self, id: LineageId) -> StoreResult<Option<Lineage>> {
        load_lineage(self.conn, id)
    }

    fn create_lineage(&self, draft: &LineageDraft) -> StoreResult<Lineage> {
        let id = Uuid::new_v4();
        insert_lineage(self.conn, id, draft)?;
        load_required_lineage(self.conn, id)
    }

    fn update_lineage(&self, id: LineageId, draft: &LineageDraft) -> StoreResult<Lineage> {
        let settings_json = encode_settings(&draft.settings)?;
        let changed = self.conn.execute(
            "UPDATE lineages
             SET name = ?2,
                 description = ?3,
                 settings_json = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), draft.name, draft.description, settings_json],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found(RecordKind::Lineage, id));
        }
        load_required_lineage(self.conn, id)
    }

    fn delete_lineage(&self, id: LineageId) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM lineages WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::not_found(RecordKind::Lineage, id));
        }
        Ok(())
    }

    fn clone_lineage(&self, id: LineageId, request: &CloneRequest) -> StoreResult<Lineage> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let source = load_lineage(&tx, id)?
            .ok_or_else(|| StoreError::not_found(RecordKind::Lineage, id))?;

        let clone_id = Uuid::new_v4();
        insert_lineage(
            &tx,
            clone_id,
            &LineageDraft {
                name: request.name.clone(),
                description: source.description.clone(),
                settings: source.settings.clone(),
            },
        )?;

        let subset: Option<HashSet<PersonId>> = request
            .person_ids
            .as_ref()
            .map(|ids| ids.iter().copied().collect());
        let mut id_map: HashMap<PersonId, PersonId> = HashMap::new();
        for person in list_lineage_persons(&tx, id)? {
            if subset.as_ref().is_some_and(|ids| !ids.contains(&person.id)) {
                continue;
            }
            let copy_id = Uuid::new_v4();
            id_map.insert(person.id, copy_id);
            insert_person(
                &tx,
                &Person {
                    id: copy_id,
                    lineage_id: clone_id,
                    ..person
                },
            )?;
        }

        for relationship in list_lineage_relationships(&tx, id)? {
            let (Some(from), Some(to)) = (
                id_map.get(&relationship.from_person_id),
                id_map.get(&relationship.to_person_id),
            ) else {
                continue;
            };
            insert_relationship(
                &tx,
                &Relationship {
                    id: Uuid::new_v4(),
                    lineage_id: clone_id,
                    from_person_id: *from,
                    to_person_id: *to,
                    ..relationship
                },
            )?;
        }

        tx.commit()?;
        load_required_lineage(self.conn, clone_id)
    }

    fn list_persons(&self, lineage_id: LineageId) -> StoreResult<Vec<Person>> {
        list_lineage_persons(self.conn, lineage_id)
    }

    fn get_person(&self, id: PersonId) -> StoreResult<Option<Person>> {
        load_person(self.conn, id)
    }

    fn create_person(&self, lineage_id: LineageId, fields: &Person) -> StoreResult<Person> {
        if load_lineage(self.conn, lineage_id)?.is_none() {
            return Err(StoreError::not_found(RecordKind::Lineage, lineage_id));
        }
        let person = Person {
            id: Uuid::new_v4(),
            lineage_id,
            ..fields.clone()
        };
        insert_person(self.conn, &person)?;
        load_required_person(self.conn, person.id)
    }

    fn update_person(&self, person: &Person) -> StoreResult<Person> {
        if !update_person_row(self.conn, person)? {
            return Err(StoreError::not_found(RecordKind::Person, person.id));
        }
        load_required_person(self.conn, person.id)
    }

    fn delete_person(&self, id: PersonId) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM persons WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::not_found(RecordKind::Person, id));
        }
        Ok(())
    }

    fn list_relationships_by_lineage(
        &self,
        lineage_id: LineageId,
    ) -> StoreResult<Vec<Relationship>> {
        list_lineage_relationships(self.conn, lineage_id)
    }

    fn list_relationships_by_person(&self, person_id: PersonId) -> StoreResult<Vec<Relationship>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RELATIONSHIP_COLUMNS}
             FROM relationships
             WHERE from_person_id = ?1
                OR to_person_id = ?1
             ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query([person_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_relationship_row(row)?);
        }
        Ok(items)
    }

    fn create_relationship(&self, fields: &NewRelationship) -> StoreResult<Relationship> {
        let from = load_required_person(self.conn, fields.from_person_id)?;
        let to = load_required_person(self.conn, fields.to_person_id)?;
        if from.lineage_id != to.lineage_id {
            return Err(StoreError::InvalidData(format!(
                "relationship endpoints {} and {} belong to different lineages",
                from.id, to.id
            )));
        }

        let relationship = Relationship {
            id: Uuid::new_v4(),
            lineage_id: from.lineage_id,
            relationship_type: fields.relationship_type,
            from_person_id: from.id,
            to_person_id: to.id,
            notes: fields.notes.clone(),
        };
        insert_relationship(self.conn, &relationship)?;
        Ok(relationship)
    }

    fn delete_relationship(&self, id: RelationshipId) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM relationships WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::not_found(RecordKind::Relationship, id));
        }
        Ok(())
    }

    fn apply_merge(&self, write: &MergeWrite<'_>) -> StoreResult<()> {
        let target = write.target_lineage_id;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if load_lineage(&tx, target)?.is_none() {
            return Err(StoreError::not_found(RecordKind::Lineage, target));
        }

        for person in write.updated_persons {
            let person = Person {
                lineage_id: target,
                ..person.clone()
            };
            if !update_person_row(&tx, &person)? {
                return Err(StoreError::not_found(RecordKind::Person, person.id));
            }
        }
        for person in write.created_persons {
            insert_person(
                &tx,
                &Person {
                    lineage_id: target,
                    ..person.clone()
                },
            )?;
        }
        for relationship in write.created_relationships {
            insert_relationship(
                &tx,
                &Relationship {
                    lineage_id: target,
                    ..relationship.clone()
                },
            )?;
        }

        tx.execute(
            "UPDATE lineages
             SET updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [target.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn insert_lineage(conn: &Connection, id: LineageId, draft: &LineageDraft) -> StoreResult<()> {
    let settings_json = encode_settings(&draft.settings)?;
    conn.execute(
        "INSERT INTO lineages (id, name, description, settings_json)
         VALUES (?1, ?2, ?3, ?4);",
        params![id.to_string(), draft.name, draft.description, settings_json],
    )?;
    Ok(())
}

fn load_lineage(conn: &Connection, id: LineageId) -> StoreResult<Option<Lineage>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LINEAGE_COLUMNS}
         FROM lineages
         WHERE id = ?1;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_lineage_row(row)?));
    }
    Ok(None)
}

fn load_required_lineage(conn: &Connection, id: LineageId) -> StoreResult<Lineage> {
    load_lineage(conn, id)?.ok_or_else(|| StoreError::not_found(RecordKind::Lineage, id))
}

fn list_lineage_persons(conn: &Connection, lineage_id: LineageId) -> StoreResult<Vec<Person>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PERSON_COLUMNS}
         FROM persons
         WHERE lineage_id = ?1
         ORDER BY rowid ASC;"
    ))?;
    let mut rows = stmt.query([lineage_id.to_string()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_person_row(row)?);
    }
    Ok(items)
}

fn load_person(conn: &Connection, id: PersonId) -> StoreResult<Option<Person>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PERSON_COLUMNS}
         FROM persons
         WHERE id = ?1;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_person_row(row)?));
    }
    Ok(None)
}

fn load_required_person(conn: &Connection, id: PersonId) -> StoreResult<Person> {
    load_person(conn, id)?.ok_or_else(|| StoreError::not_found(RecordKind::Person, id))
}

fn insert_person(conn: &Connection, person: &Person) -> StoreResult<()> {
    let birth_date_json = encode_date(person.birth_date.as_ref())?;
    let death_date_json = encode_date(person.death_date.as_ref())?;
    conn.execute(
        &format!(
            "INSERT INTO persons ({PERSON_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                     ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20);"
        ),
        params![
            person.id.to_string(),
            person.lineage_id.to_string(),
            person.family_name,
            person.middle_name,
            person.given_name,
            person.common_name,
            person.honorific_name,
            person.posthumous_name,
            person.religious_name,
            person.han_nom_name,
            person.gender.as_str(),
            i64::from(person.is_alive),
            person.generation_number,
            birth_date_json,
            death_date_json,
            person.biography,
            person.notes,
            person.birth_place,
            person.death_place,
            person.burial_place,
        ],
    )?;
    Ok(())
}

/// Rewrites one person row in place; returns `false` when no row matched.
fn update_person_row(conn: &Connection, person: &Person) -> StoreResult<bool> {
    let birth_date_json = encode_date(person.birth_date.as_ref())?;
    let death_date_json = encode_date(person.death_date.as_ref())?;
    let changed = conn.execute(
        "UPDATE persons
         SET family_name = ?3,
             middle_name = ?4,
             given_name = ?5,
             common_name = ?6,
             honorific_name = ?7,
             posthumous_name = ?8,
             religious_name = ?9,
             han_nom_name = ?10,
             gender = ?11,
             is_alive = ?12,
             generation_number = ?13,
             birth_date_json = ?14,
             death_date_json = ?15,
             biography = ?16,
             notes = ?17,
             birth_place = ?18,
             death_place = ?19,
             burial_place = ?20,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1
           AND lineage_id = ?2;",
        params![
            person.id.to_string(),
            person.lineage_id.to_string(),
            person.family_name,
            person.middle_name,
            person.given_name,
            person.common_name,
            person.honorific_name,
            person.posthumous_name,
            person.religious_name,
            person.han_nom_name,
            person.gender.as_str(),
            i64::from(person.is_alive),
            person.generation_number,
            birth_date_json,
            death_date_json,
            person.biography,
            person.notes,
            person.birth_place,
            person.death_place,
            person.burial_place,
        ],
    )?;
    Ok(changed > 0)
}

fn list_lineage_relationships(
    conn: &Connection,
    lineage_id: LineageId,
) -> StoreResult<Vec<Relationship>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RELATIONSHIP_COLUMNS}
         FROM relationships
         WHERE lineage_id = ?1
         ORDER BY rowid ASC;"
    ))?;
    let mut rows = stmt.query([lineage_id.to_string()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_relationship_row(row)?);
    }
    Ok(items)
}

fn insert_relationship(conn: &Connection, relationship: &Relationship) -> StoreResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO relationships ({RELATIONSHIP_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);"
        ),
        params![
            relationship.id.to_string(),
            relationship.lineage_id.to_string(),
            relationship.relationship_type.as_str(),
            relationship.from_person_id.to_string(),
            relationship.to_person_id.to_string(),
            relationship.notes,
        ],
    )?;
    Ok(())
}

fn parse_lineage_row(row: &Row<'_>) -> StoreResult<Lineage> {
    let id_text: String = row.get("id")?;
    let settings_json: String = row.get("settings_json")?;
    Ok(Lineage {
        id: parse_uuid(&id_text, "lineages.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        settings: decode_settings(&settings_json)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_person_row(row: &Row<'_>) -> StoreResult<Person> {
    let id_text: String = row.get("id")?;
    let lineage_text: String = row.get("lineage_id")?;
    let gender_text: String = row.get("gender")?;

    let is_alive = match row.get::<_, i64>("is_alive")? {
        0 => false,
        1 => true,
        other => {
            return Err(StoreError::InvalidData(format!(
                "invalid is_alive value `{other}` in persons.is_alive"
            )));
        }
    };

    Ok(Person {
        id: parse_uuid(&id_text, "persons.id")?,
        lineage_id: parse_uuid(&lineage_text, "persons.lineage_id")?,
        family_name: row.get("family_name")?,
        middle_name: row.get("middle_name")?,
        given_name: row.get("given_name")?,
        common_name: row.get("common_name")?,
        honorific_name: row.get("honorific_name")?,
        posthumous_name: row.get("posthumous_name")?,
        religious_name: row.get("religious_name")?,
        han_nom_name: row.get("han_nom_name")?,
        gender: Gender::parse(&gender_text),
        is_alive,
        generation_number: row.get("generation_number")?,
        birth_date: decode_date(row.get("birth_date_json")?, "persons.birth_date_json")?,
        death_date: decode_date(row.get("death_date_json")?, "persons.death_date_json")?,
        biography: row.get("biography")?,
        notes: row.get("notes")?,
        birth_place: row.get("birth_place")?,
        death_place: row.get("death_place")?,
        burial_place: row.get("burial_place")?,
    })
}

fn parse_relationship_row(row: &Row<'_>) -> StoreResult<Relationship> {
    let id_text: String = row.get("id")?;
    let lineage_text: String = row.get("lineage_id")?;
    let type_text: String = row.get("relationship_type")?;
    let from_text: String = row.get("from_person_id")?;
    let to_text: String = row.get("to_person_id")?;
    Ok(Relationship {
        id: parse_uuid(&id_text, "relationships.id")?,
        lineage_id: parse_uuid(&lineage_text, "relationships.lineage_id")?,
        relationship_type: RelationshipType::parse(&type_text),
        from_person_id: parse_uuid(&from_text, "relationships.from_person_id")?,
        to_person_id: parse_uuid(&to_text, "relationships.to_person_id")?,
        notes: row.get("notes")?,
    })
}

fn encode_date(date: Option<&FlexibleDate>) -> StoreResult<Option<String>> {
    date.map(|value| {
        serde_json::to_string(value)
            .map_err(|err| StoreError::InvalidData(format!("cannot encode date: {err}")))
    })
    .transpose()
}

fn decode_date(value: Option<String>, column: &'static str) -> StoreResult<Option<FlexibleDate>> {
    value
        .map(|text| {
            serde_json::from_str(&text)
                .map_err(|err| StoreError::InvalidData(format!("invalid date in {column}: {err}")))
        })
        .transpose()
}

fn encode_settings(settings: &LineageSettings) -> StoreResult<String> {
    serde_json::to_string(settings)
        .map_err(|err| StoreError::InvalidData(format!("cannot encode lineage settings: {err}")))
}

fn decode_settings(value: &str) -> StoreResult<LineageSettings> {
    serde_json::from_str(value).map_err(|err| {
        StoreError::InvalidData(format!("invalid settings in lineages.settings_json: {err}"))
    })
}

fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["lineages", "persons", "relationships"] {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
