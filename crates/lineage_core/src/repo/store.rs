//! Record store contract consumed by the engine.
//!
//! # Responsibility
//! - Describe the CRUD surface for lineages, persons and relationships.
//! - Describe the two compound writes the engine relies on: lineage clone
//!   and atomic merge write-back.
//!
//! # Invariants
//! - `create_*` calls assign fresh ids; caller-supplied ids are ignored.
//! - `clone_lineage` copies persons under fresh ids and rewrites the copied
//!   relationships onto them; relationships with an endpoint outside the
//!   copied subset are not copied.
//! - `apply_merge` is all-or-nothing.

use crate::db::DbError;
use crate::model::lineage::{CloneRequest, Lineage, LineageDraft};
use crate::model::person::{LineageId, Person, PersonId};
use crate::model::relationship::{NewRelationship, Relationship, RelationshipId};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type used by record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Record family named in [`StoreError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Lineage,
    Person,
    Relationship,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lineage => "lineage",
            Self::Person => "person",
            Self::Relationship => "relationship",
        }
    }
}

/// Errors from record store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target record does not exist.
    NotFound { kind: RecordKind, id: Uuid },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
    /// Store could not be reached or refused the call.
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(kind: RecordKind, id: Uuid) -> Self {
        Self::NotFound { kind, id }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{} not found: {id}", kind.as_str()),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "record store requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid record data: {message}"),
            Self::Unavailable(message) => write!(f, "record store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::InvalidData(_) => None,
            Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Consolidated merge output to persist in one atomic write.
///
/// Persons and relationships carry their final ids; the store must keep them.
#[derive(Debug, Clone, Copy)]
pub struct MergeWrite<'a> {
    pub target_lineage_id: LineageId,
    /// Existing target persons whose fields changed.
    pub updated_persons: &'a [Person],
    /// Persons imported from absorbed lineages.
    pub created_persons: &'a [Person],
    pub created_relationships: &'a [Relationship],
}

impl MergeWrite<'_> {
    pub fn is_empty(&self) -> bool {
        self.updated_persons.is_empty()
            && self.created_persons.is_empty()
            && self.created_relationships.is_empty()
    }
}

/// External record store used by services and the merge coordinator.
pub trait RecordStore {
    /// Lists all lineages ordered by creation time.
    fn list_lineages(&self) -> StoreResult<Vec<Lineage>>;
    /// Loads one lineage by id.
    fn get_lineage(&self, id: LineageId) -> StoreResult<Option<Lineage>>;
    /// Creates one lineage.
    fn create_lineage(&self, draft: &LineageDraft) -> StoreResult<Lineage>;
    /// Replaces name, description and settings of one lineage.
    fn update_lineage(&self, id: LineageId, draft: &LineageDraft) -> StoreResult<Lineage>;
    /// Deletes one lineage with all its persons and relationships.
    fn delete_lineage(&self, id: LineageId) -> StoreResult<()>;
    /// Copies a lineage (or a person subset of it) into a new lineage.
    fn clone_lineage(&self, id: LineageId, request: &CloneRequest) -> StoreResult<Lineage>;

    /// Lists persons of one lineage in insertion order.
    fn list_persons(&self, lineage_id: LineageId) -> StoreResult<Vec<Person>>;
    /// Loads one person by id.
    fn get_person(&self, id: PersonId) -> StoreResult<Option<Person>>;
    /// Creates one person under `lineage_id` from the given fields.
    fn create_person(&self, lineage_id: LineageId, fields: &Person) -> StoreResult<Person>;
    /// Replaces all fields of an existing person.
    fn update_person(&self, person: &Person) -> StoreResult<Person>;
    /// Deletes one person and every relationship touching it.
    fn delete_person(&self, id: PersonId) -> StoreResult<()>;

    /// Lists relationships of one lineage in insertion order.
    fn list_relationships_by_lineage(&self, lineage_id: LineageId)
        -> StoreResult<Vec<Relationship>>;
    /// Lists relationships where `person_id` is either endpoint.
    fn list_relationships_by_person(&self, person_id: PersonId) -> StoreResult<Vec<Relationship>>;
    /// Creates one relationship inside the lineage of its endpoints.
    fn create_relationship(&self, fields: &NewRelationship) -> StoreResult<Relationship>;
    /// Deletes one relationship.
    fn delete_relationship(&self, id: RelationshipId) -> StoreResult<()>;

    /// Persists a consolidated merge atomically.
    fn apply_merge(&self, write: &MergeWrite<'_>) -> StoreResult<()>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn list_lineages(&self) -> StoreResult<Vec<Lineage>> {
        (**self).list_lineages()
    }

    fn get_lineage(&self, id: LineageId) -> StoreResult<Option<Lineage>> {
        (**self).get_lineage(id)
    }

    fn create_lineage(&self, draft: &LineageDraft) -> StoreResult<Lineage> {
        (**self).create_lineage(draft)
    }

    fn update_lineage(&self, id: LineageId, draft: &LineageDraft) -> StoreResult<Lineage> {
        (**self).update_lineage(id, draft)
    }

    fn delete_lineage(&self, id: LineageId) -> StoreResult<()> {
        (**self).delete_lineage(id)
    }

    fn clone_lineage(&self, id: LineageId, request: &CloneRequest) -> StoreResult<Lineage> {
        (**self).clone_lineage(id, request)
    }

    fn list_persons(&self, lineage_id: LineageId) -> StoreResult<Vec<Person>> {
        (**self).list_persons(lineage_id)
    }

    fn get_person(&self, id: PersonId) -> StoreResult<Option<Person>> {
        (**self).get_person(id)
    }

    fn create_person(&self, lineage_id: LineageId, fields: &Person) -> StoreResult<Person> {
        (**self).create_person(lineage_id, fields)
    }

    fn update_person(&self, person: &Person) -> StoreResult<Person> {
        (**self).update_person(person)
    }

    fn delete_person(&self, id: PersonId) -> StoreResult<()> {
        (**self).delete_person(id)
    }

    fn list_relationships_by_lineage(
        &self,
        lineage_id: LineageId,
    ) -> StoreResult<Vec<Relationship>> {
        (**self).list_relationships_by_lineage(lineage_id)
    }

    fn list_relationships_by_person(&self, person_id: PersonId) -> StoreResult<Vec<Relationship>> {
        (**self).list_relationships_by_person(person_id)
    }

    fn create_relationship(&self, fields: &NewRelationship) -> StoreResult<Relationship> {
        (**self).create_relationship(fields)
    }

    fn delete_relationship(&self, id: RelationshipId) -> StoreResult<()> {
        (**self).delete_relationship(id)
    }

    fn apply_merge(&self, write: &MergeWrite<'_>) -> StoreResult<()> {
        (**self).apply_merge(write)
    }
}
