//! Person domain model.
//!
//! # Responsibility
//! - Define the canonical person record exchanged with the record store.
//! - Provide identity helpers for cross-lineage work.
//!
//! # Invariants
//! - `id` is unique only within `lineage_id`.
//! - `given_name` is the only mandatory name segment.

use crate::model::date::FlexibleDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of one person inside its owning lineage.
pub type PersonId = Uuid;

/// Identifier of one lineage (family tree).
pub type LineageId = Uuid;

/// Person gender as recorded by the family tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
    #[default]
    Unknown,
}

impl Gender {
    /// Stable storage label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a storage label. Unrecognized labels map to `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Self::Male,
            "female" => Self::Female,
            "other" => Self::Other,
            _ => Self::Unknown,
        }
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }
}

/// Person identity scoped to its source lineage: `lineage_id:person_id`.
///
/// Used wherever persons from more than one tree meet (matching, merging,
/// combined views), since bare person ids may collide across trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct NamespacedId {
    pub lineage_id: LineageId,
    pub person_id: PersonId,
}

impl NamespacedId {
    pub fn new(lineage_id: LineageId, person_id: PersonId) -> Self {
        Self {
            lineage_id,
            person_id,
        }
    }
}

impl Display for NamespacedId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.lineage_id, self.person_id)
    }
}

/// Error returned when a namespaced id string is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNamespacedIdError(pub String);

impl Display for ParseNamespacedIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid namespaced id `{}`; expected `lineage_id:person_id`",
            self.0
        )
    }
}

impl Error for ParseNamespacedIdError {}

impl FromStr for NamespacedId {
    type Err = ParseNamespacedIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (lineage, person) = value
            .split_once(':')
            .ok_or_else(|| ParseNamespacedIdError(value.to_string()))?;
        let lineage_id =
            Uuid::parse_str(lineage).map_err(|_| ParseNamespacedIdError(value.to_string()))?;
        let person_id =
            Uuid::parse_str(person).map_err(|_| ParseNamespacedIdError(value.to_string()))?;
        Ok(Self::new(lineage_id, person_id))
    }
}

impl From<NamespacedId> for String {
    fn from(value: NamespacedId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for NamespacedId {
    type Error = ParseNamespacedIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Canonical person record.
///
/// Name segments follow the family / middle / given convention; the optional
/// variants hold culture-specific alternate names (common, honorific,
/// posthumous, religious, Han-Nom script).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub lineage_id: LineageId,
    pub family_name: Option<String>,
    pub middle_name: Option<String>,
    pub given_name: String,
    pub common_name: Option<String>,
    pub honorific_name: Option<String>,
    pub posthumous_name: Option<String>,
    pub religious_name: Option<String>,
    pub han_nom_name: Option<String>,
    pub gender: Gender,
    pub is_alive: bool,
    /// Tree depth hint; may be sparse or inconsistent between trees.
    pub generation_number: Option<i32>,
    pub birth_date: Option<FlexibleDate>,
    pub death_date: Option<FlexibleDate>,
    pub biography: Option<String>,
    pub notes: Option<String>,
    pub birth_place: Option<String>,
    pub death_place: Option<String>,
    pub burial_place: Option<String>,
}

impl Person {
    /// Creates a living person of unknown gender with a generated id.
    pub fn new(lineage_id: LineageId, given_name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), lineage_id, given_name)
    }

    /// Creates a person with a caller-provided id.
    ///
    /// Used by store and import paths where identity already exists.
    pub fn with_id(id: PersonId, lineage_id: LineageId, given_name: impl Into<String>) -> Self {
        Self {
            id,
            lineage_id,
            family_name: None,
            middle_name: None,
            given_name: given_name.into(),
            common_name: None,
            honorific_name: None,
            posthumous_name: None,
            religious_name: None,
            han_nom_name: None,
            gender: Gender::Unknown,
            is_alive: true,
            generation_number: None,
            birth_date: None,
            death_date: None,
            biography: None,
            notes: None,
            birth_place: None,
            death_place: None,
            burial_place: None,
        }
    }

    /// Family, middle and given segments joined by single spaces.
    ///
    /// Blank segments are skipped.
    pub fn full_name(&self) -> String {
        [
            self.family_name.as_deref(),
            self.middle_name.as_deref(),
            Some(self.given_name.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    pub fn namespaced_id(&self) -> NamespacedId {
        NamespacedId::new(self.lineage_id, self.id)
    }

    /// Authoritative birth year, if any.
    pub fn birth_year(&self) -> Option<i32> {
        self.birth_date.as_ref().and_then(FlexibleDate::year)
    }
}
