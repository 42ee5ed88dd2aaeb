//! Genealogy domain model shared by the graph engine and the record store.
//!
//! # Responsibility
//! - Define canonical person, date, relationship and lineage records.
//! - Keep the fine-grained relationship vocabulary mapped onto a closed set of
//!   rendering categories.
//!
//! # Invariants
//! - A `PersonId` is only meaningful together with its `LineageId`; cross-tree
//!   code uses `NamespacedId`.
//! - Sibling relationships are derived from shared parents, never asserted.

pub mod date;
pub mod lineage;
pub mod person;
pub mod relationship;
