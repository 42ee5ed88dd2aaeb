//! Record store abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the record store contract the engine consumes.
//! - Isolate SQLite query details from service and merge orchestration.
//!
//! # Invariants
//! - Store APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - The engine never reaches a store except through [`store::RecordStore`].

pub mod sqlite_store;
pub mod store;
