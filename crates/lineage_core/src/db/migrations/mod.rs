//! Ordered schema migrations for the record store.
//!
//! # Invariants
//! - Versions start at 1 and increase by exactly one per step.
//! - `PRAGMA user_version` always equals the last applied step.
//! - Relationship tables are created after the person table they reference.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// One schema step.
#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "lineages_persons",
        sql: include_str!("0001_lineages_persons.sql"),
    },
    SchemaStep {
        version: 2,
        name: "relationships",
        sql: include_str!("0002_relationships.sql"),
    },
];

/// Schema version a fully migrated database reports.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Reads the schema version recorded in `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Brings `conn` up to [`latest_version`] inside one transaction.
///
/// Returns how many steps ran; zero for an already current database.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let found = schema_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > found)
        .collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;
    Ok(pending.len())
}
