//! Genealogy graph engine.
//! This crate is the single source of truth for family-tree invariants:
//! graph construction, depth and branch derivation, identity matching across
//! lineages and multi-lineage merge.

pub mod db;
pub mod graph;
pub mod logging;
pub mod matching;
pub mod merge;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use graph::builder::build;
pub use graph::collapse::{filter_by_collapsed, CollapsedView};
pub use graph::combined::{combine_lineages, CombinedGraph, CombinedNode, LineageSource};
pub use graph::depth::{compute_depth, filter_by_branch, filter_by_depth, find_parent_cycle};
pub use graph::kinship::{calculate_kinship, KinshipResult, KinshipSide};
pub use graph::{BuildDiagnostics, EdgeKey, FamilyGraph, GraphNode, Rels};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use matching::matcher::{
    match_persons, match_persons_with_policy, MatchCandidate, MatchField, MatchPolicy, MatchResult,
};
pub use merge::coordinator::{
    MergeCoordinator, MergeError, MergeOptions, MergeResult, MergeStep,
};
pub use merge::plan::{
    plan_merge, FieldChoice, FieldConflict, FieldResolutions, MergePlan, MergeSource,
    ResolvableField,
};
pub use merge::PersonMapping;
pub use model::date::{CalendarConverter, CalendarType, DateQualifier, FlexibleDate};
pub use model::lineage::{CloneRequest, Lineage, LineageDraft};
pub use model::person::{Gender, LineageId, NamespacedId, Person, PersonId};
pub use model::relationship::{EdgeCategory, Relationship, RelationshipKind, RelationshipType};
pub use repo::sqlite_store::SqliteRecordStore;
pub use repo::store::{RecordStore, StoreError, StoreResult};
pub use service::lineage_service::{LineageService, LineageServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
