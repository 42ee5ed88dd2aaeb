//! Store-touching merge protocol.
//!
//! # Responsibility
//! - Run the strict sequence snapshot -> plan -> atomic write -> delete.
//! - Report failures with the step and lineage they happened in.
//!
//! # Invariants
//! - Any snapshot failure aborts before the store is written.
//! - Absorbed lineages are deleted only after the merged write landed.
//! - The target lineage is never deleted.
//! - Callers serialize merges per target lineage; nothing here locks.

use crate::merge::plan::{
    plan_merge, FieldConflict, FieldResolutions, MergeSource, MergeStats, RejectedMapping,
};
use crate::merge::PersonMapping;
use crate::model::lineage::{CloneRequest, Lineage};
use crate::model::person::{LineageId, NamespacedId, Person, PersonId};
use crate::model::relationship::Relationship;
use crate::repo::store::{RecordKind, RecordStore, StoreError};
use log::{error, info};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Merge protocol switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Clone every source before writing; disable only when the caller
    /// keeps its own backup.
    pub snapshot_sources: bool,
    /// Delete absorbed lineages after the merged write.
    pub delete_sources: bool,
    /// Name for snapshot lineages; defaults to `<source name> (before merge)`.
    pub snapshot_name: Option<String>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            snapshot_sources: true,
            delete_sources: false,
            snapshot_name: None,
        }
    }
}

/// Store-touching protocol step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStep {
    Snapshot,
    Write,
    DeleteSource,
}

impl MergeStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Write => "write",
            Self::DeleteSource => "delete_source",
        }
    }
}

/// Snapshot lineage created for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSnapshot {
    pub source_lineage_id: LineageId,
    pub snapshot: Lineage,
}

/// Outcome of a merge whose write landed.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    pub target_lineage_id: LineageId,
    pub persons: Vec<Person>,
    pub relationships: Vec<Relationship>,
    pub id_map: HashMap<NamespacedId, PersonId>,
    pub stats: MergeStats,
    /// Mapped pairs needing a human decision; empty when none.
    pub conflicts: Vec<FieldConflict>,
    pub rejected_mappings: Vec<RejectedMapping>,
    pub snapshots: Vec<SourceSnapshot>,
    pub deleted_sources: Vec<LineageId>,
}

/// Errors from the merge protocol.
#[derive(Debug)]
pub enum MergeError {
    /// No source lineage was supplied.
    NoSources,
    /// A snapshot or the merged write failed; the store holds no merge output.
    Step {
        step: MergeStep,
        lineage_id: LineageId,
        source: StoreError,
    },
    /// The merged write landed but deleting an absorbed lineage failed.
    DeleteSource {
        lineage_id: LineageId,
        source: StoreError,
        result: Box<MergeResult>,
    },
}

impl MergeError {
    pub fn step(&self) -> Option<MergeStep> {
        match self {
            Self::NoSources => None,
            Self::Step { step, .. } => Some(*step),
            Self::DeleteSource { .. } => Some(MergeStep::DeleteSource),
        }
    }

    pub fn lineage_id(&self) -> Option<LineageId> {
        match self {
            Self::NoSources => None,
            Self::Step { lineage_id, .. } | Self::DeleteSource { lineage_id, .. } => {
                Some(*lineage_id)
            }
        }
    }

    /// Whether the merged output is already persisted.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::DeleteSource { .. })
    }
}

impl Display for MergeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSources => write!(f, "merge requires at least one source lineage"),
            Self::Step {
                step,
                lineage_id,
                source,
            } => write!(
                f,
                "merge {} failed for lineage {lineage_id}: {source}",
                step.as_str()
            ),
            Self::DeleteSource {
                lineage_id, source, ..
            } => write!(
                f,
                "merge committed but deleting source lineage {lineage_id} failed: {source}"
            ),
        }
    }
}

impl Error for MergeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoSources => None,
            Self::Step { source, .. } => Some(source),
            Self::DeleteSource { source, .. } => Some(source),
        }
    }
}

/// Runs merges against one record store.
pub struct MergeCoordinator<'s, S: RecordStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: RecordStore + ?Sized> MergeCoordinator<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Merges `sources` into the first one.
    ///
    /// Unresolved field conflicts do not fail the merge; they are listed in
    /// the result and the affected fields keep the primary's value.
    pub fn merge(
        &self,
        sources: &[MergeSource],
        mappings: &[PersonMapping],
        resolutions: &FieldResolutions,
        options: &MergeOptions,
    ) -> Result<MergeResult, MergeError> {
        let Some((target, absorbed)) = sources.split_first() else {
            return Err(MergeError::NoSources);
        };
        let target_lineage_id = target.lineage_id;

        let mut snapshots = Vec::new();
        if options.snapshot_sources {
            for source in sources {
                snapshots.push(self.snapshot(source.lineage_id, options)?);
            }
        }

        let plan = plan_merge(target, absorbed, mappings, resolutions);

        logged_step(MergeStep::Write, target_lineage_id, || {
            self.store.apply_merge(&plan.write())
        })
        .map_err(|source| MergeError::Step {
            step: MergeStep::Write,
            lineage_id: target_lineage_id,
            source,
        })?;

        let mut result = MergeResult {
            target_lineage_id,
            persons: plan.persons,
            relationships: plan.relationships,
            id_map: plan.id_map,
            stats: plan.stats,
            conflicts: plan.conflicts,
            rejected_mappings: plan.rejected_mappings,
            snapshots,
            deleted_sources: Vec::new(),
        };

        if options.delete_sources {
            for source in absorbed {
                let lineage_id = source.lineage_id;
                if lineage_id == target_lineage_id || result.deleted_sources.contains(&lineage_id)
                {
                    continue;
                }
                if let Err(err) = logged_step(MergeStep::DeleteSource, lineage_id, || {
                    self.store.delete_lineage(lineage_id)
                }) {
                    return Err(MergeError::DeleteSource {
                        lineage_id,
                        source: err,
                        result: Box::new(result),
                    });
                }
                result.deleted_sources.push(lineage_id);
            }
        }

        Ok(result)
    }

    fn snapshot(
        &self,
        lineage_id: LineageId,
        options: &MergeOptions,
    ) -> Result<SourceSnapshot, MergeError> {
        let snapshot = logged_step(MergeStep::Snapshot, lineage_id, || {
            let lineage = self
                .store
                .get_lineage(lineage_id)?
                .ok_or_else(|| StoreError::not_found(RecordKind::Lineage, lineage_id))?;
            let name = options
                .snapshot_name
                .clone()
                .unwrap_or_else(|| format!("{} (before merge)", lineage.name));
            self.store
                .clone_lineage(lineage_id, &CloneRequest::full(name))
        })
        .map_err(|source| MergeError::Step {
            step: MergeStep::Snapshot,
            lineage_id,
            source,
        })?;
        Ok(SourceSnapshot {
            source_lineage_id: lineage_id,
            snapshot,
        })
    }
}

fn logged_step<T>(
    step: MergeStep,
    lineage_id: LineageId,
    call: impl FnOnce() -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let started_at = Instant::now();
    info!(
        "event=merge_step module=merge status=start step={} lineage={lineage_id}",
        step.as_str()
    );
    match call() {
        Ok(value) => {
            info!(
                "event=merge_step module=merge status=ok step={} lineage={lineage_id} duration_ms={}",
                step.as_str(),
                started_at.elapsed().as_millis()
            );
            Ok(value)
        }
        Err(source) => {
            error!(
                "event=merge_step module=merge status=error step={} lineage={lineage_id} duration_ms={} error={}",
                step.as_str(),
                started_at.elapsed().as_millis(),
                source
            );
            Err(source)
        }
    }
}
