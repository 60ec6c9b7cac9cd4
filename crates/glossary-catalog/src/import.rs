//! Bulk import of term records.
//!
//! A run never aborts on a bad record: every record ends up in exactly one
//! bucket of the [`RunSummary`] (or is folded into another record's bucket by
//! an intra-batch collision warning). Relationship resolution is deliberately
//! not part of the run; see [`crate::Resolver`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use glossary_model::{TermId, TermRecord, ValidationError};

use crate::{CatalogError, TermStore, UpsertOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Missing/blank mandatory field, unusable name or bad priority.
    Validation,
    /// Category outside the closed set.
    Category,
    /// The store could not commit the record.
    Storage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRecord {
    /// Zero-based position of the record in the batch.
    pub position: usize,
    pub record: TermRecord,
    pub kind: FailureKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ImportWarning {
    /// Several records in one batch normalize to the same identifier; the
    /// last valid one was stored.
    #[serde(rename_all = "camelCase")]
    IntraBatchCollision {
        identifier: TermId,
        kept_position: usize,
        superseded_positions: Vec<usize>,
    },
}

/// Outcome of one import run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub records_total: usize,
    pub created: Vec<TermId>,
    pub updated: Vec<TermId>,
    pub unchanged: Vec<TermId>,
    pub failed: Vec<FailedRecord>,
    pub warnings: Vec<ImportWarning>,
}

impl RunSummary {
    fn begin(records_total: usize) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            records_total,
            created: Vec::new(),
            updated: Vec::new(),
            unchanged: Vec::new(),
            failed: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Identifiers that were stored (or already matched) in this run.
    pub fn succeeded(&self) -> usize {
        self.created.len() + self.updated.len() + self.unchanged.len()
    }

    /// True when no record failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, identifier: TermId, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.created.push(identifier),
            UpsertOutcome::Updated => self.updated.push(identifier),
            UpsertOutcome::Unchanged => self.unchanged.push(identifier),
        }
    }

    fn fail(&mut self, position: usize, record: &TermRecord, kind: FailureKind, reason: String) {
        tracing::debug!(position, name = record.label(), ?kind, %reason, "record failed");
        self.failed.push(FailedRecord {
            position,
            record: record.clone(),
            kind,
            reason,
        });
    }
}

fn validation_kind(err: &ValidationError) -> FailureKind {
    if err.is_category() {
        FailureKind::Category
    } else {
        FailureKind::Validation
    }
}

/// Batch importer bound to one store.
#[derive(Debug, Clone)]
pub struct ImportPipeline {
    store: Arc<TermStore>,
}

impl ImportPipeline {
    pub fn new(store: Arc<TermStore>) -> Self {
        Self { store }
    }

    /// Validate and upsert every record; never fails as a whole.
    ///
    /// Records are validated in file order. Records sharing an identifier are
    /// collapsed so that the last valid one is written (once), and a collision
    /// warning lists the ones it superseded. The store's write gate is held for
    /// the entire run, so a resolution pass cannot observe a partial batch.
    pub fn import_batch(&self, records: &[TermRecord]) -> RunSummary {
        let mut summary = RunSummary::begin(records.len());
        let _gate = self.store.write_gate();

        // identifier -> positions of valid records, in file order
        let mut order: Vec<TermId> = Vec::new();
        let mut positions: HashMap<TermId, Vec<usize>> = HashMap::new();

        for (position, record) in records.iter().enumerate() {
            match record.validate() {
                Ok(term) => {
                    let slot = positions.entry(term.identifier.clone()).or_default();
                    if slot.is_empty() {
                        order.push(term.identifier);
                    }
                    slot.push(position);
                }
                Err(err) => {
                    summary.fail(position, record, validation_kind(&err), err.to_string());
                }
            }
        }

        for identifier in order {
            let Some(seen) = positions.remove(&identifier) else {
                continue;
            };
            let Some((&kept, superseded)) = seen.split_last() else {
                continue;
            };

            if !superseded.is_empty() {
                tracing::warn!(
                    identifier = %identifier,
                    kept_position = kept,
                    superseded = ?superseded,
                    "records collide on one identifier; last one wins"
                );
                summary.warnings.push(ImportWarning::IntraBatchCollision {
                    identifier: identifier.clone(),
                    kept_position: kept,
                    superseded_positions: superseded.to_vec(),
                });
            }

            let record = &records[kept];
            match self.store.upsert(record) {
                Ok(outcome) => {
                    tracing::debug!(identifier = %identifier, ?outcome, "record imported");
                    summary.record(identifier, outcome);
                }
                Err(CatalogError::Validation(err)) => {
                    summary.fail(kept, record, validation_kind(&err), err.to_string());
                }
                Err(CatalogError::Storage(err)) => {
                    summary.fail(kept, record, FailureKind::Storage, err.to_string());
                }
            }
        }

        summary.failed.sort_by_key(|f| f.position);
        summary.finished_at = Utc::now();

        tracing::info!(
            run_id = %summary.run_id,
            records = summary.records_total,
            created = summary.created.len(),
            updated = summary.updated.len(),
            unchanged = summary.unchanged.len(),
            failed = summary.failed.len(),
            warnings = summary.warnings.len(),
            "import run finished"
        );

        self.store.record_import(summary.clone());
        summary
    }
}
