//! Glossary Term Catalog
//!
//! One store, three collaborators:
//!
//! ```text
//! ┌──────────────┐    ┌────────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ TermRecord[] │───►│ ImportPipeline │───►│  TermStore   │───►│ QueryService │
//! │ (untrusted)  │    │ validate+upsert│    │ id -> Term   │    │  read-only   │
//! └──────────────┘    └────────────────┘    └──────┬───────┘    └──────────────┘
//!                                                  │  ▲
//!                                                  ▼  │ relatedTermIds only
//!                                            ┌─────────────┐
//!                                            │  Resolver   │
//!                                            └─────────────┘
//! ```
//!
//! ## Key Properties
//!
//! - **Flat arena**: terms live in one map keyed by [`TermId`]; links between
//!   terms are identifier strings, so reference cycles are harmless.
//! - **Single write path**: [`TermStore::upsert`] is the only way records enter
//!   the store; the resolver may only rewrite resolved links.
//! - **Serialized writers, concurrent readers**: import runs and resolution
//!   passes hold one re-entrant write gate; readers clone `Arc<Term>` handles
//!   under a short shared lock and never observe a half-built term.
//! - **Durable**: file-backed stores log every mutation before applying it.

pub mod error;
pub mod import;
pub mod persistence;
pub mod query;
pub mod resolve;


use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use glossary_model::{Category, Term, TermId, TermRecord};

pub use error::{CatalogError, StorageError, TermNotFound};
pub use import::{FailedRecord, FailureKind, ImportPipeline, ImportWarning, RunSummary};
pub use persistence::{LogEntry, MemoryLog, TermLog, WriteAheadLog};
pub use query::{
    index_letter, AlphabeticalIndex, LetterGroup, LetterGroups, MatchRank, QueryService, SearchHit,
};
pub use resolve::{DanglingReference, RelinkFailure, ResolutionSummary, Resolver};

pub(crate) type TermMap = BTreeMap<TermId, Arc<Term>>;

// ============================================================================
// Core Types
// ============================================================================

/// What an upsert did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Last import and resolution summaries, for administrative review.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDiagnostics {
    pub last_import: Option<RunSummary>,
    pub last_resolution: Option<ResolutionSummary>,
}

// ============================================================================
// Store Configuration
// ============================================================================

/// Bounded exponential backoff for storage commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 50,
            max_delay_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Retry immediately, `max_attempts` times in total.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let mult = self.backoff_multiplier.max(1.0);
        let delay = self.initial_delay_ms as f64 * mult.powi(retry as i32 - 1);
        Duration::from_millis(delay.min(self.max_delay_ms as f64) as u64)
    }
}

// ============================================================================
// Term Store
// ============================================================================

/// The term arena: identifier -> term, plus the write gate and durability log.
pub struct TermStore {
    terms: RwLock<TermMap>,
    /// Held for a whole import run or resolution pass; re-entrant so that the
    /// holder can still call [`TermStore::upsert`].
    write_gate: ReentrantMutex<()>,
    log: Box<dyn TermLog>,
    retry: RetryPolicy,
    diagnostics: RwLock<RunDiagnostics>,
    data_dir: Option<PathBuf>,
}

impl TermStore {
    /// Empty store without persistence.
    pub fn in_memory() -> Self {
        Self::with_log(Box::new(MemoryLog), RetryPolicy::default())
    }

    /// Empty store writing through a custom log.
    pub fn with_log(log: Box<dyn TermLog>, retry: RetryPolicy) -> Self {
        Self {
            terms: RwLock::new(TermMap::new()),
            write_gate: ReentrantMutex::new(()),
            log,
            retry,
            diagnostics: RwLock::new(RunDiagnostics::default()),
            data_dir: None,
        }
    }

    /// Open (or create) a file-backed store in `dir`.
    pub fn open(dir: &Path, retry: RetryPolicy) -> Result<Self, StorageError> {
        let recovered = persistence::recover(dir)?;
        tracing::info!(
            dir = %dir.display(),
            terms = recovered.terms.len(),
            "opened term store"
        );
        Ok(Self {
            terms: RwLock::new(recovered.terms),
            write_gate: ReentrantMutex::new(()),
            log: Box::new(recovered.log),
            retry,
            diagnostics: RwLock::new(recovered.diagnostics),
            data_dir: Some(dir.to_path_buf()),
        })
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Serialize against other writers until the guard drops.
    pub(crate) fn write_gate(&self) -> ReentrantMutexGuard<'_, ()> {
        self.write_gate.lock()
    }

    // ========================================================================
    // Write Operations
    // ========================================================================

    /// Validate `record` and insert or fully replace the term at its identifier.
    ///
    /// - `Created`: no term had this identifier.
    /// - `Unchanged`: the stored term has identical authored content.
    /// - `Updated`: anything else; resolved links are carried over until the
    ///   next resolution pass.
    ///
    /// On any error the store is left exactly as it was.
    pub fn upsert(&self, record: &TermRecord) -> Result<UpsertOutcome, CatalogError> {
        let mut term = record.validate()?;
        let _gate = self.write_gate();

        let existing = self.terms.read().get(&term.identifier).cloned();
        let outcome = match &existing {
            None => UpsertOutcome::Created,
            Some(prev) if prev.same_content(&term) => return Ok(UpsertOutcome::Unchanged),
            Some(prev) => {
                term.related_term_ids = prev.related_term_ids.clone();
                UpsertOutcome::Updated
            }
        };

        self.commit(LogEntry::Upsert { term })?;
        Ok(outcome)
    }

    /// Replace the resolved links of one term (resolver only).
    pub(crate) fn relink(
        &self,
        identifier: &TermId,
        related_term_ids: Vec<TermId>,
    ) -> Result<(), StorageError> {
        let _gate = self.write_gate();
        if !self.terms.read().contains_key(identifier) {
            return Ok(());
        }
        self.commit(LogEntry::Relink {
            identifier: identifier.clone(),
            related_term_ids,
        })
    }

    /// Administrative removal. Returns `false` when the identifier is unknown.
    ///
    /// Other terms lose their resolved link to the removed one; their authored
    /// `related_term_names` stay, and will show up as dangling on the next
    /// resolution pass.
    pub fn remove(&self, identifier: &str) -> Result<bool, StorageError> {
        let _gate = self.write_gate();
        let Some(id) = self.terms.read().get_key_value(identifier).map(|(k, _)| k.clone()) else {
            return Ok(false);
        };
        self.commit(LogEntry::Remove { identifier: id })?;
        tracing::info!(identifier, "removed term");
        Ok(true)
    }

    /// Write a snapshot and truncate the log.
    pub fn compact(&self) -> Result<usize, StorageError> {
        let _gate = self.write_gate();
        let terms: Vec<Term> = self
            .terms
            .read()
            .values()
            .map(|t| Term::clone(t))
            .collect();
        self.log.checkpoint(&terms)?;
        tracing::info!(terms = terms.len(), "compacted term store");
        Ok(terms.len())
    }

    /// Log the entry (with bounded retries), then apply it in memory.
    fn commit(&self, entry: LogEntry) -> Result<(), StorageError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.log.append(&entry) {
                Ok(()) => break,
                Err(err) if attempt < max_attempts => {
                    let delay = self.retry.delay_for_retry(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "storage commit failed, retrying"
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(
                        attempts = attempt,
                        error = %err,
                        "storage commit failed; giving up"
                    );
                    return Err(StorageError::RetriesExhausted {
                        attempts: attempt,
                        last_error: err.to_string(),
                    });
                }
            }
        }

        persistence::apply_entry(&mut self.terms.write(), &entry);
        Ok(())
    }

    // ========================================================================
    // Read Operations
    // ========================================================================

    /// Exact identifier lookup.
    pub fn get(&self, identifier: &str) -> Result<Arc<Term>, TermNotFound> {
        self.terms
            .read()
            .get(identifier)
            .cloned()
            .ok_or_else(|| TermNotFound(identifier.to_string()))
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.terms.read().contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.terms.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.read().is_empty()
    }

    /// All terms, ordered by identifier.
    pub fn all(&self) -> Vec<Arc<Term>> {
        self.terms.read().values().cloned().collect()
    }

    /// Terms in `category`, ordered by display name.
    pub fn list_by_category(&self, category: Category) -> Vec<Arc<Term>> {
        let mut out: Vec<Arc<Term>> = self
            .terms
            .read()
            .values()
            .filter(|t| t.category == category)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        out
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    pub fn diagnostics(&self) -> RunDiagnostics {
        self.diagnostics.read().clone()
    }

    pub(crate) fn record_import(&self, summary: RunSummary) {
        let mut diagnostics = self.diagnostics.write();
        diagnostics.last_import = Some(summary);
        self.save_diagnostics(&diagnostics);
    }

    pub(crate) fn record_resolution(&self, summary: ResolutionSummary) {
        let mut diagnostics = self.diagnostics.write();
        diagnostics.last_resolution = Some(summary);
        self.save_diagnostics(&diagnostics);
    }

    fn save_diagnostics(&self, diagnostics: &RunDiagnostics) {
        if let Err(err) = self.log.save_diagnostics(diagnostics) {
            tracing::warn!(error = %err, "failed to persist run diagnostics");
        }
    }
}

impl std::fmt::Debug for TermStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermStore")
            .field("terms", &self.len())
            .field("data_dir", &self.data_dir)
            .finish()
    }
}
