//! Related-term resolution.
//!
//! Import stores related terms by *name*; this pass turns names into
//! identifiers once everything in the batch (or in later batches) exists:
//!
//! 1. every authored name is normalized exactly like a display name,
//! 2. names that hit a stored term become forward links,
//! 3. names that miss are reported as dangling and retried next pass,
//! 4. every forward link from `related_term_names` is mirrored onto its
//!    target; `one_way_term_names` links are not.
//!
//! Links are recomputed from scratch on each pass, which makes the pass
//! idempotent and independent of the order terms were imported in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use uuid::Uuid;

use glossary_model::TermId;

use crate::TermStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingReference {
    /// Term that mentions the missing name.
    pub term: TermId,
    /// Name as authored.
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelinkFailure {
    pub identifier: TermId,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub terms_scanned: usize,
    /// Forward links found (before mirroring).
    pub links_resolved: usize,
    /// Terms whose resolved links changed in this pass.
    pub relinked: Vec<TermId>,
    pub dangling: Vec<DanglingReference>,
    /// Terms that list themselves as related (skipped).
    pub self_references: Vec<TermId>,
    pub failed: Vec<RelinkFailure>,
}

/// Second-pass link resolver bound to one store.
#[derive(Debug, Clone)]
pub struct Resolver {
    store: Arc<TermStore>,
}

impl Resolver {
    pub fn new(store: Arc<TermStore>) -> Self {
        Self { store }
    }

    /// Recompute `related_term_ids` for every term.
    pub fn resolve(&self) -> ResolutionSummary {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let _gate = self.store.write_gate();

        let terms = self.store.all();

        let mut forward: BTreeMap<TermId, Vec<TermId>> = BTreeMap::new();
        let mut mirrored: BTreeMap<TermId, BTreeSet<TermId>> = BTreeMap::new();
        let mut dangling = Vec::new();
        let mut self_references = Vec::new();
        let mut links_resolved = 0;

        for term in &terms {
            let own = &term.identifier;
            let mut links: Vec<TermId> = Vec::new();

            let authored = term
                .related_term_names
                .iter()
                .map(|n| (n, true))
                .chain(term.one_way_term_names.iter().map(|n| (n, false)));

            for (name, symmetric) in authored {
                let target = match TermId::from_name(name) {
                    Some(id) if self.store.contains(id.as_str()) => id,
                    _ => {
                        dangling.push(DanglingReference {
                            term: own.clone(),
                            name: name.clone(),
                        });
                        continue;
                    }
                };

                if &target == own {
                    if !self_references.contains(own) {
                        tracing::warn!(term = %own, "term lists itself as related; skipped");
                        self_references.push(own.clone());
                    }
                    continue;
                }

                if symmetric {
                    mirrored
                        .entry(target.clone())
                        .or_default()
                        .insert(own.clone());
                }
                if !links.contains(&target) {
                    links.push(target);
                    links_resolved += 1;
                }
            }

            forward.insert(own.clone(), links);
        }

        let mut relinked = Vec::new();
        let mut failed = Vec::new();

        for term in &terms {
            let own = &term.identifier;
            let mut links = forward.remove(own).unwrap_or_default();
            if let Some(back) = mirrored.remove(own) {
                for id in back {
                    if !links.contains(&id) {
                        links.push(id);
                    }
                }
            }

            if links == term.related_term_ids {
                continue;
            }

            match self.store.relink(own, links) {
                Ok(()) => relinked.push(own.clone()),
                Err(err) => failed.push(RelinkFailure {
                    identifier: own.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        for d in &dangling {
            tracing::warn!(term = %d.term, name = %d.name, "dangling related-term reference");
        }

        let summary = ResolutionSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            terms_scanned: terms.len(),
            links_resolved,
            relinked,
            dangling,
            self_references,
            failed,
        };

        tracing::info!(
            run_id = %summary.run_id,
            terms = summary.terms_scanned,
            links = summary.links_resolved,
            relinked = summary.relinked.len(),
            dangling = summary.dangling.len(),
            failed = summary.failed.len(),
            "resolution pass finished"
        );

        self.store.record_resolution(summary.clone());
        summary
    }
}
