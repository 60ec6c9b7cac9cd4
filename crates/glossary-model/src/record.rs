//! Import records (untrusted input).
//!
//! A [`TermRecord`] mirrors the authored file shape: every field is optional at
//! the serde level so that a missing `definition` surfaces as a
//! [`ValidationError`] for that one record instead of a decode failure for the
//! whole file. [`TermRecord::validate`] is the single place where a record turns
//! into a [`Term`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::{Category, Priority, Term, TermId, UnknownCategory, UnknownPriority};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TermRecord {
    #[serde(alias = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub why_it_matters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_context: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supporting_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_alignment: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_term_names: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub one_way_term_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing or empty required field `{0}`")]
    MissingField(&'static str),

    #[error("display name `{0}` does not produce a usable identifier")]
    EmptyIdentifier(String),

    #[error(transparent)]
    Category(#[from] UnknownCategory),

    #[error(transparent)]
    Priority(#[from] UnknownPriority),
}

impl ValidationError {
    /// True for category-set violations (as opposed to structural problems).
    pub fn is_category(&self) -> bool {
        matches!(self, ValidationError::Category(_))
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ValidationError::MissingField(field))
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn names(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

impl TermRecord {
    /// Identifier this record would be stored under, if its name is usable.
    pub fn identifier(&self) -> Option<TermId> {
        self.display_name.as_deref().and_then(TermId::from_name)
    }

    /// Name for diagnostics, even when the record is invalid.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or("<unnamed>")
    }

    /// Validate the record and convert it into a [`Term`].
    ///
    /// Structural checks (mandatory fields) run before the category check, so a
    /// record that is both incomplete and mis-categorized reports the missing
    /// field.
    pub fn validate(&self) -> Result<Term, ValidationError> {
        let display_name = required(&self.display_name, "displayName")?;
        let identifier = TermId::from_name(&display_name)
            .ok_or_else(|| ValidationError::EmptyIdentifier(display_name.clone()))?;
        let definition = required(&self.definition, "definition")?;
        let why_it_matters = required(&self.why_it_matters, "whyItMatters")?;
        let local_context = required(&self.local_context, "localContext")?;
        let category_raw = required(&self.category, "category")?;

        let category: Category = category_raw.parse()?;
        let priority = match self.priority.as_deref() {
            Some(p) if !p.trim().is_empty() => p.parse()?,
            _ => Priority::Normal,
        };

        Ok(Term {
            identifier,
            display_name,
            definition,
            category,
            tags: names(&self.tags).into_iter().collect::<BTreeSet<_>>(),
            why_it_matters,
            local_context,
            supporting_data: optional(&self.supporting_data),
            policy_alignment: optional(&self.policy_alignment),
            related_term_names: names(&self.related_term_names),
            one_way_term_names: names(&self.one_way_term_names),
            related_term_ids: Vec::new(),
            priority,
            featured: self.featured.unwrap_or(false),
        })
    }
}
