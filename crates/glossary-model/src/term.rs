use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::{Category, TermId};

/// Editorial priority. Ordered so that `Essential > High > Normal`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    High,
    Essential,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown priority `{0}` (expected normal, high or essential)")]
pub struct UnknownPriority(pub String);

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "essential" => Ok(Priority::Essential),
            _ => Err(UnknownPriority(s.to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Essential => "essential",
        };
        f.write_str(s)
    }
}

/// A validated glossary entry.
///
/// Obtained from [`crate::TermRecord::validate`]. The mandatory text fields are
/// guaranteed non-empty and `category` is always one of [`Category::ALL`].
///
/// `related_term_ids` belongs to the relationship resolver: validation always
/// leaves it empty, and it never takes part in change detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub identifier: TermId,
    pub display_name: String,
    pub definition: String,
    pub category: Category,
    pub tags: BTreeSet<String>,
    pub why_it_matters: String,
    pub local_context: String,
    pub supporting_data: Option<String>,
    pub policy_alignment: Option<String>,
    /// Related term names as authored; mirrored onto the targets on resolution.
    pub related_term_names: Vec<String>,
    /// Names the author links one way only (never mirrored).
    pub one_way_term_names: Vec<String>,
    pub related_term_ids: Vec<TermId>,
    pub priority: Priority,
    pub featured: bool,
}

impl Term {
    /// Structural equality of the authored content, ignoring `related_term_ids`.
    pub fn same_content(&self, other: &Term) -> bool {
        let Term {
            identifier,
            display_name,
            definition,
            category,
            tags,
            why_it_matters,
            local_context,
            supporting_data,
            policy_alignment,
            related_term_names,
            one_way_term_names,
            related_term_ids: _,
            priority,
            featured,
        } = self;

        *identifier == other.identifier
            && *display_name == other.display_name
            && *definition == other.definition
            && *category == other.category
            && *tags == other.tags
            && *why_it_matters == other.why_it_matters
            && *local_context == other.local_context
            && *supporting_data == other.supporting_data
            && *policy_alignment == other.policy_alignment
            && *related_term_names == other.related_term_names
            && *one_way_term_names == other.one_way_term_names
            && *priority == other.priority
            && *featured == other.featured
    }

    /// Key used for every name-ordered listing: case-folded name, then identifier.
    pub fn sort_key(&self) -> (String, &str) {
        (self.display_name.to_lowercase(), self.identifier.as_str())
    }
}
