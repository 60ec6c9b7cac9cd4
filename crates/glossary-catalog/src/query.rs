//! Read-only queries for presentation code.
//!
//! Everything here hands out `Arc<Term>` snapshots. Callers never hold a
//! mutable reference into the store and must re-fetch after an import to see
//! new data.

use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

use glossary_model::{normalize_identifier, Category, Term};

use crate::{RunDiagnostics, TermNotFound, TermStore};

/// How a search hit matched, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchRank {
    ExactName,
    NamePrefix,
    NameContains,
    Definition,
    Tag,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub rank: MatchRank,
    pub term: Arc<Term>,
}

#[derive(Debug, Clone)]
pub struct QueryService {
    store: Arc<TermStore>,
}

impl QueryService {
    pub fn new(store: Arc<TermStore>) -> Self {
        Self { store }
    }

    /// Lookup by identifier. The argument is normalized first, so a display
    /// name works as well as the identifier itself.
    pub fn get_by_identifier(&self, identifier: &str) -> Result<Arc<Term>, TermNotFound> {
        let normalized = normalize_identifier(identifier);
        self.store
            .get(&normalized)
            .map_err(|_| TermNotFound(identifier.to_string()))
    }

    /// Terms of one category ordered by display name.
    pub fn list_by_category(&self, category: Category) -> Vec<Arc<Term>> {
        self.store.list_by_category(category)
    }

    /// Featured terms, most important first, then by name.
    pub fn list_featured(&self, limit: usize) -> Vec<Arc<Term>> {
        let mut featured: Vec<Arc<Term>> = self
            .store
            .all()
            .into_iter()
            .filter(|t| t.featured)
            .collect();
        featured.sort_by(|a, b| {
            (Reverse(a.priority), a.sort_key()).cmp(&(Reverse(b.priority), b.sort_key()))
        });
        featured.truncate(limit);
        featured
    }

    /// Case-insensitive substring search over name, definition and tags.
    ///
    /// Each term appears at most once, at its best rank. Within a rank,
    /// higher priority comes first, then name order.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = self
            .store
            .all()
            .into_iter()
            .filter_map(|term| match_rank(&term, &needle).map(|rank| SearchHit { rank, term }))
            .collect();

        hits.sort_by(|a, b| {
            (a.rank, Reverse(a.term.priority), a.term.sort_key()).cmp(&(
                b.rank,
                Reverse(b.term.priority),
                b.term.sort_key(),
            ))
        });
        hits
    }

    /// A-Z index over the current contents (computed on demand).
    pub fn group_alphabetically(&self) -> AlphabeticalIndex {
        AlphabeticalIndex::new(self.store.all())
    }

    /// Term counts per category, in category order (empty categories included).
    pub fn category_counts(&self) -> Vec<(Category, usize)> {
        let terms = self.store.all();
        Category::ALL
            .iter()
            .map(|c| (*c, terms.iter().filter(|t| t.category == *c).count()))
            .collect()
    }

    /// Last import and resolution summaries.
    pub fn diagnostics(&self) -> RunDiagnostics {
        self.store.diagnostics()
    }
}

fn match_rank(term: &Term, needle: &str) -> Option<MatchRank> {
    let name = term.display_name.to_lowercase();
    if name == needle {
        return Some(MatchRank::ExactName);
    }
    if name.starts_with(needle) {
        return Some(MatchRank::NamePrefix);
    }
    if name.contains(needle) {
        return Some(MatchRank::NameContains);
    }
    if term.definition.to_lowercase().contains(needle) {
        return Some(MatchRank::Definition);
    }
    if term.tags.iter().any(|t| t.to_lowercase().contains(needle)) {
        return Some(MatchRank::Tag);
    }
    None
}

// ============================================================================
// Alphabetical index
// ============================================================================

/// Index letter for a term: uppercased first alphanumeric character of the
/// display name; digits (and names without letters) go under `#`.
pub fn index_letter(term: &Term) -> char {
    match term.display_name.chars().find(|c| c.is_alphanumeric()) {
        Some(c) if c.is_alphabetic() => c.to_uppercase().next().unwrap_or(c),
        _ => '#',
    }
}

/// Point-in-time A-Z view. Iterating is cheap and can be repeated; groups are
/// sliced out of one sorted vector rather than stored.
#[derive(Debug, Clone)]
pub struct AlphabeticalIndex {
    terms: Vec<(char, Arc<Term>)>,
}

#[derive(Debug, Clone)]
pub struct LetterGroup<'a> {
    pub letter: char,
    terms: &'a [(char, Arc<Term>)],
}

impl<'a> LetterGroup<'a> {
    pub fn terms(&self) -> impl Iterator<Item = &'a Arc<Term>> + 'a {
        let terms: &'a [(char, Arc<Term>)] = self.terms;
        terms.iter().map(|(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl AlphabeticalIndex {
    fn new(terms: Vec<Arc<Term>>) -> Self {
        let mut terms: Vec<(char, Arc<Term>)> =
            terms.into_iter().map(|t| (index_letter(&t), t)).collect();
        terms.sort_by(|(la, a), (lb, b)| (la, a.sort_key()).cmp(&(lb, b.sort_key())));
        Self { terms }
    }

    pub fn iter(&self) -> LetterGroups<'_> {
        LetterGroups {
            rest: &self.terms,
        }
    }

    /// Letters that have at least one term.
    pub fn letters(&self) -> Vec<char> {
        self.iter().map(|g| g.letter).collect()
    }

    pub fn to_map(&self) -> BTreeMap<char, Vec<Arc<Term>>> {
        self.iter()
            .map(|g| (g.letter, g.terms().cloned().collect()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a AlphabeticalIndex {
    type Item = LetterGroup<'a>;
    type IntoIter = LetterGroups<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct LetterGroups<'a> {
    rest: &'a [(char, Arc<Term>)],
}

impl<'a> Iterator for LetterGroups<'a> {
    type Item = LetterGroup<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let all: &'a [(char, Arc<Term>)] = self.rest;
        let letter = all.first()?.0;
        let end = all
            .iter()
            .position(|(l, _)| *l != letter)
            .unwrap_or(all.len());
        let (group, rest) = all.split_at(end);
        self.rest = rest;
        Some(LetterGroup {
            letter,
            terms: group,
        })
    }
}
