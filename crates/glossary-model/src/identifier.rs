//! Term identifiers.
//!
//! An identifier is derived from a display name and is the only key the
//! catalog uses. Identifiers are plain ASCII, `[a-z0-9-]` only:
//!
//! - non-ASCII letters are transliterated to ASCII (`é` to `e`, `İ` to `i`),
//!   characters with no ASCII form are dropped,
//! - lowercase everything,
//! - whitespace, `-`, `_` and `/` become a single `-`,
//! - every other non-alphanumeric character is dropped,
//! - leading/trailing separators are trimmed.
//!
//! `"Living Wage"`, `"living wage"` and `" Living  Wage! "` all map to
//! `living-wage`. Normalizing an identifier again returns it unchanged, so a
//! stored identifier is always a valid lookup key. Since the derivation
//! lowercases, uniqueness of identifiers is case-insensitive uniqueness of
//! names.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Normalized term identifier (e.g. `participatory-budgeting`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermId(String);

impl TermId {
    /// Derive an identifier from a display name.
    ///
    /// Returns `None` when nothing URL-safe survives normalization
    /// (e.g. `"!!!"` or an empty string).
    pub fn from_name(name: &str) -> Option<Self> {
        let id = normalize_identifier(name);
        if id.is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TermId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TermId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a display name into identifier form (may return an empty string).
pub fn normalize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars() {
        if c.is_ascii() {
            push_ascii(&mut out, &mut pending_separator, c);
        } else if c.is_whitespace() {
            pending_separator = true;
        } else if let Some(folded) = deunicode::deunicode_char(c) {
            for f in folded.chars() {
                push_ascii(&mut out, &mut pending_separator, f);
            }
        }
    }

    out
}

fn push_ascii(out: &mut String, pending_separator: &mut bool, c: char) {
    if c.is_ascii_alphanumeric() {
        if *pending_separator && !out.is_empty() {
            out.push('-');
        }
        *pending_separator = false;
        out.push(c.to_ascii_lowercase());
    } else if c.is_ascii_whitespace() || matches!(c, '-' | '_' | '/') {
        *pending_separator = true;
    }
    // Anything else is punctuation and is dropped without splitting words.
}
