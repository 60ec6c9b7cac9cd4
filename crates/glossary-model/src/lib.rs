//! Glossary term model
//!
//! This crate defines the strongly typed vocabulary shared by every other
//! glossary crate:
//!
//! - [`TermId`]: the normalized, URL-safe identifier derived from a display name,
//! - [`Category`]: the closed set of fourteen policy areas,
//! - [`Term`] / [`Priority`]: a validated glossary entry,
//! - [`TermRecord`]: the loosely typed import record as authored in files.
//!
//! Records only become [`Term`]s through [`TermRecord::validate`]; nothing
//! downstream has to deal with missing or blank mandatory fields.

pub mod category;
pub mod identifier;
pub mod record;
pub mod term;

pub use category::{Category, UnknownCategory};
pub use identifier::{normalize_identifier, TermId};
pub use record::{TermRecord, ValidationError};
pub use term::{Priority, Term, UnknownPriority};
