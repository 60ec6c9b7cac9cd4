//! Record file loading for the glossary catalog
//!
//! Turns files on disk into a batch of [`TermRecord`]s for the import pipeline:
//! - JSON: an array of records, or an object with a `terms` array
//! - TOML: `[[terms]]` tables
//! - directories: every `.json` / `.toml` file below them, in path order
//!
//! Decoding is per entry. An entry that is not record-shaped becomes a
//! [`Rejection`] and the rest of the file still loads; a file that does not
//! parse at all is an error for the whole call.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use glossary_model::TermRecord;

/// Supported record file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Json,
    Toml,
}

impl RecordFormat {
    /// Format implied by the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(RecordFormat::Json),
            "toml" => Some(RecordFormat::Toml),
            _ => None,
        }
    }
}

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSource {
    pub file: PathBuf,
    /// Zero-based entry index inside the file.
    pub position: usize,
}

/// An entry that could not be decoded into a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub source: RecordSource,
    pub reason: String,
}

/// Result of loading one or more paths.
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    /// Records in load order; this is the batch handed to the importer.
    pub records: Vec<TermRecord>,
    /// `sources[i]` is the origin of `records[i]`.
    pub sources: Vec<RecordSource>,
    pub rejections: Vec<Rejection>,
    pub files: Vec<PathBuf>,
}

impl LoadedRecords {
    /// Origin of the record at `batch_position`.
    pub fn source_of(&self, batch_position: usize) -> Option<&RecordSource> {
        self.sources.get(batch_position)
    }

    fn extend(&mut self, other: LoadedRecords) {
        self.records.extend(other.records);
        self.sources.extend(other.sources);
        self.rejections.extend(other.rejections);
        self.files.extend(other.files);
    }
}

/// Load several files or directories into one batch, in argument order.
pub fn load_paths<P: AsRef<Path>>(paths: &[P]) -> Result<LoadedRecords> {
    let mut loaded = LoadedRecords::default();
    for path in paths {
        loaded.extend(load_path(path.as_ref())?);
    }
    Ok(loaded)
}

/// Load a single file, or every record file below a directory.
pub fn load_path(path: &Path) -> Result<LoadedRecords> {
    if path.is_dir() {
        return load_dir(path);
    }
    load_file(path)
}

fn load_dir(root: &Path) -> Result<LoadedRecords> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if entry.file_type().is_file() && RecordFormat::from_path(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    files.sort();

    tracing::debug!(dir = %root.display(), files = files.len(), "found record files");

    let mut loaded = LoadedRecords::default();
    for file in files {
        loaded.extend(load_file(&file)?);
    }
    Ok(loaded)
}

/// Load one record file; the format comes from its extension.
pub fn load_file(path: &Path) -> Result<LoadedRecords> {
    let format = RecordFormat::from_path(path).ok_or_else(|| {
        anyhow!(
            "unsupported record file {} (expected .json or .toml)",
            path.display()
        )
    })?;
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let entries = match format {
        RecordFormat::Json => parse_json(&text),
        RecordFormat::Toml => parse_toml(&text),
    }
    .with_context(|| format!("failed to parse {}", path.display()))?;

    let mut loaded = LoadedRecords {
        files: vec![path.to_path_buf()],
        ..LoadedRecords::default()
    };
    for (position, entry) in entries.into_iter().enumerate() {
        let source = RecordSource {
            file: path.to_path_buf(),
            position,
        };
        match entry {
            Ok(record) => {
                loaded.records.push(record);
                loaded.sources.push(source);
            }
            Err(reason) => {
                tracing::warn!(
                    file = %path.display(),
                    position,
                    %reason,
                    "rejected record entry"
                );
                loaded.rejections.push(Rejection { source, reason });
            }
        }
    }

    tracing::info!(
        file = %path.display(),
        records = loaded.records.len(),
        rejected = loaded.rejections.len(),
        "loaded record file"
    );
    Ok(loaded)
}

type Entry = std::result::Result<TermRecord, String>;

/// Decode JSON record text into per-entry results.
pub fn parse_json(text: &str) -> Result<Vec<Entry>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        serde_json::Value::Object(mut map) => match map.remove("terms") {
            Some(serde_json::Value::Array(entries)) => entries,
            Some(_) => bail!("`terms` must be an array"),
            None => bail!("expected an array of records or an object with a `terms` array"),
        },
        _ => bail!("expected an array of records or an object with a `terms` array"),
    };

    Ok(entries
        .into_iter()
        .map(|entry| {
            if !entry.is_object() {
                return Err(format!("expected a record object, found {}", json_kind(&entry)));
            }
            serde_json::from_value::<TermRecord>(entry).map_err(|e| e.to_string())
        })
        .collect())
}

/// Decode TOML record text (`[[terms]]` tables) into per-entry results.
pub fn parse_toml(text: &str) -> Result<Vec<Entry>> {
    let mut table: toml::Table = text.parse()?;
    let entries = match table.remove("terms") {
        Some(toml::Value::Array(entries)) => entries,
        Some(_) => bail!("`terms` must be an array of tables"),
        None => bail!("expected `[[terms]]` tables"),
    };

    Ok(entries
        .into_iter()
        .map(|entry| {
            if !entry.is_table() {
                return Err(format!("expected a record table, found {}", entry.type_str()));
            }
            TermRecord::deserialize(entry).map_err(|e| e.to_string())
        })
        .collect())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const JSON_BATCH: &str = r#"[
        {
            "displayName": "Living Wage",
            "definition": "Pay that covers basic needs.",
            "category": "Labor & Workforce",
            "whyItMatters": "Sets a floor for city contracts.",
            "localContext": "Adopted in 2019.",
            "relatedTermNames": ["Minimum Wage"],
            "priority": "High",
            "featured": true
        },
        "not a record",
        {
            "name": "Minimum Wage",
            "definition": "Lowest legal hourly pay.",
            "category": "labor-workforce",
            "whyItMatters": "Baseline for workers.",
            "localContext": "Indexed to inflation.",
            "somethingElse": 42
        }
    ]"#;

    #[test]
    fn test_json_array_with_rejection() {
        let entries = parse_json(JSON_BATCH).unwrap();
        assert_eq!(entries.len(), 3);
        let first = entries[0].as_ref().unwrap();
        assert_eq!(first.display_name.as_deref(), Some("Living Wage"));
        assert_eq!(first.featured, Some(true));
        assert!(entries[1].as_ref().unwrap_err().contains("a string"));
        assert_eq!(
            entries[2].as_ref().unwrap().display_name.as_deref(),
            Some("Minimum Wage")
        );
    }

    #[test]
    fn test_json_terms_object() {
        let entries = parse_json(r#"{"terms": [{"displayName": "Quorum"}]}"#).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_ok());
    }

    #[test]
    fn test_json_wrong_field_type_is_rejected() {
        let entries = parse_json(r#"[{"displayName": "Quorum", "tags": 5}]"#).unwrap();
        assert!(entries[0].is_err());
    }

    #[test]
    fn test_json_unparseable_is_an_error() {
        assert!(parse_json("[{").is_err());
        assert!(parse_json("42").is_err());
        assert!(parse_json(r#"{"records": []}"#).is_err());
    }

    #[test]
    fn test_toml_terms_tables() {
        let text = r#"
            [[terms]]
            displayName = "Participatory Budgeting"
            definition = "Residents decide how to spend part of a budget."
            category = "Civic Engagement"
            whyItMatters = "Direct say over public money."
            localContext = "Two districts piloted it."
            tags = ["budget", "participation"]

            [[terms]]
            displayName = "Town Hall"
        "#;
        let entries = parse_toml(text).unwrap();
        assert_eq!(entries.len(), 2);
        let first = entries[0].as_ref().unwrap();
        assert_eq!(first.tags, vec!["budget", "participation"]);
        assert_eq!(
            entries[1].as_ref().unwrap().display_name.as_deref(),
            Some("Town Hall")
        );
    }

    #[test]
    fn test_toml_without_terms_is_an_error() {
        assert!(parse_toml("title = \"glossary\"").is_err());
        assert!(parse_toml("terms = \"nope\"").is_err());
    }

    #[test]
    fn test_toml_non_table_entry_is_rejected() {
        let entries = parse_toml("terms = [1, 2]").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.is_err()));
    }

    #[test]
    fn test_load_file_tracks_sources() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labor.json");
        fs::write(&path, JSON_BATCH).unwrap();

        let loaded = load_path(&path).unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.rejections.len(), 1);
        assert_eq!(loaded.rejections[0].source.position, 1);
        assert_eq!(loaded.source_of(1).unwrap().position, 2);
        assert_eq!(loaded.files, vec![path]);
    }

    #[test]
    fn test_load_dir_is_recursive_and_sorted() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(
            dir.path().join("b/one.toml"),
            "[[terms]]\ndisplayName = \"Second\"\n",
        )
        .unwrap();
        fs::write(dir.path().join("a.json"), r#"[{"displayName": "First"}]"#).unwrap();
        fs::write(dir.path().join("notes.md"), "# not records").unwrap();

        let loaded = load_path(dir.path()).unwrap();
        let names: Vec<_> = loaded
            .records
            .iter()
            .map(|r| r.display_name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["First", "Second"]);
        assert_eq!(loaded.files.len(), 2);
    }

    #[test]
    fn test_load_paths_concatenates_in_argument_order() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.json");
        let z = dir.path().join("z.json");
        fs::write(&a, r#"[{"displayName": "Alpha"}]"#).unwrap();
        fs::write(&z, r#"[{"displayName": "Zulu"}]"#).unwrap();

        let loaded = load_paths(&[z, a]).unwrap();
        assert_eq!(loaded.records[0].display_name.as_deref(), Some("Zulu"));
        assert_eq!(
            loaded.source_of(1).unwrap().file.file_name().and_then(|n| n.to_str()),
            Some("a.json")
        );
    }

    #[test]
    fn test_unsupported_extension_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("terms.csv");
        fs::write(&path, "name\n").unwrap();
        let err = load_path(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported record file"));
    }
}
