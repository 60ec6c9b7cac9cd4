//! Durable catalog storage
//!
//! The in-memory term map is the source of truth for reads. Durability comes
//! from two files in the data directory:
//!
//! ```text
//! <data_dir>/
//! ├── terms.snapshot     # bincode Vec<Term>, written by `compact`
//! ├── catalog.wal        # length-prefixed, crc32-checked bincode LogEntry frames
//! └── diagnostics.json   # last import / resolution summaries
//! ```
//!
//! Every mutation is appended (and fsynced) to the log before it is applied in
//! memory, so a failed append leaves the store exactly as it was. Opening a
//! store loads the snapshot and replays the log on top of it.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glossary_model::{Term, TermId};

use crate::{RunDiagnostics, StorageError, TermMap};

const SNAPSHOT_FILE: &str = "terms.snapshot";
const WAL_FILE: &str = "catalog.wal";
const DIAGNOSTICS_FILE: &str = "diagnostics.json";

/// Length prefix plus trailing checksum.
const FRAME_OVERHEAD: u64 = 8;

// ============================================================================
// Log entries
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogEntry {
    /// Full-record replace (resolved links included, so replay is exact).
    Upsert { term: Term },
    /// Resolver update of `related_term_ids` only.
    Relink {
        identifier: TermId,
        related_term_ids: Vec<TermId>,
    },
    /// Administrative removal; also strips the id from every other term's links.
    Remove { identifier: TermId },
}

/// Apply one entry to a term map. Shared by the live write path and replay.
pub(crate) fn apply_entry(terms: &mut TermMap, entry: &LogEntry) {
    match entry {
        LogEntry::Upsert { term } => {
            terms.insert(term.identifier.clone(), Arc::new(term.clone()));
        }
        LogEntry::Relink {
            identifier,
            related_term_ids,
        } => {
            if let Some(current) = terms.get_mut(identifier) {
                let mut next = Term::clone(current);
                next.related_term_ids = related_term_ids.clone();
                *current = Arc::new(next);
            }
        }
        LogEntry::Remove { identifier } => {
            if terms.remove(identifier).is_none() {
                return;
            }
            for current in terms.values_mut() {
                if current.related_term_ids.contains(identifier) {
                    let mut next = Term::clone(current);
                    next.related_term_ids.retain(|id| id != identifier);
                    *current = Arc::new(next);
                }
            }
        }
    }
}

// ============================================================================
// Log backends
// ============================================================================

/// Where committed mutations go before they become visible.
pub trait TermLog: Send + Sync {
    /// Durably record one entry.
    fn append(&self, entry: &LogEntry) -> Result<(), StorageError>;

    /// Persist a full snapshot and drop the entries it covers.
    fn checkpoint(&self, _terms: &[Term]) -> Result<(), StorageError> {
        Ok(())
    }

    /// Persist the latest run diagnostics.
    fn save_diagnostics(&self, _diagnostics: &RunDiagnostics) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Log for purely in-memory stores: accepts everything, keeps nothing.
#[derive(Debug, Default)]
pub struct MemoryLog;

impl TermLog for MemoryLog {
    fn append(&self, _entry: &LogEntry) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Write-ahead log + snapshot in a data directory.
pub struct WriteAheadLog {
    file: Mutex<File>,
    dir: PathBuf,
}

impl WriteAheadLog {
    /// Open (creating if needed) the log in `dir`.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(dir.join(WAL_FILE))?;

        Ok(Self {
            file: Mutex::new(file),
            dir: dir.to_path_buf(),
        })
    }

    /// Replay every complete frame in the log.
    ///
    /// A torn trailing frame (crash mid-append) ends the replay and is cut
    /// off, so later appends start on a frame boundary. A checksum mismatch
    /// anywhere before the tail is corruption and fails the open.
    pub fn replay<F: FnMut(LogEntry)>(&self, mut handler: F) -> Result<usize, StorageError> {
        let mut file = self.file.lock();
        let file_len = file.metadata()?.len();
        file.seek(SeekFrom::Start(0))?;

        let mut replayed = 0;
        let mut offset: u64 = 0;
        while offset < file_len {
            let remaining = file_len - offset;
            if remaining < FRAME_OVERHEAD {
                self.cut_torn_tail(&mut *file, offset, replayed)?;
                break;
            }

            let mut len_bytes = [0u8; 4];
            file.read_exact(&mut len_bytes)?;
            let len = u64::from(u32::from_le_bytes(len_bytes));
            let frame_len = FRAME_OVERHEAD + len;
            if frame_len > remaining {
                self.cut_torn_tail(&mut *file, offset, replayed)?;
                break;
            }

            let mut data = vec![0u8; len as usize];
            file.read_exact(&mut data)?;
            let mut crc_bytes = [0u8; 4];
            file.read_exact(&mut crc_bytes)?;

            if u32::from_le_bytes(crc_bytes) != crc32fast::hash(&data) {
                if frame_len == remaining {
                    self.cut_torn_tail(&mut *file, offset, replayed)?;
                    break;
                }
                return Err(StorageError::Corrupt { offset });
            }

            let entry: LogEntry = bincode::deserialize(&data)?;
            handler(entry);
            replayed += 1;
            offset += frame_len;
        }

        Ok(replayed)
    }

    fn cut_torn_tail(
        &self,
        file: &mut File,
        offset: u64,
        replayed: usize,
    ) -> Result<(), StorageError> {
        tracing::warn!(
            path = %self.dir.join(WAL_FILE).display(),
            offset,
            replayed,
            "ignoring torn frame at end of write-ahead log"
        );
        file.set_len(offset)?;
        Ok(())
    }

    /// Run `write` against the log file, then fsync. On any error the file is
    /// cut back to its previous length so no partial frame stays behind.
    fn append_with<W>(&self, write: W) -> Result<(), StorageError>
    where
        W: FnOnce(&mut File) -> std::io::Result<()>,
    {
        let mut file = self.file.lock();
        let start = file.metadata()?.len();

        let written = write(&mut *file).and_then(|()| file.sync_data());
        if let Err(err) = written {
            if let Err(rollback) = file.set_len(start) {
                tracing::error!(
                    path = %self.dir.join(WAL_FILE).display(),
                    error = %rollback,
                    "failed to roll back partial log frame"
                );
            }
            return Err(err.into());
        }
        Ok(())
    }

    fn truncate(&self) -> Result<(), StorageError> {
        let mut file = self.file.lock();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}

/// `len | data | crc32(data)`
fn write_frame(file: &mut File, data: &[u8]) -> std::io::Result<()> {
    let len = u32::try_from(data.len())
        .map_err(|_| std::io::Error::new(ErrorKind::InvalidData, "log entry larger than 4 GiB"))?;
    file.write_all(&len.to_le_bytes())?;
    file.write_all(data)?;
    file.write_all(&crc32fast::hash(data).to_le_bytes())
}

impl TermLog for WriteAheadLog {
    fn append(&self, entry: &LogEntry) -> Result<(), StorageError> {
        let data = bincode::serialize(entry)?;
        self.append_with(|file| write_frame(file, &data))
    }

    fn checkpoint(&self, terms: &[Term]) -> Result<(), StorageError> {
        let data = bincode::serialize(terms)?;
        let tmp = self.dir.join(format!("{SNAPSHOT_FILE}.tmp"));
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, self.dir.join(SNAPSHOT_FILE))?;
        self.truncate()
    }

    fn save_diagnostics(&self, diagnostics: &RunDiagnostics) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(diagnostics)?;
        std::fs::write(self.dir.join(DIAGNOSTICS_FILE), json)?;
        Ok(())
    }
}

// ============================================================================
// Recovery
// ============================================================================

/// Everything needed to bring a file-backed store back up.
pub(crate) struct Recovered {
    pub log: WriteAheadLog,
    pub terms: TermMap,
    pub diagnostics: RunDiagnostics,
}

pub(crate) fn recover(dir: &Path) -> Result<Recovered, StorageError> {
    let log = WriteAheadLog::open(dir)?;
    let mut terms = TermMap::new();

    let snapshot_path = dir.join(SNAPSHOT_FILE);
    if snapshot_path.exists() {
        let bytes = std::fs::read(&snapshot_path)?;
        let snapshot: Vec<Term> = bincode::deserialize(&bytes)?;
        for term in snapshot {
            terms.insert(term.identifier.clone(), Arc::new(term));
        }
    }
    let from_snapshot = terms.len();

    let replayed = log.replay(|entry| apply_entry(&mut terms, &entry))?;

    let diagnostics_path = dir.join(DIAGNOSTICS_FILE);
    let diagnostics = if diagnostics_path.exists() {
        let contents = std::fs::read_to_string(&diagnostics_path)?;
        match serde_json::from_str(&contents) {
            Ok(d) => d,
            Err(err) => {
                tracing::warn!(
                    path = %diagnostics_path.display(),
                    error = %err,
                    "discarding unreadable diagnostics file"
                );
                RunDiagnostics::default()
            }
        }
    } else {
        RunDiagnostics::default()
    };

    tracing::debug!(
        dir = %dir.display(),
        from_snapshot,
        replayed,
        terms = terms.len(),
        "recovered term store"
    );

    Ok(Recovered {
        log,
        terms,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glossary_model::{Category, Priority};
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn term(name: &str) -> Term {
        Term {
            identifier: TermId::from_name(name).unwrap(),
            display_name: name.to_string(),
            definition: format!("{name} definition"),
            category: Category::CivicEngagement,
            tags: BTreeSet::new(),
            why_it_matters: "matters".to_string(),
            local_context: "local".to_string(),
            supporting_data: None,
            policy_alignment: None,
            related_term_names: vec![],
            one_way_term_names: vec![],
            related_term_ids: vec![],
            priority: Priority::Normal,
            featured: false,
        }
    }

    #[test]
    fn test_replay_restores_entries_in_order() {
        let dir = tempdir().unwrap();
        {
            let log = WriteAheadLog::open(dir.path()).unwrap();
            log.append(&LogEntry::Upsert { term: term("Quorum") }).unwrap();
            log.append(&LogEntry::Upsert { term: term("Ballot Measure") }).unwrap();
            log.append(&LogEntry::Relink {
                identifier: TermId::from_name("Quorum").unwrap(),
                related_term_ids: vec![TermId::from_name("Ballot Measure").unwrap()],
            })
            .unwrap();
        }

        let recovered = recover(dir.path()).unwrap();
        assert_eq!(recovered.terms.len(), 2);
        let quorum = &recovered.terms["quorum"];
        assert_eq!(quorum.related_term_ids[0].as_str(), "ballot-measure");
    }

    #[test]
    fn test_remove_strips_dangling_links() {
        let mut map = TermMap::new();
        let mut a = term("Quorum");
        a.related_term_ids = vec![TermId::from_name("Ballot Measure").unwrap()];
        apply_entry(&mut map, &LogEntry::Upsert { term: a });
        apply_entry(&mut map, &LogEntry::Upsert { term: term("Ballot Measure") });

        apply_entry(
            &mut map,
            &LogEntry::Remove {
                identifier: TermId::from_name("Ballot Measure").unwrap(),
            },
        );

        assert_eq!(map.len(), 1);
        assert!(map["quorum"].related_term_ids.is_empty());
    }

    #[test]
    fn test_checkpoint_then_reopen() {
        let dir = tempdir().unwrap();
        {
            let log = WriteAheadLog::open(dir.path()).unwrap();
            log.append(&LogEntry::Upsert { term: term("Quorum") }).unwrap();
            log.checkpoint(&[term("Quorum")]).unwrap();
            log.append(&LogEntry::Upsert { term: term("Recall") }).unwrap();
        }

        let recovered = recover(dir.path()).unwrap();
        assert_eq!(recovered.terms.len(), 2);
        assert!(recovered.terms.contains_key("recall"));
    }

    #[test]
    fn test_torn_tail_is_ignored() {
        let dir = tempdir().unwrap();
        {
            let log = WriteAheadLog::open(dir.path()).unwrap();
            log.append(&LogEntry::Upsert { term: term("Quorum") }).unwrap();
        }
        // Simulate a crash halfway through the next frame.
        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join(WAL_FILE))
            .unwrap();
        file.write_all(&64u32.to_le_bytes()).unwrap();
        file.write_all(&[1, 2, 3]).unwrap();
        drop(file);

        let recovered = recover(dir.path()).unwrap();
        assert_eq!(recovered.terms.len(), 1);

        recovered
            .log
            .append(&LogEntry::Upsert { term: term("Recall") })
            .unwrap();
        drop(recovered);
        let reopened = recover(dir.path()).unwrap();
        assert_eq!(reopened.terms.len(), 2);
    }

    #[test]
    fn test_failed_append_is_rolled_back() {
        let dir = tempdir().unwrap();
        {
            let log = WriteAheadLog::open(dir.path()).unwrap();
            log.append(&LogEntry::Upsert { term: term("Quorum") }).unwrap();

            // Length prefix and part of the payload land, then the disk fails.
            let failed = log.append_with(|file| {
                file.write_all(&200u32.to_le_bytes())?;
                file.write_all(&[0u8; 10])?;
                Err(std::io::Error::new(ErrorKind::Other, "disk full"))
            });
            assert!(failed.is_err());

            log.append(&LogEntry::Upsert { term: term("Recall") }).unwrap();
        }

        let recovered = recover(dir.path()).unwrap();
        assert_eq!(recovered.terms.len(), 2);
        assert!(recovered.terms.contains_key("recall"));
    }

    #[test]
    fn test_corrupt_frame_before_tail_fails_open() {
        let dir = tempdir().unwrap();
        {
            let log = WriteAheadLog::open(dir.path()).unwrap();
            log.append(&LogEntry::Upsert { term: term("Quorum") }).unwrap();
            log.append(&LogEntry::Upsert { term: term("Recall") }).unwrap();
        }
        let path = dir.path().join(WAL_FILE);
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[6] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        match recover(dir.path()) {
            Err(StorageError::Corrupt { offset }) => assert_eq!(offset, 0),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("corrupt log opened"),
        }
    }

    #[test]
    fn test_oversized_length_prefix_is_a_torn_tail() {
        let dir = tempdir().unwrap();
        {
            let log = WriteAheadLog::open(dir.path()).unwrap();
            log.append(&LogEntry::Upsert { term: term("Quorum") }).unwrap();
        }
        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join(WAL_FILE))
            .unwrap();
        file.write_all(&u32::MAX.to_le_bytes()).unwrap();
        file.write_all(&[7u8; 16]).unwrap();
        drop(file);

        let recovered = recover(dir.path()).unwrap();
        assert_eq!(recovered.terms.len(), 1);
    }
}
