//! Applied-migration ledger
//!
//! The ledger is the persisted set of applied migrations, kept apart from the
//! row data at `<data_dir>/metadata/applied.json`. It refuses any change that
//! would leave an applied migration without its applied prerequisites.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{RecorderError, RecorderResult};
use crate::migration::{Migration, MigrationHistory, MigrationId};

const LEDGER_FILE: &str = "applied.json";

/// One ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMigration {
    #[serde(flatten)]
    pub id: MigrationId,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    applied: Vec<AppliedMigration>,
}

/// Applied set, in application order.
#[derive(Debug, Clone, Default)]
pub struct AppliedLedger {
    /// `None` for an in-memory ledger
    path: Option<PathBuf>,
    entries: Vec<AppliedMigration>,
}

impl AppliedLedger {
    /// Ledger that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the ledger under `data_dir`. A missing file is an empty ledger.
    pub fn open(data_dir: &Path) -> RecorderResult<Self> {
        let path = data_dir.join("metadata").join(LEDGER_FILE);

        let entries = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| RecorderError::Read {
                path: path.display().to_string(),
                source: e,
            })?;
            let file: LedgerFile =
                serde_json::from_str(&content).map_err(|e| RecorderError::Malformed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            file.applied
        } else {
            Vec::new()
        };

        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    pub fn is_applied(&self, id: &MigrationId) -> bool {
        self.entries.iter().any(|e| &e.id == id)
    }

    /// Entries in application order
    pub fn applied(&self) -> &[AppliedMigration] {
        &self.entries
    }

    pub fn applied_ids(&self) -> impl Iterator<Item = &MigrationId> {
        self.entries.iter().map(|e| &e.id)
    }

    /// Records `migration` as applied.
    ///
    /// Already-recorded migrations are left untouched.
    ///
    /// # Errors
    ///
    /// `InconsistentHistory` if any dependency is not yet recorded.
    pub fn record_applied(&mut self, migration: &Migration) -> RecorderResult<()> {
        if self.is_applied(&migration.id) {
            return Ok(());
        }

        if let Some(missing) = migration.dependencies().iter().find(|d| !self.is_applied(d)) {
            return Err(RecorderError::InconsistentHistory {
                migration: migration.id.clone(),
                dependency: missing.clone(),
            });
        }

        let mut entries = self.entries.clone();
        entries.push(AppliedMigration {
            id: migration.id.clone(),
            applied_at: Utc::now(),
        });
        self.replace_entries(entries)
    }

    /// Removes `id` from the applied set.
    ///
    /// # Errors
    ///
    /// `DependentApplied` while any migration depending on `id` is recorded.
    pub fn record_unapplied(
        &mut self,
        id: &MigrationId,
        history: &MigrationHistory,
    ) -> RecorderResult<()> {
        if let Some(dependent) = history.dependents_of(id).find(|d| self.is_applied(d)) {
            return Err(RecorderError::DependentApplied {
                migration: id.clone(),
                dependent: dependent.clone(),
            });
        }

        if !self.is_applied(id) {
            return Ok(());
        }
        let entries = self.entries.iter().filter(|e| &e.id != id).cloned().collect();
        self.replace_entries(entries)
    }

    /// Verifies every recorded migration is known and has its dependencies
    /// recorded.
    pub fn check_consistent(&self, history: &MigrationHistory) -> RecorderResult<()> {
        for entry in &self.entries {
            let migration = history
                .get(&entry.id)
                .ok_or_else(|| RecorderError::UnknownApplied(entry.id.clone()))?;

            if let Some(missing) = migration.dependencies().iter().find(|d| !self.is_applied(d)) {
                return Err(RecorderError::InconsistentHistory {
                    migration: entry.id.clone(),
                    dependency: missing.clone(),
                });
            }
        }
        Ok(())
    }

    /// Writes `entries`, then adopts them. A failed write leaves the
    /// in-memory ledger as it was.
    fn replace_entries(&mut self, entries: Vec<AppliedMigration>) -> RecorderResult<()> {
        self.persist(&entries)?;
        self.entries = entries;
        Ok(())
    }

    fn persist(&self, entries: &[AppliedMigration]) -> RecorderResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let write_err = |e: std::io::Error| RecorderError::Write {
            path: path.display().to_string(),
            source: e,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let file = LedgerFile {
            applied: entries.to_vec(),
        };
        let content = serde_json::to_string_pretty(&file).map_err(|e| RecorderError::Malformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let tmp_path = path.with_extension("json.tmp");
        let mut out = File::create(&tmp_path).map_err(write_err)?;
        out.write_all(content.as_bytes()).map_err(write_err)?;
        out.sync_all().map_err(write_err)?;
        drop(out);

        fs::rename(&tmp_path, path).map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn history() -> MigrationHistory {
        MigrationHistory::new(vec![
            Migration::new("video", "0001_initial"),
            Migration::new("video", "0002_next").depends_on("video", "0001_initial"),
        ])
        .unwrap()
    }

    fn id(name: &str) -> MigrationId {
        MigrationId::new("video", name)
    }

    #[test]
    fn test_record_requires_dependencies() {
        let history = history();
        let mut ledger = AppliedLedger::in_memory();

        let err = ledger
            .record_applied(history.get(&id("0002_next")).unwrap())
            .unwrap_err();
        assert_eq!(err.code(), "DELTA_INCONSISTENT_HISTORY");
        assert!(!ledger.is_applied(&id("0002_next")));
    }

    #[test]
    fn test_record_twice_is_noop() {
        let history = history();
        let mut ledger = AppliedLedger::in_memory();
        let first = history.get(&id("0001_initial")).unwrap();

        ledger.record_applied(first).unwrap();
        let stamp = ledger.applied()[0].applied_at;
        ledger.record_applied(first).unwrap();

        assert_eq!(ledger.applied().len(), 1);
        assert_eq!(ledger.applied()[0].applied_at, stamp);
    }

    #[test]
    fn test_unapply_blocked_by_dependent() {
        let history = history();
        let mut ledger = AppliedLedger::in_memory();
        ledger.record_applied(history.get(&id("0001_initial")).unwrap()).unwrap();
        ledger.record_applied(history.get(&id("0002_next")).unwrap()).unwrap();

        let err = ledger
            .record_unapplied(&id("0001_initial"), &history)
            .unwrap_err();
        assert_eq!(err.code(), "DELTA_DEPENDENT_APPLIED");

        ledger.record_unapplied(&id("0002_next"), &history).unwrap();
        ledger.record_unapplied(&id("0001_initial"), &history).unwrap();
        assert!(ledger.applied().is_empty());
    }

    #[test]
    fn test_persisted_across_open() {
        let tmp = TempDir::new().unwrap();
        let history = history();

        let mut ledger = AppliedLedger::open(tmp.path()).unwrap();
        ledger.record_applied(history.get(&id("0001_initial")).unwrap()).unwrap();

        let reopened = AppliedLedger::open(tmp.path()).unwrap();
        assert!(reopened.is_applied(&id("0001_initial")));
        assert!(reopened.check_consistent(&history).is_ok());
    }

    #[test]
    fn test_check_consistent_flags_unknown_entries() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("metadata");
        fs::create_dir_all(&path).unwrap();
        fs::write(
            path.join(LEDGER_FILE),
            r#"{"applied":[{"app":"video","name":"0009_gone","applied_at":"2021-08-01T07:43:00Z"}]}"#,
        )
        .unwrap();

        let ledger = AppliedLedger::open(tmp.path()).unwrap();
        let err = ledger.check_consistent(&history()).unwrap_err();
        assert!(matches!(err, RecorderError::UnknownApplied(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_failed_write_leaves_ledger_unchanged() {
        let tmp = TempDir::new().unwrap();
        let history = history();

        let mut ledger = AppliedLedger::open(tmp.path()).unwrap();
        ledger.record_applied(history.get(&id("0001_initial")).unwrap()).unwrap();

        // A regular file where the metadata directory should be
        fs::remove_dir_all(tmp.path().join("metadata")).unwrap();
        fs::write(tmp.path().join("metadata"), "").unwrap();

        let err = ledger
            .record_applied(history.get(&id("0002_next")).unwrap())
            .unwrap_err();
        assert_eq!(err.code(), "DELTA_LEDGER_WRITE_FAILED");
        assert!(!ledger.is_applied(&id("0002_next")));
        assert_eq!(ledger.applied().len(), 1);

        ledger
            .record_unapplied(&id("0001_initial"), &history)
            .unwrap_err();
        assert!(ledger.is_applied(&id("0001_initial")));
    }

    #[test]
    fn test_malformed_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("metadata");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join(LEDGER_FILE), "not json").unwrap();

        let err = AppliedLedger::open(tmp.path()).unwrap_err();
        assert_eq!(err.code(), "DELTA_LEDGER_MALFORMED");
    }
}
