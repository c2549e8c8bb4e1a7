//! Append-only ledger of season free-throw totals
//!
//! One CSV file per season (`timestamp,ftm,fta`). Entries are only ever
//! appended; the last entry is what the next run compares against.

use crate::{Result, SeasonTotals};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// One recorded snapshot of season totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: String,
    #[serde(rename = "ftm")]
    pub made: u32,
    #[serde(rename = "fta")]
    pub attempted: u32,
}

impl LedgerEntry {
    /// Stamp totals with the current UTC time
    pub fn now(totals: SeasonTotals) -> Self {
        LedgerEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            made: totals.made,
            attempted: totals.attempted,
        }
    }

    pub fn totals(&self) -> Option<SeasonTotals> {
        SeasonTotals::new(self.made, self.attempted).ok()
    }
}

/// True when there is nothing recorded yet or either count moved
pub fn has_changed(old: Option<SeasonTotals>, new: SeasonTotals) -> bool {
    old != Some(new)
}

/// Directory of per-season ledger files
#[derive(Debug, Clone)]
pub struct Ledger {
    dir: PathBuf,
    /// If true, appends are logged and discarded
    read_only: bool,
}

impl Ledger {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Ledger {
            dir: dir.as_ref().to_path_buf(),
            read_only: false,
        }
    }

    /// Set read-only mode (used by dry runs)
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Ledger file for a season
    pub fn path(&self, year: u16) -> PathBuf {
        self.dir.join(format!("free_throws_{}.csv", year))
    }

    /// All entries for a season, oldest first (empty when no file exists)
    pub fn entries(&self, year: u16) -> Result<Vec<LedgerEntry>> {
        let path = self.path(year);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let mut entries = Vec::new();
        for record in reader.deserialize::<LedgerEntry>() {
            entries.push(record?);
        }
        Ok(entries)
    }

    /// Most recently appended totals.
    ///
    /// A missing, empty or unreadable ledger reads as `None` so a damaged file
    /// never blocks publishing.
    pub fn read_last(&self, year: u16) -> Option<SeasonTotals> {
        match self.entries(year) {
            Ok(entries) => entries.last().and_then(LedgerEntry::totals),
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable ledger {}: {}",
                    self.path(year).display(),
                    e
                );
                None
            }
        }
    }

    /// Append one entry, writing the header first if the file is new or empty
    pub fn append(&self, entry: &LedgerEntry, year: u16) -> Result<()> {
        if self.read_only {
            log::info!(
                "Read-only ledger, not recording {}/{}",
                entry.made,
                entry.attempted
            );
            return Ok(());
        }

        std::fs::create_dir_all(&self.dir)?;

        let path = self.path(year);
        let needs_header = std::fs::metadata(&path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(entry)?;
        writer.flush()?;

        log::debug!(
            "Appended {}/{} to {}",
            entry.made,
            entry.attempted,
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(made: u32, attempted: u32) -> SeasonTotals {
        SeasonTotals::new(made, attempted).unwrap()
    }

    #[test]
    fn test_has_changed() {
        assert!(has_changed(None, totals(300, 400)));
        assert!(!has_changed(Some(totals(300, 400)), totals(300, 400)));
        assert!(has_changed(Some(totals(300, 400)), totals(301, 400)));
        assert!(has_changed(Some(totals(300, 400)), totals(300, 401)));
    }

    #[test]
    fn test_missing_ledger_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path());
        assert_eq!(ledger.read_last(2025), None);
        assert!(ledger.entries(2025).unwrap().is_empty());
    }

    #[test]
    fn test_append_then_read_last() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("nested"));

        for n in 1..=5u32 {
            ledger
                .append(&LedgerEntry::now(totals(n * 10, n * 14)), 2025)
                .unwrap();
            assert_eq!(ledger.read_last(2025), Some(totals(n * 10, n * 14)));
        }

        assert_eq!(ledger.entries(2025).unwrap().len(), 5);
        // seasons are independent
        assert_eq!(ledger.read_last(2024), None);
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path());
        let entry = LedgerEntry {
            timestamp: "2025-03-08T18:00:00Z".to_string(),
            made: 300,
            attempted: 400,
        };
        ledger.append(&entry, 2025).unwrap();
        ledger.append(&entry, 2025).unwrap();

        let text = std::fs::read_to_string(ledger.path(2025)).unwrap();
        assert_eq!(
            text,
            "timestamp,ftm,fta\n2025-03-08T18:00:00Z,300,400\n2025-03-08T18:00:00Z,300,400\n"
        );
    }

    #[test]
    fn test_corrupt_ledger_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path());
        std::fs::write(ledger.path(2025), "timestamp,ftm,fta\nyesterday,lots,more\n").unwrap();
        assert_eq!(ledger.read_last(2025), None);
    }

    #[test]
    fn test_empty_ledger_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path());
        std::fs::write(ledger.path(2025), "").unwrap();
        assert_eq!(ledger.read_last(2025), None);

        ledger
            .append(&LedgerEntry::now(totals(1, 2)), 2025)
            .unwrap();
        assert_eq!(ledger.read_last(2025), Some(totals(1, 2)));
    }

    #[test]
    fn test_read_only_ledger_never_writes() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path()).read_only(true);
        ledger
            .append(&LedgerEntry::now(totals(300, 400)), 2025)
            .unwrap();
        assert!(!ledger.path(2025).exists());
        assert_eq!(ledger.read_last(2025), None);
    }
}
