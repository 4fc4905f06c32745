//! Analysis history
//!
//! Provides:
//! - [`HistoryEntry`], one summary line per finished analysis
//! - [`HistoryStore`], newest-first bounded storage
//! - [`JsonFileHistory`] guarded by an fs2 lock file, and [`MemoryHistory`]

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::analysis::BasicAnalysis;
use crate::config::DEFAULT_HISTORY_MAX_ENTRIES;
use crate::conversation::Platform;
use crate::situation::SituationType;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub date: DateTime<Utc>,
    pub temperature: u8,
    pub temperature_label: String,
    /// Total messages analyzed.
    pub message_count: usize,
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub situation: Option<SituationType>,
}

impl HistoryEntry {
    pub fn from_analysis(
        basic: &BasicAnalysis,
        platform: Platform,
        situation: Option<SituationType>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date,
            temperature: basic.temperature,
            temperature_label: basic.temperature_label.clone(),
            message_count: basic.message_count.total,
            platform,
            situation,
        }
    }
}

/// Newest-first store of past analyses, capped at a fixed size.
pub trait HistoryStore {
    fn save(&self, entry: HistoryEntry) -> Result<()>;

    /// All entries, newest first.
    fn list(&self) -> Result<Vec<HistoryEntry>>;

    fn clear(&self) -> Result<()>;

    fn last_entry(&self) -> Result<Option<HistoryEntry>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Latest temperature minus the previous one.
    fn temperature_change(&self) -> Result<Option<i16>> {
        Ok(temperature_change(&self.list()?))
    }
}

/// `entries[0] - entries[1]`, `None` with fewer than two entries.
pub fn temperature_change(entries: &[HistoryEntry]) -> Option<i16> {
    match entries {
        [latest, previous, ..] => Some(i16::from(latest.temperature) - i16::from(previous.temperature)),
        _ => None,
    }
}

fn push_newest(entries: &mut Vec<HistoryEntry>, entry: HistoryEntry, max_entries: usize) {
    entries.insert(0, entry);
    entries.truncate(max_entries);
}

/// History kept in a JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileHistory {
    path: PathBuf,
    max_entries: usize,
}

impl JsonFileHistory {
    pub fn new(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            path: path.into(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn with_default_size(path: impl Into<PathBuf>) -> Self {
        Self::new(path, DEFAULT_HISTORY_MAX_ENTRIES)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "history.json".into());
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn read_entries(&self) -> Vec<HistoryEntry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "Failed to read history, treating as empty");
                }
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<HistoryEntry>>(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt history file, treating as empty");
                Vec::new()
            }
        }
    }

    fn write_entries(&self, entries: &[HistoryEntry]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| Error::HistoryError(format!("Failed to write {}: {}", self.path.display(), e)))
    }
}

impl HistoryStore for JsonFileHistory {
    fn save(&self, entry: HistoryEntry) -> Result<()> {
        let _lock = HistoryLock::acquire(&self.lock_path())?;
        let mut entries = self.read_entries();
        push_newest(&mut entries, entry, self.max_entries);
        self.write_entries(&entries)?;
        debug!(path = %self.path.display(), entries = entries.len(), "History saved");
        Ok(())
    }

    fn list(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.read_entries())
    }

    fn clear(&self) -> Result<()> {
        let _lock = HistoryLock::acquire(&self.lock_path())?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::HistoryError(format!(
                "Failed to clear {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

/// Exclusive lock on the history file, released on drop.
struct HistoryLock {
    file: File,
}

impl HistoryLock {
    fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| Error::LockError(format!("Failed to open lock file: {}", e)))?;

        file.try_lock_exclusive().map_err(|_| {
            Error::LockError(format!(
                "{} is held by another process",
                path.display()
            ))
        })?;

        Ok(Self { file })
    }
}

impl Drop for HistoryLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// In-process history, mostly for tests and one-shot runs.
#[derive(Debug)]
pub struct MemoryHistory {
    entries: Mutex<Vec<HistoryEntry>>,
    max_entries: usize,
}

impl MemoryHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            max_entries: max_entries.max(1),
        }
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_MAX_ENTRIES)
    }
}

impl HistoryStore for MemoryHistory {
    fn save(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::HistoryError("history mutex poisoned".to_string()))?;
        push_newest(&mut entries, entry, self.max_entries);
        Ok(())
    }

    fn list(&self) -> Result<Vec<HistoryEntry>> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .map_err(|_| Error::HistoryError("history mutex poisoned".to_string()))
    }

    fn clear(&self) -> Result<()> {
        self.entries
            .lock()
            .map(|mut entries| entries.clear())
            .map_err(|_| Error::HistoryError("history mutex poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn entry(temperature: u8, minutes: i64) -> HistoryEntry {
        HistoryEntry {
            id: Uuid::new_v4().to_string(),
            date: Utc.with_ymd_and_hms(2024, 4, 12, 9, 0, 0).unwrap() + Duration::minutes(minutes),
            temperature,
            temperature_label: crate::analysis::temperature_label(temperature).to_string(),
            message_count: 30,
            platform: Platform::Kakao,
            situation: None,
        }
    }

    #[test]
    fn temperature_change_needs_two_entries() {
        assert_eq!(temperature_change(&[]), None);
        assert_eq!(temperature_change(&[entry(60, 0)]), None);
        assert_eq!(temperature_change(&[entry(72, 1), entry(60, 0)]), Some(12));
        assert_eq!(temperature_change(&[entry(20, 1), entry(95, 0)]), Some(-75));
    }

    #[test]
    fn memory_history_is_newest_first_and_bounded() {
        let store = MemoryHistory::new(3);
        for i in 0..5u8 {
            store.save(entry(10 * i, i64::from(i))).unwrap();
        }

        let temps: Vec<u8> = store.list().unwrap().iter().map(|e| e.temperature).collect();
        assert_eq!(temps, vec![40, 30, 20]);
        assert_eq!(store.last_entry().unwrap().unwrap().temperature, 40);
        assert_eq!(store.temperature_change().unwrap(), Some(10));

        store.clear().unwrap();
        assert!(store.last_entry().unwrap().is_none());
    }

    #[test]
    fn json_history_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");

        JsonFileHistory::with_default_size(&path)
            .save(entry(55, 0))
            .unwrap();
        JsonFileHistory::with_default_size(&path)
            .save(entry(70, 1))
            .unwrap();

        let reopened = JsonFileHistory::with_default_size(&path);
        let entries = reopened.list().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].temperature, 70);
        assert_eq!(reopened.temperature_change().unwrap(), Some(15));
    }

    #[test]
    fn json_history_keeps_ten_by_default() {
        let dir = tempdir().unwrap();
        let store = JsonFileHistory::with_default_size(dir.path().join("history.json"));
        for i in 0..12 {
            store.save(entry(50, i)).unwrap();
        }
        assert_eq!(store.list().unwrap().len(), 10);
    }

    #[test]
    fn corrupt_history_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "[{not json").unwrap();

        let store = JsonFileHistory::with_default_size(&path);
        assert!(store.list().unwrap().is_empty());

        // the next save replaces the broken file
        store.save(entry(61, 0)).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn missing_history_file_is_empty_and_clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = JsonFileHistory::with_default_size(dir.path().join("history.json"));

        assert!(store.list().unwrap().is_empty());
        store.clear().unwrap();
        store.clear().unwrap();
    }

    #[test]
    fn held_lock_rejects_concurrent_writer() {
        let dir = tempdir().unwrap();
        let store = JsonFileHistory::with_default_size(dir.path().join("history.json"));

        let _held = HistoryLock::acquire(&store.lock_path()).unwrap();
        let err = store.save(entry(50, 0)).unwrap_err();
        assert!(matches!(err, Error::LockError(_)));
    }

    #[test]
    fn entry_serializes_camel_case() {
        let value = serde_json::to_value(entry(42, 0)).unwrap();
        assert_eq!(value["temperatureLabel"], "살짝 쿨한 관계");
        assert_eq!(value["messageCount"], 30);
        assert_eq!(value["platform"], "kakao");
        assert!(value.get("situation").is_none());
    }
}
