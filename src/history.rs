//! Bounded log of past match results plus a "last result" slot, stored as
//! JSON under the user data directory. A missing or unreadable file is a cold
//! start, never an error.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ai::MatchResult;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub result: MatchResult,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    last: Option<HistoryEntry>,
    #[serde(default)]
    entries: Vec<HistoryEntry>,
}

pub struct History {
    path: PathBuf,
    limit: usize,
    file: HistoryFile,
}

impl History {
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .context("Could not determine data directory")?
            .join("constellate");
        Ok(data_dir.join("history.json"))
    }

    pub fn open(path: PathBuf, limit: usize) -> Self {
        let file = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|error| {
                log::warn!("ignoring unreadable history {}: {error}", path.display());
                HistoryFile::default()
            }),
            Err(_) => HistoryFile::default(),
        };

        let mut history = Self {
            path,
            limit: limit.max(1),
            file,
        };
        history.trim();
        history
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.file.entries
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.file.last.as_ref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn trim(&mut self) {
        let overflow = self.file.entries.len().saturating_sub(self.limit);
        if overflow > 0 {
            self.file.entries.drain(..overflow);
        }
    }

    pub fn record(&mut self, query: &str, result: &MatchResult, timestamp: DateTime<Utc>) -> Result<()> {
        let entry = HistoryEntry {
            timestamp,
            query: query.to_owned(),
            result: result.clone(),
        };
        self.file.entries.push(entry.clone());
        self.file.last = Some(entry);
        self.trim();
        self.save()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.file = HistoryFile::default();
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create history directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(&self.file).context("Failed to serialize history")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write history to {}", self.path.display()))
    }

    /// Writes `entry` next to the history file with a timestamped name.
    pub fn export(&self, entry: &HistoryEntry) -> Result<PathBuf> {
        let directory = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&directory)
            .with_context(|| format!("Failed to create export directory {}", directory.display()))?;

        let name = format!("matches-{}.json", entry.timestamp.format("%Y%m%d-%H%M%S"));
        let target = directory.join(name);
        let content = serde_json::to_string_pretty(entry).context("Failed to serialize match result")?;
        fs::write(&target, content)
            .with_context(|| format!("Failed to write export {}", target.display()))?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::ai::Match;

    fn result(id: &str) -> MatchResult {
        MatchResult {
            explanation: format!("match {id}"),
            matches: vec![Match {
                id: id.to_owned(),
                name: String::new(),
                score: 55.0,
                reason: String::new(),
                aspect: String::new(),
            }],
        }
    }

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, second).single().unwrap()
    }

    #[test]
    fn test_cold_start_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::open(dir.path().join("history.json"), 5);
        assert!(history.entries().is_empty());
        assert!(history.last().is_none());
    }

    #[test]
    fn test_record_trims_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut history = History::open(path.clone(), 2);
        for (second, id) in ["p_0", "p_1", "p_2"].iter().enumerate() {
            history.record("query", &result(id), at(second as u32)).unwrap();
        }
        assert_eq!(history.entries().len(), 2);
        assert_eq!(history.entries()[0].result.matches[0].id, "p_1");

        let reopened = History::open(path, 2);
        assert_eq!(reopened.entries(), history.entries());
        assert_eq!(reopened.last().map(|entry| entry.result.matches[0].id.as_str()), Some("p_2"));
    }

    #[test]
    fn test_corrupt_file_is_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{ definitely not json").unwrap();
        let history = History::open(path, 5);
        assert!(history.entries().is_empty());
    }

    #[test]
    fn test_export_writes_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = History::open(dir.path().join("history.json"), 5);
        history.record("rust people", &result("p_4"), at(7)).unwrap();

        let entry = history.last().cloned().unwrap();
        let target = history.export(&entry).unwrap();
        assert!(target.ends_with("matches-20240101-000007.json"));
        let written: HistoryEntry = serde_json::from_str(&fs::read_to_string(target).unwrap()).unwrap();
        assert_eq!(written.query, "rust people");
    }
}
