//! Activity log storage (CSV format)

use crate::{
    models::{ActivityEntry, ActivityKind},
    Result,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CSV-friendly representation of an ActivityEntry
#[derive(Debug, Serialize, Deserialize)]
struct ActivityCsv {
    id: String,
    at: String,
    kind: String,
    detail: String,
}

impl From<&ActivityEntry> for ActivityCsv {
    fn from(entry: &ActivityEntry) -> Self {
        Self {
            id: entry.id.clone(),
            at: entry.at.to_rfc3339(),
            kind: entry.kind.as_str().to_string(),
            detail: entry.detail.clone(),
        }
    }
}

impl TryFrom<ActivityCsv> for ActivityEntry {
    type Error = crate::Error;

    fn try_from(csv: ActivityCsv) -> Result<Self> {
        Ok(Self {
            id: csv.id,
            at: DateTime::parse_from_rfc3339(&csv.at)
                .map_err(|e| crate::Error::InvalidData(format!("Invalid timestamp: {}", e)))?
                .with_timezone(&Utc),
            kind: ActivityKind::parse(&csv.kind)
                .ok_or_else(|| crate::Error::InvalidData(format!("Unknown kind: {}", csv.kind)))?,
            detail: csv.detail,
        })
    }
}

pub struct ActivityLog {
    data_dir: PathBuf,
}

impl ActivityLog {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn log_path(&self) -> PathBuf {
        self.data_dir.join("activity.csv")
    }

    pub fn load(&self) -> Result<Vec<ActivityEntry>> {
        let path = self.log_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(path)?;
        let mut entries = Vec::new();

        for result in reader.deserialize() {
            let entry_csv: ActivityCsv = result?;
            let entry = ActivityEntry::try_from(entry_csv)?;
            entries.push(entry);
        }

        Ok(entries)
    }

    pub fn append(&self, entry: &ActivityEntry) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;

        let path = self.log_path();
        let file_exists = path.exists();

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;

        // When appending, don't write headers
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        // Only write header for brand new file
        if !file_exists {
            writer.write_record(["id", "at", "kind", "detail"])?;
        }

        writer.serialize(ActivityCsv::from(entry))?;
        writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let log = ActivityLog::new(temp_dir.path().to_path_buf());
        assert!(log.load().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let log = ActivityLog::new(temp_dir.path().to_path_buf());

        let first = ActivityEntry::new(ActivityKind::PhaseCompleted, "Work phase done");
        let second = ActivityEntry::new(ActivityKind::Extension, "finishing a thought");
        log.append(&first).unwrap();
        log.append(&second).unwrap();

        let entries = log.load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, ActivityKind::PhaseCompleted);
        assert_eq!(entries[1].detail, "finishing a thought");
    }

    #[test]
    fn test_detail_with_commas_survives() {
        let temp_dir = TempDir::new().unwrap();
        let log = ActivityLog::new(temp_dir.path().to_path_buf());

        let entry = ActivityEntry::new(ActivityKind::Note, "read, replied, archived");
        log.append(&entry).unwrap();

        let entries = log.load().unwrap();
        assert_eq!(entries[0].detail, "read, replied, archived");
    }
}
