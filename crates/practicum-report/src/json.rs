//! One pretty-printed JSON file per finished session.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use uuid::Uuid;

use practicum_core::record::SessionRecord;
use practicum_core::traits::ResultSink;

/// Writes `<dir>/<session-id>.json` for every record it receives.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Read back every record in the directory, oldest first.
    ///
    /// Files that are not session records are skipped with a warning.
    pub fn load_all(&self) -> Result<Vec<SessionRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to list {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match load_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(path = %path.display(), "skipping unreadable record: {e:#}"),
            }
        }
        records.sort_by_key(|r| r.finished_at);
        Ok(records)
    }
}

#[async_trait]
impl ResultSink for JsonFileSink {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn persist(&self, record: &SessionRecord) -> Result<()> {
        let path = self.path_for(record.id);
        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), "session record written");
        Ok(())
    }
}

/// Write a record to an explicit path.
pub fn write_json_report(record: &SessionRecord, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read one record written by [`JsonFileSink`] or [`write_json_report`].
pub fn load_record(path: &Path) -> Result<SessionRecord> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}
