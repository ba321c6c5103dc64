use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tokio::fs;
use tracing::warn;

use super::{SaveOutcome, SnapshotRecord, SnapshotStore};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// JSON file-based snapshot storage.
///
/// Directory structure:
/// ```text
/// data/
///   snapshots/
///     2024-05-01.json
///     2024-05-02.json
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    base_path: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn snapshots_dir(&self) -> PathBuf {
        self.base_path.join("snapshots")
    }

    fn snapshot_file(&self, date: NaiveDate) -> PathBuf {
        self.snapshots_dir()
            .join(format!("{}.json", date.format(DATE_FORMAT)))
    }

    async fn read_snapshot(&self, date: NaiveDate, path: &Path) -> Result<Option<SnapshotRecord>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let mut record: SnapshotRecord = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
                // The file name is the key; a stale date inside the body loses.
                record.date = date;
                Ok(Some(record))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {:?}", path)),
        }
    }

    /// Dates of every `YYYY-MM-DD.json` file, oldest first.
    async fn list_dates(&self) -> Result<Vec<NaiveDate>> {
        let mut dates = Vec::new();

        let mut entries = match fs::read_dir(self.snapshots_dir()).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(dates),
            Err(e) => return Err(e).context("Failed to read snapshots directory"),
        };

        while let Some(entry) = entries.next_entry().await.context("Failed to read entry")? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(stem) = name.strip_suffix(".json") else {
                continue;
            };
            match NaiveDate::parse_from_str(stem, DATE_FORMAT) {
                Ok(date) => dates.push(date),
                Err(_) => warn!(file = name, "skipping unexpected file in snapshots directory"),
            }
        }

        dates.sort();
        Ok(dates)
    }
}

#[async_trait::async_trait]
impl SnapshotStore for JsonFileSnapshotStore {
    async fn save_snapshot(&self, record: &SnapshotRecord) -> Result<SaveOutcome> {
        let path = self.snapshot_file(record.date);
        let existed = fs::try_exists(&path)
            .await
            .with_context(|| format!("Failed to check for existing snapshot {:?}", path))?;

        fs::create_dir_all(self.snapshots_dir())
            .await
            .context("Failed to create snapshots directory")?;
        let content = serde_json::to_string_pretty(record).context("Failed to serialize JSON")?;
        fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;

        Ok(if existed {
            SaveOutcome::Replaced
        } else {
            SaveOutcome::Created
        })
    }

    async fn snapshot_for(&self, date: NaiveDate) -> Result<Option<SnapshotRecord>> {
        self.read_snapshot(date, &self.snapshot_file(date)).await
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>> {
        let mut snapshots = Vec::new();

        for date in self.list_dates().await? {
            match self.read_snapshot(date, &self.snapshot_file(date)).await {
                Ok(Some(record)) => snapshots.push(record),
                Ok(None) => {}
                Err(err) => warn!(%date, error = %format!("{err:#}"), "skipping unreadable snapshot"),
            }
        }

        Ok(snapshots)
    }

    async fn delete_before(&self, cutoff: NaiveDate) -> Result<usize> {
        let mut removed = 0;

        for date in self.list_dates().await? {
            if date >= cutoff {
                break;
            }
            let path = self.snapshot_file(date);
            fs::remove_file(&path)
                .await
                .with_context(|| format!("Failed to remove {:?}", path))?;
            removed += 1;
        }

        Ok(removed)
    }
}
