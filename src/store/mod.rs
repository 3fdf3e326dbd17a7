//! Append-only record storage.
//!
//! The crawl stage writes one JSON file per visited page into
//! `<root>/datasets/<name>/`, named by a zero-padded sequence id
//! (`000000001.json`, `000000002.json`, ...). The render stage reads the
//! whole dataset back in id order and maps each record to one PDF.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One unit of extracted page data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub title: String,
    pub url: String,
    pub text: String,
}

/// A record together with the storage identifier it was persisted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Zero-padded sequence id; also the file stem on disk.
    pub id: String,
    pub record: PageRecord,
}

/// Append-only persistence for crawl output.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Writes one record durably and returns it with its storage id.
    async fn append(&self, record: &PageRecord) -> Result<StoredRecord>;

    /// Reads back every record, in stable storage-id order.
    async fn read_all(&self) -> Result<Vec<StoredRecord>>;
}

/// File-backed dataset store.
///
/// Appends are atomic: the record is written to a `.tmp` sibling first and
/// renamed into place, so a crash never leaves a half-written record with a
/// `.json` name.
pub struct DatasetStore {
    dir: PathBuf,
    next_id: AtomicU32,
}

impl DatasetStore {
    /// Opens (creating if needed) the dataset directory and resumes the
    /// record sequence after the highest id already present.
    pub async fn open(root: &Path, name: &str) -> Result<Self> {
        let dir = root.join("datasets").join(name);
        tokio::fs::create_dir_all(&dir).await?;

        let mut highest = 0u32;
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u32>().ok())
            {
                highest = highest.max(id);
            }
        }

        Ok(Self {
            dir,
            next_id: AtomicU32::new(highest + 1),
        })
    }

    /// The dataset directory on disk.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl RecordStore for DatasetStore {
    async fn append(&self, record: &PageRecord) -> Result<StoredRecord> {
        let id = format!("{:09}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let path = self.record_path(&id);
        let tmp = self.dir.join(format!("{id}.json.tmp"));

        let body = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        Ok(StoredRecord {
            id,
            record: record.clone(),
        })
    }

    async fn read_all(&self) -> Result<Vec<StoredRecord>> {
        // Escape the directory before globbing: storage roots may contain
        // characters glob treats as pattern syntax.
        let pattern = format!(
            "{}/*.json",
            glob::Pattern::escape(&self.dir.to_string_lossy())
        );
        let mut paths: Vec<PathBuf> = Vec::new();
        let entries = glob::glob(&pattern)
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;
        for entry in entries {
            paths.push(entry.map_err(|e| Error::Io(e.into_error()))?);
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let id = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };
            let raw = tokio::fs::read(&path).await?;
            let record: PageRecord = serde_json::from_slice(&raw)?;
            records.push(StoredRecord { id, record });
        }
        Ok(records)
    }
}
