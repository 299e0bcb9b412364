//! Best-score and session persistence
//!
//! The engine depends on the `BestScoreStore` capability for the one value
//! that outlives a game session. `FileBestScore` keeps it in a small JSON
//! document; `SessionLog` appends one CSV record per finished game.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Capability for reading and writing the persisted best score
pub trait BestScoreStore: Send + Sync {
    /// Last stored best score; 0 when nothing is stored
    fn read_best(&self) -> Result<u32>;

    /// Persist a new best score
    fn write_best(&self, value: u32) -> Result<()>;
}

/// Best-score document as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BestScoreDocument {
    best_score: u32,
    saved_at: DateTime<Utc>,
}

/// File-backed best-score store: pretty JSON, replaced atomically on write
pub struct FileBestScore {
    path: PathBuf,
}

impl FileBestScore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BestScoreStore for FileBestScore {
    fn read_best(&self) -> Result<u32> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "💾 No best-score file found, starting at 0");
            return Ok(0);
        }

        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        match serde_json::from_str::<BestScoreDocument>(&json) {
            Ok(doc) => Ok(doc.best_score),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Unparseable best-score file, starting at 0"
                );
                Ok(0)
            }
        }
    }

    fn write_best(&self, value: u32) -> Result<()> {
        let doc = BestScoreDocument {
            best_score: value,
            saved_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&doc)?;

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
        }

        // Unique temp file then rename, so a crash never leaves a torn document
        let tmp = self.path.with_extension(format!("tmp-{}", Uuid::new_v4()));
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        info!(path = %self.path.display(), best_score = value, "💾 Best score saved");
        Ok(())
    }
}

/// In-memory store for tests and embedding without a filesystem
#[derive(Debug, Default)]
pub struct MemoryBestScore {
    best: RwLock<u32>,
    writes: RwLock<Vec<u32>>,
}

impl MemoryBestScore {
    pub fn new(initial: u32) -> Self {
        Self {
            best: RwLock::new(initial),
            writes: RwLock::new(Vec::new()),
        }
    }

    /// Every value passed to `write_best`, in order
    pub fn writes(&self) -> Vec<u32> {
        self.writes.read().unwrap().clone()
    }
}

impl BestScoreStore for MemoryBestScore {
    fn read_best(&self) -> Result<u32> {
        Ok(*self.best.read().unwrap())
    }

    fn write_best(&self, value: u32) -> Result<()> {
        *self.best.write().unwrap() = value;
        self.writes.write().unwrap().push(value);
        Ok(())
    }
}

/// One finished game, as appended to the session log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub timestamp: i64,
    pub score: u32,
    pub level: u32,
    pub rounds_played: u32,
    pub best_score: u32,
    pub new_record: bool,
}

/// Append-only CSV log of finished games
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one record, writing the header only when the file is empty
    pub fn append(&self, record: &SessionRecord) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
        }

        let file_has_data =
            self.path.exists() && fs::metadata(&self.path).map(|m| m.len() > 0).unwrap_or(false);

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .append(true)
            .open(&self.path)
            .context("Failed to open session log")?;

        let mut writer = WriterBuilder::new()
            .has_headers(!file_has_data)
            .from_writer(file);

        writer
            .serialize(record)
            .context("Failed to write session record")?;
        writer.flush().context("Failed to flush session log")?;
        Ok(())
    }

    /// Load every stored session record
    pub fn load(&self) -> Result<Vec<SessionRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        let mut records = Vec::new();
        for record in reader.deserialize() {
            records.push(record.context("Failed to parse session record")?);
        }
        Ok(records)
    }
}
