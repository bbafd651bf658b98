//! Message state file
//!
//! A flow's `Message` is rewritten after every lifecycle event so an
//! interrupted run can be picked up with `opbridge resume --state FILE`.

use eyre::{Result, WrapErr};
use opbridge_rs::Message;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Serialize, Deserialize)]
struct StateRecord {
    saved_at: u64,
    message: Message,
}

/// JSON file holding the latest snapshot of one message
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the snapshot. Written to a sibling file first and renamed, so
    /// a crash mid-write leaves the previous snapshot intact.
    pub fn save(&self, message: &Message) -> Result<()> {
        let record = StateRecord {
            saved_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            message: message.clone(),
        };
        let json = serde_json::to_string_pretty(&record)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .wrap_err_with(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .wrap_err_with(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    pub fn load(&self) -> Result<Message> {
        let json = fs::read_to_string(&self.path)
            .wrap_err_with(|| format!("Failed to read {}", self.path.display()))?;
        let record: StateRecord = serde_json::from_str(&json)
            .wrap_err_with(|| format!("{} is not a message state file", self.path.display()))?;
        Ok(record.message)
    }
}
