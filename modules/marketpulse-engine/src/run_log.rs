//! Per-run JSON timeline written under the data directory.
//!
//! One file per run, append-in-memory and flushed once at the end (plus on
//! fatal abort), so a crash mid-run leaves either no file or a complete one.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use marketpulse_common::RunStatus;

#[derive(Debug, Serialize)]
struct RunLogEntry {
    at: DateTime<Utc>,
    stage: String,
    message: String,
}

#[derive(Debug, Serialize)]
pub struct RunLog {
    run_id: String,
    started_at: DateTime<Utc>,
    entries: Vec<RunLogEntry>,
    #[serde(skip)]
    dir: PathBuf,
}

impl RunLog {
    pub fn new(data_dir: &str, run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            started_at: Utc::now(),
            entries: Vec::new(),
            dir: PathBuf::from(data_dir).join("run_logs"),
        }
    }

    pub fn record(&mut self, stage: &str, message: impl Into<String>) {
        self.entries.push(RunLogEntry {
            at: Utc::now(),
            stage: stage.to_string(),
            message: message.into(),
        });
    }

    /// Flush the timeline to `<data_dir>/run_logs/run-<id>.json`.
    pub fn write(&mut self, status: RunStatus) -> Result<()> {
        self.record("finish", format!("run {} with status {status}", self.run_id));
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.dir.join(format!("run-{}.json", self.run_id));
        let json = serde_json::to_string_pretty(&self)?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}
