//! Append-only JSONL audit log of hook events
//!
//! Recording is fire-and-forget: callers push onto an unbounded channel
//! and a background writer appends one JSON line per event. Write
//! failures are logged and the record is dropped; nothing is ever
//! reported back to the hook decision path.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use super::types::{HookKind, HookPayload};
use crate::utils::truncate_str;

/// Longest command/prompt text kept in a record
const SUMMARY_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub hook: HookKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl AuditRecord {
    pub fn from_event(hook: HookKind, payload: &HookPayload) -> Self {
        let summary = payload
            .tool_input
            .command
            .as_deref()
            .or(payload.task_text())
            .map(|s| truncate_str(s, SUMMARY_CHARS).to_string());

        Self {
            timestamp: Utc::now(),
            hook,
            agent_id: payload.agent_id.clone(),
            session_id: payload.session_id.clone(),
            tool_name: payload.tool_name.clone(),
            files: payload.file_paths(),
            summary,
        }
    }
}

/// Handle used by the router to record events
#[derive(Clone)]
pub struct AuditLog {
    tx: Option<mpsc::UnboundedSender<AuditRecord>>,
}

impl AuditLog {
    /// A log that records nothing
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// A log whose records are delivered to the returned receiver
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AuditRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Start a background writer appending to `path`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(path: PathBuf) -> Self {
        let (log, mut rx) = Self::channel();
        tokio::spawn(async move {
            let mut writer = AuditWriter::new(path);
            while let Some(record) = rx.recv().await {
                if let Err(e) = writer.append(&record) {
                    tracing::warn!("Dropping audit record for {}: {}", record.hook, e);
                }
            }
        });
        log
    }

    pub fn record(&self, record: AuditRecord) {
        if let Some(tx) = &self.tx {
            if tx.send(record).is_err() {
                tracing::debug!("Audit writer has stopped; record dropped");
            }
        }
    }
}

/// Lazily opened append-only file
struct AuditWriter {
    path: PathBuf,
    file: Option<File>,
}

impl AuditWriter {
    fn new(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    fn open(path: &Path) -> Result<File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .context("Failed to open audit log file")
    }

    fn append(&mut self, record: &AuditRecord) -> Result<()> {
        if self.file.is_none() {
            self.file = Some(Self::open(&self.path)?);
        }
        let line = serde_json::to_string(record)?;
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = writeln!(file, "{}", line).and_then(|_| file.flush()) {
                // Reopen on the next record
                self.file = None;
                return Err(e.into());
            }
        }
        Ok(())
    }
}
