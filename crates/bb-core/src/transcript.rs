//! Append-only log of every relayed message.
//!
//! One line per message: `User {sender} to {receiver}: {summary}`, optionally
//! prefixed with `[{rfc3339}] `. Newlines inside a summary are written as `\n`
//! so that a message never spans more than one line.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};

use crate::{domain::UserId, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub sender: UserId,
    pub receiver: UserId,
    pub summary: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl TranscriptEntry {
    pub fn now(sender: UserId, receiver: UserId, summary: impl Into<String>) -> Self {
        Self {
            sender,
            receiver,
            summary: summary.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn to_line(&self, with_timestamp: bool) -> String {
        let summary = self.summary.replace('\r', "").replace('\n', "\\n");
        let body = format!("User {} to {}: {summary}", self.sender, self.receiver);
        match self.timestamp {
            Some(ts) if with_timestamp => format!("[{}] {body}", ts.to_rfc3339()),
            _ => body,
        }
    }

    pub fn parse_line(line: &str) -> Option<Self> {
        let (timestamp, rest) = match line.strip_prefix('[') {
            Some(after) => {
                let (ts, rest) = after.split_once("] ")?;
                let ts = DateTime::parse_from_rfc3339(ts).ok()?.with_timezone(&Utc);
                (Some(ts), rest)
            }
            None => (None, line),
        };

        let rest = rest.strip_prefix("User ")?;
        let (sender, rest) = rest.split_once(" to ")?;
        let (receiver, summary) = rest.split_once(": ")?;

        Some(Self {
            sender: UserId(sender.trim().parse().ok()?),
            receiver: UserId(receiver.trim().parse().ok()?),
            summary: summary.to_string(),
            timestamp,
        })
    }
}

/// File-backed transcript sink.
///
/// Appends are serialized and flushed to disk before returning.
#[derive(Debug)]
pub struct Transcript {
    path: PathBuf,
    timestamps: bool,
    write_lock: Mutex<()>,
}

impl Transcript {
    pub fn new(path: impl Into<PathBuf>, timestamps: bool) -> Self {
        Self {
            path: path.into(),
            timestamps,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, entry: &TranscriptEntry) -> Result<()> {
        let mut line = entry.to_line(self.timestamps);
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.sync_data().await?;
        Ok(())
    }

    /// `false` until the first entry has been written.
    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Whole transcript as text; `None` when no log has been written yet.
    pub async fn read_raw(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Parsed entries. Lines that do not parse are skipped.
    pub async fn entries(&self) -> Result<Option<Vec<TranscriptEntry>>> {
        let Some(raw) = self.read_raw().await? else {
            return Ok(None);
        };
        Ok(Some(
            raw.lines().filter_map(TranscriptEntry::parse_line).collect(),
        ))
    }

    /// Last `n` entries, oldest first.
    pub async fn tail(&self, n: usize) -> Result<Option<Vec<TranscriptEntry>>> {
        let Some(mut all) = self.entries().await? else {
            return Ok(None);
        };
        let skip = all.len().saturating_sub(n);
        Ok(Some(all.split_off(skip)))
    }
}
