use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::models::{CompatibilityFeatureVector, EventSource, MatchEventLog, MatchOutcome, MatchType};

/// Errors that can occur while persisting match events
#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("Failed to write event: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Build a training record for an observed outcome, stamped with the current time
pub fn create_event_log(
    match_type: MatchType,
    features: CompatibilityFeatureVector,
    outcome: MatchOutcome,
    preset: impl Into<String>,
) -> MatchEventLog {
    MatchEventLog {
        match_type,
        features,
        outcome,
        label: outcome.label(),
        preset: preset.into(),
        timestamp: chrono::Utc::now().timestamp_millis(),
        source: EventSource::default(),
    }
}

/// Destination for serialized events, one JSON document per line
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn write_line(&self, line: &str) -> Result<(), EventLogError>;
}

/// Appends events to a JSON Lines file
pub struct JsonlFileSink {
    path: PathBuf,
    file: Mutex<Option<tokio::fs::File>>,
}

impl JsonlFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> Result<tokio::fs::File, EventLogError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        Ok(file)
    }
}

#[async_trait]
impl EventSink for JsonlFileSink {
    async fn write_line(&self, line: &str) -> Result<(), EventLogError> {
        let mut guard = self.file.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
        }

        if let Some(file) = guard.as_mut() {
            let mut buf = Vec::with_capacity(line.len() + 1);
            buf.extend_from_slice(line.as_bytes());
            buf.push(b'\n');
            file.write_all(&buf).await?;
            file.flush().await?;
        }
        Ok(())
    }
}

/// Keeps lines in memory
#[derive(Default)]
pub struct MemorySink {
    lines: std::sync::Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn write_line(&self, line: &str) -> Result<(), EventLogError> {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
        Ok(())
    }
}

/// Fire-and-forget event emitter.
///
/// `emit` never blocks the caller; a background writer drains the channel into
/// the sink. Delivery is at-most-once: a write that fails is logged and dropped.
#[derive(Clone)]
pub struct MatchEventLogger {
    tx: mpsc::UnboundedSender<MatchEventLog>,
}

impl MatchEventLogger {
    /// Start the background writer. It exits once every logger clone is dropped.
    pub fn spawn(sink: Arc<dyn EventSink>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<MatchEventLog>();

        let writer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = write_event(sink.as_ref(), &event).await {
                    tracing::warn!(
                        match_type = %event.match_type,
                        outcome = ?event.outcome,
                        "Dropping match event: {}",
                        e
                    );
                }
            }
            tracing::debug!("Match event writer stopped");
        });

        (Self { tx }, writer)
    }

    /// Hand an event to the writer
    pub fn emit(&self, event: &MatchEventLog) {
        if self.tx.send(event.clone()).is_err() {
            tracing::warn!("Match event writer is gone, event dropped");
        }
    }
}

async fn write_event(sink: &dyn EventSink, event: &MatchEventLog) -> Result<(), EventLogError> {
    let line = serde_json::to_string(event)?;
    sink.write_line(&line).await
}
