use async_trait::async_trait;
use callflow_core::error::SinkError;
use callflow_core::event::InteractionSink;
use callflow_core::turn::InteractionLogEntry;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// One JSON object per line, appended to a file.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesSink {
    /// Open (creating if needed) `path` for appending.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InteractionSink for JsonLinesSink {
    async fn append(&self, entry: InteractionLogEntry) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), SinkError> {
        let mut file = self.file.lock().await;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }
}

/// Emits each record as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl InteractionSink for TracingSink {
    async fn append(&self, entry: InteractionLogEntry) -> Result<(), SinkError> {
        tracing::info!(
            target: "callflow::interaction",
            call_id = %entry.call_id,
            flow_id = %entry.flow_id,
            step_id = %entry.step_id,
            caller_input = entry.caller_input.as_deref().unwrap_or(""),
            from = %entry.from_number,
            to = %entry.to_number,
            used_fallback = entry.used_fallback,
            timestamp = %entry.timestamp.to_rfc3339(),
            "interaction"
        );
        Ok(())
    }
}

/// Keeps records in memory. For tests and `callflow render`.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<InteractionLogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<InteractionLogEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl InteractionSink for MemorySink {
    async fn append(&self, entry: InteractionLogEntry) -> Result<(), SinkError> {
        self.entries.lock().await.push(entry);
        Ok(())
    }
}
