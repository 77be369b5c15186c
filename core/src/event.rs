use crate::error::SinkError;
use crate::turn::InteractionLogEntry;
use async_trait::async_trait;

/// Represents a sink for interaction records (file, database, analytics bus).
///
/// Append-only. The engine never reads records back.
#[async_trait]
pub trait InteractionSink: Send + Sync {
    /// Appends a record to the sink.
    async fn append(&self, entry: InteractionLogEntry) -> Result<(), SinkError>;

    /// Flushes buffered records, if the sink buffers.
    async fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
