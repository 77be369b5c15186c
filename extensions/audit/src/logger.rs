use callflow_core::EngineError;
use callflow_core::event::InteractionSink;
use callflow_core::turn::InteractionLogEntry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Cheap-to-clone handle used by the webhook path.
#[derive(Clone, Debug)]
pub struct InteractionLogger {
    tx: mpsc::Sender<InteractionLogEntry>,
    dropped: Arc<AtomicU64>,
}

/// The background drain task. Completes once every [`InteractionLogger`]
/// clone has been dropped and the queue is empty.
#[derive(Debug)]
pub struct LoggerTask {
    handle: JoinHandle<u64>,
}

impl InteractionLogger {
    /// Spawn the drain task on the current runtime.
    pub fn spawn(sink: Arc<dyn InteractionSink>, capacity: usize) -> (Self, LoggerTask) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(drain(sink, rx));
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            LoggerTask { handle },
        )
    }

    /// Enqueue without waiting. Returns `false` when the record was dropped.
    pub fn record(&self, entry: InteractionLogEntry) -> bool {
        match self.tx.try_send(entry) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(entry)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    call_id = %entry.call_id,
                    step_id = %entry.step_id,
                    "interaction queue full; record dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(entry)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(call_id = %entry.call_id, "interaction logger stopped; record dropped");
                false
            }
        }
    }

    /// Records dropped because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl LoggerTask {
    /// Wait for the queue to drain. Returns the number of records the sink
    /// failed to append.
    pub async fn join(self) -> u64 {
        match self.handle.await {
            Ok(failed) => failed,
            Err(err) => {
                tracing::error!(error = %err, "interaction logger task aborted");
                0
            }
        }
    }
}

async fn drain(sink: Arc<dyn InteractionSink>, mut rx: mpsc::Receiver<InteractionLogEntry>) -> u64 {
    let mut failed = 0;
    while let Some(entry) = rx.recv().await {
        let call_id = entry.call_id.clone();
        if let Err(err) = sink.append(entry).await {
            failed += 1;
            let err = EngineError::from(err);
            tracing::warn!(%call_id, error = %err, "failed to append interaction");
        }
    }
    if let Err(err) = sink.flush().await {
        tracing::warn!(error = %err, "failed to flush interaction sink");
    }
    tracing::debug!(failed, "interaction logger drained");
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use async_trait::async_trait;
    use callflow_core::error::SinkError;
    use callflow_core::turn::CallTurn;

    fn entry(call_id: &str) -> InteractionLogEntry {
        let turn = CallTurn {
            call_id: call_id.to_string(),
            ..Default::default()
        };
        InteractionLogEntry::for_turn(&turn, "flow-1", "main_menu", false)
    }

    struct FailingSink;

    #[async_trait]
    impl InteractionSink for FailingSink {
        async fn append(&self, _entry: InteractionLogEntry) -> Result<(), SinkError> {
            Err(SinkError::Closed)
        }
    }

    #[tokio::test]
    async fn test_records_reach_the_sink_in_order() {
        let sink = Arc::new(MemorySink::new());
        let (logger, task) = InteractionLogger::spawn(sink.clone(), 8);

        assert!(logger.record(entry("CA1")));
        assert!(logger.record(entry("CA2")));
        drop(logger);

        assert_eq!(task.join().await, 0);
        let ids: Vec<String> = sink.entries().await.into_iter().map(|e| e.call_id).collect();
        assert_eq!(ids, vec!["CA1", "CA2"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_full_queue_drops_without_blocking() {
        let sink = Arc::new(MemorySink::new());
        let (logger, task) = InteractionLogger::spawn(sink.clone(), 1);

        // The drain task cannot run until this task yields.
        assert!(logger.record(entry("CA1")));
        assert!(!logger.record(entry("CA2")));
        assert_eq!(logger.dropped(), 1);

        drop(logger);
        task.join().await;
        assert_eq!(sink.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_sink_failures_are_counted_not_raised() {
        let (logger, task) = InteractionLogger::spawn(Arc::new(FailingSink), 4);
        logger.record(entry("CA1"));
        logger.record(entry("CA2"));
        drop(logger);

        assert_eq!(task.join().await, 2);
    }
}
