use crate::error::RepositoryError;
use crate::model::Flow;
use async_trait::async_trait;
use std::sync::Arc;

/// Flow Repository: the read-only integration point to the flow store.
///
/// Owned externally. The engine performs exactly one read per webhook and
/// keeps nothing; caching, if any, belongs to the implementation.
#[async_trait]
pub trait FlowRepository: Send + Sync {
    /// The active flow for the line addressed by `line`, or `None` when the
    /// line has no active flow.
    async fn active_flow_for_line(&self, line: &str) -> Result<Option<Flow>, RepositoryError>;
}

#[async_trait]
impl<T: FlowRepository + ?Sized> FlowRepository for Arc<T> {
    async fn active_flow_for_line(&self, line: &str) -> Result<Option<Flow>, RepositoryError> {
        (**self).active_flow_for_line(line).await
    }
}
