//! In-memory [`FlowRepository`] backed by a [`FlowCatalog`].

use async_trait::async_trait;
use callflow_core::error::RepositoryError;
use callflow_core::model::{Flow, FlowCatalog};
use callflow_core::synapse::FlowRepository;
use std::collections::HashMap;
use std::path::Path;

/// Catalog loaded once at startup. Never mutated while serving calls.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFlowRepository {
    /// Dialed number -> line id.
    lines: HashMap<String, String>,
    catalog: FlowCatalog,
}

impl InMemoryFlowRepository {
    pub fn new(catalog: FlowCatalog) -> Self {
        let lines = catalog
            .lines
            .iter()
            .map(|line| (line.number.trim().to_string(), line.id.clone()))
            .collect();
        Self { lines, catalog }
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RepositoryError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self::new(FlowCatalog::from_json(&raw)?))
    }

    pub fn catalog(&self) -> &FlowCatalog {
        &self.catalog
    }

    /// Line id for a dialed number; unknown numbers are taken as line ids.
    pub fn line_id<'a>(&'a self, number: &'a str) -> &'a str {
        let number = number.trim();
        self.lines.get(number).map_or(number, String::as_str)
    }

    fn find_active(&self, line: &str) -> Option<&Flow> {
        let line_id = self.line_id(line);
        self.catalog
            .flows
            .iter()
            .find(|flow| flow.is_active && flow.phone_line_id == line_id)
    }
}

#[async_trait]
impl FlowRepository for InMemoryFlowRepository {
    async fn active_flow_for_line(&self, line: &str) -> Result<Option<Flow>, RepositoryError> {
        Ok(self.find_active(line).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> FlowCatalog {
        serde_json::from_value(json!({
            "lines": [ { "id": "line-1", "number": "+15559870000" } ],
            "flows": [
                { "id": "draft", "name": "Draft", "isActive": false, "phoneLineId": "line-1",
                  "steps": [ { "id": "welcome", "type": "hangup" } ] },
                { "id": "live", "name": "Live", "isActive": true, "phoneLineId": "line-1",
                  "steps": [ { "id": "welcome", "type": "hangup" } ] },
                { "id": "direct", "name": "Direct", "isActive": true, "phoneLineId": "line-2",
                  "steps": [] }
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_number_maps_to_active_flow() {
        let repo = InMemoryFlowRepository::new(catalog());
        let flow = repo
            .active_flow_for_line("+15559870000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(flow.id, "live");
    }

    #[tokio::test]
    async fn test_unknown_number_is_a_line_id() {
        let repo = InMemoryFlowRepository::new(catalog());
        let flow = repo.active_flow_for_line("line-2").await.unwrap().unwrap();
        assert_eq!(flow.id, "direct");
        assert!(repo.active_flow_for_line("+15550000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flows.json");
        std::fs::write(&path, serde_json::to_string(&catalog()).unwrap()).unwrap();

        let repo = InMemoryFlowRepository::from_file(&path).await.unwrap();
        assert_eq!(repo.catalog().flows.len(), 3);

        let missing = InMemoryFlowRepository::from_file(dir.path().join("nope.json")).await;
        assert!(matches!(missing, Err(RepositoryError::Io { .. })));

        std::fs::write(&path, "{ not json").unwrap();
        let invalid = InMemoryFlowRepository::from_file(&path).await;
        assert!(matches!(invalid, Err(RepositoryError::Parse(_))));
    }
}
