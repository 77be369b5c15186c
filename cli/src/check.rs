//! Flow catalog validation

use anyhow::{Context, Result};
use callflow_core::model::FlowCatalog;
use callflow_flow::{FlowIssue, lint};
use std::collections::HashMap;
use std::path::Path;

pub fn load_catalog(path: &Path) -> Result<FlowCatalog> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read flow catalog: {}", path.display()))?;
    FlowCatalog::from_json(&raw)
        .with_context(|| format!("Failed to parse flow catalog: {}", path.display()))
}

/// Lint findings for one flow of the catalog.
pub struct FlowReport {
    pub flow_id: String,
    pub issues: Vec<FlowIssue>,
}

impl FlowReport {
    pub fn errors(&self) -> usize {
        self.issues.iter().filter(|issue| issue.is_error()).count()
    }
}

pub fn lint_catalog(catalog: &FlowCatalog) -> Vec<FlowReport> {
    catalog
        .flows
        .iter()
        .map(|flow| FlowReport {
            flow_id: flow.id.clone(),
            issues: lint(flow),
        })
        .collect()
}

/// Problems spanning flows: only the first active flow of a line answers.
pub fn catalog_warnings(catalog: &FlowCatalog) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut active: HashMap<&str, Vec<&str>> = HashMap::new();
    for flow in catalog.flows.iter().filter(|flow| flow.is_active) {
        active
            .entry(flow.phone_line_id.as_str())
            .or_default()
            .push(flow.id.as_str());
    }

    let mut lines: Vec<_> = active.into_iter().collect();
    lines.sort();
    for (line, flows) in lines {
        if flows.len() > 1 {
            warnings.push(format!(
                "line `{line}` has {} active flows ({}); only `{}` will answer",
                flows.len(),
                flows.join(", "),
                flows[0]
            ));
        }
        if !catalog.lines.is_empty() && !catalog.lines.iter().any(|l| l.id == line) {
            warnings.push(format!(
                "line `{line}` is not listed in `lines`; calls reach it only if dialed by id"
            ));
        }
    }
    warnings
}

/// Run catalog validation checks
pub fn run_check_command(path: &Path, strict: bool) -> Result<()> {
    println!("Checking flow catalog at: {}", path.display());
    let catalog = load_catalog(path)?;

    let mut errors = 0;
    let mut warnings = 0;

    for report in lint_catalog(&catalog) {
        if report.issues.is_empty() {
            println!("  ✅ {}", report.flow_id);
            continue;
        }
        println!("  {}:", report.flow_id);
        for issue in &report.issues {
            println!("    {issue}");
        }
        errors += report.errors();
        warnings += report.issues.len() - report.errors();
    }

    for warning in catalog_warnings(&catalog) {
        println!("  warning: {warning}");
        warnings += 1;
    }

    println!();
    println!(
        "{} flow(s), {} error(s), {} warning(s)",
        catalog.flows.len(),
        errors,
        warnings
    );

    if errors > 0 || (strict && warnings > 0) {
        anyhow::bail!("flow catalog has problems");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(flows: serde_json::Value) -> FlowCatalog {
        serde_json::from_value(serde_json::json!({
            "lines": [ { "id": "line-1", "number": "+15559870000" } ],
            "flows": flows
        }))
        .unwrap()
    }

    #[test]
    fn test_duplicate_active_flows_warn() {
        let catalog = catalog(serde_json::json!([
            { "id": "a", "name": "A", "isActive": true, "phoneLineId": "line-1", "steps": [] },
            { "id": "b", "name": "B", "isActive": true, "phoneLineId": "line-1", "steps": [] },
            { "id": "c", "name": "C", "isActive": true, "phoneLineId": "line-9", "steps": [] }
        ]));
        let warnings = catalog_warnings(&catalog);

        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("only `a` will answer"));
        assert!(warnings[1].contains("line-9"));
    }

    #[test]
    fn test_check_command_fails_on_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flows.json");

        let broken = catalog(serde_json::json!([
            { "id": "a", "name": "A", "isActive": true, "phoneLineId": "line-1",
              "steps": [ { "id": "welcome", "type": "welcome", "nextSteps": { "default": "ghost" } } ] }
        ]));
        std::fs::write(&path, serde_json::to_string(&broken).unwrap()).unwrap();
        assert!(run_check_command(&path, false).is_err());

        let clean = catalog(serde_json::json!([
            { "id": "a", "name": "A", "isActive": true, "phoneLineId": "line-1",
              "steps": [ { "id": "welcome", "type": "hangup", "message": "Closed" } ] }
        ]));
        std::fs::write(&path, serde_json::to_string(&clean).unwrap()).unwrap();
        assert!(run_check_command(&path, true).is_ok());
    }

    #[test]
    fn test_missing_catalog() {
        let err = load_catalog(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read flow catalog"));
    }
}
