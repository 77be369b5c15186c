//! Authoring-time checks.
//!
//! The engine tolerates every problem reported here at call time (fallback
//! policy, safe terminal responses). Linting exists so authors find them
//! before a caller does.

use callflow_core::model::{Flow, MAIN_MENU_STEP_ID, StepType};
use std::collections::{HashSet, VecDeque};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    EmptyFlow,
    NoActiveFlag,
    DuplicateStepId,
    DanglingTarget { key: String, target: String },
    MissingMainMenu,
    MenuWithoutTransitions,
    IgnoredTransitions,
    InvalidOption { option: &'static str, reason: String },
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowIssue {
    pub severity: Severity,
    pub step: Option<String>,
    pub kind: IssueKind,
}

impl FlowIssue {
    fn error(step: Option<&str>, kind: IssueKind) -> Self {
        Self {
            severity: Severity::Error,
            step: step.map(str::to_string),
            kind,
        }
    }

    fn warning(step: Option<&str>, kind: IssueKind) -> Self {
        Self {
            severity: Severity::Warning,
            step: step.map(str::to_string),
            kind,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for FlowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level}")?;
        if let Some(step) = &self.step {
            write!(f, " [{step}]")?;
        }
        match &self.kind {
            IssueKind::EmptyFlow => write!(f, ": flow has no steps"),
            IssueKind::NoActiveFlag => write!(f, ": flow is not active and will never answer"),
            IssueKind::DuplicateStepId => write!(f, ": step id is used more than once"),
            IssueKind::DanglingTarget { key, target } => {
                write!(f, ": transition `{key}` targets unknown step `{target}`")
            }
            IssueKind::MissingMainMenu => write!(
                f,
                ": no `{MAIN_MENU_STEP_ID}` step; fallbacks and gather timeouts land on the first step"
            ),
            IssueKind::MenuWithoutTransitions => {
                write!(f, ": menu has no transitions and will repeat forever")
            }
            IssueKind::IgnoredTransitions => {
                write!(f, ": terminal step has transitions that are never taken")
            }
            IssueKind::InvalidOption { option, reason } => {
                write!(f, ": option `{option}` {reason}")
            }
            IssueKind::Unreachable => write!(f, ": step cannot be reached from the entry step"),
        }
    }
}

/// Check a flow for authoring mistakes. Issues are ordered by step.
pub fn lint(flow: &Flow) -> Vec<FlowIssue> {
    let mut issues = Vec::new();

    if flow.steps.is_empty() {
        issues.push(FlowIssue::error(None, IssueKind::EmptyFlow));
        return issues;
    }
    if !flow.is_active {
        issues.push(FlowIssue::warning(None, IssueKind::NoActiveFlag));
    }

    let mut seen = HashSet::new();
    let mut needs_main_menu = false;

    for step in &flow.steps {
        let id = Some(step.id.as_str());
        if !seen.insert(step.id.as_str()) {
            issues.push(FlowIssue::error(id, IssueKind::DuplicateStepId));
        }

        for (key, target) in &step.next_steps {
            if flow.step(target).is_none() {
                needs_main_menu = true;
                issues.push(FlowIssue::error(
                    id,
                    IssueKind::DanglingTarget {
                        key: key.clone(),
                        target: target.clone(),
                    },
                ));
            }
        }

        match step.step_type {
            StepType::Menu if step.next_steps.is_empty() => {
                issues.push(FlowIssue::warning(id, IssueKind::MenuWithoutTransitions));
            }
            StepType::Gather if step.options.action.is_none() => needs_main_menu = true,
            t if t.is_terminal() && !step.next_steps.is_empty() => {
                issues.push(FlowIssue::warning(id, IssueKind::IgnoredTransitions));
            }
            _ => {}
        }

        for (option, reason) in invalid_options(step) {
            issues.push(FlowIssue::error(
                id,
                IssueKind::InvalidOption { option, reason },
            ));
        }
    }

    if needs_main_menu && flow.main_menu().is_none() {
        issues.push(FlowIssue::warning(None, IssueKind::MissingMainMenu));
    }

    let reachable = reachable_steps(flow);
    for step in &flow.steps {
        if !reachable.contains(step.id.as_str()) {
            issues.push(FlowIssue::warning(
                Some(step.id.as_str()),
                IssueKind::Unreachable,
            ));
        }
    }

    issues
}

fn invalid_options(step: &callflow_core::Step) -> Vec<(&'static str, String)> {
    let options = &step.options;
    let mut invalid = Vec::new();

    if options.num_digits == Some(0) {
        invalid.push(("numDigits", "must be at least 1".to_string()));
    }
    if options.timeout == Some(0) {
        invalid.push(("timeout", "must be at least 1 second".to_string()));
    }
    if options.max_length == Some(0) {
        invalid.push(("maxLength", "must be at least 1 second".to_string()));
    }
    if let Some(key) = &options.finish_on_key {
        if !is_dtmf_key(key) {
            invalid.push(("finishOnKey", format!("`{key}` is not a single DTMF key")));
        }
    }
    if let Some(number) = &options.transfer_number {
        if number.trim().is_empty() {
            invalid.push(("transferNumber", "is empty".to_string()));
        }
    }
    invalid
}

/// `0-9`, `#`, `*`, or empty (disables the finish key).
pub fn is_dtmf_key(key: &str) -> bool {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (None, _) => true,
        (Some(c), None) => c.is_ascii_digit() || c == '#' || c == '*',
        _ => false,
    }
}

/// Steps reachable from the entry step. `main_menu` counts as reachable
/// from every gather step and from every fallback.
fn reachable_steps(flow: &Flow) -> HashSet<&str> {
    let mut reachable = HashSet::new();
    let mut queue = VecDeque::new();

    if let Some(entry) = flow.entry_step() {
        queue.push_back(entry.id.as_str());
    }
    if let Some(main_menu) = flow.main_menu() {
        queue.push_back(main_menu.id.as_str());
    }

    while let Some(id) = queue.pop_front() {
        if !reachable.insert(id) {
            continue;
        }
        if let Some(step) = flow.step(id) {
            for target in step.next_steps.values() {
                if flow.step(target).is_some() && !reachable.contains(target.as_str()) {
                    queue.push_back(target.as_str());
                }
            }
        }
    }
    reachable
}
