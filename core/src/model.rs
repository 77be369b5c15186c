//! # Flow Model
//!
//! A `Flow` is the authored decision tree for one phone line. Steps reference
//! each other by id only (arena style): the id is what travels through the
//! carrier between webhooks, so no pointer structure is needed.
//!
//! The model is read-only to the engine. It is produced by an external
//! authoring tool and deserialized from its JSON shape (`camelCase` keys).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Conventional id of the entry step.
pub const ENTRY_STEP_ID: &str = "welcome";
/// Conventional id of the step used by the fallback policy.
pub const MAIN_MENU_STEP_ID: &str = "main_menu";
/// Reserved transition key for the unconditional / no-input edge.
pub const DEFAULT_TRANSITION_KEY: &str = "default";

/// Caller-input keyed transition table (`"1" -> "sales"`, `"default" -> ...`).
pub type NextSteps = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    pub phone_line_id: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Flow {
    /// Look up a step by id.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.id == id)
    }

    /// The step a call lands on when no step id has been round-tripped yet.
    ///
    /// `welcome` by id, then the first step of type `welcome`, then the first step.
    pub fn entry_step(&self) -> Option<&Step> {
        self.step(ENTRY_STEP_ID)
            .or_else(|| {
                self.steps
                    .iter()
                    .find(|step| step.step_type == StepType::Welcome)
            })
            .or_else(|| self.steps.first())
    }

    pub fn main_menu(&self) -> Option<&Step> {
        self.step(MAIN_MENU_STEP_ID)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub options: StepOptions,
    #[serde(default)]
    pub next_steps: NextSteps,
}

impl Step {
    /// Target id for an exact caller-input match.
    pub fn target_for(&self, input: &str) -> Option<&str> {
        self.next_steps.get(input).map(String::as_str)
    }

    /// Target id of the `default` edge.
    pub fn default_target(&self) -> Option<&str> {
        self.target_for(DEFAULT_TRANSITION_KEY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Welcome,
    Menu,
    Gather,
    Record,
    Transfer,
    Hangup,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Welcome => "welcome",
            StepType::Menu => "menu",
            StepType::Gather => "gather",
            StepType::Record => "record",
            StepType::Transfer => "transfer",
            StepType::Hangup => "hangup",
        }
    }

    /// Terminal steps end the call (or hand it to the carrier) and never
    /// embed a continuation back into the engine.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepType::Record | StepType::Transfer | StepType::Hangup
        )
    }
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-type configuration bag. Each renderer reads only the keys its step
/// type understands and applies its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_digits: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_on_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_number: Option<String>,
}

/// A carrier phone line. The carrier addresses webhooks by the dialed
/// number; flows are attached to line ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneLine {
    pub id: String,
    pub number: String,
}

/// The on-disk shape exported by the authoring tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowCatalog {
    #[serde(default)]
    pub lines: Vec<PhoneLine>,
    #[serde(default)]
    pub flows: Vec<Flow>,
}

impl FlowCatalog {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Flow {
        serde_json::from_value(serde_json::json!({
            "id": "flow-1",
            "name": "Front desk",
            "isActive": true,
            "phoneLineId": "line-1",
            "steps": [
                { "id": "intro", "type": "hangup", "message": "bye" },
                { "id": "hello", "type": "welcome", "message": "Hi",
                  "nextSteps": { "default": "main_menu" } },
                { "id": "main_menu", "type": "menu", "message": "Press 1",
                  "options": { "numDigits": 1, "timeout": 5 },
                  "nextSteps": { "1": "intro" } }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_deserializes_authoring_shape() {
        let flow = sample();
        assert!(flow.is_active);
        assert_eq!(flow.steps.len(), 3);

        let menu = flow.step("main_menu").unwrap();
        assert_eq!(menu.step_type, StepType::Menu);
        assert_eq!(menu.options.num_digits, Some(1));
        assert_eq!(menu.options.timeout, Some(5));
        assert_eq!(menu.target_for("1"), Some("intro"));
        assert_eq!(menu.default_target(), None);
    }

    #[test]
    fn test_entry_prefers_welcome_type_when_no_welcome_id() {
        let flow = sample();
        assert_eq!(flow.entry_step().map(|s| s.id.as_str()), Some("hello"));
    }

    #[test]
    fn test_entry_prefers_welcome_id() {
        let mut flow = sample();
        flow.steps[0].id = ENTRY_STEP_ID.to_string();
        assert_eq!(flow.entry_step().map(|s| s.id.as_str()), Some("welcome"));
    }

    #[test]
    fn test_entry_falls_back_to_first_step() {
        let mut flow = sample();
        flow.steps.retain(|s| s.step_type != StepType::Welcome);
        assert_eq!(flow.entry_step().map(|s| s.id.as_str()), Some("intro"));

        flow.steps.clear();
        assert!(flow.entry_step().is_none());
    }

    #[test]
    fn test_terminal_types() {
        assert!(StepType::Record.is_terminal());
        assert!(StepType::Transfer.is_terminal());
        assert!(StepType::Hangup.is_terminal());
        assert!(!StepType::Menu.is_terminal());
        assert!(!StepType::Gather.is_terminal());
        assert!(!StepType::Welcome.is_terminal());
    }
}
