//! # Call Turn
//!
//! A `CallTurn` is everything the engine knows about a call for the duration
//! of one webhook. Nothing is kept between webhooks: the step id comes back
//! from the carrier inside the continuation URL the previous response embedded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Continuation parameter carrying the current step id.
pub const STEP_PARAM: &str = "step";

/// Continuation parameter asking for the named step to be rendered again
/// instead of advanced. Set on no-input redirects.
pub const REPLAY_PARAM: &str = "replay";

/// Carrier form fields read by the engine.
pub mod fields {
    pub const CALL_SID: &str = "CallSid";
    pub const FROM: &str = "From";
    pub const TO: &str = "To";
    pub const DIGITS: &str = "Digits";
    pub const CALL_STATUS: &str = "CallStatus";
    pub const RECORDING_URL: &str = "RecordingUrl";
    pub const RECORDING_SID: &str = "RecordingSid";
    pub const TRANSCRIPTION_TEXT: &str = "TranscriptionText";
    pub const DIAL_CALL_STATUS: &str = "DialCallStatus";
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallTurn {
    pub call_id: String,
    pub from_number: String,
    pub to_number: String,
    pub current_step_id: Option<String>,
    pub caller_input: Option<String>,
    /// Render `current_step_id` in place rather than taking an edge from it.
    pub replay: bool,
}

impl CallTurn {
    /// Rebuild the turn from decoded webhook parameters (query and body merged).
    ///
    /// Empty values are treated as absent; the carrier sends `Digits=` on a
    /// gather timeout with some configurations.
    pub fn from_params(params: &[(String, String)]) -> Self {
        let find = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            call_id: find(fields::CALL_SID).unwrap_or_default(),
            from_number: find(fields::FROM).unwrap_or_default(),
            to_number: find(fields::TO).unwrap_or_default(),
            current_step_id: find(STEP_PARAM),
            caller_input: find(fields::DIGITS),
            replay: find(REPLAY_PARAM).is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        }
    }
}

/// Append-only audit record of one transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionLogEntry {
    pub call_id: String,
    pub flow_id: String,
    pub step_id: String,
    pub caller_input: Option<String>,
    pub from_number: String,
    pub to_number: String,
    pub used_fallback: bool,
    pub timestamp: DateTime<Utc>,
}

impl InteractionLogEntry {
    pub fn for_turn(turn: &CallTurn, flow_id: &str, step_id: &str, used_fallback: bool) -> Self {
        Self {
            call_id: turn.call_id.clone(),
            flow_id: flow_id.to_string(),
            step_id: step_id.to_string(),
            caller_input: turn.caller_input.clone(),
            from_number: turn.from_number.clone(),
            to_number: turn.to_number.clone(),
            used_fallback,
            timestamp: Utc::now(),
        }
    }
}
