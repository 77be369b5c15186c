//! # Renderer
//!
//! A dispatch over [`StepType`], not a generic template. Each arm builds a
//! typed plan from the step's option bag (applying that type's defaults),
//! then emits the verbs for it.
//!
//! | Type | Continuation |
//! |---|---|
//! | `welcome` | redirect to itself when a `default` edge exists |
//! | `menu` | gather back to itself; on timeout a notice and a retry redirect |
//! | `gather` | gather to `options.action` or the gather endpoint; on timeout redirect to `main_menu` |
//! | `record` | terminal |
//! | `transfer` | terminal |
//! | `hangup` | terminal |

use crate::twiml::{Dial, Gather, Record, Say, Verb, VoiceResponse};
use crate::urls::{Continuation, paths};
use callflow_core::model::{Flow, Step, StepOptions, StepType};
use callflow_flow::{fallback_step, is_dtmf_key};
use thiserror::Error;

/// Canned spoken messages.
pub mod messages {
    pub const OFFICE_CLOSED: &str = "Thank you for calling. Our office is currently closed. \
        Please call back during business hours. Goodbye.";
    pub const APOLOGY: &str = "We apologize for the inconvenience. We are experiencing \
        technical difficulties. Please try your call again later. Goodbye.";
    pub const NO_SELECTION: &str = "We did not receive your selection.";
    pub const RECORDING_CLOSING: &str = "Thank you for your message. Goodbye.";
}

pub const MENU_NUM_DIGITS: u32 = 1;
pub const MENU_TIMEOUT_SECS: u32 = 10;
pub const GATHER_NUM_DIGITS: u32 = 10;
pub const GATHER_TIMEOUT_SECS: u32 = 15;
pub const GATHER_FINISH_ON_KEY: &str = "#";
pub const RECORD_MAX_LENGTH_SECS: u32 = 60;
pub const RECORD_FINISH_ON_KEY: &str = "#";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("transfer step `{step}` has no transferNumber and no default transfer number is configured")]
    MissingTransferNumber { step: String },
    #[error("step `{step}` option `{option}` {reason}")]
    InvalidOption {
        step: String,
        option: &'static str,
        reason: String,
    },
}

impl RenderError {
    pub fn step(&self) -> &str {
        match self {
            RenderError::MissingTransferNumber { step }
            | RenderError::InvalidOption { step, .. } => step,
        }
    }
}

impl From<RenderError> for callflow_core::EngineError {
    fn from(err: RenderError) -> Self {
        callflow_core::EngineError::RenderingFailure {
            step: err.step().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Carrier-wide rendering settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceSettings {
    pub voice: Option<String>,
    pub language: Option<String>,
    pub default_transfer_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    settings: VoiceSettings,
}

impl Renderer {
    pub fn new(settings: VoiceSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &VoiceSettings {
        &self.settings
    }

    /// Render `step` of `flow`; continuation URLs are built under `urls`.
    pub fn render(
        &self,
        flow: &Flow,
        step: &Step,
        urls: &Continuation,
    ) -> Result<VoiceResponse, RenderError> {
        let doc = VoiceResponse::new();

        let doc = match step.step_type {
            StepType::Welcome => {
                let doc = self.say_opt(doc, &step.message);
                match step.default_target() {
                    Some(_) => doc.push(Verb::Redirect(urls.voice(&step.id))),
                    None => doc,
                }
            }
            StepType::Menu => {
                let num_digits = positive(step, "numDigits", step.options.num_digits)?
                    .unwrap_or(MENU_NUM_DIGITS);
                let timeout =
                    positive(step, "timeout", step.options.timeout)?.unwrap_or(MENU_TIMEOUT_SECS);
                let finish_on_key = finish_key(step, &step.options)?;

                doc.push(Gather {
                    num_digits,
                    timeout,
                    finish_on_key,
                    action: urls.voice(&step.id),
                    prompt: self.prompt(&step.message),
                })
                .push(self.say(messages::NO_SELECTION))
                .push(Verb::Redirect(urls.replay(&step.id)))
            }
            StepType::Gather => {
                let num_digits = positive(step, "numDigits", step.options.num_digits)?
                    .unwrap_or(GATHER_NUM_DIGITS);
                let timeout = positive(step, "timeout", step.options.timeout)?
                    .unwrap_or(GATHER_TIMEOUT_SECS);
                let finish_on_key = finish_key(step, &step.options)?
                    .unwrap_or_else(|| GATHER_FINISH_ON_KEY.to_string());
                let action = match &step.options.action {
                    Some(action) if !action.trim().is_empty() => urls.resolve(action.trim()),
                    _ => urls.url(paths::GATHER, &step.id),
                };
                // No input: go to main_menu (or the flow's fallback), not back to this step.
                let on_timeout = fallback_step(flow).map_or(step.id.as_str(), |s| s.id.as_str());

                doc.push(Gather {
                    num_digits,
                    timeout,
                    finish_on_key: Some(finish_on_key),
                    action,
                    prompt: self.prompt(&step.message),
                })
                .push(Verb::Redirect(urls.replay(on_timeout)))
            }
            StepType::Record => {
                let max_length = positive(step, "maxLength", step.options.max_length)?
                    .unwrap_or(RECORD_MAX_LENGTH_SECS);
                let finish_on_key = finish_key(step, &step.options)?
                    .unwrap_or_else(|| RECORD_FINISH_ON_KEY.to_string());

                self.say_opt(doc, &step.message)
                    .push(Record {
                        max_length,
                        finish_on_key,
                        action: urls.url(paths::RECORDED, &step.id),
                        recording_status_callback: urls.url(paths::RECORDING_STATUS, &step.id),
                        transcribe_callback: urls.url(paths::TRANSCRIPTION, &step.id),
                    })
                    .push(self.say(messages::RECORDING_CLOSING))
                    .push(Verb::Hangup)
            }
            StepType::Transfer => {
                let number = step
                    .options
                    .transfer_number
                    .as_deref()
                    .or(self.settings.default_transfer_number.as_deref())
                    .map(str::trim)
                    .filter(|number| !number.is_empty())
                    .ok_or_else(|| RenderError::MissingTransferNumber {
                        step: step.id.clone(),
                    })?;

                self.say_opt(doc, &step.message).push(Dial {
                    number: number.to_string(),
                    status_callback: urls.url(paths::CALL_STATUS, &step.id),
                    recording_status_callback: urls.url(paths::RECORDING_STATUS, &step.id),
                })
            }
            StepType::Hangup => self.say_opt(doc, &step.message).push(Verb::Hangup),
        };

        Ok(doc)
    }

    /// Closing response for a line without an active flow.
    pub fn office_closed(&self) -> VoiceResponse {
        self.terminal(messages::OFFICE_CLOSED)
    }

    /// Safe terminal response for any failure after validation.
    pub fn apology(&self) -> VoiceResponse {
        self.terminal(messages::APOLOGY)
    }

    /// Response to the `record` action once the caller has finished.
    pub fn recording_closing(&self) -> VoiceResponse {
        self.terminal(messages::RECORDING_CLOSING)
    }

    /// Acknowledgement for status callbacks; carries no instructions.
    pub fn acknowledge(&self) -> VoiceResponse {
        VoiceResponse::new()
    }

    fn terminal(&self, text: &str) -> VoiceResponse {
        VoiceResponse::new().push(self.say(text)).push(Verb::Hangup)
    }

    fn say(&self, text: &str) -> Say {
        Say {
            text: text.to_string(),
            voice: self.settings.voice.clone(),
            language: self.settings.language.clone(),
        }
    }

    fn prompt(&self, message: &str) -> Option<Say> {
        let message = message.trim();
        (!message.is_empty()).then(|| self.say(message))
    }

    fn say_opt(&self, doc: VoiceResponse, message: &str) -> VoiceResponse {
        match self.prompt(message) {
            Some(say) => doc.push(say),
            None => doc,
        }
    }
}

fn positive(
    step: &Step,
    option: &'static str,
    value: Option<u32>,
) -> Result<Option<u32>, RenderError> {
    match value {
        Some(0) => Err(RenderError::InvalidOption {
            step: step.id.clone(),
            option,
            reason: "must be at least 1".to_string(),
        }),
        other => Ok(other),
    }
}

fn finish_key(step: &Step, options: &StepOptions) -> Result<Option<String>, RenderError> {
    match options.finish_on_key.as_deref() {
        None => Ok(None),
        Some(key) if is_dtmf_key(key) => Ok(Some(key.to_string())),
        Some(key) => Err(RenderError::InvalidOption {
            step: step.id.clone(),
            option: "finishOnKey",
            reason: format!("`{key}` is not a single DTMF key"),
        }),
    }
}
