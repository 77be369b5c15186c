//! Callflow Voice - Markup Renderer
//!
//! Turns a resolved [`Step`](callflow_core::Step) into carrier voice-control
//! markup. Each step type has a fixed response shape; every non-terminal
//! shape embeds a continuation URL carrying the current step id, which is
//! the only state that survives between webhooks.

pub mod render;
pub mod twiml;
pub mod urls;

pub use render::{RenderError, Renderer, VoiceSettings, messages};
pub use twiml::{Dial, Gather, Record, Say, Verb, VoiceResponse};
pub use urls::{Continuation, is_replay_url, paths, step_from_url};
