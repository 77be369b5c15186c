//! # Webhook Controller
//!
//! One inbound webhook, start to finish:
//!
//! ```text
//! Received -> Validated -> FlowResolved -> StepResolved -> Rendered -> Logged -> Responded
//! ```
//!
//! Only a failure at `Validated` leaves as a non-200 reply. Every later
//! failure is converted into spoken markup that ends the call politely.

use crate::route::WebhookRoute;
use callflow_audit::InteractionLogger;
use callflow_core::EngineError;
use callflow_core::config::EngineConfig;
use callflow_core::model::{Flow, Step};
use callflow_core::synapse::FlowRepository;
use callflow_core::turn::{CallTurn, InteractionLogEntry, STEP_PARAM, fields};
use callflow_flow::resolve;
use callflow_guard::SignatureGuard;
use callflow_voice::{Continuation, Renderer, VoiceResponse, VoiceSettings};
use std::sync::Arc;

/// A decoded webhook, independent of the HTTP stack.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    pub route: WebhookRoute,
    /// The full URL as the carrier requested (and signed) it.
    pub url: String,
    /// Base for continuation URLs, e.g. `https://ivr.example.com`.
    pub base_url: String,
    pub signature: Option<String>,
    /// Decoded query string parameters.
    pub query: Vec<(String, String)>,
    /// Decoded form body parameters. Only these are signed.
    pub body: Vec<(String, String)>,
}

impl WebhookRequest {
    /// Query and body parameters; the query wins for duplicated keys.
    pub fn params(&self) -> Vec<(String, String)> {
        self.query.iter().chain(self.body.iter()).cloned().collect()
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .chain(self.body.iter())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookReply {
    /// 200 with voice markup.
    Markup(VoiceResponse),
    /// 401 with an empty body.
    Unauthorized,
}

impl WebhookReply {
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookReply::Markup(_) => 200,
            WebhookReply::Unauthorized => 401,
        }
    }

    pub fn markup(&self) -> Option<&VoiceResponse> {
        match self {
            WebhookReply::Markup(doc) => Some(doc),
            WebhookReply::Unauthorized => None,
        }
    }

    pub fn into_body(self) -> String {
        match self {
            WebhookReply::Markup(doc) => doc.to_xml(),
            WebhookReply::Unauthorized => String::new(),
        }
    }
}

/// The step chosen for this turn and whether the fallback policy chose it.
struct Selected<'f> {
    step: &'f Step,
    used_fallback: bool,
}

#[derive(Clone)]
pub struct WebhookController {
    repository: Arc<dyn FlowRepository>,
    guard: SignatureGuard,
    renderer: Renderer,
    logger: InteractionLogger,
}

impl WebhookController {
    pub fn new(
        repository: Arc<dyn FlowRepository>,
        guard: SignatureGuard,
        renderer: Renderer,
        logger: InteractionLogger,
    ) -> Self {
        Self {
            repository,
            guard,
            renderer,
            logger,
        }
    }

    pub fn from_config(
        config: &EngineConfig,
        repository: Arc<dyn FlowRepository>,
        logger: InteractionLogger,
    ) -> Self {
        let settings = VoiceSettings {
            voice: config.carrier.voice.clone(),
            language: config.carrier.language.clone(),
            default_transfer_number: config.carrier.default_transfer_number.clone(),
        };
        Self::new(
            repository,
            SignatureGuard::from_config(config),
            Renderer::new(settings),
            logger,
        )
    }

    pub fn guard(&self) -> &SignatureGuard {
        &self.guard
    }

    pub async fn handle(&self, request: WebhookRequest) -> WebhookReply {
        let signature = request.signature.as_deref();
        if let Err(err) = self.guard.admit(signature, &request.url, &request.body) {
            if err.is_fatal() {
                tracing::warn!(route = ?request.route, error = %err, "webhook rejected");
                return WebhookReply::Unauthorized;
            }
            tracing::warn!(route = ?request.route, error = %err, "signature check failed; serving anyway");
        }

        let doc = match request.route {
            WebhookRoute::Voice | WebhookRoute::Gather => self.advance(&request).await,
            WebhookRoute::Recorded => {
                tracing::info!(
                    call_sid = request.param(fields::CALL_SID).unwrap_or_default(),
                    step = request.param(STEP_PARAM).unwrap_or_default(),
                    recording_url = request.param(fields::RECORDING_URL).unwrap_or_default(),
                    "recording finished"
                );
                self.renderer.recording_closing()
            }
            WebhookRoute::RecordingStatus => {
                tracing::info!(
                    call_sid = request.param(fields::CALL_SID).unwrap_or_default(),
                    recording_sid = request.param(fields::RECORDING_SID).unwrap_or_default(),
                    recording_url = request.param(fields::RECORDING_URL).unwrap_or_default(),
                    "recording status"
                );
                self.renderer.acknowledge()
            }
            WebhookRoute::Transcription => {
                tracing::info!(
                    call_sid = request.param(fields::CALL_SID).unwrap_or_default(),
                    chars = request
                        .param(fields::TRANSCRIPTION_TEXT)
                        .map_or(0, |text| text.chars().count()),
                    "transcription received"
                );
                self.renderer.acknowledge()
            }
            WebhookRoute::CallStatus => {
                tracing::info!(
                    call_sid = request.param(fields::CALL_SID).unwrap_or_default(),
                    call_status = request.param(fields::CALL_STATUS).unwrap_or_default(),
                    dial_status = request.param(fields::DIAL_CALL_STATUS).unwrap_or_default(),
                    "transfer leg status"
                );
                self.renderer.acknowledge()
            }
        };

        tracing::debug!(markup = %doc, "responding");
        WebhookReply::Markup(doc)
    }

    async fn advance(&self, request: &WebhookRequest) -> VoiceResponse {
        let turn = CallTurn::from_params(&request.params());
        let urls = Continuation::new(request.base_url.as_str());

        match self.advance_turn(&turn, &urls).await {
            Ok(doc) => doc,
            Err(err @ EngineError::ConfigurationMissing(_)) => {
                tracing::info!(call_sid = %turn.call_id, reason = %err, "office closed");
                self.renderer.office_closed()
            }
            Err(err) => {
                tracing::warn!(call_sid = %turn.call_id, error = %err, "call ended with apology");
                self.renderer.apology()
            }
        }
    }

    async fn advance_turn(
        &self,
        turn: &CallTurn,
        urls: &Continuation,
    ) -> Result<VoiceResponse, EngineError> {
        let flow = self
            .repository
            .active_flow_for_line(&turn.to_number)
            .await?
            .ok_or_else(|| EngineError::ConfigurationMissing(turn.to_number.clone()))?;

        let selected = select_step(&flow, turn)?;
        if selected.used_fallback {
            tracing::warn!(
                call_sid = %turn.call_id,
                flow_id = %flow.id,
                from = turn.current_step_id.as_deref().unwrap_or_default(),
                to = %selected.step.id,
                "dangling transition; fallback applied"
            );
        }

        let doc = self
            .renderer
            .render(&flow, selected.step, urls)
            .map_err(EngineError::from)?;

        tracing::info!(
            call_sid = %turn.call_id,
            flow_id = %flow.id,
            step = %selected.step.id,
            step_type = %selected.step.step_type,
            input = turn.caller_input.as_deref().unwrap_or_default(),
            "transition"
        );
        self.logger.record(InteractionLogEntry::for_turn(
            turn,
            &flow.id,
            &selected.step.id,
            selected.used_fallback,
        ));

        Ok(doc)
    }
}

/// The first webhook of a call (no step id) lands on the entry step itself,
/// and so does a replay of a known step. Every other webhook moves along one
/// edge from the round-tripped step.
fn select_step<'f>(flow: &'f Flow, turn: &CallTurn) -> Result<Selected<'f>, EngineError> {
    let Some(current) = turn.current_step_id.as_deref() else {
        let step = flow.entry_step().ok_or_else(|| {
            EngineError::StateResolutionAnomaly(format!("flow `{}` has no steps", flow.id))
        })?;
        return Ok(Selected {
            step,
            used_fallback: false,
        });
    };

    let known = flow.step(current);
    match known {
        Some(step) if turn.replay => {
            return Ok(Selected {
                step,
                used_fallback: false,
            });
        }
        Some(_) => {}
        None => tracing::warn!(
            call_sid = %turn.call_id,
            flow_id = %flow.id,
            step = current,
            "unknown step id; restarting at entry step"
        ),
    }

    let resolution = resolve(flow, Some(current), turn.caller_input.as_deref())
        .map_err(|err| EngineError::StateResolutionAnomaly(err.to_string()))?;

    Ok(Selected {
        step: resolution.step(),
        used_fallback: known.is_none() || resolution.used_fallback(),
    })
}
