//! Offline turn rendering

use crate::check::load_catalog;
use anyhow::Result;
use callflow_audit::{InteractionLogger, MemorySink};
use callflow_core::config::SignaturePolicy;
use callflow_core::turn::{STEP_PARAM, fields};
use callflow_guard::SignatureGuard;
use callflow_runtime::{
    InMemoryFlowRepository, WebhookController, WebhookReply, WebhookRequest, WebhookRoute,
};
use callflow_voice::{Continuation, Renderer, VoiceSettings};
use std::path::PathBuf;
use std::sync::Arc;

pub struct RenderArgs {
    pub catalog: PathBuf,
    pub to: String,
    pub step: Option<String>,
    pub digits: Option<String>,
    pub base_url: String,
    pub default_transfer_number: Option<String>,
}

/// Run one webhook through the controller and print the markup.
pub fn run_render_command(args: RenderArgs) -> Result<()> {
    let catalog = load_catalog(&args.catalog)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let (reply, entries) = runtime.block_on(async move {
        let sink = Arc::new(MemorySink::new());
        let (logger, task) = InteractionLogger::spawn(sink.clone(), 1);
        let controller = WebhookController::new(
            Arc::new(InMemoryFlowRepository::new(catalog)),
            SignatureGuard::new(SignaturePolicy::LogOnly, None),
            Renderer::new(VoiceSettings {
                default_transfer_number: args.default_transfer_number,
                ..Default::default()
            }),
            logger,
        );

        let webhook = request(args.to, args.step, args.digits, &args.base_url);
        let reply = controller.handle(webhook).await;
        drop(controller);
        task.join().await;
        (reply, sink.entries().await)
    });

    match reply {
        WebhookReply::Markup(doc) => println!("{doc}"),
        WebhookReply::Unauthorized => anyhow::bail!("webhook rejected"),
    }
    for entry in entries {
        eprintln!("{}", serde_json::to_string(&entry)?);
    }
    Ok(())
}

fn request(
    to: String,
    step: Option<String>,
    digits: Option<String>,
    base_url: &str,
) -> WebhookRequest {
    let urls = Continuation::new(base_url);
    let url = match &step {
        Some(step) => urls.voice(step),
        None => format!("{}{}", urls.base_url(), WebhookRoute::Voice.path()),
    };

    let mut body = vec![
        (fields::CALL_SID.to_string(), "CAoffline".to_string()),
        (fields::FROM.to_string(), "+10000000000".to_string()),
        (fields::TO.to_string(), to),
    ];
    if let Some(digits) = digits {
        body.push((fields::DIGITS.to_string(), digits));
    }

    WebhookRequest {
        route: WebhookRoute::Voice,
        url,
        base_url: urls.base_url().to_string(),
        signature: None,
        query: step
            .map(|step| vec![(STEP_PARAM.to_string(), step)])
            .unwrap_or_default(),
        body,
    }
}
