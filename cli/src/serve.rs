//! Webhook server command

use crate::check::{catalog_warnings, lint_catalog};
use anyhow::{Context, Result};
use callflow_audit::{InteractionLogger, JsonLinesSink, TracingSink};
use callflow_core::config::EngineConfig;
use callflow_core::event::InteractionSink;
use callflow_http::HttpIngress;
use callflow_runtime::{InMemoryFlowRepository, WebhookController};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub fn run_serve_command(config_path: Option<&Path>) -> Result<()> {
    let config = EngineConfig::load(config_path).context("Failed to load configuration")?;
    callflow_observe::init_tracing(config.log_format)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(serve(config))
}

async fn serve(config: EngineConfig) -> Result<()> {
    let flows_path = config
        .flows
        .path
        .as_deref()
        .context("No flow catalog configured (flows.path or CALLFLOW_FLOWS_PATH)")?;
    let repository = InMemoryFlowRepository::from_file(flows_path)
        .await
        .with_context(|| format!("Failed to load flow catalog {}", flows_path.display()))?;

    let catalog = repository.catalog();
    for report in lint_catalog(catalog) {
        for issue in &report.issues {
            tracing::warn!(flow_id = %report.flow_id, "{issue}");
        }
    }
    for warning in catalog_warnings(catalog) {
        tracing::warn!("{warning}");
    }

    let sink: Arc<dyn InteractionSink> = match &config.interactions.path {
        Some(path) => Arc::new(
            JsonLinesSink::open(path)
                .await
                .with_context(|| format!("Failed to open interaction log {}", path.display()))?,
        ),
        None => Arc::new(TracingSink),
    };
    let (logger, logger_task) = InteractionLogger::spawn(sink, config.interactions.queue_capacity);

    let flow_count = catalog.flows.len();
    let controller = WebhookController::from_config(&config, Arc::new(repository), logger);
    tracing::info!(
        mode = ?config.mode,
        signature_policy = ?controller.guard().policy(),
        flows = flow_count,
        "Callflow starting"
    );

    let ingress = HttpIngress::new(controller)
        .bind(config.server.bind.clone())
        .public_base_url(config.server.public_base_url.clone())
        .mode(config.mode);

    ingress
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    // Open keep-alive connections still hold logger handles; drain what we can.
    match tokio::time::timeout(DRAIN_TIMEOUT, logger_task.join()).await {
        Ok(0) => {}
        Ok(failed) => tracing::warn!(failed, "some interactions could not be written"),
        Err(_) => tracing::warn!("interaction queue not drained before shutdown"),
    }
    tracing::info!("Callflow stopped");
    Ok(())
}
