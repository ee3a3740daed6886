//! CarePath - terminal client for symptom triage
//!
//! Drives a triage conversation against the CarePath backend: symptom entry,
//! a chat loop, and a structured assessment with an urgency tier.

mod backend;
mod bootstrap;
mod config;
mod repl;
mod runtime;
mod state_machine;
mod transcript;
mod urgency;

use backend::{HttpTriageService, LoggingService};
use config::ClientConfig;
use repl::ReadlineInput;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "carepath=info".into());

    // stdout belongs to the conversation
    let fmt_layer = if std::env::var_os("CAREPATH_LOG_JSON").is_some() {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = ClientConfig::from_env();
    tracing::info!(
        backend = %config.backend_url,
        offer_after = config.offer_after,
        threshold = config.auto_diagnosis_threshold,
        "Configuration loaded"
    );

    let service = Arc::new(LoggingService::new(HttpTriageService::new(
        &config.backend_url,
        config.request_timeout,
    )?));

    let mut input = ReadlineInput::spawn()?;
    let mut stdout = tokio::io::stdout();

    bootstrap::ensure_credentials(service.as_ref(), &mut input, &mut stdout).await?;

    let handle = runtime::start_session(config.session_context(), service);
    tracing::info!(session_id = handle.session_id(), "Session started");

    repl::run(handle, &mut input).await?;

    Ok(())
}
