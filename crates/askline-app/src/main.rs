//! Askline application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration (file, env, CLI)
//! 2. Initialize tracing
//! 3. Build the generation client and pick the retrieval strategy
//! 4. Wire the Supervisor
//! 5. Serve the HTTP API, or answer a single question with `ask`
//!
//! `init-config` writes a default config file and exits before step 3.

mod cli;

use std::sync::Arc;

use clap::Parser;

use askline_agents::{retriever_from_config, GeminiClient, Supervisor};
use askline_api::{start_server, AppState};
use askline_core::config::{AsklineConfig, LLM_API_KEY_ENV};

use crate::cli::{CliArgs, Command};

fn init_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config: file, then environment, then CLI flags.
    let config_path = args.resolve_config_path();
    let (mut config, load_error) = match AsklineConfig::load(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (AsklineConfig::default(), Some(e)),
    };
    config.apply_env_overrides();
    args.apply_overrides(&mut config);

    init_tracing(&config.general.log_level);
    tracing::info!("Starting Askline v{}", env!("CARGO_PKG_VERSION"));

    match load_error {
        None => tracing::info!(path = %config_path.display(), "Configuration loaded"),
        Some(e) if config_path.exists() => tracing::warn!(
            path = %config_path.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
        Some(_) => tracing::info!(
            path = %config_path.display(),
            "No config file found, using defaults"
        ),
    }

    if let Command::InitConfig { force } = args.command() {
        cli::write_default_config(&config_path, force)?;
        tracing::info!(path = %config_path.display(), "Default configuration written");
        return Ok(());
    }

    if !config.request_timeout_covers_pipeline() {
        tracing::warn!(
            request_timeout_secs = config.general.request_timeout_secs,
            pipeline_budget_secs = config.pipeline_budget_secs(),
            "Request timeout is shorter than the slowest pipeline run; clients may see 408 instead of a fallback answer"
        );
    }

    // Generation backend is mandatory.
    let generator = match GeminiClient::from_config(&config.llm) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(error = %e, "Cannot start without a generation backend");
            tracing::error!("Set {} or add [llm] api_key to {}", LLM_API_KEY_ENV, config_path.display());
            return Err(e.into());
        }
    };

    let search_status = config.search.status();
    tracing::info!(configured = search_status.configured, "{}", search_status.message);
    let retriever = retriever_from_config(&config.search);

    let supervisor = Supervisor::with_generator(generator, retriever);

    match args.command() {
        Command::Serve => {
            let state = AppState::new(config.clone(), supervisor);
            start_server(&config, state).await?;
        }
        Command::Ask { transcript } => {
            if transcript.trim().is_empty() {
                return Err("transcript must not be empty".into());
            }
            let result = supervisor.run(&transcript).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::InitConfig { .. } => unreachable!("handled before backend setup"),
    }

    Ok(())
}
