use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use relay_agent::{OllamaClient, RelayRuntime};
use relay_core::RelayConfig;
use relay_discord::DiscordAdapter;
use relay_memory::{InactivityReaper, PersistenceSink, SessionStore};

/// Discord bot that answers mentions with a local Ollama model.
#[derive(Parser, Debug)]
#[command(name = "ollama-relay", version, about)]
struct Cli {
    /// Path to relay.toml. Falls back to $RELAY_CONFIG, then
    /// ~/.ollama-relay/relay.toml.
    #[arg(long, short)]
    config: Option<String>,
}

impl Cli {
    fn config_path(&self) -> Option<String> {
        self.config
            .clone()
            .or_else(|| std::env::var("RELAY_CONFIG").ok())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ollama_relay=info,relay_agent=info,relay_discord=info,relay_memory=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config = match RelayConfig::load(cli.config_path().as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!(code = e.code(), "{e}");
            std::process::exit(1);
        }
    };

    info!(version = env!("CARGO_PKG_VERSION"), "starting ollama-relay");
    info!(
        url = %config.ollama.generate_url(),
        model = model_label(&config.ollama.model),
        history_limit = config.conversation.history_limit,
        inactivity_timeout_secs = config.conversation.inactivity_timeout_secs,
        "configuration loaded"
    );
    if config.ollama.model.is_empty() {
        warn!("ollama.model is empty, Ollama will use its default model");
    }

    let client = OllamaClient::from_config(&config.ollama).context("building HTTP client")?;
    let sessions = Arc::new(SessionStore::new(config.conversation.history_limit));
    let sink = PersistenceSink::from_config(&config.persistence, config.conversation.history_limit)
        .map(Arc::new);
    if sink.is_some() {
        info!(
            transcripts = config.persistence.transcripts,
            raw_prompts = config.persistence.raw_prompts,
            "persistence enabled"
        );
    }

    let mut runtime = RelayRuntime::from_config(&config, Box::new(client), Arc::clone(&sessions));
    let mut reaper = InactivityReaper::new(
        Arc::clone(&sessions),
        Duration::from_secs(config.conversation.inactivity_timeout_secs),
        Duration::from_secs(config.conversation.sweep_interval_secs),
    );
    if let Some(ref sink) = sink {
        runtime = runtime.with_sink(Arc::clone(sink));
        reaper = reaper.with_sink(Arc::clone(sink));
    }
    let runtime = Arc::new(runtime);

    let cancel = CancellationToken::new();
    let reaper_task = tokio::spawn(reaper.run(cancel.clone()));

    let adapter = DiscordAdapter::new(&config.discord, Arc::clone(&runtime))?;
    tokio::select! {
        _ = adapter.run() => {}
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutdown requested");
        }
    }

    cancel.cancel();
    if let Err(e) = reaper_task.await {
        warn!(error = %e, "inactivity reaper task failed");
    }
    info!("ollama-relay stopped");
    Ok(())
}

/// Log label for the configured model; empty means Ollama's default.
fn model_label(model: &str) -> &str {
    if model.is_empty() {
        "default"
    } else {
        model
    }
}
