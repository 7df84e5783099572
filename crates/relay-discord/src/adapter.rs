use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serenity::model::gateway::GatewayIntents;
use serenity::Client;
use tracing::{error, info, warn};

use relay_agent::RelayRuntime;
use relay_core::config::DiscordConfig;

use crate::error::DiscordError;
use crate::handler::RelayHandler;

/// Discord side of the relay.
///
/// Wraps a serenity `Client` and drives the gateway until the process exits,
/// rebuilding the client whenever the connection drops.
pub struct DiscordAdapter {
    runtime: Arc<RelayRuntime>,
    token: String,
}

impl DiscordAdapter {
    pub fn new(config: &DiscordConfig, runtime: Arc<RelayRuntime>) -> Result<Self, DiscordError> {
        let token = config.bot_token.trim();
        if token.is_empty() {
            return Err(DiscordError::NoToken);
        }
        Ok(Self {
            runtime,
            token: token.to_string(),
        })
    }

    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }

    /// Connect and keep reconnecting. Never returns.
    pub async fn run(self) {
        let intents = Self::intents();

        loop {
            let mut client = self.connect(intents).await;
            info!("Discord: gateway connecting");

            if let Err(e) = client.start().await {
                warn!("Discord: gateway error ({e}), reconnecting in 5s");
            } else {
                info!("Discord: gateway stopped cleanly, reconnecting in 5s");
            }

            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    }

    /// Build a client, retrying every 30s until it succeeds.
    async fn connect(&self, intents: GatewayIntents) -> Client {
        loop {
            match self.build_client(intents).await {
                Ok(c) => return c,
                Err(e) => {
                    error!("Discord: connect failed ({e}), retrying in 30s");
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
            }
        }
    }

    async fn build_client(&self, intents: GatewayIntents) -> Result<Client, DiscordError> {
        let handler = RelayHandler {
            runtime: Arc::clone(&self.runtime),
            bot_id: OnceLock::new(),
        };

        Ok(Client::builder(&self.token, intents)
            .event_handler(handler)
            .await?)
    }
}
