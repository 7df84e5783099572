use std::sync::{Arc, OnceLock};

use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::UserId;
use serenity::prelude::{Context, EventHandler};
use tracing::{debug, info};

use relay_agent::{handle_mention, Outcome, RelayRuntime};
use relay_core::types::{Author, ChannelId, ChannelRef, InboundMessage};

use crate::channel::DiscordChannel;

/// Serenity event handler that feeds mentions into the relay pipeline.
pub struct RelayHandler {
    pub runtime: Arc<RelayRuntime>,
    pub bot_id: OnceLock<UserId>,
}

#[async_trait]
impl EventHandler for RelayHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        self.bot_id.set(ready.user.id).ok();
        self.runtime.set_bot_name(ready.user.name.clone());

        info!(name = %ready.user.name, guilds = ready.guilds.len(), "Discord bot connected");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(bot_id) = self.bot_id.get().copied() else {
            return;
        };
        if msg.author.id == bot_id || !msg.mentions_user_id(bot_id) {
            return;
        }

        let inbound = inbound_message(&ctx, &msg, bot_id);
        info!(
            author = %inbound.author.username,
            channel = inbound.channel.display_name(),
            server = inbound.channel.server_label(),
            "received mention"
        );
        debug!(content = %inbound.content, "mention content");

        let channel = DiscordChannel::new(ctx, msg.channel_id, msg.guild_id, msg.id);
        let runtime = Arc::clone(&self.runtime);

        tokio::spawn(async move {
            let outcome = handle_mention(&runtime, &channel, inbound).await;
            if !matches!(outcome, Outcome::Replied { .. }) {
                debug!(?outcome, "mention cycle ended without a reply");
            }
        });
    }
}

/// Translate a serenity message into the relay's inbound form, resolving
/// guild and channel names from the cache.
fn inbound_message(ctx: &Context, msg: &Message, bot_id: UserId) -> InboundMessage {
    let (server, name) = match msg.guild_id {
        None => (None, None),
        Some(guild_id) => {
            let cached = ctx.cache.guild(guild_id).map(|guild| {
                let channel_name = guild
                    .channels
                    .get(&msg.channel_id)
                    .map(|c| c.name.clone())
                    .or_else(|| {
                        guild
                            .threads
                            .iter()
                            .find(|t| t.id == msg.channel_id)
                            .map(|t| t.name.clone())
                    });
                (guild.name.clone(), channel_name)
            });
            match cached {
                Some((guild_name, channel_name)) => (
                    Some(guild_name),
                    Some(channel_name.unwrap_or_else(|| msg.channel_id.to_string())),
                ),
                None => (
                    Some(guild_id.to_string()),
                    Some(msg.channel_id.to_string()),
                ),
            }
        }
    };

    let display_name = msg
        .member
        .as_ref()
        .and_then(|m| m.nick.clone())
        .or_else(|| msg.author.global_name.clone())
        .unwrap_or_else(|| msg.author.name.clone());

    InboundMessage {
        channel: ChannelRef {
            id: ChannelId::from(msg.channel_id.to_string()),
            name,
            server,
        },
        author: Author {
            id: msg.author.id.to_string(),
            username: msg.author.name.clone(),
            display_name,
        },
        content: strip_mention(&msg.content, bot_id.get()),
    }
}

/// Remove every mention of the bot (`<@id>` and `<@!id>`) and trim.
pub fn strip_mention(content: &str, bot_id: u64) -> String {
    content
        .replace(&format!("<@{bot_id}>"), "")
        .replace(&format!("<@!{bot_id}>"), "")
        .trim()
        .to_string()
}
