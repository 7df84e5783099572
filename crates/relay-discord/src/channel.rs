use async_trait::async_trait;
use serenity::builder::CreateMessage;
use serenity::http::HttpError;
use serenity::model::error::Error as ModelError;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use serenity::prelude::Context;
use tracing::{debug, warn};

use relay_agent::ChatChannel;
use relay_core::ChannelError;

/// HTTP status Discord returns for missing permissions.
const FORBIDDEN: u16 = 403;
/// Discord JSON error code: Missing Access.
const MISSING_ACCESS: isize = 50001;
/// Discord JSON error code: Missing Permissions.
const MISSING_PERMISSIONS: isize = 50013;

/// The channel a mention arrived on, bound to the triggering message.
#[derive(Clone)]
pub struct DiscordChannel {
    ctx: Context,
    channel_id: ChannelId,
    guild_id: Option<GuildId>,
    message_id: MessageId,
}

impl DiscordChannel {
    pub fn new(
        ctx: Context,
        channel_id: ChannelId,
        guild_id: Option<GuildId>,
        message_id: MessageId,
    ) -> Self {
        Self {
            ctx,
            channel_id,
            guild_id,
            message_id,
        }
    }

    /// Answer the permission question from the cache. `None` means the
    /// guild or channel is not cached (threads, for one).
    fn cached_send_permission(
        &self,
        guild_id: GuildId,
        member: &serenity::model::guild::Member,
    ) -> Option<bool> {
        let guild = self.ctx.cache.guild(guild_id)?;
        let channel = guild.channels.get(&self.channel_id)?;
        Some(guild.user_permissions_in(channel, member).send_messages())
    }
}

#[async_trait]
impl ChatChannel for DiscordChannel {
    async fn can_send(&self) -> bool {
        // Direct messages are always allowed.
        let Some(guild_id) = self.guild_id else {
            return true;
        };

        let bot_id = self.ctx.cache.current_user().id;
        let member = match guild_id.member(&self.ctx, bot_id).await {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, guild = %guild_id, "could not resolve own guild member, assuming send is allowed");
                return true;
            }
        };

        match self.cached_send_permission(guild_id, &member) {
            Some(allowed) => allowed,
            None => {
                debug!(channel = %self.channel_id, "channel not in cache, assuming send is allowed");
                true
            }
        }
    }

    async fn send_typing(&self) -> Result<(), ChannelError> {
        self.channel_id
            .broadcast_typing(&self.ctx.http)
            .await
            .map_err(classify)
    }

    async fn reply(&self, text: &str) -> Result<(), ChannelError> {
        let message = CreateMessage::new()
            .content(text)
            .reference_message((self.channel_id, self.message_id));
        self.channel_id
            .send_message(&self.ctx.http, message)
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

/// Sort a serenity failure into permission-class or anything else.
pub fn classify(err: serenity::Error) -> ChannelError {
    let permission = match &err {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)) => {
            is_permission_failure(resp.status_code.as_u16(), resp.error.code)
        }
        serenity::Error::Model(ModelError::InvalidPermissions { .. }) => true,
        _ => false,
    };

    if permission {
        ChannelError::PermissionDenied(err.to_string())
    } else {
        ChannelError::Other(err.to_string())
    }
}

/// HTTP 403 or Discord codes 50001 / 50013.
pub fn is_permission_failure(status: u16, code: isize) -> bool {
    status == FORBIDDEN || code == MISSING_ACCESS || code == MISSING_PERMISSIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_status_is_permission() {
        assert!(is_permission_failure(403, 0));
    }

    #[test]
    fn discord_access_codes_are_permission() {
        assert!(is_permission_failure(400, 50001));
        assert!(is_permission_failure(400, 50013));
    }

    #[test]
    fn other_failures_are_not_permission() {
        assert!(!is_permission_failure(500, 0));
        assert!(!is_permission_failure(429, 20028));
        assert!(!is_permission_failure(404, 10003));
    }

    #[test]
    fn non_http_errors_are_other() {
        let err = serenity::Error::Other("gateway closed");
        assert!(!classify(err).is_permission());
    }
}
