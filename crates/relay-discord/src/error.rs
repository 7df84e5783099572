/// Errors produced while setting up the Discord connection.
///
/// Failures during a mention cycle never surface here; they are classified
/// into [`relay_core::ChannelError`] by [`crate::channel`].
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("no Discord bot token configured")]
    NoToken,

    #[error("failed to build Discord client: {0}")]
    Client(#[from] serenity::Error),
}
