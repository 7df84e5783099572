use async_trait::async_trait;

use relay_core::ChannelError;

/// The one conversation channel a mention arrived on.
///
/// Implemented by the Discord adapter and by test fakes. Every method is
/// scoped to that channel; replies are threaded to the triggering message.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Whether the bot may post here. Unknown permissions count as allowed.
    async fn can_send(&self) -> bool;

    /// Show the "is typing" indicator once.
    async fn send_typing(&self) -> Result<(), ChannelError>;

    /// Post `text` as a reply to the triggering message.
    async fn reply(&self, text: &str) -> Result<(), ChannelError>;
}
