use serde::{Deserialize, Serialize};
use std::fmt;

/// Server label used for direct messages in logs and transcripts.
pub const DM_SENTINEL: &str = "DM";

/// Stable identifier of a conversation channel (Discord snowflake as text).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ChannelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Where a message came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: ChannelId,
    /// Channel name; `None` for direct messages.
    pub name: Option<String>,
    /// Guild (server) name; `None` for direct messages.
    pub server: Option<String>,
}

impl ChannelRef {
    pub fn is_direct(&self) -> bool {
        self.server.is_none()
    }

    /// Name used in logs, `"DM"` for direct messages.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DM_SENTINEL)
    }

    pub fn server_label(&self) -> &str {
        self.server.as_deref().unwrap_or(DM_SENTINEL)
    }
}

/// Who sent a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
    /// Guild nickname or global display name; falls back to `username`.
    pub display_name: String,
}

/// A mention the relay has to answer, already stripped of the bot mention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub channel: ChannelRef,
    pub author: Author,
    pub content: String,
}
