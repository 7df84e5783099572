use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use relay_core::types::{ChannelId, InboundMessage};

/// One attributed message in a channel's rolling history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: String,
    pub content: String,
}

impl Turn {
    pub fn new(speaker: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            content: content.into(),
        }
    }
}

/// Snapshot of a channel's conversation state.
///
/// Returned by value; the `SessionStore` keeps the authoritative copy.
#[derive(Debug, Clone)]
pub struct Session {
    pub channel_id: ChannelId,
    /// Oldest first. Always an even number of turns (user, bot, user, bot…).
    pub history: Vec<Turn>,
    pub last_activity: Option<Instant>,
}

/// One line of the durable transcript log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    /// RFC3339 timestamp of when the reply was delivered.
    pub timestamp: String,
    pub user: TranscriptUser,
    /// Guild name, or `"DM"` for direct messages.
    pub server: String,
    pub channel: TranscriptChannel,
    pub message: String,
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptChannel {
    pub name: String,
    pub id: String,
}

impl TranscriptRecord {
    /// Build a record for a delivered reply, stamped with the current time.
    pub fn new(msg: &InboundMessage, response: &str) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            user: TranscriptUser {
                id: msg.author.id.clone(),
                username: msg.author.username.clone(),
            },
            server: msg.channel.server_label().to_string(),
            channel: TranscriptChannel {
                name: msg.channel.display_name().to_string(),
                id: msg.channel.id.to_string(),
            },
            message: msg.content.clone(),
            response: response.to_string(),
        }
    }
}
