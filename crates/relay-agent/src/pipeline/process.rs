//! One mention cycle, from permission check to recording.
//!
//! `handle_mention` walks PermissionCheck → Drafting → Inferring →
//! PostProcessing → Replying → Recording and reports where it ended as an
//! [`Outcome`]. History is only touched after the reply was delivered.

use std::sync::Arc;

use tracing::{error, info, warn};

use relay_core::types::InboundMessage;
use relay_core::RelayError;
use relay_memory::{TranscriptRecord, Turn};

use crate::keepalive::run_with_keepalive;
use crate::runtime::RelayRuntime;

use super::channel::ChatChannel;

/// Sent when inference or delivery fails, or the model's reply is empty.
/// Details stay in the logs.
pub const APOLOGY: &str = "Sorry, I encountered an error while processing your request.";

/// Terminal state of a mention cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The bot may not post in the channel; nothing was sent or inferred.
    Rejected,
    /// The reply was delivered and the exchange recorded.
    Replied { text: String },
    /// Something failed and the apology was attempted.
    Apologized { delivered: bool },
    /// The reply was refused for lack of permission. No apology is tried.
    DeliveryFailed { text: String },
}

/// Answer one mention on `channel`.
///
/// Concurrent mentions in the same channel are serialized; the second waits
/// until the first has recorded its exchange.
pub async fn handle_mention<C>(rt: &RelayRuntime, channel: &C, msg: InboundMessage) -> Outcome
where
    C: ChatChannel + ?Sized,
{
    let channel_id = msg.channel.id.clone();

    if !channel.can_send().await {
        let err = RelayError::PermissionDenied {
            reason: "missing Send Messages permission".into(),
        };
        warn!(
            code = err.code(),
            error = %err,
            channel = %channel_id,
            name = msg.channel.display_name(),
            server = msg.channel.server_label(),
            "missing send permission, ignoring mention"
        );
        return Outcome::Rejected;
    }

    let sessions = rt.sessions();
    let _cycle = sessions.begin_cycle(&channel_id).await;

    // Drafting
    let session = sessions.get_or_create(&channel_id);
    sessions.touch(&channel_id);
    let prompt = rt
        .prompt()
        .build(&session.history, &msg.content, &msg.author);

    info!(
        channel = %channel_id,
        author = %msg.author.username,
        history_turns = session.history.len(),
        prompt_len = prompt.len(),
        "handling mention"
    );

    // Inferring
    let generation = rt.client().generate(rt.model(), &prompt);
    let raw = match run_with_keepalive(channel, rt.typing_interval(), generation).await {
        Ok(text) => text,
        Err(e) => {
            let err = RelayError::from(e);
            error!(
                code = err.code(),
                error = %err,
                channel = %channel_id,
                provider = rt.client().name(),
                "inference failed"
            );
            return apologize(channel, &msg).await;
        }
    };
    sessions.touch(&channel_id);

    // PostProcessing
    let reply = rt.postprocess().process(&raw);
    if reply.trim().is_empty() {
        warn!(
            channel = %channel_id,
            raw_len = raw.len(),
            "model reply is empty after post-processing"
        );
        return apologize(channel, &msg).await;
    }

    // Replying
    if let Err(e) = channel.reply(&reply).await {
        if e.is_permission() {
            let err = RelayError::DeliveryFailure { text: reply.clone() };
            warn!(code = err.code(), error = %err, reason = %e, channel = %channel_id, "reply refused");
            return Outcome::DeliveryFailed { text: reply };
        }
        error!(error = %e, channel = %channel_id, "failed to deliver reply");
        return apologize(channel, &msg).await;
    }

    // Recording
    sessions.record_exchange(
        &channel_id,
        Turn::new(&msg.author.username, &msg.content),
        Turn::new(rt.bot_name(), &reply),
    );
    info!(channel = %channel_id, reply_len = reply.chars().count(), "reply delivered");

    if let Some(sink) = rt.sink() {
        let record = TranscriptRecord::new(&msg, &reply);
        let transcript_sink = Arc::clone(sink);
        tokio::spawn(async move {
            transcript_sink.append_transcript(record).await;
        });

        let archive_sink = Arc::clone(sink);
        let InboundMessage {
            channel: origin,
            author,
            ..
        } = msg;
        tokio::spawn(async move {
            archive_sink
                .archive_raw_prompt(&prompt, &origin, &author)
                .await;
        });
    }

    Outcome::Replied { text: reply }
}

async fn apologize<C>(channel: &C, msg: &InboundMessage) -> Outcome
where
    C: ChatChannel + ?Sized,
{
    match channel.reply(APOLOGY).await {
        Ok(()) => Outcome::Apologized { delivered: true },
        Err(e) => {
            warn!(error = %e, channel = %msg.channel.id, "could not deliver apology");
            Outcome::Apologized { delivered: false }
        }
    }
}
